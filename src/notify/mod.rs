//! In-app notification dispatch.
//!
//! Turns classified reservation transitions into short title/message pairs
//! and hands them to the platform's transient-message primitive. A single
//! dispatcher is shared by every notification-emitting watcher in the
//! process; its bounded seen-set keeps a change observed by both the
//! global watcher and a screen watcher from being announced twice.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use crate::model::{Reservation, ReservationStatus, Role};
use crate::store::Timestamp;
use crate::sync::ReservationEvent;

/// The one platform primitive this core needs: display a transient
/// message (toast or alert, the platform decides).
pub trait MessagePresenter: Send + Sync {
    fn show_transient_message(&self, title: &str, message: &str);
}

const NEW_BOOKING_TITLE: &str = "Nouvelle réservation";
const STATUS_TITLE: &str = "Réservation";
const CONFIRMED_MESSAGE: &str = "Confirmée.";
const CANCELED_MESSAGE: &str = "Annulée.";

/// Default size of the dedup window. Watchers observe the same change
/// within moments of each other; a short bounded history is enough.
const DEDUP_CAPACITY: usize = 128;

#[derive(Clone, PartialEq, Eq, Hash)]
struct DedupKey {
    document_id: String,
    kind: DedupKind,
    stamp: Option<Timestamp>,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
enum DedupKind {
    Created,
    StatusChanged(ReservationStatus),
}

/// FIFO-evicting seen-set.
struct DedupCache {
    seen: HashSet<DedupKey>,
    order: VecDeque<DedupKey>,
    capacity: usize,
}

impl DedupCache {
    fn new(capacity: usize) -> Self {
        Self {
            seen: HashSet::new(),
            order: VecDeque::new(),
            capacity,
        }
    }

    /// Returns false when the key was already recorded.
    fn insert(&mut self, key: DedupKey) -> bool {
        if !self.seen.insert(key.clone()) {
            return false;
        }
        self.order.push_back(key);
        while self.order.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.seen.remove(&evicted);
            }
        }
        true
    }
}

pub struct NotificationDispatcher {
    presenter: Arc<dyn MessagePresenter>,
    seen: Mutex<DedupCache>,
}

impl NotificationDispatcher {
    pub fn new(presenter: Arc<dyn MessagePresenter>) -> Self {
        Self::with_capacity(presenter, DEDUP_CAPACITY)
    }

    pub fn with_capacity(presenter: Arc<dyn MessagePresenter>, capacity: usize) -> Self {
        Self {
            presenter,
            seen: Mutex::new(DedupCache::new(capacity)),
        }
    }

    /// Announces the event if it is relevant to the watcher's role and has
    /// not been announced by another watcher already.
    ///
    /// Manager watchers announce new bookings; client watchers announce
    /// terminal status changes. Everything else is silent.
    pub fn dispatch(&self, role: Role, event: &ReservationEvent) {
        let Some((key, title, message)) = self.render(role, event) else {
            return;
        };

        let fresh = {
            let mut seen = self
                .seen
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            seen.insert(key)
        };
        if !fresh {
            log::debug!("suppressed duplicate notification: {title} / {message}");
            return;
        }

        self.presenter.show_transient_message(title, &message);
    }

    fn render(
        &self,
        role: Role,
        event: &ReservationEvent,
    ) -> Option<(DedupKey, &'static str, String)> {
        match event {
            ReservationEvent::BookingCreated(reservation) if role.is_manager() => {
                let key = DedupKey {
                    document_id: reservation.id.clone(),
                    kind: DedupKind::Created,
                    stamp: reservation.created_at,
                };
                Some((key, NEW_BOOKING_TITLE, booking_message(reservation)))
            }
            ReservationEvent::StatusChanged { reservation, .. } if role == Role::Client => {
                let message = match reservation.status {
                    ReservationStatus::Confirmed => CONFIRMED_MESSAGE,
                    ReservationStatus::Canceled => CANCELED_MESSAGE,
                    ReservationStatus::Pending => return None,
                };
                let key = DedupKey {
                    document_id: reservation.id.clone(),
                    kind: DedupKind::StatusChanged(reservation.status),
                    stamp: reservation.updated_at,
                };
                Some((key, STATUS_TITLE, message.to_string()))
            }
            _ => None,
        }
    }
}

/// "{carwash} • {service} • {phone}"; the phone segment is dropped when
/// the document carries none.
fn booking_message(reservation: &Reservation) -> String {
    let mut message = format!(
        "{} • {}",
        reservation.carwash_label(),
        reservation.service_label()
    );
    if !reservation.client_phone.is_empty() {
        message.push_str(" • ");
        message.push_str(&reservation.client_phone);
    }
    message
}
