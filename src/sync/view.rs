use std::num::NonZeroUsize;

use crate::badge;
use crate::model::{Reservation, ReservationStatus, Role};
use crate::store::{Document, Timestamp};

/// The authoritative reservation list for one watcher scope.
///
/// Rebuilt wholesale from every feed event or batched read, never patched
/// in place, so the list cannot drift from the store. Expected volumes are
/// tens to low hundreds of reservations per carwash.
#[derive(Debug)]
pub struct ReservationView {
    role: Role,
    reservations: Vec<Reservation>,
}

impl ReservationView {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            reservations: Vec::new(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn reservations(&self) -> &[Reservation] {
        &self.reservations
    }

    pub fn len(&self) -> usize {
        self.reservations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reservations.is_empty()
    }

    /// Replaces the list with the decoded, role-ordered result set.
    pub fn rebuild(&mut self, documents: &[Document]) {
        let mut reservations: Vec<Reservation> =
            documents.iter().map(Reservation::from_document).collect();
        sort_for_role(self.role, &mut reservations);
        self.reservations = reservations;
    }

    pub fn clear(&mut self) {
        self.reservations.clear();
    }

    /// Badge derived from the current list; `None` when there is nothing
    /// to show.
    pub fn badge(&self) -> Option<NonZeroUsize> {
        badge::badge_count(self.role, &self.reservations)
    }
}

fn sort_for_role(role: Role, reservations: &mut [Reservation]) {
    if role.is_manager() {
        // Pending entries first. The sort is stable: entries of equal
        // priority keep their arrival order.
        reservations.sort_by_key(|reservation| status_priority(reservation.status));
    } else {
        // Client history: newest first, document id as the tie-break.
        reservations.sort_by(|a, b| {
            let a_created = a.created_at.unwrap_or(Timestamp::new(0, 0));
            let b_created = b.created_at.unwrap_or(Timestamp::new(0, 0));
            b_created
                .cmp(&a_created)
                .then_with(|| a.id.cmp(&b.id))
        });
    }
}

fn status_priority(status: ReservationStatus) -> u8 {
    match status {
        ReservationStatus::Pending => 0,
        ReservationStatus::Confirmed | ReservationStatus::Canceled => 1,
    }
}
