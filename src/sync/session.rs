use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::{failed_precondition, SyncResult};
use crate::model::Role;
use crate::notify::{MessagePresenter, NotificationDispatcher};
use crate::store::DocumentStore;
use crate::sync::watcher::{ReservationWatcher, WatcherKind};

/// Everything scoped to one signed-in user: identity, role, the shared
/// notification dispatcher, and ownership of every watcher started on the
/// user's behalf.
///
/// There is no ambient "current session"; screens receive the session
/// explicitly and the owning scope calls [`Session::end`] on sign-out,
/// which releases every watcher (the global one included) before a
/// successor session starts any of its own. Skipping that teardown is
/// what leaks one user's notifications into the next user's session.
pub struct Session {
    store: Arc<dyn DocumentStore>,
    dispatcher: Arc<NotificationDispatcher>,
    identity: String,
    role: Role,
    watchers: Mutex<Vec<Arc<ReservationWatcher>>>,
    ended: AtomicBool,
}

impl Session {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        presenter: Arc<dyn MessagePresenter>,
        identity: impl Into<String>,
        role: Role,
    ) -> Self {
        Self {
            store,
            dispatcher: Arc::new(NotificationDispatcher::new(presenter)),
            identity: identity.into(),
            role,
            watchers: Mutex::new(Vec::new()),
            ended: AtomicBool::new(false),
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_ended(&self) -> bool {
        self.ended.load(Ordering::SeqCst)
    }

    /// Starts the app-wide watcher that exists only to announce
    /// transitions: new bookings to managers, terminal status changes to
    /// clients. Runs for the session's whole lifetime; `end` stops it.
    pub async fn start_global_notification_watcher(
        &self,
    ) -> SyncResult<Arc<ReservationWatcher>> {
        self.start(WatcherKind::Global, Some(self.dispatcher.clone()))
            .await
    }

    /// Starts a screen-scoped watcher maintaining a live sorted list plus
    /// badge. Manager screens double as notification sources for new
    /// bookings (the dispatcher's seen-set absorbs the overlap with the
    /// global watcher); client screens are view-only.
    pub async fn start_reservation_watcher(&self) -> SyncResult<Arc<ReservationWatcher>> {
        let dispatcher = if self.role.is_manager() {
            Some(self.dispatcher.clone())
        } else {
            None
        };
        self.start(WatcherKind::Screen, dispatcher).await
    }

    async fn start(
        &self,
        kind: WatcherKind,
        dispatcher: Option<Arc<NotificationDispatcher>>,
    ) -> SyncResult<Arc<ReservationWatcher>> {
        if self.is_ended() {
            return Err(failed_precondition("session already ended"));
        }

        let watcher = Arc::new(
            ReservationWatcher::start(
                self.store.clone(),
                self.role,
                self.identity.clone(),
                dispatcher,
                kind,
            )
            .await?,
        );

        let mut watchers = self
            .watchers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if self.is_ended() {
            // Sign-out raced the start; do not hand out a live watcher.
            watcher.stop();
            return Err(failed_precondition("session already ended"));
        }
        watchers.push(watcher.clone());
        Ok(watcher)
    }

    /// Stops every watcher this session started. Idempotent; watcher stop
    /// is itself idempotent, so a watcher the caller already stopped is
    /// fine.
    pub fn end(&self) {
        if self.ended.swap(true, Ordering::SeqCst) {
            return;
        }
        let watchers = {
            let mut watchers = self
                .watchers
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            std::mem::take(&mut *watchers)
        };
        log::debug!(
            "ending session for {} ({} watchers)",
            self.identity,
            watchers.len()
        );
        for watcher in watchers {
            watcher.stop();
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.end();
    }
}
