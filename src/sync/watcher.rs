use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use crate::error::{failed_precondition, SyncResult};
use crate::model::carwash;
use crate::model::reservation::fields;
use crate::model::{Reservation, Role, CARWASHES_COLLECTION, RESERVATIONS_COLLECTION};
use crate::notify::NotificationDispatcher;
use crate::store::{
    DocumentStore, Filter, ListenerRegistration, SnapshotEvent, SnapshotObserver, FAN_OUT_LIMIT,
};
use crate::sync::batcher;
use crate::sync::classifier::{ChangeClassifier, WatcherPhase};
use crate::sync::view::ReservationView;

pub type UpdateCallback = Arc<dyn Fn(&[Reservation]) + Send + Sync>;

/// What a watcher exists for. A screen watcher maintains a visible list
/// and, for managers, doubles as a notification source; the global
/// watcher exists only to notify and skips the degraded batched read
/// entirely when the owned set exceeds the fan-out limit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum WatcherKind {
    Screen,
    Global,
}

struct WatcherState {
    role: Role,
    kind: WatcherKind,
    view: Mutex<ReservationView>,
    classifier: Mutex<ChangeClassifier>,
    subscription: Mutex<Option<ListenerRegistration>>,
    update_callbacks: Mutex<Vec<UpdateCallback>>,
    dispatcher: Option<Arc<NotificationDispatcher>>,
    realtime: AtomicBool,
    stopped: AtomicBool,
}

/// One live reservation scope: a subscription (or batched fallback), its
/// classification state, and the sorted view derived from it.
///
/// The watcher exclusively owns its subscription handle. `stop` releases
/// it exactly once and is safe to call any number of times; a session
/// tears every watcher down through it on sign-out.
pub struct ReservationWatcher {
    store: Arc<dyn DocumentStore>,
    identity: String,
    state: Arc<WatcherState>,
}

impl std::fmt::Debug for ReservationWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReservationWatcher")
            .field("identity", &self.identity)
            .field("role", &self.state.role)
            .field("kind", &self.state.kind)
            .finish()
    }
}

impl ReservationWatcher {
    pub(crate) async fn start(
        store: Arc<dyn DocumentStore>,
        role: Role,
        identity: impl Into<String>,
        dispatcher: Option<Arc<NotificationDispatcher>>,
        kind: WatcherKind,
    ) -> SyncResult<Self> {
        let watcher = Self {
            store,
            identity: identity.into(),
            state: Arc::new(WatcherState {
                role,
                kind,
                view: Mutex::new(ReservationView::new(role)),
                classifier: Mutex::new(ChangeClassifier::new()),
                subscription: Mutex::new(None),
                update_callbacks: Mutex::new(Vec::new()),
                dispatcher,
                realtime: AtomicBool::new(false),
                stopped: AtomicBool::new(false),
            }),
        };
        watcher.attach().await?;
        Ok(watcher)
    }

    pub fn role(&self) -> Role {
        self.state.role
    }

    /// Current sorted list; a copy, so screens can render without holding
    /// the watcher's lock.
    pub fn current_list(&self) -> Vec<Reservation> {
        lock(&self.state.view).reservations().to_vec()
    }

    /// Registers a callback invoked after every view rebuild. The current
    /// list is available through [`Self::current_list`] immediately.
    pub fn on_update<F>(&self, callback: F)
    where
        F: Fn(&[Reservation]) + Send + Sync + 'static,
    {
        lock(&self.state.update_callbacks).push(Arc::new(callback));
    }

    pub fn badge_count(&self) -> Option<NonZeroUsize> {
        lock(&self.state.view).badge()
    }

    /// False while operating in the degraded mode above the fan-out limit
    /// (and after a terminal subscription error); the list then only
    /// moves on explicit [`Self::reload`].
    pub fn is_realtime(&self) -> bool {
        self.state.realtime.load(Ordering::SeqCst)
    }

    pub fn phase(&self) -> WatcherPhase {
        if self.state.stopped.load(Ordering::SeqCst) {
            WatcherPhase::Stopped
        } else {
            lock(&self.state.classifier).phase()
        }
    }

    /// Rebuilds the watcher from scratch: refetches the owned-carwash set,
    /// re-selects live versus degraded mode, and replaces the view.
    /// This is the restart path after a subscription error, after the
    /// owned set changes, and after a manager's own writes in degraded
    /// mode.
    pub async fn reload(&self) -> SyncResult<()> {
        if self.state.stopped.load(Ordering::SeqCst) {
            return Err(failed_precondition("watcher already stopped"));
        }
        self.attach().await
    }

    /// Releases the subscription. Idempotent: repeated calls (and calls
    /// racing a store-side teardown) are no-ops.
    pub fn stop(&self) {
        if self.state.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(subscription) = lock(&self.state.subscription).take() {
            subscription.unsubscribe();
        }
        lock(&self.state.classifier).stop();
        log::debug!(
            "stopped {} reservation watcher for {}",
            self.state.role,
            self.identity
        );
    }

    async fn attach(&self) -> SyncResult<()> {
        if let Some(previous) = lock(&self.state.subscription).take() {
            previous.unsubscribe();
        }
        *lock(&self.state.classifier) = ChangeClassifier::new();
        self.state.realtime.store(false, Ordering::SeqCst);

        if !self.state.role.is_manager() {
            let filter = Filter::new().with_eq(fields::CLIENT_ID, self.identity.as_str());
            return self.open_subscription(filter).await;
        }

        let owned = self.owned_carwash_ids().await?;
        if owned.is_empty() {
            self.replace_view(&[]);
            return Ok(());
        }

        if owned.len() <= FAN_OUT_LIMIT {
            let values: Vec<serde_json::Value> =
                owned.iter().map(|id| id.as_str().into()).collect();
            let filter = Filter::new().with_in(fields::CARWASH_ID, values)?;
            return self.open_subscription(filter).await;
        }

        // Above the store's fan-out limit there is no live subscription;
        // the view is populated by a batched read and refreshed only on
        // reload.
        log::debug!(
            "owner {} has {} carwashes (> {FAN_OUT_LIMIT}); reservation view is not real-time",
            self.identity,
            owned.len()
        );
        if self.state.kind == WatcherKind::Global {
            return Ok(());
        }
        let documents = batcher::query_by_id_set(
            self.store.as_ref(),
            RESERVATIONS_COLLECTION,
            &Filter::new(),
            fields::CARWASH_ID,
            &owned,
        )
        .await?;
        self.replace_view(&documents);
        Ok(())
    }

    async fn owned_carwash_ids(&self) -> SyncResult<Vec<String>> {
        let filter = Filter::new().with_eq(carwash::fields::OWNER_ID, self.identity.as_str());
        let documents = self.store.query(CARWASHES_COLLECTION, &filter).await?;
        Ok(documents
            .into_iter()
            .map(|document| document.id().to_string())
            .collect())
    }

    async fn open_subscription(&self, filter: Filter) -> SyncResult<()> {
        lock(&self.state.classifier).mark_subscribed();

        let on_event = Arc::downgrade(&self.state);
        let on_error = Weak::clone(&on_event);
        let observer = SnapshotObserver::new(move |event: &SnapshotEvent| {
            if let Some(state) = on_event.upgrade() {
                handle_event(&state, event);
            }
        })
        .with_error(move |error| {
            if let Some(state) = on_error.upgrade() {
                log::warn!(
                    "{} reservation subscription failed: {error}; watcher left stopped",
                    state.role
                );
                lock(&state.classifier).stop();
                state.realtime.store(false, Ordering::SeqCst);
            }
        });

        let registration = self
            .store
            .subscribe(RESERVATIONS_COLLECTION, filter, observer)
            .await?;

        if self.state.stopped.load(Ordering::SeqCst) {
            // Stopped while the subscription was being opened; release
            // immediately instead of leaking the handle.
            registration.unsubscribe();
            return Ok(());
        }
        *lock(&self.state.subscription) = Some(registration);
        self.state.realtime.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn replace_view(&self, documents: &[crate::store::Document]) {
        let list = {
            let mut view = lock(&self.state.view);
            view.rebuild(documents);
            view.reservations().to_vec()
        };
        notify_update(&self.state, &list);
    }
}

fn handle_event(state: &WatcherState, event: &SnapshotEvent) {
    if state.stopped.load(Ordering::SeqCst) {
        return;
    }

    let transitions = lock(&state.classifier).classify(event);

    let list = {
        let mut view = lock(&state.view);
        view.rebuild(&event.documents);
        view.reservations().to_vec()
    };
    notify_update(state, &list);

    if let Some(dispatcher) = &state.dispatcher {
        for transition in &transitions {
            dispatcher.dispatch(state.role, transition);
        }
    }
}

fn notify_update(state: &WatcherState, list: &[Reservation]) {
    let callbacks: Vec<UpdateCallback> = lock(&state.update_callbacks).clone();
    for callback in callbacks {
        callback(list);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
