//! Change feed adapter: the uniform surface the synchronization core uses
//! to talk to the document store.
//!
//! The store is an external collaborator; this module pins down the three
//! primitives the core relies on (one-shot query, live subscription,
//! sentinel-resolving writes) plus the event shape every subscription
//! delivers. [`memory::MemoryDocumentStore`] implements the trait for
//! tests and local development.

pub mod document;
pub mod filter;
pub mod memory;
pub mod timestamp;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{SyncError, SyncResult};

pub use document::{server_timestamp, Document, WriteData, WriteValue};
pub use filter::{FieldFilter, Filter, FilterOp, FAN_OUT_LIMIT};
pub use memory::MemoryDocumentStore;
pub use timestamp::Timestamp;

/// How a document moved relative to the previous snapshot of the same
/// subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Modified,
    Removed,
}

#[derive(Clone, Debug)]
pub struct DocumentChange {
    pub kind: ChangeKind,
    pub document: Document,
}

/// One delivery of a live subscription: the full current result set plus
/// the changes since the previous delivery. The first event after
/// subscribing carries every matching document tagged [`ChangeKind::Added`].
#[derive(Clone, Debug)]
pub struct SnapshotEvent {
    pub documents: Vec<Document>,
    pub changes: Vec<DocumentChange>,
}

type SnapshotCallback = Arc<dyn Fn(&SnapshotEvent) + Send + Sync>;
type SubscriptionErrorCallback = Arc<dyn Fn(&SyncError) + Send + Sync>;

/// Callback pair a subscription delivers into. A store-level error is
/// terminal for the subscription; after the error callback fires no
/// further events arrive and retrying is the caller's decision.
#[derive(Clone)]
pub struct SnapshotObserver {
    next: SnapshotCallback,
    error: Option<SubscriptionErrorCallback>,
}

impl SnapshotObserver {
    pub fn new<F>(next: F) -> Self
    where
        F: Fn(&SnapshotEvent) + Send + Sync + 'static,
    {
        Self {
            next: Arc::new(next),
            error: None,
        }
    }

    pub fn with_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(&SyncError) + Send + Sync + 'static,
    {
        self.error = Some(Arc::new(callback));
        self
    }

    pub fn emit(&self, event: &SnapshotEvent) {
        (self.next)(event);
    }

    pub fn emit_error(&self, error: &SyncError) {
        if let Some(callback) = &self.error {
            callback(error);
        }
    }
}

/// Handle to a live subscription. Releasing is explicit and idempotent:
/// the second and later `unsubscribe` calls are no-ops, and releasing a
/// subscription the store already tore down (after a terminal error) is
/// equally harmless.
pub struct ListenerRegistration {
    release: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl ListenerRegistration {
    pub fn new<F>(release: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            release: Mutex::new(Some(Box::new(release))),
        }
    }

    pub fn unsubscribe(&self) {
        let release = self
            .release
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(release) = release {
            release();
        }
    }

    pub fn is_active(&self) -> bool {
        self.release
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_some()
    }
}

/// The store primitives the synchronization core consumes.
///
/// Filters are restricted to equality and bounded membership clauses; a
/// membership clause carries at most [`FAN_OUT_LIMIT`] values and larger
/// sets are the batcher's problem, not the store's.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// One-shot read of every document matching the filter.
    async fn query(&self, collection: &str, filter: &Filter) -> SyncResult<Vec<Document>>;

    /// Point read by document id.
    async fn get(&self, collection: &str, id: &str) -> SyncResult<Option<Document>>;

    /// Opens a live subscription. The first event delivers the current
    /// snapshot; subsequent events follow every write that changes the
    /// result set, in server write order for this subscription.
    async fn subscribe(
        &self,
        collection: &str,
        filter: Filter,
        observer: SnapshotObserver,
    ) -> SyncResult<ListenerRegistration>;

    /// Creates a document with a store-assigned id and returns the id.
    async fn create(&self, collection: &str, data: WriteData) -> SyncResult<String>;

    /// Merges fields into an existing document.
    async fn update(&self, collection: &str, id: &str, data: WriteData) -> SyncResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn unsubscribe_runs_release_exactly_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let captured = calls.clone();
        let registration = ListenerRegistration::new(move || {
            captured.fetch_add(1, Ordering::SeqCst);
        });

        assert!(registration.is_active());
        registration.unsubscribe();
        registration.unsubscribe();

        assert!(!registration.is_active());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn observer_without_error_callback_ignores_errors() {
        let observer = SnapshotObserver::new(|_| {});
        observer.emit_error(&crate::error::unavailable("listen stream closed"));
    }
}
