use std::collections::{BTreeMap, HashMap};
use std::fmt::{self, Debug, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use async_lock::Mutex;
use async_trait::async_trait;
use rand::Rng;
use serde_json::Value;

use crate::error::{not_found, SyncError, SyncResult};

use super::document::{Document, WriteData};
use super::filter::Filter;
use super::timestamp::Timestamp;
use super::{
    ChangeKind, DocumentChange, DocumentStore, ListenerRegistration, SnapshotEvent,
    SnapshotObserver,
};

type FieldMap = BTreeMap<String, Value>;
type CollectionMap = BTreeMap<String, FieldMap>;

struct ListenerEntry {
    collection: String,
    filter: Filter,
    observer: SnapshotObserver,
    last_documents: Vec<Document>,
}

type ListenerMap = Arc<StdMutex<HashMap<u64, ListenerEntry>>>;

/// In-memory document store backing tests and local development.
///
/// Collections hold flat JSON field maps keyed by document id. Live
/// subscriptions are re-evaluated against the full collection after every
/// write; each listener keeps its previous result set so deliveries carry
/// added/modified/removed changes relative to that listener, not to the
/// writer. Feed callbacks run synchronously on the writer's task and must
/// stay cheap.
pub struct MemoryDocumentStore {
    collections: Mutex<BTreeMap<String, CollectionMap>>,
    listeners: ListenerMap,
    next_listener_id: AtomicU64,
}

impl Debug for MemoryDocumentStore {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryDocumentStore").finish()
    }
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            collections: Mutex::new(BTreeMap::new()),
            listeners: Arc::new(StdMutex::new(HashMap::new())),
            next_listener_id: AtomicU64::new(1),
        }
    }

    /// Fails every live subscription on the collection with the provided
    /// error and tears the subscriptions down, mimicking a store-side
    /// terminal listen failure (revoked permission, closed stream).
    pub fn reject_listeners(&self, collection: &str, error: SyncError) {
        let rejected: Vec<SnapshotObserver> = {
            let mut listeners = lock_listeners(&self.listeners);
            let ids: Vec<u64> = listeners
                .iter()
                .filter(|(_, entry)| entry.collection == collection)
                .map(|(id, _)| *id)
                .collect();
            ids.into_iter()
                .filter_map(|id| listeners.remove(&id))
                .map(|entry| entry.observer)
                .collect()
        };

        for observer in rejected {
            observer.emit_error(&error);
        }
    }

    fn snapshot(collection: &CollectionMap, filter: &Filter) -> Vec<Document> {
        collection
            .iter()
            .map(|(id, fields)| Document::new(id.clone(), fields.clone()))
            .filter(|document| filter.matches(document))
            .collect()
    }

    /// Re-evaluates every listener on `collection` against its current
    /// contents and delivers one event per listener whose result set moved.
    fn fan_out(&self, collection_name: &str, collection: &CollectionMap) {
        let deliveries: Vec<(SnapshotObserver, SnapshotEvent)> = {
            let mut listeners = lock_listeners(&self.listeners);
            listeners
                .values_mut()
                .filter(|entry| entry.collection == collection_name)
                .filter_map(|entry| {
                    let next = Self::snapshot(collection, &entry.filter);
                    let changes = compute_changes(&entry.last_documents, &next);
                    if changes.is_empty() {
                        return None;
                    }
                    entry.last_documents = next.clone();
                    let event = SnapshotEvent {
                        documents: next,
                        changes,
                    };
                    Some((entry.observer.clone(), event))
                })
                .collect()
        };

        // Callbacks may subscribe or unsubscribe; never hold the registry
        // lock while invoking them.
        for (observer, event) in deliveries {
            observer.emit(&event);
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn query(&self, collection: &str, filter: &Filter) -> SyncResult<Vec<Document>> {
        let collections = self.collections.lock().await;
        Ok(collections
            .get(collection)
            .map(|documents| Self::snapshot(documents, filter))
            .unwrap_or_default())
    }

    async fn get(&self, collection: &str, id: &str) -> SyncResult<Option<Document>> {
        let collections = self.collections.lock().await;
        Ok(collections
            .get(collection)
            .and_then(|documents| documents.get(id))
            .map(|fields| Document::new(id, fields.clone())))
    }

    async fn subscribe(
        &self,
        collection: &str,
        filter: Filter,
        observer: SnapshotObserver,
    ) -> SyncResult<ListenerRegistration> {
        let (documents, registration) = {
            let collections = self.collections.lock().await;
            let documents = collections
                .get(collection)
                .map(|documents| Self::snapshot(documents, &filter))
                .unwrap_or_default();

            let id = self.next_listener_id.fetch_add(1, Ordering::SeqCst);
            lock_listeners(&self.listeners).insert(
                id,
                ListenerEntry {
                    collection: collection.to_string(),
                    filter,
                    observer: observer.clone(),
                    last_documents: documents.clone(),
                },
            );

            let listeners = Arc::clone(&self.listeners);
            let registration = ListenerRegistration::new(move || {
                lock_listeners(&listeners).remove(&id);
            });

            (documents, registration)
        };

        let changes = documents
            .iter()
            .map(|document| DocumentChange {
                kind: ChangeKind::Added,
                document: document.clone(),
            })
            .collect();
        observer.emit(&SnapshotEvent { documents, changes });

        Ok(registration)
    }

    async fn create(&self, collection: &str, data: WriteData) -> SyncResult<String> {
        let id = auto_id();
        let fields = data.resolve(Timestamp::now());

        let snapshot = {
            let mut collections = self.collections.lock().await;
            let documents = collections.entry(collection.to_string()).or_default();
            documents.insert(id.clone(), fields);
            documents.clone()
        };

        self.fan_out(collection, &snapshot);
        Ok(id)
    }

    async fn update(&self, collection: &str, id: &str, data: WriteData) -> SyncResult<()> {
        let fields = data.resolve(Timestamp::now());

        let snapshot = {
            let mut collections = self.collections.lock().await;
            let documents = collections
                .get_mut(collection)
                .ok_or_else(|| not_found(format!("collection {collection} has no documents")))?;
            let document = documents
                .get_mut(id)
                .ok_or_else(|| not_found(format!("document {collection}/{id} does not exist")))?;
            document.extend(fields);
            documents.clone()
        };

        self.fan_out(collection, &snapshot);
        Ok(())
    }
}

fn lock_listeners(
    listeners: &StdMutex<HashMap<u64, ListenerEntry>>,
) -> std::sync::MutexGuard<'_, HashMap<u64, ListenerEntry>> {
    listeners
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Diff of two result sets of the same subscription, in id order with
/// removals trailing.
fn compute_changes(previous: &[Document], next: &[Document]) -> Vec<DocumentChange> {
    let previous_by_id: BTreeMap<&str, &Document> = previous
        .iter()
        .map(|document| (document.id(), document))
        .collect();

    let mut changes = Vec::new();
    for document in next {
        match previous_by_id.get(document.id()) {
            None => changes.push(DocumentChange {
                kind: ChangeKind::Added,
                document: document.clone(),
            }),
            Some(existing) if existing.fields() != document.fields() => {
                changes.push(DocumentChange {
                    kind: ChangeKind::Modified,
                    document: document.clone(),
                });
            }
            Some(_) => {}
        }
    }

    let next_ids: BTreeMap<&str, ()> = next.iter().map(|document| (document.id(), ())).collect();
    for document in previous {
        if !next_ids.contains_key(document.id()) {
            changes.push(DocumentChange {
                kind: ChangeKind::Removed,
                document: document.clone(),
            });
        }
    }

    changes
}

/// Store-assigned 20-character document id, matching the id alphabet the
/// hosted store hands out.
fn auto_id() -> String {
    let mut rng = rand::thread_rng();
    (0..20)
        .map(|_| rng.sample(rand::distributions::Alphanumeric) as char)
        .collect()
}
