use std::collections::HashSet;

use futures::future;
use serde_json::Value;

use crate::error::SyncResult;
use crate::store::{Document, DocumentStore, Filter, FAN_OUT_LIMIT};

/// One-shot read of every document whose `field` is a member of `ids`,
/// working around the store's cap on membership-filter size.
///
/// Zero ids returns empty without touching the store. Up to
/// [`FAN_OUT_LIMIT`] ids issue a single query. Larger sets split into
/// consecutive chunks of at most [`FAN_OUT_LIMIT`], queried concurrently
/// and merged once every chunk resolves. No subscription exists at this
/// size; callers poll by repeating the call.
///
/// Equality clauses in `base` are ANDed into every chunk query.
pub async fn query_by_id_set(
    store: &dyn DocumentStore,
    collection: &str,
    base: &Filter,
    field: &str,
    ids: &[String],
) -> SyncResult<Vec<Document>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let filters: Vec<Filter> = ids
        .chunks(FAN_OUT_LIMIT)
        .map(|chunk| {
            let values: Vec<Value> = chunk.iter().map(|id| Value::from(id.as_str())).collect();
            base.clone().with_in(field, values)
        })
        .collect::<SyncResult<_>>()?;

    let results = future::try_join_all(
        filters
            .iter()
            .map(|filter| store.query(collection, filter)),
    )
    .await?;

    let mut seen: HashSet<String> = HashSet::new();
    let mut merged = Vec::new();
    for document in results.into_iter().flatten() {
        if seen.insert(document.id().to_string()) {
            merged.push(document);
        }
    }
    Ok(merged)
}
