//! In-memory [`DocumentStore`].
//!
//! The reference implementation of the port's semantics (shallow merge,
//! last-write-wins, full-snapshot fan-out) and the backend for tests and
//! local runs without a redis server.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{RwLock, watch};
use tracing::instrument;

use crate::store::port::{Collection, DocumentStore, doc_key};
use crate::store::{StoreError, StoreResult};

pub struct MemoryStore {
    collections: RwLock<HashMap<Collection, BTreeMap<String, Value>>>,
    notifiers: HashMap<Collection, watch::Sender<Vec<Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let mut collections = HashMap::new();
        let mut notifiers = HashMap::new();

        for collection in Collection::ALL {
            collections.insert(collection, BTreeMap::new());
            let (tx, _rx) = watch::channel(Vec::new());
            notifiers.insert(collection, tx);
        }

        Self {
            collections: RwLock::new(collections),
            notifiers,
        }
    }

    async fn broadcast(&self, collection: Collection) {
        let docs = {
            let guard = self.collections.read().await;
            guard[&collection].values().cloned().collect::<Vec<_>>()
        };

        // send_replace: fine if nobody is listening yet
        self.notifiers[&collection].send_replace(docs);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Shallow top-level merge. Explicit nulls overwrite the field; the store
/// never deep-merges nested objects or appends to arrays.
pub(crate) fn merge_into(doc: &mut Value, patch: Value) {
    let Value::Object(fields) = patch else {
        *doc = patch;
        return;
    };

    let Value::Object(target) = doc else {
        *doc = Value::Object(fields);
        return;
    };

    for (key, value) in fields {
        target.insert(key, value);
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn snapshot(&self, collection: Collection) -> StoreResult<Vec<Value>> {
        let guard = self.collections.read().await;
        Ok(guard[&collection].values().cloned().collect())
    }

    async fn subscribe(&self, collection: Collection) -> StoreResult<watch::Receiver<Vec<Value>>> {
        // prime the channel so a fresh subscriber sees current state
        self.broadcast(collection).await;
        Ok(self.notifiers[&collection].subscribe())
    }

    #[instrument(skip(self, patch))]
    async fn merge_write(&self, collection: Collection, id: &str, patch: Value) -> StoreResult<()> {
        {
            let mut guard = self.collections.write().await;
            let docs = guard.get_mut(&collection).expect("collection map is pre-seeded");
            let doc = docs
                .entry(id.to_string())
                .or_insert_with(|| Value::Object(Default::default()));
            merge_into(doc, patch);
        }

        self.broadcast(collection).await;
        Ok(())
    }

    #[instrument(skip(self, docs), fields(count = docs.len()))]
    async fn seed(&self, collection: Collection, docs: Vec<Value>) -> StoreResult<()> {
        {
            let mut guard = self.collections.write().await;
            let target = guard.get_mut(&collection).expect("collection map is pre-seeded");

            for doc in docs {
                let key = doc_key(&doc).ok_or_else(|| StoreError::MalformedDocument {
                    id: "<seed>".to_string(),
                    reason: "seed document has no usable id field".to_string(),
                })?;
                target.insert(key, doc);
            }
        }

        self.broadcast(collection).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_merge_write_is_shallow_and_null_overwrites() {
        let store = MemoryStore::new();

        store
            .merge_write(
                Collection::Matches,
                "1",
                json!({"id": 1, "score": "2-0", "reportedBy": "Sam"}),
            )
            .await
            .unwrap();

        store
            .merge_write(
                Collection::Matches,
                "1",
                json!({"score": "", "reportedBy": null}),
            )
            .await
            .unwrap();

        let docs = store.snapshot(Collection::Matches).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["id"], 1);
        assert_eq!(docs[0]["score"], "");
        assert!(docs[0]["reportedBy"].is_null());
    }

    #[tokio::test]
    async fn test_later_write_wins_per_field() {
        let store = MemoryStore::new();

        store
            .merge_write(Collection::Matches, "7", json!({"pA1": "p1", "pA2": "p2"}))
            .await
            .unwrap();
        store
            .merge_write(Collection::Matches, "7", json!({"pA1": "p9"}))
            .await
            .unwrap();

        let docs = store.snapshot(Collection::Matches).await.unwrap();
        assert_eq!(docs[0]["pA1"], "p9");
        assert_eq!(docs[0]["pA2"], "p2");
    }

    #[tokio::test]
    async fn test_subscription_sees_seed_and_subsequent_writes() {
        let store = MemoryStore::new();
        let mut rx = store.subscribe(Collection::Teams).await.unwrap();
        assert!(rx.borrow().is_empty());

        store
            .seed(
                Collection::Teams,
                vec![json!({"id": "team-a"}), json!({"id": "team-b"})],
            )
            .await
            .unwrap();

        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().len(), 2);

        store
            .merge_write(Collection::Teams, "team-a", json!({"name": "Alley Cats"}))
            .await
            .unwrap();

        rx.changed().await.unwrap();
        let docs = rx.borrow_and_update().clone();
        let team_a = docs.iter().find(|d| d["id"] == "team-a").unwrap();
        assert_eq!(team_a["name"], "Alley Cats");
    }

    #[tokio::test]
    async fn test_seed_rejects_documents_without_ids() {
        let store = MemoryStore::new();
        let result = store
            .seed(Collection::Players, vec![json!({"name": "nobody"})])
            .await;

        match result {
            Err(StoreError::MalformedDocument { .. }) => {}
            other => panic!("expected malformed document error, got {:?}", other),
        }
    }
}
