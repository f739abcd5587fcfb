//! The persistence port.
//!
//! The core never talks to a concrete backend: it receives a
//! [`DocumentStore`] at the composition root and works with whole-collection
//! snapshots plus merge-writes keyed by document id. Field-level
//! last-write-wins is the only concurrency control — two racing writers both
//! succeed and the later one sticks.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::watch;

use crate::store::StoreResult;

/// The three document collections a league season lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Matches,
    Teams,
    Players,
}

impl Collection {
    pub const ALL: [Collection; 3] = [Collection::Matches, Collection::Teams, Collection::Players];

    pub fn name(self) -> &'static str {
        match self {
            Collection::Matches => "matches",
            Collection::Teams => "teams",
            Collection::Players => "players",
        }
    }
}

impl core::fmt::Display for Collection {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A live document store: full-collection snapshots pushed on every change,
/// and shallow merge-writes keyed by document id.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// The current full contents of a collection.
    async fn snapshot(&self, collection: Collection) -> StoreResult<Vec<Value>>;

    /// A channel that yields the full collection again after every change.
    /// The receiver's current value is the snapshot as of subscription time.
    async fn subscribe(&self, collection: Collection) -> StoreResult<watch::Receiver<Vec<Value>>>;

    /// Shallow-merges `patch`'s top-level fields into the document, creating
    /// it when absent. Explicit nulls overwrite; absent fields are left
    /// untouched.
    async fn merge_write(&self, collection: Collection, id: &str, patch: Value) -> StoreResult<()>;

    /// Bulk-inserts the seed documents (keyed by their `id` field) in one
    /// shot, then notifies subscribers once.
    async fn seed(&self, collection: Collection, docs: Vec<Value>) -> StoreResult<()>;
}

/// Pulls the `id` field out of a seed document as its store key.
pub(crate) fn doc_key(doc: &Value) -> Option<String> {
    match doc.get("id")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
