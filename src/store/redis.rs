//! Redis-backed [`DocumentStore`].
//!
//! Each collection is one hash (`league:matches` etc.) with a JSON document
//! per field. Writers publish the document id on the collection's event
//! channel after every write; a background listener reloads the collection
//! and fans the fresh snapshot out through the same watch channels the
//! in-memory store uses. Merge semantics are identical to [`MemoryStore`]:
//! shallow, field-level, last write wins.
//!
//! [`MemoryStore`]: crate::store::memory::MemoryStore

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use redis::{AsyncCommands, aio::ConnectionManager};
use serde_json::Value;
use tokio::sync::watch;
use tracing::{instrument, warn};

use crate::store::memory::merge_into;
use crate::store::port::{Collection, DocumentStore, doc_key};
use crate::store::{StoreError, StoreResult};

fn hash_key(collection: Collection) -> String {
    format!("league:{}", collection.name())
}

fn event_channel(collection: Collection) -> String {
    format!("league:{}:events", collection.name())
}

fn collection_for_channel(channel: &str) -> Option<Collection> {
    Collection::ALL
        .into_iter()
        .find(|c| event_channel(*c) == channel)
}

pub struct RedisStore {
    manager: ConnectionManager,
    notifiers: Arc<HashMap<Collection, watch::Sender<Vec<Value>>>>,
}

impl RedisStore {
    /// Connects, primes the snapshot channels, and spawns the pub/sub
    /// listener that keeps them fresh.
    #[instrument(skip(url))]
    pub async fn connect(url: &str) -> StoreResult<Self> {
        tracing::debug!("connecting to redis document store");

        let client = redis::Client::open(url)?;
        let manager = ConnectionManager::new(client.clone()).await?;

        let mut notifiers = HashMap::new();
        for collection in Collection::ALL {
            let initial = load_collection(manager.clone(), collection).await?;
            let (tx, _rx) = watch::channel(initial);
            notifiers.insert(collection, tx);
        }
        let notifiers = Arc::new(notifiers);

        tokio::spawn(run_listener(
            client,
            manager.clone(),
            Arc::clone(&notifiers),
        ));

        Ok(Self { manager, notifiers })
    }

    async fn notify(&self, collection: Collection, id: &str) -> StoreResult<()> {
        let mut manager = self.manager.clone();
        manager
            .publish::<_, _, ()>(event_channel(collection), id)
            .await?;
        Ok(())
    }
}

async fn load_collection(
    mut manager: ConnectionManager,
    collection: Collection,
) -> StoreResult<Vec<Value>> {
    let fields: HashMap<String, String> = manager.hgetall(hash_key(collection)).await?;

    let mut docs = Vec::with_capacity(fields.len());
    for (id, raw) in fields {
        match serde_json::from_str::<Value>(&raw) {
            Ok(doc) => docs.push(doc),
            Err(e) => {
                warn!(%id, collection = %collection, error = %e, "skipping undecodable document")
            }
        }
    }

    Ok(docs)
}

/// Listens on the event channels and re-publishes full snapshots to the
/// watch channels. Exits when the pub/sub connection drops.
async fn run_listener(
    client: redis::Client,
    manager: ConnectionManager,
    notifiers: Arc<HashMap<Collection, watch::Sender<Vec<Value>>>>,
) {
    let mut pubsub = match client.get_async_pubsub().await {
        Ok(pubsub) => pubsub,
        Err(e) => {
            tracing::error!(error = %e, "could not open pub/sub connection");
            return;
        }
    };

    for collection in Collection::ALL {
        if let Err(e) = pubsub.subscribe(event_channel(collection)).await {
            tracing::error!(collection = %collection, error = %e, "pub/sub subscribe failed");
            return;
        }
    }

    let mut stream = pubsub.on_message();
    while let Some(msg) = stream.next().await {
        let Some(collection) = collection_for_channel(msg.get_channel_name()) else {
            continue;
        };

        match load_collection(manager.clone(), collection).await {
            Ok(docs) => {
                notifiers[&collection].send_replace(docs);
            }
            Err(e) => {
                warn!(collection = %collection, error = %e, "snapshot reload failed")
            }
        }
    }

    tracing::warn!("pub/sub stream ended; live snapshots are stale until restart");
}

#[async_trait]
impl DocumentStore for RedisStore {
    async fn snapshot(&self, collection: Collection) -> StoreResult<Vec<Value>> {
        load_collection(self.manager.clone(), collection).await
    }

    async fn subscribe(&self, collection: Collection) -> StoreResult<watch::Receiver<Vec<Value>>> {
        Ok(self.notifiers[&collection].subscribe())
    }

    #[instrument(skip(self, patch))]
    async fn merge_write(&self, collection: Collection, id: &str, patch: Value) -> StoreResult<()> {
        let key = hash_key(collection);
        let mut manager = self.manager.clone();

        let current: Option<String> = manager.hget(&key, id).await?;
        let mut doc = match current {
            Some(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(%id, error = %e, "stored document was undecodable; replacing it");
                Value::Object(Default::default())
            }),
            None => Value::Object(Default::default()),
        };

        merge_into(&mut doc, patch);
        manager
            .hset::<_, _, _, ()>(&key, id, serde_json::to_string(&doc)?)
            .await?;

        self.notify(collection, id).await
    }

    #[instrument(skip(self, docs), fields(count = docs.len()))]
    async fn seed(&self, collection: Collection, docs: Vec<Value>) -> StoreResult<()> {
        let key = hash_key(collection);
        let mut manager = self.manager.clone();

        let mut pipe = redis::pipe();
        for doc in &docs {
            let id = doc_key(doc).ok_or_else(|| StoreError::MalformedDocument {
                id: "<seed>".to_string(),
                reason: "seed document has no usable id field".to_string(),
            })?;
            pipe.hset(&key, id, serde_json::to_string(doc)?);
        }

        pipe.query_async::<()>(&mut manager).await?;
        self.notify(collection, "<seed>").await
    }
}
