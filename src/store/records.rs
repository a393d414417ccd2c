//! Record store
//!
//! Document-style collections with ordered, real-time query subscriptions.
//! A subscription always receives the full ordered result set, first when
//! it is opened and again after every mutation of its collection.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use super::error::{StoreError, StoreResult};
use super::types::{Collection, Query, QuerySnapshot, Record};

/// Stream of full query snapshots for one subscription
///
/// `Err` items are delivered for failures the store reports while the
/// subscription stays open; the stream ending means the subscription is gone.
pub struct SnapshotStream {
    receiver: mpsc::UnboundedReceiver<StoreResult<QuerySnapshot>>,
}

impl SnapshotStream {
    pub fn new(receiver: mpsc::UnboundedReceiver<StoreResult<QuerySnapshot>>) -> Self {
        Self { receiver }
    }

    /// Create a connected sender/stream pair
    pub fn channel() -> (mpsc::UnboundedSender<StoreResult<QuerySnapshot>>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self::new(rx))
    }

    pub async fn next(&mut self) -> Option<StoreResult<QuerySnapshot>> {
        self.receiver.recv().await
    }
}

/// Contract of the hosted document database
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Open a standing subscription for a query
    async fn subscribe(&self, query: Query) -> StoreResult<SnapshotStream>;

    /// Insert a record under a generated id
    async fn add(&self, collection: Collection, data: Map<String, Value>) -> StoreResult<String>;

    /// Create or replace a record under a known id
    async fn set(&self, collection: Collection, id: &str, data: Map<String, Value>)
        -> StoreResult<()>;

    /// Fetch a single record
    async fn get(&self, collection: Collection, id: &str) -> StoreResult<Option<Record>>;

    /// Delete a record. Deleting a missing record is not an error.
    async fn delete(&self, collection: Collection, id: &str) -> StoreResult<()>;
}

struct Subscriber {
    query: Query,
    sender: mpsc::UnboundedSender<StoreResult<QuerySnapshot>>,
}

type Documents = BTreeMap<String, Map<String, Value>>;

/// In-process record store
///
/// Mutations notify subscribers while the collection lock is held, so every
/// subscriber observes snapshots in mutation order.
#[derive(Default)]
pub struct MemoryRecordStore {
    collections: RwLock<HashMap<Collection, Documents>>,
    subscribers: RwLock<Vec<Subscriber>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of open subscriptions on a collection
    pub async fn subscriber_count(&self, collection: Collection) -> usize {
        self.subscribers
            .read()
            .await
            .iter()
            .filter(|s| s.query.collection == collection && !s.sender.is_closed())
            .count()
    }

    /// Number of records in a collection
    pub async fn count(&self, collection: Collection) -> usize {
        self.collections
            .read()
            .await
            .get(&collection)
            .map(|docs| docs.len())
            .unwrap_or(0)
    }

    fn snapshot(docs: Option<&Documents>, query: &Query) -> QuerySnapshot {
        let mut records: Vec<Record> = docs
            .map(|docs| {
                docs.iter()
                    .map(|(id, data)| Record::new(id.clone(), data.clone()))
                    .collect()
            })
            .unwrap_or_default();
        query.sort(&mut records);
        QuerySnapshot { records }
    }

    async fn notify(&self, collection: Collection, docs: Option<&Documents>) {
        let mut subscribers = self.subscribers.write().await;
        subscribers.retain(|s| !s.sender.is_closed());

        let mut notified = 0;
        for subscriber in subscribers
            .iter()
            .filter(|s| s.query.collection == collection)
        {
            let snapshot = Self::snapshot(docs, &subscriber.query);
            if subscriber.sender.send(Ok(snapshot)).is_ok() {
                notified += 1;
            }
        }

        tracing::trace!(collection = %collection, subscribers = notified, "Snapshot fan-out");
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn subscribe(&self, query: Query) -> StoreResult<SnapshotStream> {
        let collections = self.collections.read().await;
        let (sender, stream) = SnapshotStream::channel();

        let initial = Self::snapshot(collections.get(&query.collection), &query);
        sender
            .send(Ok(initial))
            .map_err(|_| StoreError::internal("subscription closed during setup"))?;

        tracing::debug!(collection = %query.collection, "Subscription opened");
        self.subscribers
            .write()
            .await
            .push(Subscriber { query, sender });

        Ok(stream)
    }

    async fn add(&self, collection: Collection, data: Map<String, Value>) -> StoreResult<String> {
        let id = Uuid::new_v4().simple().to_string();
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection).or_default();
        docs.insert(id.clone(), data);

        tracing::debug!(collection = %collection, id = %id, "Record added");
        self.notify(collection, collections.get(&collection)).await;
        Ok(id)
    }

    async fn set(
        &self,
        collection: Collection,
        id: &str,
        data: Map<String, Value>,
    ) -> StoreResult<()> {
        if id.is_empty() {
            return Err(StoreError::internal("record id cannot be empty"));
        }

        let mut collections = self.collections.write().await;
        collections
            .entry(collection)
            .or_default()
            .insert(id.to_string(), data);

        tracing::debug!(collection = %collection, id = %id, "Record set");
        self.notify(collection, collections.get(&collection)).await;
        Ok(())
    }

    async fn get(&self, collection: Collection, id: &str) -> StoreResult<Option<Record>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .and_then(|docs| docs.get(id))
            .map(|data| Record::new(id, data.clone())))
    }

    async fn delete(&self, collection: Collection, id: &str) -> StoreResult<()> {
        let mut collections = self.collections.write().await;
        let removed = collections
            .get_mut(&collection)
            .and_then(|docs| docs.remove(id))
            .is_some();

        if removed {
            tracing::debug!(collection = %collection, id = %id, "Record deleted");
            self.notify(collection, collections.get(&collection)).await;
        }
        Ok(())
    }
}
