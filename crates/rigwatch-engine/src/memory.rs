//! In-memory document store
//!
//! Backs the daemon when no external database is configured and every test in
//! the workspace. Each call takes a single lock, so `create` and `take` are
//! atomic per key.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use rigwatch_core::{Document, DocumentStore, Query, StoreError, StoreResult, StoredDocument};

type Collection = BTreeMap<String, Document>;

/// In-memory store with failure and latency injection
#[derive(Default)]
pub struct InMemoryStore {
    collections: RwLock<HashMap<String, Collection>>,
    /// Insertion order for generated keys, so `add` results sort by arrival
    sequence: AtomicU64,
    unavailable: AtomicBool,
    latency: RwLock<Option<Duration>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail with [`StoreError::Unavailable`]
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    /// Delay every call by `latency`
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.write() = latency;
    }

    /// Number of documents in a collection
    pub fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .get(collection)
            .map(|c| c.len())
            .unwrap_or(0)
    }

    async fn ready(&self) -> StoreResult<()> {
        let latency = *self.latency.read();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("in-memory store offline".into()));
        }
        Ok(())
    }

    fn next_key(&self) -> String {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        format!("{:012}-{}", seq, uuid::Uuid::new_v4().simple())
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn get(&self, collection: &str, key: &str) -> StoreResult<Option<Document>> {
        self.ready().await?;
        Ok(self
            .collections
            .read()
            .get(collection)
            .and_then(|c| c.get(key))
            .cloned())
    }

    async fn set(
        &self,
        collection: &str,
        key: &str,
        fields: Document,
        merge: bool,
    ) -> StoreResult<()> {
        self.ready().await?;
        let mut collections = self.collections.write();
        let docs = collections.entry(collection.to_string()).or_default();
        match docs.get_mut(key) {
            Some(existing) if merge => existing.extend(fields),
            _ => {
                docs.insert(key.to_string(), fields);
            }
        }
        Ok(())
    }

    async fn update(&self, collection: &str, key: &str, fields: Document) -> StoreResult<bool> {
        self.ready().await?;
        let mut collections = self.collections.write();
        match collections.get_mut(collection).and_then(|c| c.get_mut(key)) {
            Some(existing) => {
                existing.extend(fields);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn add(&self, collection: &str, fields: Document) -> StoreResult<String> {
        self.ready().await?;
        let key = self.next_key();
        self.collections
            .write()
            .entry(collection.to_string())
            .or_default()
            .insert(key.clone(), fields);
        Ok(key)
    }

    async fn delete(&self, collection: &str, key: &str) -> StoreResult<()> {
        self.ready().await?;
        if let Some(docs) = self.collections.write().get_mut(collection) {
            docs.remove(key);
        }
        Ok(())
    }

    async fn query(&self, collection: &str, query: &Query) -> StoreResult<Vec<StoredDocument>> {
        self.ready().await?;
        let collections = self.collections.read();
        let Some(docs) = collections.get(collection) else {
            return Ok(Vec::new());
        };
        Ok(query.apply(docs.iter().map(|(id, data)| StoredDocument {
            id: id.clone(),
            data: data.clone(),
        })))
    }

    async fn create(&self, collection: &str, key: &str, fields: Document) -> StoreResult<bool> {
        self.ready().await?;
        let mut collections = self.collections.write();
        let docs = collections.entry(collection.to_string()).or_default();
        if docs.contains_key(key) {
            return Ok(false);
        }
        docs.insert(key.to_string(), fields);
        Ok(true)
    }

    async fn take(&self, collection: &str, key: &str) -> StoreResult<Option<Document>> {
        self.ready().await?;
        Ok(self
            .collections
            .write()
            .get_mut(collection)
            .and_then(|c| c.remove(key)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rigwatch_core::{Direction, Filter, FilterOp};
    use serde_json::json;
    use std::sync::Arc;

    fn doc(value: serde_json::Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_set_merge_and_replace() {
        let store = InMemoryStore::new();
        store
            .set("c", "k", doc(json!({ "a": 1, "b": 2 })), false)
            .await
            .unwrap();
        store.set("c", "k", doc(json!({ "b": 3 })), true).await.unwrap();
        assert_eq!(
            store.get("c", "k").await.unwrap(),
            Some(doc(json!({ "a": 1, "b": 3 })))
        );

        store.set("c", "k", doc(json!({ "z": 0 })), false).await.unwrap();
        assert_eq!(store.get("c", "k").await.unwrap(), Some(doc(json!({ "z": 0 }))));
    }

    #[tokio::test]
    async fn test_update_requires_existing_document() {
        let store = InMemoryStore::new();
        assert!(!store.update("c", "k", doc(json!({ "a": 1 }))).await.unwrap());
        assert_eq!(store.get("c", "k").await.unwrap(), None);

        store.set("c", "k", doc(json!({ "a": 1 })), false).await.unwrap();
        assert!(store.update("c", "k", doc(json!({ "b": 2 }))).await.unwrap());
        assert_eq!(
            store.get("c", "k").await.unwrap(),
            Some(doc(json!({ "a": 1, "b": 2 })))
        );
    }

    #[tokio::test]
    async fn test_create_and_take_are_exclusive() {
        let store = Arc::new(InMemoryStore::new());

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.create("c", "k", doc(json!({ "writer": i }))).await.unwrap()
            }));
        }
        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap() {
                created += 1;
            }
        }
        assert_eq!(created, 1);

        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move { store.take("c", "k").await.unwrap() }));
        }
        let mut taken = 0;
        for handle in handles {
            if handle.await.unwrap().is_some() {
                taken += 1;
            }
        }
        assert_eq!(taken, 1);
        assert_eq!(store.count("c"), 0);
    }

    #[tokio::test]
    async fn test_add_and_query() {
        let store = InMemoryStore::new();
        for (device, ts) in [("a", 3), ("b", 1), ("a", 2)] {
            store
                .add("logs", doc(json!({ "deviceId": device, "timestamp": ts })))
                .await
                .unwrap();
        }

        let query = Query::new()
            .filter(Filter::eq("deviceId", "a"))
            .filter(Filter::new("timestamp", FilterOp::Ge, 2))
            .order_by("timestamp", Direction::Asc);
        let found = store.query("logs", &query).await.unwrap();
        let stamps: Vec<i64> = found
            .iter()
            .map(|d| d.data["timestamp"].as_i64().unwrap())
            .collect();
        assert_eq!(stamps, vec![2, 3]);
        assert!(store.query("missing", &Query::new()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unavailable() {
        let store = InMemoryStore::new();
        store.set_available(false);
        assert!(matches!(
            store.get("c", "k").await,
            Err(StoreError::Unavailable(_))
        ));
        store.set_available(true);
        assert!(store.get("c", "k").await.is_ok());
    }
}
