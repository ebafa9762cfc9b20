//! Time-bounded store decorator
//!
//! Wraps any [`DocumentStore`] so that no call can block the caller for
//! longer than the configured timeout. An elapsed call fails with
//! [`StoreError::Timeout`]; the underlying operation may still complete.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rigwatch_core::{Document, DocumentStore, Query, StoreError, StoreResult, StoredDocument};

pub struct TimedStore {
    inner: Arc<dyn DocumentStore>,
    timeout: Duration,
}

impl TimedStore {
    pub fn new(inner: Arc<dyn DocumentStore>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    async fn bounded<T>(&self, op: &str, fut: impl Future<Output = StoreResult<T>>) -> StoreResult<T> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(op, timeout_ms = self.timeout.as_millis() as u64, "Store call timed out");
                Err(StoreError::Timeout)
            }
        }
    }
}

#[async_trait]
impl DocumentStore for TimedStore {
    async fn get(&self, collection: &str, key: &str) -> StoreResult<Option<Document>> {
        self.bounded("get", self.inner.get(collection, key)).await
    }

    async fn set(
        &self,
        collection: &str,
        key: &str,
        fields: Document,
        merge: bool,
    ) -> StoreResult<()> {
        self.bounded("set", self.inner.set(collection, key, fields, merge))
            .await
    }

    async fn update(&self, collection: &str, key: &str, fields: Document) -> StoreResult<bool> {
        self.bounded("update", self.inner.update(collection, key, fields))
            .await
    }

    async fn add(&self, collection: &str, fields: Document) -> StoreResult<String> {
        self.bounded("add", self.inner.add(collection, fields)).await
    }

    async fn delete(&self, collection: &str, key: &str) -> StoreResult<()> {
        self.bounded("delete", self.inner.delete(collection, key)).await
    }

    async fn query(&self, collection: &str, query: &Query) -> StoreResult<Vec<StoredDocument>> {
        self.bounded("query", self.inner.query(collection, query)).await
    }

    async fn create(&self, collection: &str, key: &str, fields: Document) -> StoreResult<bool> {
        self.bounded("create", self.inner.create(collection, key, fields))
            .await
    }

    async fn take(&self, collection: &str, key: &str) -> StoreResult<Option<Document>> {
        self.bounded("take", self.inner.take(collection, key)).await
    }
}
