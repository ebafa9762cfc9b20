//! DocumentStore trait - the persistence abstraction
//!
//! The diagnostic engine never talks to a concrete database. Everything it
//! persists goes through a keyed document store with Firestore-like
//! semantics: collections of JSON objects addressed by string keys.

use async_trait::async_trait;

use crate::document::{Document, Query, StoredDocument};
use crate::error::StoreResult;

/// Well-known collection names
pub mod collections {
    /// Currently open faults, keyed by `"{device}/{code}"`
    pub const ACTIVE_ERRORS: &str = "active_errors";
    /// Resolved fault episodes (append-only)
    pub const ERROR_HISTORY: &str = "error_history";
    /// Periodic raw snapshots used as forecast input
    pub const MACHINE_LOGS: &str = "machine_logs";
    /// Operator maintenance records
    pub const MAINTENANCE_RECORDS: &str = "maintenance_records";
}

/// Keyed document store
///
/// Implementations must make [`create`](DocumentStore::create) and
/// [`take`](DocumentStore::take) atomic with respect to other calls on the
/// same key: two racing creates see exactly one `true`, two racing takes see
/// exactly one `Some`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read a document by key
    async fn get(&self, collection: &str, key: &str) -> StoreResult<Option<Document>>;

    /// Write a document under a key.
    ///
    /// With `merge`, fields are merged into an existing document (top-level
    /// fields of `fields` replace existing ones); otherwise the document is
    /// replaced. A missing document is created either way.
    async fn set(
        &self,
        collection: &str,
        key: &str,
        fields: Document,
        merge: bool,
    ) -> StoreResult<()>;

    /// Merge fields into an existing document.
    ///
    /// Returns `false` without writing anything when the document is missing.
    async fn update(&self, collection: &str, key: &str, fields: Document) -> StoreResult<bool>;

    /// Append a document under a generated key and return the key
    async fn add(&self, collection: &str, fields: Document) -> StoreResult<String>;

    /// Delete a document. Deleting a missing document is not an error.
    async fn delete(&self, collection: &str, key: &str) -> StoreResult<()>;

    /// Query a collection
    async fn query(&self, collection: &str, query: &Query) -> StoreResult<Vec<StoredDocument>>;

    /// Create a document only if the key is free. Returns whether it was created.
    async fn create(&self, collection: &str, key: &str, fields: Document) -> StoreResult<bool>;

    /// Remove a document and return it, if it exists
    async fn take(&self, collection: &str, key: &str) -> StoreResult<Option<Document>>;
}
