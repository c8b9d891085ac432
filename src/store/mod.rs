//! Document stores - the storage interface collections are read and written through.
//!
//! A store groups collections by database. Every call names its target with a
//! [`Namespace`]. Implementations only need key-addressed CRUD plus
//! query-driven find/count/delete; revision tracking is layered on top.
//!
//! ## Example
//!
//! ```ignore
//! use versioned_rust::{Document, DocumentStore, InMemoryDocumentStore, Namespace, Query};
//!
//! let store = InMemoryDocumentStore::new();
//! let users = Namespace::new("app", "users");
//!
//! let id = store.insert(&users, Document::from_value(json!({"name": "ada"})).unwrap())?;
//! let found = store.find(&users, &Query::new().eq("name", "ada"))?;
//! ```

mod in_memory;
mod query;

use std::fmt;

use thiserror::Error;

use crate::document::Document;

pub use in_memory::InMemoryDocumentStore;
pub use query::Query;

/// A database and collection pair addressing one collection.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Namespace {
    pub database: String,
    pub collection: String,
}

impl Namespace {
    pub fn new(database: impl Into<String>, collection: impl Into<String>) -> Self {
        Namespace {
            database: database.into(),
            collection: collection.into(),
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.collection)
    }
}

/// Error type for store operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("store lock poisoned during {0}")]
    LockPoisoned(&'static str),
    /// A document with this `_id` already exists in the collection.
    #[error("duplicate key {id} in {namespace}")]
    DuplicateKey { namespace: String, id: String },
    #[error("invalid document: {0}")]
    InvalidDocument(String),
    /// Failure reported by the backing database (connectivity, constraint).
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Abstract collection storage.
pub trait DocumentStore: Send + Sync {
    /// Insert a new document. Generates an `_id` when the document has none.
    /// Fails with [`StorageError::DuplicateKey`] when the `_id` is taken.
    fn insert(&self, namespace: &Namespace, doc: Document) -> Result<String, StorageError>;

    /// Upsert a document by `_id` (full replacement). Generates an `_id` when absent.
    fn save(&self, namespace: &Namespace, doc: Document) -> Result<String, StorageError>;

    /// Get a document by `_id`. Returns None if not found.
    fn find_one(&self, namespace: &Namespace, id: &str) -> Result<Option<Document>, StorageError>;

    /// Find every document matching the query, in insertion order.
    fn find(&self, namespace: &Namespace, query: &Query) -> Result<Vec<Document>, StorageError>;

    /// Count documents matching the query.
    fn count(&self, namespace: &Namespace, query: &Query) -> Result<usize, StorageError> {
        Ok(self.find(namespace, query)?.len())
    }

    /// Delete a document by `_id`. Returns true if it existed.
    fn delete_one(&self, namespace: &Namespace, id: &str) -> Result<bool, StorageError>;

    /// Delete every document matching the query. Returns how many were removed.
    fn delete_many(&self, namespace: &Namespace, query: &Query) -> Result<usize, StorageError>;
}

/// Generate a fresh document id.
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
