//! Document versioning for schemaless document stores.
//!
//! Documents are JSON objects kept in named collections of a
//! [`DocumentStore`]. A [`VersionedDocument`] records every save as a new
//! revision in a separate history collection, and can fetch, list and restore
//! earlier revisions.
//!
//! ```
//! use versioned_rust::{DocumentsExt, InMemoryDocumentStore, VersionedType};
//!
//! #[derive(VersionedType)]
//! #[document(
//!     database = "test",
//!     collection = "mongokit",
//!     versioning_collection = "versioned_mongokit"
//! )]
//! struct MyDoc {
//!     foo: String,
//! }
//!
//! # fn main() -> Result<(), versioned_rust::DocumentError> {
//! let store = InMemoryDocumentStore::new();
//! let docs = store.versioned::<MyDoc>()?;
//!
//! let mut doc = docs.create()?;
//! doc.set("_id", "mydoc");
//! doc.set("foo", "bla");
//! assert_eq!(doc.save()?, 1);
//!
//! doc.set("foo", "bar");
//! assert_eq!(doc.save()?, 2);
//! assert_eq!(doc.get_revision(1)?.unwrap()["foo"], "bla");
//! # Ok(())
//! # }
//! ```
//!
//! A versioned type must name its history collection:
//!
//! ```compile_fail
//! use versioned_rust::VersionedType;
//!
//! #[derive(VersionedType)]
//! #[document(database = "test", collection = "mongokit")]
//! struct Unversioned {
//!     foo: String,
//! }
//! ```

mod document;
mod error;
mod persisted;
mod store;
mod validation;
mod versioning;

pub use document::{Document, ID_FIELD, REVISION_FIELD};
pub use error::DocumentError;
pub use persisted::ValidatedDocument;
pub use store::{generate_id, DocumentStore, InMemoryDocumentStore, Namespace, Query, StorageError};
pub use validation::{AcceptAll, FieldSpec, FieldType, Structure, ValidationError, Validator};
pub use versioning::{
    record_key, resolve_history_target, DocumentClass, DocumentClassBuilder, DocumentRepository,
    DocumentType, DocumentsExt, HistoryRecord, RevisionStore, Revisions, VersionedDocument,
    VersionedRepository, VersionedType, VersioningDefaults, VersioningOptions,
};

pub use versioned_rust_macros::{DocumentType, VersionedType};
