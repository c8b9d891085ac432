//! Versioning - revision history for documents.
//!
//! Every save of a [`VersionedDocument`] writes the primary document with a
//! new `_revision` and appends a `{ id, revision, doc }` record to a history
//! collection. Revisions start at 1 and are derived from the stored history,
//! so reloaded and restored documents continue the same sequence.
//!
//! ## Example
//!
//! ```ignore
//! use versioned_rust::{DocumentsExt, InMemoryDocumentStore, VersionedType, VersioningOptions};
//!
//! #[derive(VersionedType)]
//! #[document(database = "test", collection = "pages", versioning_collection = "pages_history")]
//! struct Page {
//!     title: String,
//! }
//!
//! let store = InMemoryDocumentStore::new();
//! let pages = store.versioned::<Page>()?;
//!
//! let mut page = pages.create()?;
//! page.set("title", "Draft");
//! page.save()?;                 // revision 1
//! page.set("title", "Final");
//! page.save()?;                 // revision 2
//!
//! let mut old = page.restore(1)?;
//! old.save()?;                  // revision 3, same fields as revision 1
//!
//! // history for this one instance goes to another database
//! let archived = pages.create_with(VersioningOptions::new().database("archive"))?;
//! ```

mod config;
mod document;
mod record;
mod repository;
mod revision_store;

pub use config::{
    resolve_history_target, DocumentClass, DocumentClassBuilder, DocumentType, VersionedType,
    VersioningDefaults, VersioningOptions,
};
pub use document::VersionedDocument;
pub use record::{record_key, HistoryRecord};
pub use repository::{DocumentRepository, DocumentsExt, VersionedRepository};
pub use revision_store::{RevisionStore, Revisions};
