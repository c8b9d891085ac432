//! Repositories - class-level access to documents of one type.

use std::sync::Arc;

use crate::document::Document;
use crate::error::DocumentError;
use crate::persisted::ValidatedDocument;
use crate::store::{DocumentStore, Query};

use super::config::{DocumentClass, DocumentType, VersionedType, VersioningOptions};
use super::document::{remove_documents, VersionedDocument};
use super::revision_store::RevisionStore;

/// Creates, loads, finds and removes versioned documents of one class.
#[derive(Clone)]
pub struct VersionedRepository<S> {
    store: S,
    class: Arc<DocumentClass>,
}

impl<S: DocumentStore + Clone> VersionedRepository<S> {
    /// Fails if `class` is not versioned.
    pub fn new(store: S, class: DocumentClass) -> Result<Self, DocumentError> {
        let class = Arc::new(class);
        // surfaces a missing history target before any document exists
        class.history_target(&VersioningOptions::default())?;
        Ok(VersionedRepository { store, class })
    }

    pub fn class(&self) -> &DocumentClass {
        &self.class
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// A new, unsaved document writing history to the class default target.
    pub fn create(&self) -> Result<VersionedDocument<S>, DocumentError> {
        self.create_with(VersioningOptions::default())
    }

    /// A new, unsaved document writing history where `options` say.
    pub fn create_with(
        &self,
        options: VersioningOptions,
    ) -> Result<VersionedDocument<S>, DocumentError> {
        VersionedDocument::with_options(self.store.clone(), Arc::clone(&self.class), options)
    }

    /// Wrap existing fields, e.g. a snapshot from `get_revision`.
    pub fn from_document(&self, fields: Document) -> Result<VersionedDocument<S>, DocumentError> {
        self.from_document_with(fields, VersioningOptions::default())
    }

    pub fn from_document_with(
        &self,
        fields: Document,
        options: VersioningOptions,
    ) -> Result<VersionedDocument<S>, DocumentError> {
        VersionedDocument::from_document(
            self.store.clone(),
            Arc::clone(&self.class),
            options,
            fields,
        )
    }

    pub fn get_from_id(&self, id: &str) -> Result<Option<VersionedDocument<S>>, DocumentError> {
        self.get_from_id_with(id, VersioningOptions::default())
    }

    pub fn get_from_id_with(
        &self,
        id: &str,
        options: VersioningOptions,
    ) -> Result<Option<VersionedDocument<S>>, DocumentError> {
        VersionedDocument::get_from_id(self.store.clone(), Arc::clone(&self.class), options, id)
    }

    /// Primary documents matching `query`, in store order.
    pub fn find(&self, query: &Query) -> Result<Vec<VersionedDocument<S>>, DocumentError> {
        self.store
            .find(self.class.namespace(), query)?
            .into_iter()
            .map(|fields| self.from_document(fields))
            .collect()
    }

    pub fn count(&self, query: &Query) -> Result<usize, DocumentError> {
        Ok(self.store.count(self.class.namespace(), query)?)
    }

    /// The class default history collection.
    pub fn history(&self) -> Result<RevisionStore<S>, DocumentError> {
        self.history_with(&VersioningOptions::default())
    }

    pub fn history_with(
        &self,
        options: &VersioningOptions,
    ) -> Result<RevisionStore<S>, DocumentError> {
        let target = self.class.history_target(options)?;
        Ok(RevisionStore::new(self.store.clone(), target))
    }

    /// Delete matching primary documents; history is kept.
    pub fn remove(&self, query: &Query) -> Result<usize, DocumentError> {
        remove_documents(&self.store, self.class.namespace(), None, query)
    }

    /// Delete matching primary documents and all of their history in the
    /// class default history collection.
    pub fn remove_with_history(&self, query: &Query) -> Result<usize, DocumentError> {
        let history = self.history()?;
        remove_documents(&self.store, self.class.namespace(), Some(&history), query)
    }
}

/// Creates, loads, finds and removes plain (unversioned) documents of one class.
#[derive(Clone)]
pub struct DocumentRepository<S> {
    store: S,
    class: Arc<DocumentClass>,
}

impl<S: DocumentStore + Clone> DocumentRepository<S> {
    pub fn new(store: S, class: DocumentClass) -> Self {
        DocumentRepository {
            store,
            class: Arc::new(class),
        }
    }

    pub fn class(&self) -> &DocumentClass {
        &self.class
    }

    pub fn create(&self) -> ValidatedDocument<S> {
        self.from_document(Document::new())
    }

    pub fn from_document(&self, fields: Document) -> ValidatedDocument<S> {
        ValidatedDocument::from_document(
            self.store.clone(),
            self.class.namespace().clone(),
            self.class.validator(),
            fields,
        )
    }

    pub fn get_from_id(&self, id: &str) -> Result<Option<ValidatedDocument<S>>, DocumentError> {
        ValidatedDocument::get_from_id(
            self.store.clone(),
            self.class.namespace().clone(),
            self.class.validator(),
            id,
        )
    }

    pub fn find(&self, query: &Query) -> Result<Vec<ValidatedDocument<S>>, DocumentError> {
        Ok(self
            .store
            .find(self.class.namespace(), query)?
            .into_iter()
            .map(|fields| self.from_document(fields))
            .collect())
    }

    pub fn count(&self, query: &Query) -> Result<usize, DocumentError> {
        Ok(self.store.count(self.class.namespace(), query)?)
    }

    pub fn remove(&self, query: &Query) -> Result<usize, DocumentError> {
        remove_documents::<S>(&self.store, self.class.namespace(), None, query)
    }
}

/// Extension trait for typed document access on any cloneable store.
pub trait DocumentsExt: DocumentStore + Clone + Sized {
    /// Repository for a versioned type declared in code.
    fn versioned<D: VersionedType>(&self) -> Result<VersionedRepository<Self>, DocumentError> {
        VersionedRepository::new(self.clone(), D::versioned_class()?)
    }

    /// Repository for a plain document type declared in code.
    fn documents<D: DocumentType>(&self) -> Result<DocumentRepository<Self>, DocumentError> {
        Ok(DocumentRepository::new(self.clone(), D::class()?))
    }

    /// Repository for a runtime class.
    fn versioned_repository(
        &self,
        class: DocumentClass,
    ) -> Result<VersionedRepository<Self>, DocumentError> {
        VersionedRepository::new(self.clone(), class)
    }
}

impl<S: DocumentStore + Clone> DocumentsExt for S {}
