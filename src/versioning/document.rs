//! VersionedDocument - keeps a primary document and its history consistent.

use std::ops::Index;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::document::{Document, REVISION_FIELD};
use crate::error::DocumentError;
use crate::persisted::ValidatedDocument;
use crate::store::{DocumentStore, Namespace, Query};

use super::config::{DocumentClass, VersioningOptions};
use super::revision_store::{RevisionStore, Revisions};

/// A document whose every save is recorded as a new revision.
///
/// The history target is resolved once, when the instance is built, from the
/// instance's [`VersioningOptions`] and the class defaults.
#[derive(Clone)]
pub struct VersionedDocument<S> {
    class: Arc<DocumentClass>,
    options: VersioningOptions,
    inner: ValidatedDocument<S>,
    revisions: RevisionStore<S>,
}

impl<S: DocumentStore + Clone> VersionedDocument<S> {
    /// A new, unsaved document of `class`.
    pub fn new(store: S, class: Arc<DocumentClass>) -> Result<Self, DocumentError> {
        Self::with_options(store, class, VersioningOptions::default())
    }

    /// A new, unsaved document whose history goes where `options` say.
    pub fn with_options(
        store: S,
        class: Arc<DocumentClass>,
        options: VersioningOptions,
    ) -> Result<Self, DocumentError> {
        Self::from_document(store, class, options, Document::new())
    }

    /// Wrap existing fields, e.g. a snapshot returned by [`get_revision`](Self::get_revision).
    pub fn from_document(
        store: S,
        class: Arc<DocumentClass>,
        options: VersioningOptions,
        fields: Document,
    ) -> Result<Self, DocumentError> {
        if !class.is_versioned() {
            return Err(DocumentError::Configuration(format!(
                "{} is not a versioned document class",
                class.namespace()
            )));
        }
        let target = class.history_target(&options)?;
        let inner = ValidatedDocument::from_document(
            store.clone(),
            class.namespace().clone(),
            class.validator(),
            fields,
        );
        Ok(VersionedDocument {
            class,
            options,
            inner,
            revisions: RevisionStore::new(store, target),
        })
    }

    /// Load the current state of `id` from the primary collection.
    pub fn get_from_id(
        store: S,
        class: Arc<DocumentClass>,
        options: VersioningOptions,
        id: &str,
    ) -> Result<Option<Self>, DocumentError> {
        let Some(fields) = store.find_one(class.namespace(), id)? else {
            return Ok(None);
        };
        Self::from_document(store, class, options, fields).map(Some)
    }

    pub fn id(&self) -> Option<&str> {
        self.inner.id()
    }

    pub fn class(&self) -> &DocumentClass {
        &self.class
    }

    pub fn fields(&self) -> &Document {
        self.inner.fields()
    }

    pub fn fields_mut(&mut self) -> &mut Document {
        self.inner.fields_mut()
    }

    pub fn into_fields(self) -> Document {
        self.inner.into_fields()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.inner.get(field)
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.inner.set(field, value)
    }

    pub fn history(&self) -> &RevisionStore<S> {
        &self.revisions
    }

    pub fn history_target(&self) -> &Namespace {
        self.revisions.target()
    }

    /// Validate, assign the next revision, write the primary document, then
    /// record the snapshot. Returns the revision written.
    ///
    /// The revision comes from the stored history, so a reloaded or restored
    /// document continues the sequence. If either write fails, `_revision` is
    /// put back to its previous value and the error is returned; a failed
    /// history append leaves the primary document one revision ahead until
    /// the next successful save records that revision. A
    /// [`DocumentError::RevisionConflict`] means another writer recorded this
    /// revision first; the primary document then holds this instance's fields
    /// under a revision whose history record holds the other writer's.
    pub fn save(&mut self) -> Result<u64, DocumentError> {
        self.inner.validate()?;

        let previous = self.inner.fields().get(REVISION_FIELD).cloned();
        let revision = match self.inner.id() {
            Some(id) => self.revisions.next_revision(id)?,
            None => 1,
        };
        self.inner.fields_mut().set_revision(revision);

        let id = match self.inner.write() {
            Ok(id) => id,
            Err(err) => {
                self.inner.fields_mut().restore_revision(previous);
                return Err(err);
            }
        };

        let snapshot = self.inner.fields().clone();
        if let Err(err) = self.revisions.append(&id, revision, snapshot) {
            warn!(
                namespace = %self.class.namespace(),
                id = %id,
                revision,
                error = %err,
                "primary document written but revision not recorded"
            );
            self.inner.fields_mut().restore_revision(previous);
            return Err(err);
        }

        debug!(namespace = %self.class.namespace(), id = %id, revision, "document saved");
        Ok(revision)
    }

    /// Delete the primary document and keep its history.
    pub fn delete(&self) -> Result<bool, DocumentError> {
        self.inner.delete()
    }

    /// Delete the primary document and every history record for it.
    pub fn delete_with_history(&self) -> Result<bool, DocumentError> {
        let deleted = self.inner.delete()?;
        let id = self.id().ok_or(DocumentError::MissingId("delete"))?;
        self.revisions.delete_all(id)?;
        Ok(deleted)
    }

    /// Delete every primary document of this class matching `query`; history is kept.
    pub fn remove(&self, query: &Query) -> Result<usize, DocumentError> {
        remove_documents(self.inner.store(), self.class.namespace(), None, query)
    }

    /// Delete every primary document matching `query` and all history of each
    /// matched document from this instance's history target.
    pub fn remove_with_history(&self, query: &Query) -> Result<usize, DocumentError> {
        remove_documents(
            self.inner.store(),
            self.class.namespace(),
            Some(&self.revisions),
            query,
        )
    }

    /// The highest revision recorded in history for this document, or 0.
    /// An unsaved document reports its in-memory `_revision`, if any.
    pub fn get_last_revision_id(&self) -> Result<u64, DocumentError> {
        match self.id() {
            Some(id) => Ok(self.revisions.latest_revision(id)?.unwrap_or(0)),
            None => Ok(self.inner.fields().revision().unwrap_or(0)),
        }
    }

    /// The fields as saved at `revision`, or None if that revision does not exist.
    pub fn get_revision(&self, revision: u64) -> Result<Option<Document>, DocumentError> {
        let id = self.id().ok_or(DocumentError::MissingId("get revision"))?;
        self.revisions.get_revision(id, revision)
    }

    /// Every recorded revision, ascending.
    pub fn get_revisions(&self) -> Result<Revisions<S>, DocumentError> {
        let id = self.id().ok_or(DocumentError::MissingId("get revisions"))?;
        Ok(self.revisions.list_revisions(id))
    }

    /// A new instance holding the fields of `revision`, with the same history
    /// target. Saving it records a new revision after the latest one.
    pub fn restore(&self, revision: u64) -> Result<Self, DocumentError> {
        let id = self.id().ok_or(DocumentError::MissingId("restore"))?;
        let fields = self
            .revisions
            .get_revision(id, revision)?
            .ok_or_else(|| DocumentError::RevisionNotFound {
                id: id.to_string(),
                revision,
            })?;
        Self::from_document(
            self.inner.store().clone(),
            Arc::clone(&self.class),
            self.options.clone(),
            fields,
        )
    }
}

impl<S> Index<&str> for VersionedDocument<S> {
    type Output = Value;

    fn index(&self, field: &str) -> &Value {
        &self.inner[field]
    }
}

/// Bulk delete on `primary`, cascading to `history` for every matched id.
pub(crate) fn remove_documents<S: DocumentStore + Clone>(
    store: &S,
    primary: &Namespace,
    history: Option<&RevisionStore<S>>,
    query: &Query,
) -> Result<usize, DocumentError> {
    let Some(history) = history else {
        let removed = store.delete_many(primary, query)?;
        debug!(namespace = %primary, removed, "documents removed");
        return Ok(removed);
    };

    // ids are collected before the primary documents disappear
    let ids: Vec<String> = store
        .find(primary, query)?
        .iter()
        .filter_map(|doc| doc.id().map(str::to_string))
        .collect();
    let removed = store.delete_many(primary, query)?;
    let purged = history.delete_ids(&ids)?;
    debug!(namespace = %primary, removed, purged, "documents and history removed");
    Ok(removed)
}
