//! ValidatedDocument - a document bound to its collection, validator and store.

use std::ops::Index;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::document::Document;
use crate::error::DocumentError;
use crate::store::{DocumentStore, Namespace};
use crate::validation::Validator;

/// A document that validates itself before every write to its primary collection.
#[derive(Clone)]
pub struct ValidatedDocument<S> {
    store: S,
    namespace: Namespace,
    validator: Arc<dyn Validator>,
    fields: Document,
}

impl<S: DocumentStore> ValidatedDocument<S> {
    pub fn new(store: S, namespace: Namespace, validator: Arc<dyn Validator>) -> Self {
        Self::from_document(store, namespace, validator, Document::new())
    }

    pub fn from_document(
        store: S,
        namespace: Namespace,
        validator: Arc<dyn Validator>,
        fields: Document,
    ) -> Self {
        ValidatedDocument {
            store,
            namespace,
            validator,
            fields,
        }
    }

    /// Load a stored document by `_id`.
    pub fn get_from_id(
        store: S,
        namespace: Namespace,
        validator: Arc<dyn Validator>,
        id: &str,
    ) -> Result<Option<Self>, DocumentError> {
        let fields = store.find_one(&namespace, id)?;
        Ok(fields.map(|fields| Self::from_document(store, namespace, validator, fields)))
    }

    pub fn id(&self) -> Option<&str> {
        self.fields.id()
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn fields(&self) -> &Document {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut Document {
        &mut self.fields
    }

    pub fn into_fields(self) -> Document {
        self.fields
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.set(field, value)
    }

    /// Run the validator and keep its coerced output.
    pub fn validate(&mut self) -> Result<(), DocumentError> {
        let coerced = self.validator.validate(self.fields.clone())?;
        self.fields = coerced;
        Ok(())
    }

    /// Write the fields as they are: insert when there is no `_id` yet,
    /// full upsert otherwise. Returns the document id.
    pub fn write(&mut self) -> Result<String, DocumentError> {
        let id = match self.fields.id() {
            Some(_) => self.store.save(&self.namespace, self.fields.clone())?,
            None => self.store.insert(&self.namespace, self.fields.clone())?,
        };
        if self.fields.id() != Some(id.as_str()) {
            self.fields.set_id(id.clone());
        }
        debug!(namespace = %self.namespace, id = %id, "document written");
        Ok(id)
    }

    /// Validate, then write.
    pub fn save(&mut self) -> Result<&Document, DocumentError> {
        self.validate()?;
        self.write()?;
        Ok(&self.fields)
    }

    /// Delete the stored document. Returns true if it existed.
    pub fn delete(&self) -> Result<bool, DocumentError> {
        let id = self.fields.id().ok_or(DocumentError::MissingId("delete"))?;
        let deleted = self.store.delete_one(&self.namespace, id)?;
        debug!(namespace = %self.namespace, id = %id, deleted, "document deleted");
        Ok(deleted)
    }
}

impl<S> Index<&str> for ValidatedDocument<S> {
    type Output = Value;

    fn index(&self, field: &str) -> &Value {
        &self.fields[field]
    }
}
