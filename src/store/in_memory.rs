//! InMemoryDocumentStore - HashMap-backed document store for testing and development.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockWriteGuard};

use crate::document::{Document, ID_FIELD};

use super::{generate_id, DocumentStore, Namespace, Query, StorageError};

type Collections = HashMap<Namespace, Vec<Document>>;

/// In-memory document store keyed by [`Namespace`].
///
/// Collections keep insertion order. Clone-friendly via Arc: clones share storage.
#[derive(Clone, Debug)]
pub struct InMemoryDocumentStore {
    storage: Arc<RwLock<Collections>>,
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDocumentStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            storage: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Every document in a collection, in insertion order.
    pub fn dump(&self, namespace: &Namespace) -> Result<Vec<Document>, StorageError> {
        let storage = self
            .storage
            .read()
            .map_err(|_| StorageError::LockPoisoned("dump"))?;
        Ok(storage.get(namespace).cloned().unwrap_or_default())
    }

    /// Namespaces holding at least one document, sorted.
    pub fn namespaces(&self) -> Result<Vec<Namespace>, StorageError> {
        let storage = self
            .storage
            .read()
            .map_err(|_| StorageError::LockPoisoned("namespaces"))?;
        let mut names: Vec<Namespace> = storage
            .iter()
            .filter(|(_, docs)| !docs.is_empty())
            .map(|(ns, _)| ns.clone())
            .collect();
        names.sort();
        Ok(names)
    }

    /// Drop a collection. Returns true if it existed.
    pub fn drop_collection(&self, namespace: &Namespace) -> Result<bool, StorageError> {
        let mut storage = self
            .storage
            .write()
            .map_err(|_| StorageError::LockPoisoned("drop collection"))?;
        Ok(storage.remove(namespace).is_some())
    }

    fn write(
        &self,
        operation: &'static str,
    ) -> Result<RwLockWriteGuard<'_, Collections>, StorageError> {
        self.storage
            .write()
            .map_err(|_| StorageError::LockPoisoned(operation))
    }
}

/// Ensure `doc` carries an `_id`, generating one if needed.
fn assign_id(doc: &mut Document) -> Result<String, StorageError> {
    if !doc.contains(ID_FIELD) {
        let id = generate_id();
        doc.set_id(id.clone());
        return Ok(id);
    }
    doc.id()
        .map(str::to_string)
        .ok_or_else(|| StorageError::InvalidDocument("_id must be a string".into()))
}

impl DocumentStore for InMemoryDocumentStore {
    fn insert(&self, namespace: &Namespace, mut doc: Document) -> Result<String, StorageError> {
        let id = assign_id(&mut doc)?;
        let mut storage = self.write("insert")?;
        let collection = storage.entry(namespace.clone()).or_default();

        if collection.iter().any(|existing| existing.id() == Some(id.as_str())) {
            return Err(StorageError::DuplicateKey {
                namespace: namespace.to_string(),
                id,
            });
        }

        collection.push(doc);
        Ok(id)
    }

    fn save(&self, namespace: &Namespace, mut doc: Document) -> Result<String, StorageError> {
        let id = assign_id(&mut doc)?;
        let mut storage = self.write("save")?;
        let collection = storage.entry(namespace.clone()).or_default();

        match collection
            .iter()
            .position(|existing| existing.id() == Some(id.as_str()))
        {
            Some(index) => collection[index] = doc,
            None => collection.push(doc),
        }
        Ok(id)
    }

    fn find_one(&self, namespace: &Namespace, id: &str) -> Result<Option<Document>, StorageError> {
        let storage = self
            .storage
            .read()
            .map_err(|_| StorageError::LockPoisoned("find one"))?;

        Ok(storage
            .get(namespace)
            .and_then(|docs| docs.iter().find(|doc| doc.id() == Some(id)))
            .cloned())
    }

    fn find(&self, namespace: &Namespace, query: &Query) -> Result<Vec<Document>, StorageError> {
        let storage = self
            .storage
            .read()
            .map_err(|_| StorageError::LockPoisoned("find"))?;

        Ok(storage
            .get(namespace)
            .map(|docs| docs.iter().filter(|doc| query.matches(doc)).cloned().collect())
            .unwrap_or_default())
    }

    fn count(&self, namespace: &Namespace, query: &Query) -> Result<usize, StorageError> {
        let storage = self
            .storage
            .read()
            .map_err(|_| StorageError::LockPoisoned("count"))?;

        Ok(storage
            .get(namespace)
            .map(|docs| docs.iter().filter(|doc| query.matches(doc)).count())
            .unwrap_or(0))
    }

    fn delete_one(&self, namespace: &Namespace, id: &str) -> Result<bool, StorageError> {
        let mut storage = self.write("delete one")?;
        let Some(collection) = storage.get_mut(namespace) else {
            return Ok(false);
        };

        match collection.iter().position(|doc| doc.id() == Some(id)) {
            Some(index) => {
                collection.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete_many(&self, namespace: &Namespace, query: &Query) -> Result<usize, StorageError> {
        let mut storage = self.write("delete many")?;
        let Some(collection) = storage.get_mut(namespace) else {
            return Ok(0);
        };

        let before = collection.len();
        collection.retain(|doc| !query.matches(doc));
        Ok(before - collection.len())
    }
}
