//! Document - the field map every collection stores.
//!
//! A `Document` is a JSON object. Two field names are reserved:
//!
//! - `_id` - the primary key within a collection, always a string.
//! - `_revision` - the revision number written by versioned documents.

use std::ops::Index;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field holding the primary key.
pub const ID_FIELD: &str = "_id";

/// Field holding the revision number of a versioned document.
pub const REVISION_FIELD: &str = "_revision";

static NULL: Value = Value::Null;

/// A mapping of field names to JSON values.
///
/// Cloning a document is a deep copy.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Map<String, Value>);

impl Document {
    pub fn new() -> Self {
        Document(Map::new())
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        let mut doc = Document::new();
        doc.set_id(id);
        doc
    }

    /// Build a document from a JSON value. Fails unless the value is an object.
    pub fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Object(map) => Ok(Document(map)),
            other => Err(other),
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn get_mut(&mut self, field: &str) -> Option<&mut Value> {
        self.0.get_mut(field)
    }

    /// Resolve a dotted path (`"address.city"`) through nested objects.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let first = parts.next()?;
        let mut current = self.0.get(first)?;
        for part in parts {
            current = current.as_object()?.get(part)?;
        }
        Some(current)
    }

    /// Set a field, returning the previous value.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(field.into(), value.into())
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// The `_id` of the document, if it is set to a string.
    pub fn id(&self) -> Option<&str> {
        self.0.get(ID_FIELD).and_then(Value::as_str)
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.0.insert(ID_FIELD.to_string(), Value::String(id.into()));
    }

    /// The `_revision` of the document, if present.
    pub fn revision(&self) -> Option<u64> {
        self.0.get(REVISION_FIELD).and_then(Value::as_u64)
    }

    pub fn set_revision(&mut self, revision: u64) {
        self.0
            .insert(REVISION_FIELD.to_string(), Value::from(revision));
    }

    pub(crate) fn restore_revision(&mut self, previous: Option<Value>) {
        match previous {
            Some(value) => {
                self.0.insert(REVISION_FIELD.to_string(), value);
            }
            None => {
                self.0.remove(REVISION_FIELD);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for Document {
    fn from(map: Map<String, Value>) -> Self {
        Document(map)
    }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self {
        doc.into_value()
    }
}

impl TryFrom<Value> for Document {
    type Error = Value;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Document::from_value(value)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Document {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Document(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Missing fields index to `Value::Null`, as with `serde_json::Value`.
impl Index<&str> for Document {
    type Output = Value;

    fn index(&self, field: &str) -> &Value {
        self.0.get(field).unwrap_or(&NULL)
    }
}

impl PartialEq<Value> for Document {
    fn eq(&self, other: &Value) -> bool {
        match other {
            Value::Object(map) => &self.0 == map,
            _ => false,
        }
    }
}

impl PartialEq<Document> for Value {
    fn eq(&self, other: &Document) -> bool {
        other == self
    }
}
