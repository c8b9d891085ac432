use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::error::DocumentError;

/// One saved state of a versioned document, as stored in the history collection.
///
/// Stored as `{ _id: "<id>:<revision>", id, revision, doc }`. The `_id` makes
/// `(id, revision)` unique within the history collection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    #[serde(rename = "_id")]
    pub key: String,
    pub id: String,
    pub revision: u64,
    pub doc: Document,
}

impl HistoryRecord {
    pub fn new(id: impl Into<String>, revision: u64, doc: Document) -> Self {
        let id = id.into();
        HistoryRecord {
            key: record_key(&id, revision),
            id,
            revision,
            doc,
        }
    }

    pub fn to_document(&self) -> Result<Document, DocumentError> {
        let value = serde_json::to_value(self).map_err(|e| DocumentError::Serde(e.to_string()))?;
        Document::from_value(value)
            .map_err(|other| DocumentError::Serde(format!("expected an object, got {other}")))
    }

    pub fn from_document(doc: Document) -> Result<Self, DocumentError> {
        serde_json::from_value(doc.into_value()).map_err(|e| DocumentError::Serde(e.to_string()))
    }
}

/// Storage key of the history record for `(id, revision)`.
pub fn record_key(id: &str, revision: u64) -> String {
    format!("{id}:{revision}")
}
