use thiserror::Error;

use crate::store::StorageError;
use crate::validation::ValidationError;

/// Error type for document and revision operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    /// The document class or instance has no usable history target.
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("revision {revision} of {id} not found")]
    RevisionNotFound { id: String, revision: u64 },
    /// A history record for this revision was already written.
    #[error("revision {revision} of {id} already recorded")]
    RevisionConflict { id: String, revision: u64 },
    /// The operation needs a saved document.
    #[error("document has no _id (during {0})")]
    MissingId(&'static str),
    #[error("history record serialization error: {0}")]
    Serde(String),
}
