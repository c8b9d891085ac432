//! Validation - schema checks applied to a document before it is written.
//!
//! The versioning layer only sees the [`Validator`] capability; [`Structure`]
//! is the declarative implementation generated by `#[derive(DocumentType)]`.

mod structure;

use thiserror::Error;

use crate::document::Document;

pub use structure::{FieldSpec, FieldType, Structure};

/// Error type for schema validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("unknown field {0}")]
    UnknownField(String),
    #[error("missing required field {0}")]
    MissingField(String),
    #[error("field {field} expected {expected}, found {found}")]
    WrongType {
        field: String,
        expected: String,
        found: String,
    },
    #[error("_id must be a non-empty string")]
    InvalidId,
    #[error("{0}")]
    Custom(String),
}

/// Checks and coerces a document's fields.
pub trait Validator: Send + Sync {
    /// Return the coerced document, or the first violation found.
    fn validate(&self, doc: Document) -> Result<Document, ValidationError>;
}

/// A validator that accepts every document unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl Validator for AcceptAll {
    fn validate(&self, doc: Document) -> Result<Document, ValidationError> {
        Ok(doc)
    }
}

impl<F> Validator for F
where
    F: Fn(Document) -> Result<Document, ValidationError> + Send + Sync,
{
    fn validate(&self, doc: Document) -> Result<Document, ValidationError> {
        self(doc)
    }
}
