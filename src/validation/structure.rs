//! Structure - declarative field-type schema.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;

use crate::document::{Document, ID_FIELD, REVISION_FIELD};

use super::{ValidationError, Validator};

/// The JSON shape a declared field accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Integer,
    Float,
    Boolean,
    Array,
    Object,
    Any,
}

impl FieldType {
    fn accepts(self, value: &Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
            FieldType::Integer => value.is_i64() || value.is_u64(),
            FieldType::Float => value.is_number(),
            FieldType::Boolean => value.is_boolean(),
            FieldType::Array => value.is_array(),
            FieldType::Object => value.is_object(),
            FieldType::Any => true,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Float => "float",
            FieldType::Boolean => "boolean",
            FieldType::Array => "array",
            FieldType::Object => "object",
            FieldType::Any => "any",
        };
        f.write_str(name)
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub field_type: FieldType,
    pub required: bool,
}

/// A declared set of fields.
///
/// Closed structures reject fields they do not declare; `_id` and `_revision`
/// are always allowed. `null` is accepted for optional fields, and integers
/// are widened to floats for `Float` fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Structure {
    fields: BTreeMap<String, FieldSpec>,
    open: bool,
}

impl Structure {
    /// An empty closed structure.
    pub fn new() -> Self {
        Structure::default()
    }

    /// A structure that accepts undeclared fields.
    pub fn open() -> Self {
        Structure {
            fields: BTreeMap::new(),
            open: true,
        }
    }

    pub fn field(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.fields.insert(
            name.into(),
            FieldSpec {
                field_type,
                required: false,
            },
        );
        self
    }

    pub fn required(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.fields.insert(
            name.into(),
            FieldSpec {
                field_type,
                required: true,
            },
        );
        self
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &FieldSpec)> {
        self.fields.iter()
    }
}

impl Validator for Structure {
    fn validate(&self, mut doc: Document) -> Result<Document, ValidationError> {
        if let Some(id) = doc.get(ID_FIELD) {
            if !id.as_str().is_some_and(|s| !s.is_empty()) {
                return Err(ValidationError::InvalidId);
            }
        }
        if let Some(revision) = doc.get(REVISION_FIELD) {
            if !revision.is_u64() {
                return Err(ValidationError::WrongType {
                    field: REVISION_FIELD.to_string(),
                    expected: FieldType::Integer.to_string(),
                    found: describe(revision).to_string(),
                });
            }
        }

        if !self.open {
            if let Some((name, _)) = doc
                .iter()
                .find(|(name, _)| !is_reserved(name) && !self.fields.contains_key(*name))
            {
                return Err(ValidationError::UnknownField(name.clone()));
            }
        }

        for (name, spec) in &self.fields {
            let Some(value) = doc.get_mut(name) else {
                if spec.required {
                    return Err(ValidationError::MissingField(name.clone()));
                }
                continue;
            };

            if value.is_null() {
                if spec.required {
                    return Err(ValidationError::MissingField(name.clone()));
                }
                continue;
            }

            if !spec.field_type.accepts(value) {
                return Err(ValidationError::WrongType {
                    field: name.clone(),
                    expected: spec.field_type.to_string(),
                    found: describe(value).to_string(),
                });
            }

            if spec.field_type == FieldType::Float && !value.is_f64() {
                if let Some(widened) = value.as_f64() {
                    *value = Value::from(widened);
                }
            }
        }

        Ok(doc)
    }
}

fn is_reserved(name: &str) -> bool {
    name == ID_FIELD || name == REVISION_FIELD
}
