//! Query - Mongo-shaped filter documents.
//!
//! A query maps field paths to conditions. A plain value is an equality test;
//! an object whose keys all start with `$` is a set of operators:
//!
//! | Operator  | Matches when                                   |
//! |-----------|------------------------------------------------|
//! | `$eq`     | the field equals the operand                   |
//! | `$ne`     | the field does not equal the operand           |
//! | `$in`     | the field equals any element of the operand    |
//! | `$nin`    | the field equals no element of the operand     |
//! | `$exists` | the field's presence matches the boolean       |
//!
//! Equality against an array field also matches when the array contains the
//! operand. A missing field equals `null`. Every condition must hold.

use serde::{Deserialize, Serialize};
use serde_json::map::Entry;
use serde_json::{Map, Value};

use crate::document::Document;

use super::StorageError;

/// A filter over documents. The empty query matches everything.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Query(Map<String, Value>);

impl Query {
    pub fn new() -> Self {
        Query(Map::new())
    }

    /// The empty query.
    pub fn all() -> Self {
        Query::new()
    }

    /// Build a query from its JSON form, e.g. `{"foo": "bar", "n": {"$in": [1, 2]}}`.
    pub fn from_value(value: Value) -> Result<Self, StorageError> {
        match value {
            Value::Object(map) => {
                for (path, condition) in &map {
                    if path.starts_with('$') {
                        return Err(StorageError::InvalidDocument(format!(
                            "unsupported top-level operator {path}"
                        )));
                    }
                    if let Some(ops) = operators(condition) {
                        for (op, operand) in ops {
                            validate_operator(op, operand)?;
                        }
                    }
                }
                Ok(Query(map))
            }
            other => Err(StorageError::InvalidDocument(format!(
                "query must be an object, got {other}"
            ))),
        }
    }

    pub fn eq(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(path.into(), value.into());
        self
    }

    pub fn ne(self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.operator(path, "$ne", value.into())
    }

    pub fn is_in<V: Into<Value>>(
        self,
        path: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        self.operator(path, "$in", Value::Array(values))
    }

    pub fn not_in<V: Into<Value>>(
        self,
        path: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        self.operator(path, "$nin", Value::Array(values))
    }

    pub fn exists(self, path: impl Into<String>, present: bool) -> Self {
        self.operator(path, "$exists", Value::Bool(present))
    }

    fn operator(mut self, path: impl Into<String>, op: &str, operand: Value) -> Self {
        match self.0.entry(path.into()) {
            Entry::Vacant(slot) => {
                let mut ops = Map::new();
                ops.insert(op.to_string(), operand);
                slot.insert(Value::Object(ops));
            }
            Entry::Occupied(mut slot) => {
                let condition = slot.get_mut();
                if operators(condition).is_none() {
                    // an equality set earlier on this path becomes `$eq`
                    let previous = std::mem::take(condition);
                    let mut ops = Map::new();
                    ops.insert("$eq".to_string(), previous);
                    *condition = Value::Object(ops);
                }
                if let Value::Object(ops) = condition {
                    ops.insert(op.to_string(), operand);
                }
            }
        }
        self
    }

    /// The same conditions applied under `prefix` (`{"foo": 1}` becomes `{"doc.foo": 1}`).
    pub fn nested(&self, prefix: &str) -> Query {
        Query(
            self.0
                .iter()
                .map(|(path, condition)| (format!("{prefix}.{path}"), condition.clone()))
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    /// Whether `doc` satisfies every condition.
    pub fn matches(&self, doc: &Document) -> bool {
        self.0.iter().all(|(path, condition)| {
            let field = doc.get_path(path);
            match operators(condition) {
                Some(ops) => ops.iter().all(|(op, operand)| apply(op, operand, field)),
                None => equals(field, condition),
            }
        })
    }
}

fn operators(condition: &Value) -> Option<&Map<String, Value>> {
    match condition {
        Value::Object(map) if !map.is_empty() && map.keys().all(|k| k.starts_with('$')) => {
            Some(map)
        }
        _ => None,
    }
}

fn validate_operator(op: &str, operand: &Value) -> Result<(), StorageError> {
    match op {
        "$eq" | "$ne" => Ok(()),
        "$in" | "$nin" if operand.is_array() => Ok(()),
        "$exists" if operand.is_boolean() => Ok(()),
        "$in" | "$nin" | "$exists" => Err(StorageError::InvalidDocument(format!(
            "invalid operand for {op}: {operand}"
        ))),
        _ => Err(StorageError::InvalidDocument(format!(
            "unsupported operator {op}"
        ))),
    }
}

fn apply(op: &str, operand: &Value, field: Option<&Value>) -> bool {
    match op {
        "$eq" => equals(field, operand),
        "$ne" => !equals(field, operand),
        "$in" => operand
            .as_array()
            .is_some_and(|values| values.iter().any(|v| equals(field, v))),
        "$nin" => operand
            .as_array()
            .is_some_and(|values| !values.iter().any(|v| equals(field, v))),
        "$exists" => operand.as_bool() == Some(field.is_some()),
        _ => false,
    }
}

fn equals(field: Option<&Value>, expected: &Value) -> bool {
    match field {
        None => expected.is_null(),
        Some(value) if value == expected => true,
        Some(Value::Array(items)) => items.iter().any(|item| item == expected),
        Some(_) => false,
    }
}
