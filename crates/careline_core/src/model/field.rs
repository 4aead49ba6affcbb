//! Typed column values shared by SQL writes and change payloads.

use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// Attribute name to new value, as carried by change events.
pub type ChangedFields = BTreeMap<String, JsonValue>;

/// A single column value that can be bound into SQL or rendered as JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Null,
    Integer(i64),
    Text(String),
}

impl FieldValue {
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Null => JsonValue::Null,
            Self::Integer(value) => JsonValue::from(*value),
            Self::Text(value) => JsonValue::from(value.as_str()),
        }
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// One column assignment produced by an entity patch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange {
    pub column: &'static str,
    pub value: FieldValue,
}

impl FieldChange {
    pub fn new(column: &'static str, value: impl Into<FieldValue>) -> Self {
        Self {
            column,
            value: value.into(),
        }
    }
}

/// Collects column assignments into the attribute map used by change events.
pub fn changed_fields(changes: &[FieldChange]) -> ChangedFields {
    changes
        .iter()
        .map(|change| (change.column.to_string(), change.value.to_json()))
        .collect()
}
