//! Partial records keyed by field name.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Server-assigned record identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A record, or a partial one, as a map of field name to JSON value.
///
/// Nested objects hold related records (for example an address or the
/// target of a reference field).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: Map<String, Value>,
}

impl Record {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    #[must_use]
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(Value::as_str)
    }

    /// Nested object under `field`, as a record.
    #[must_use]
    pub fn get_record(&self, field: &str) -> Option<Self> {
        match self.get(field) {
            Some(Value::Object(fields)) => Some(Self {
                fields: fields.clone(),
            }),
            _ => None,
        }
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.remove(field)
    }

    /// Identity stored under `identity_field`, if any.
    #[must_use]
    pub fn id(&self, identity_field: &str) -> Option<RecordId> {
        self.get_str(identity_field)
            .filter(|id| !id.is_empty())
            .map(RecordId::new)
    }

    /// Copy every field of `other` over this record.
    pub fn merge(&mut self, other: &Self) {
        for (field, value) in &other.fields {
            self.fields.insert(field.clone(), value.clone());
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(field, value)| (field.as_str(), value))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<Map<String, Value>> for Record {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}
