//! Side-table of resolved reference records.

use std::collections::HashMap;

use crate::record::{Record, RecordId};

/// Owner of a set of resolved references.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReferenceKey {
    /// A saved record.
    ById(RecordId),
    /// The unsaved draft.
    Draft,
}

/// Resolved records per owner and field. Entries are filled on demand and
/// never invalidated, only moved or dropped with their owner.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceTable {
    entries: HashMap<ReferenceKey, HashMap<String, Record>>,
}

impl ReferenceTable {
    #[must_use]
    pub fn get(&self, key: &ReferenceKey, field: &str) -> Option<&Record> {
        self.entries.get(key).and_then(|fields| fields.get(field))
    }

    pub fn insert(&mut self, key: ReferenceKey, field: impl Into<String>, record: Record) {
        self.entries.entry(key).or_default().insert(field.into(), record);
    }

    pub fn remove(&mut self, key: &ReferenceKey) {
        self.entries.remove(key);
    }

    /// Move every entry of `from` under `to`, keeping existing `to` entries
    /// for fields `from` does not have.
    pub fn rekey(&mut self, from: &ReferenceKey, to: ReferenceKey) {
        if let Some(moved) = self.entries.remove(from) {
            self.entries.entry(to).or_default().extend(moved);
        }
    }

    #[must_use]
    pub fn contains(&self, key: &ReferenceKey) -> bool {
        self.entries.contains_key(key)
    }
}
