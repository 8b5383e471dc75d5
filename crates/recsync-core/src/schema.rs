//! Metadata shapes returned by the record API.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::condition::{Direction, OrderBy, WhereCondition};
use crate::record::Record;

/// Field-level description of an object type.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaDescription {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldDescription>,
}

impl SchemaDescription {
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDescription> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Relationship name a reference field is navigated through, e.g.
    /// `WhatId` -> `What`.
    #[must_use]
    pub fn relationship_name(&self, field: &str) -> Option<&str> {
        self.field(field)
            .and_then(|description| description.relationship_name.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescription {
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(rename = "type", default)]
    pub field_type: String,
    /// Target object types; more than one means the reference is polymorphic.
    #[serde(default)]
    pub reference_to: Vec<String>,
    #[serde(default)]
    pub relationship_name: Option<String>,
}

impl FieldDescription {
    #[must_use]
    pub fn is_polymorphic(&self) -> bool {
        self.reference_to.len() > 1
    }
}

/// Result of a free-text query.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub total_size: usize,
    #[serde(default = "default_done")]
    pub done: bool,
    #[serde(default)]
    pub records: Vec<Record>,
}

const fn default_done() -> bool {
    true
}

/// Saved list views of one object type.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListViews {
    #[serde(default)]
    pub list_views: Vec<ListView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListView {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub developer_name: String,
    pub sobject_type: String,
}

/// Columns, ordering, and filter of one list view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListViewDescription {
    pub id: String,
    pub sobject_type: String,
    #[serde(default)]
    pub columns: Vec<ListViewColumn>,
    #[serde(default)]
    pub order_by: Vec<ListViewOrder>,
    #[serde(default)]
    pub where_condition: Option<WhereCondition>,
}

impl ListViewDescription {
    /// Queryable fields of the visible columns, in column order.
    #[must_use]
    pub fn field_names(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|column| !column.hidden)
            .map(|column| column.field_name.as_str())
            .collect()
    }

    #[must_use]
    pub fn ordering(&self) -> Vec<OrderBy> {
        self.order_by.iter().map(ListViewOrder::to_order_by).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListViewColumn {
    pub field_name: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub sortable: bool,
    #[serde(default)]
    pub hidden: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListViewOrder {
    pub field_name_or_path: String,
    /// `ascending` or `descending`.
    pub sort_direction: String,
}

impl ListViewOrder {
    fn to_order_by(&self) -> OrderBy {
        let direction = if self.sort_direction.eq_ignore_ascii_case("descending") {
            Direction::Desc
        } else {
            Direction::Asc
        };
        OrderBy::new(self.field_name_or_path.clone(), direction)
    }
}

/// Record-type handle used to fetch a page layout.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordTypeRef(String);

impl RecordTypeRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for RecordTypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Page layout: the field groups an edit form shows.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layout {
    #[serde(default)]
    pub sections: Vec<LayoutSection>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutSection {
    pub heading: String,
    #[serde(default)]
    pub fields: Vec<String>,
}
