//! Structured query criteria accepted by the record API's `retrieve`.

use anyhow::{Result, bail};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use super::{WhereCondition, quote};
use crate::query::SelectQuery;

// ---------------------------------------------------------------------------
// Ordering
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    const fn keyword(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

impl Serialize for Direction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.keyword())
    }
}

/// One `ORDER BY` term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

impl OrderBy {
    pub fn new(field: impl Into<String>, direction: Direction) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }
}

impl fmt::Display for OrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.direction)
    }
}

impl FromStr for OrderBy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split_whitespace();
        let Some(field) = parts.next() else {
            bail!("empty ordering term");
        };
        let direction = match parts.next().map(str::to_ascii_lowercase).as_deref() {
            None | Some("asc") => Direction::Asc,
            Some("desc") => Direction::Desc,
            Some(other) => bail!("unknown direction '{other}' in ordering '{s}': expected ASC or DESC"),
        };
        if parts.next().is_some() {
            bail!("unexpected trailing tokens in ordering '{s}'");
        }
        Ok(Self::new(field, direction))
    }
}

impl Serialize for OrderBy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.field, &self.direction)?;
        map.end()
    }
}

/// Parse a comma-separated ordering such as `"Name ASC, CreatedDate DESC"`.
pub fn parse_ordering(raw: &str) -> Result<Vec<OrderBy>> {
    raw.split(',')
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .map(str::parse)
        .collect()
}

// ---------------------------------------------------------------------------
// Where tree
// ---------------------------------------------------------------------------

/// Comparison applied to one field.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Eq(Value),
    Ne(Value),
    Lt(Value),
    Lte(Value),
    Gt(Value),
    Gte(Value),
    /// Pattern used verbatim, wildcards included.
    Like(String),
    In(Vec<Value>),
    Nin(Vec<Value>),
}

impl Predicate {
    const fn key(&self) -> &'static str {
        match self {
            Self::Eq(_) => "eq",
            Self::Ne(_) => "ne",
            Self::Lt(_) => "lt",
            Self::Lte(_) => "lte",
            Self::Gt(_) => "gt",
            Self::Gte(_) => "gte",
            Self::Like(_) => "like",
            Self::In(_) => "in",
            Self::Nin(_) => "nin",
        }
    }

    const fn operator(&self) -> &'static str {
        match self {
            Self::Eq(_) => "equals",
            Self::Ne(_) => "notEquals",
            Self::Lt(_) => "lessThan",
            Self::Lte(_) => "lessOrEqual",
            Self::Gt(_) => "greaterThan",
            Self::Gte(_) => "greaterOrEqual",
            Self::Like(_) => "LIKE",
            Self::In(_) => "IN",
            Self::Nin(_) => "NOT IN",
        }
    }

    fn rendered_value(&self) -> String {
        match self {
            Self::Eq(value)
            | Self::Ne(value)
            | Self::Lt(value)
            | Self::Lte(value)
            | Self::Gt(value)
            | Self::Gte(value) => literal(value),
            Self::Like(pattern) => quote(pattern),
            // Always parenthesized, even for one element.
            Self::In(values) | Self::Nin(values) => format!(
                "({})",
                values.iter().map(literal).collect::<Vec<_>>().join(", ")
            ),
        }
    }

    fn json_value(&self) -> Value {
        match self {
            Self::Eq(value)
            | Self::Ne(value)
            | Self::Lt(value)
            | Self::Lte(value)
            | Self::Gt(value)
            | Self::Gte(value) => value.clone(),
            Self::Like(pattern) => Value::String(pattern.clone()),
            Self::In(values) | Self::Nin(values) => Value::Array(values.clone()),
        }
    }
}

/// Field-keyed condition tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Where {
    Field { field: String, predicate: Predicate },
    And(Vec<Where>),
    Or(Vec<Where>),
}

impl Where {
    pub fn field(field: impl Into<String>, predicate: Predicate) -> Self {
        Self::Field {
            field: field.into(),
            predicate,
        }
    }

    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::field(field, Predicate::Eq(value.into()))
    }

    /// Lower to the condition AST with wire-quoted values.
    #[must_use]
    pub fn to_condition(&self) -> WhereCondition {
        match self {
            Self::Field { field, predicate } => WhereCondition::compare(
                field.clone(),
                predicate.operator(),
                vec![predicate.rendered_value()],
            ),
            Self::And(children) => {
                WhereCondition::and(children.iter().map(Self::to_condition).collect())
            }
            Self::Or(children) => {
                WhereCondition::or(children.iter().map(Self::to_condition).collect())
            }
        }
    }
}

impl Serialize for Where {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        match self {
            Self::Field { field, predicate } => {
                let mut inner = serde_json::Map::new();
                inner.insert(predicate.key().to_string(), predicate.json_value());
                map.serialize_entry(field, &inner)?;
            }
            Self::And(children) => map.serialize_entry("and", children)?,
            Self::Or(children) => map.serialize_entry("or", children)?,
        }
        map.end()
    }
}

fn literal(value: &Value) -> String {
    match value {
        Value::String(text) => quote(text),
        Value::Null => "null".to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        other => quote(&other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Criteria
// ---------------------------------------------------------------------------

/// Query specification for `retrieve`.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Criteria {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub order_by: Vec<OrderBy>,
    #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
    pub where_clause: Option<Where>,
}

impl Criteria {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by.push(OrderBy::new(field, direction));
        self
    }

    #[must_use]
    pub fn filter(mut self, clause: Where) -> Self {
        self.where_clause = Some(clause);
        self
    }

    /// Render as a full `SELECT` over `fields` of `object_type`.
    #[must_use]
    pub fn to_select(&self, object_type: &str, fields: &[&str]) -> SelectQuery {
        let mut query = SelectQuery::new(object_type)
            .fields(fields.iter().copied())
            .order_by(self.order_by.iter().cloned());
        if let Some(clause) = &self.where_clause {
            query = query.filter(clause.to_condition());
        }
        if let Some(limit) = self.limit {
            query = query.limit(limit);
        }
        query
    }
}
