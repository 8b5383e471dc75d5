//! Query text builder.
//!
//! Renders `SELECT f1, f2 FROM Type [WHERE c] [ORDER BY f dir, ...]
//! [LIMIT n] [OFFSET m]` with single spaces between clauses, and the paired
//! `SELECT COUNT() FROM Type [WHERE c]` used for totals.

use std::fmt;

use crate::condition::{OrderBy, WhereCondition};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectQuery {
    object_type: String,
    fields: Vec<String>,
    condition: Option<WhereCondition>,
    order_by: Vec<OrderBy>,
    limit: Option<u32>,
    offset: Option<u32>,
}

impl SelectQuery {
    pub fn new(object_type: impl Into<String>) -> Self {
        Self {
            object_type: object_type.into(),
            fields: Vec::new(),
            condition: None,
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    #[must_use]
    pub fn fields<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.fields.extend(fields.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn filter(mut self, condition: WhereCondition) -> Self {
        self.condition = Some(condition);
        self
    }

    #[must_use]
    pub fn order_by(mut self, terms: impl IntoIterator<Item = OrderBy>) -> Self {
        self.order_by.extend(terms);
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub const fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Compiled `WHERE` body, `None` when the condition restricts nothing.
    #[must_use]
    pub fn where_text(&self) -> Option<String> {
        self.condition
            .as_ref()
            .map(WhereCondition::stringify)
            .filter(|text| !text.is_empty())
    }

    /// The matching count query: same `WHERE`, no fields, order, or paging.
    #[must_use]
    pub fn count_text(&self) -> String {
        let mut out = format!("SELECT COUNT() FROM {}", self.object_type);
        if let Some(condition) = self.where_text() {
            out.push_str(" WHERE ");
            out.push_str(&condition);
        }
        out
    }
}

impl fmt::Display for SelectQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = if self.fields.is_empty() {
            "Id".to_string()
        } else {
            self.fields.join(", ")
        };
        write!(f, "SELECT {fields} FROM {}", self.object_type)?;
        if let Some(condition) = self.where_text() {
            write!(f, " WHERE {condition}")?;
        }
        if !self.order_by.is_empty() {
            let terms = self
                .order_by
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            write!(f, " ORDER BY {terms}")?;
        }
        if let Some(limit) = self.limit {
            write!(f, " LIMIT {limit}")?;
        }
        if let Some(offset) = self.offset {
            write!(f, " OFFSET {offset}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::Direction;

    #[test]
    fn full_query_shape() {
        let query = SelectQuery::new("Account")
            .fields(["Id", "Name", "Phone"])
            .filter(WhereCondition::compare(
                "Name",
                "like",
                vec!["'A%'".to_string()],
            ))
            .order_by([
                OrderBy::new("Name", Direction::Asc),
                OrderBy::new("CreatedDate", Direction::Desc),
            ])
            .limit(5)
            .offset(10);
        assert_eq!(
            query.to_string(),
            "SELECT Id, Name, Phone FROM Account WHERE Name like 'A%' ORDER BY Name ASC, CreatedDate DESC LIMIT 5 OFFSET 10"
        );
        assert_eq!(
            query.count_text(),
            "SELECT COUNT() FROM Account WHERE Name like 'A%'"
        );
    }

    #[test]
    fn empty_condition_omits_where() {
        let query = SelectQuery::new("Contact")
            .fields(["Id"])
            .filter(WhereCondition::and(vec![]))
            .limit(1);
        assert_eq!(query.to_string(), "SELECT Id FROM Contact LIMIT 1");
        assert_eq!(query.count_text(), "SELECT COUNT() FROM Contact");
    }
}
