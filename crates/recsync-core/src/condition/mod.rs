//! Filter condition AST and its compiler to query text.
//!
//! A [`WhereCondition`] is one of three shapes: a comparison on a field, an
//! `and`/`or` conjunction of child conditions, or a negation. Comparison
//! values are already wire-quoted; [`quote`] and [`quote_like`] produce such
//! literals from raw text.
//!
//! The serde representation is untagged and matches the JSON the record API
//! returns for list-view filters:
//!
//! ```json
//! { "conjunction": "and", "conditions": [
//!     { "field": "Amount", "operator": "greaterThan", "values": ["100"] },
//!     { "condition": { "field": "Name", "operator": "like", "values": ["'A%'"] } }
//! ] }
//! ```

pub mod criteria;
pub mod filter;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use criteria::{Criteria, Direction, OrderBy, Predicate, Where, parse_ordering};
pub use filter::{Filter, FilterKind, compile_filters, merge_filter};

/// Boolean combinator for a [`WhereCondition::Conjunction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Conjunction {
    And,
    Or,
}

impl Conjunction {
    const fn keyword(self) -> &'static str {
        match self {
            Self::And => " and ",
            Self::Or => " or ",
        }
    }
}

/// Filter expression tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WhereCondition {
    Conjunction {
        conjunction: Conjunction,
        conditions: Vec<WhereCondition>,
    },
    Comparison {
        field: String,
        operator: String,
        values: Vec<String>,
    },
    Negation {
        condition: Box<WhereCondition>,
    },
}

impl WhereCondition {
    pub fn and(conditions: Vec<Self>) -> Self {
        Self::Conjunction {
            conjunction: Conjunction::And,
            conditions,
        }
    }

    pub fn or(conditions: Vec<Self>) -> Self {
        Self::Conjunction {
            conjunction: Conjunction::Or,
            conditions,
        }
    }

    pub fn compare(
        field: impl Into<String>,
        operator: impl Into<String>,
        values: Vec<String>,
    ) -> Self {
        Self::Comparison {
            field: field.into(),
            operator: operator.into(),
            values,
        }
    }

    pub fn negate(condition: Self) -> Self {
        Self::Negation {
            condition: Box::new(condition),
        }
    }

    /// Compile to query text.
    ///
    /// Conjunction children are each wrapped in parentheses. Children that
    /// compile to nothing are skipped, so a conjunction with no effective
    /// children (including an empty one) compiles to the empty string.
    #[must_use]
    pub fn stringify(&self) -> String {
        match self {
            Self::Conjunction {
                conjunction,
                conditions,
            } => conditions
                .iter()
                .map(Self::stringify)
                .filter(|child| !child.is_empty())
                .map(|child| format!("({child})"))
                .collect::<Vec<_>>()
                .join(conjunction.keyword()),
            Self::Negation { condition } => {
                let inner = condition.stringify();
                if inner.is_empty() {
                    inner
                } else {
                    format!("NOT ({inner})")
                }
            }
            Self::Comparison {
                field,
                operator,
                values,
            } => {
                let rendered = match values.as_slice() {
                    [single] => single.clone(),
                    many => format!("({})", many.join(", ")),
                };
                format!("{field} {} {rendered}", operator_symbol(operator))
            }
        }
    }
}

impl fmt::Display for WhereCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.stringify())
    }
}

/// Map a named operator to its symbol; unknown names pass through verbatim.
#[must_use]
pub fn operator_symbol(operator: &str) -> &str {
    match operator {
        "equals" => "=",
        "notEquals" => "!=",
        "lessThan" => "<",
        "greaterThan" => ">",
        "lessOrEqual" => "<=",
        "greaterOrEqual" => ">=",
        other => other,
    }
}

/// Quote a string literal for the query language.
#[must_use]
pub fn quote(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 2);
    out.push('\'');
    for c in raw.chars() {
        if matches!(c, '\\' | '\'') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('\'');
    out
}

/// Quote `raw` as a `like` pattern, escaping its wildcard characters and
/// adding `prefix`/`suffix` wildcards around it.
#[must_use]
pub fn quote_like(prefix: &str, raw: &str, suffix: &str) -> String {
    let mut out = String::with_capacity(raw.len() + prefix.len() + suffix.len() + 2);
    out.push('\'');
    out.push_str(prefix);
    for c in raw.chars() {
        if matches!(c, '\\' | '\'' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push_str(suffix);
    out.push('\'');
    out
}
