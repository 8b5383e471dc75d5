//! User-facing list filters and their compilation to [`WhereCondition`]s.

use super::{WhereCondition, quote_like};
use crate::locale::Alphabet;

/// A list filter picked in the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Records whose filter field starts with this letter or an equivalent.
    FirstLetter(char),
    /// Records whose filter field starts with no letter of the alphabet.
    FirstLetterOther,
    /// No first-letter restriction.
    FirstLetterAny,
    /// Records whose filter field contains this text.
    Substring(String),
}

/// Slot a filter occupies; at most one filter per kind is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKind {
    FirstLetter,
    Substring,
}

impl Filter {
    #[must_use]
    pub const fn kind(&self) -> FilterKind {
        match self {
            Self::FirstLetter(_) | Self::FirstLetterOther | Self::FirstLetterAny => {
                FilterKind::FirstLetter
            }
            Self::Substring(_) => FilterKind::Substring,
        }
    }

    /// Compile against `field`, or `None` when the filter restricts nothing.
    #[must_use]
    pub fn to_condition(&self, field: &str, alphabet: &Alphabet) -> Option<WhereCondition> {
        match self {
            Self::FirstLetter(letter) => Some(starts_with_any(
                field,
                alphabet.equivalents(*letter).into_iter(),
            )),
            Self::FirstLetterOther => Some(WhereCondition::negate(starts_with_any(
                field,
                alphabet.letters(),
            ))),
            Self::FirstLetterAny => None,
            Self::Substring(text) if text.is_empty() => None,
            Self::Substring(text) => Some(WhereCondition::compare(
                field,
                "like",
                vec![quote_like("%", text, "%")],
            )),
        }
    }
}

fn starts_with_any(field: &str, letters: impl Iterator<Item = char>) -> WhereCondition {
    WhereCondition::or(
        letters
            .map(|letter| {
                WhereCondition::compare(
                    field,
                    "like",
                    vec![quote_like("", &letter.to_string(), "%")],
                )
            })
            .collect(),
    )
}

/// Replace any active filter of the same kind with `filter`.
#[must_use]
pub fn merge_filter(active: &[Filter], filter: Filter) -> Vec<Filter> {
    let kind = filter.kind();
    active
        .iter()
        .filter(|existing| existing.kind() != kind)
        .cloned()
        .chain(std::iter::once(filter))
        .collect()
}

/// Conjunction of every filter that restricts something.
#[must_use]
pub fn compile_filters(filters: &[Filter], field: &str, alphabet: &Alphabet) -> WhereCondition {
    WhereCondition::and(
        filters
            .iter()
            .filter_map(|filter| filter.to_condition(field, alphabet))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abc() -> Alphabet {
        Alphabet::new(vec![vec!['a', 'á'], vec!['b'], vec!['c']])
    }

    #[test]
    fn first_letter_expands_to_equivalents() {
        let condition = Filter::FirstLetter('A').to_condition("Name", &abc());
        assert_eq!(
            condition.map(|c| c.stringify()).as_deref(),
            Some("(Name like 'a%') or (Name like 'á%')")
        );
    }

    #[test]
    fn other_negates_the_whole_alphabet() {
        let condition = Filter::FirstLetterOther
            .to_condition("Name", &abc())
            .expect("restricts");
        assert_eq!(
            condition.stringify(),
            "NOT ((Name like 'a%') or (Name like 'á%') or (Name like 'b%') or (Name like 'c%'))"
        );
    }

    #[test]
    fn any_and_empty_substring_compile_to_nothing() {
        assert_eq!(Filter::FirstLetterAny.to_condition("Name", &abc()), None);
        assert_eq!(Filter::Substring(String::new()).to_condition("Name", &abc()), None);
    }

    #[test]
    fn substring_wraps_in_wildcards() {
        let condition = Filter::Substring("Acme".into())
            .to_condition("Name", &abc())
            .expect("restricts");
        assert_eq!(condition.stringify(), "Name like '%Acme%'");
    }

    #[test]
    fn merge_keeps_last_filter_per_kind() {
        let active = vec![Filter::FirstLetter('a'), Filter::Substring("x".into())];
        let merged = merge_filter(&active, Filter::FirstLetterOther);
        assert_eq!(
            merged,
            vec![Filter::Substring("x".into()), Filter::FirstLetterOther]
        );

        let merged = merge_filter(&merged, Filter::Substring("y".into()));
        assert_eq!(
            merged,
            vec![Filter::FirstLetterOther, Filter::Substring("y".into())]
        );
    }

    #[test]
    fn compiled_filters_omit_unrestricted_entries() {
        let filters = vec![Filter::FirstLetterAny, Filter::Substring("Co".into())];
        assert_eq!(
            compile_filters(&filters, "Name", &abc()).stringify(),
            "(Name like '%Co%')"
        );
        assert_eq!(
            compile_filters(&[Filter::FirstLetterAny], "Name", &abc()).stringify(),
            ""
        );
    }
}
