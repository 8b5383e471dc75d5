//! Alphabet tables for first-letter filtering.
//!
//! An [`Alphabet`] is a list of equivalence groups. The first character of
//! a group is its heading; the rest are letters that should match the same
//! heading (accented forms). Lookups are case-insensitive.

/// Letter equivalence groups for one locale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alphabet {
    groups: Vec<Vec<char>>,
}

const LATIN: &[&str] = &[
    "aàáâãäåā",
    "b",
    "cçćč",
    "dď",
    "eèéêëēěę",
    "f",
    "gğ",
    "h",
    "iìíîïī",
    "j",
    "k",
    "lł",
    "m",
    "nñńň",
    "oòóôõöøō",
    "p",
    "q",
    "rř",
    "sśšş",
    "tť",
    "uùúûüūů",
    "v",
    "w",
    "x",
    "yýÿ",
    "zźżž",
];

impl Alphabet {
    /// Build from explicit groups; empty groups are dropped.
    #[must_use]
    pub fn new(groups: Vec<Vec<char>>) -> Self {
        let groups = groups
            .into_iter()
            .map(|group| group.into_iter().flat_map(char::to_lowercase).collect::<Vec<_>>())
            .filter(|group| !group.is_empty())
            .collect();
        Self { groups }
    }

    /// Built-in Latin table with common diacritic folds.
    #[must_use]
    pub fn latin() -> Self {
        Self::new(LATIN.iter().map(|group| group.chars().collect()).collect())
    }

    /// Group headings in table order.
    #[must_use]
    pub fn headings(&self) -> Vec<char> {
        self.groups.iter().filter_map(|group| group.first().copied()).collect()
    }

    /// Every letter in the table, headings and equivalents.
    pub fn letters(&self) -> impl Iterator<Item = char> + '_ {
        self.groups.iter().flatten().copied()
    }

    /// Letters that should match `letter`, including itself.
    ///
    /// A letter outside the table is only equivalent to itself.
    #[must_use]
    pub fn equivalents(&self, letter: char) -> Vec<char> {
        let folded = fold(letter);
        self.groups
            .iter()
            .find(|group| group.contains(&folded))
            .cloned()
            .unwrap_or_else(|| vec![folded])
    }
}

impl Default for Alphabet {
    fn default() -> Self {
        Self::latin()
    }
}

fn fold(letter: char) -> char {
    let mut lower = letter.to_lowercase();
    match (lower.next(), lower.next()) {
        (Some(single), None) => single,
        _ => letter,
    }
}
