//! Label names and label sets.
//!
//! Labels are case-insensitive on the server, so every name is normalized
//! (trimmed, lowercased) before storage or comparison. The server exposes
//! no "replace all labels" operation; set equality is reached by applying
//! the symmetric difference between a local and a remote set, which is why
//! `LabelSet` exposes difference helpers.

use crate::error::{ClientError, ClientResult};
use std::collections::BTreeSet;
use std::fmt;

/// Label prefix used on the wire. Only global labels are managed here.
pub const LABEL_PREFIX: &str = "global";

/// A validated, normalized label name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LabelName(String);

impl LabelName {
    /// Parses and normalizes a label name.
    ///
    /// The input is trimmed and lowercased. After normalization the name
    /// must be non-empty and contain only ASCII alphanumerics or one of
    /// `_ - ~ { } % +`.
    pub fn parse(text: &str) -> ClientResult<Self> {
        let normalized = text.trim().to_ascii_lowercase();
        if normalized.is_empty() {
            return Err(ClientError::validation("label name is empty"));
        }
        if !normalized.chars().all(is_allowed_label_char) {
            return Err(ClientError::validation(format!(
                "label name contains disallowed characters: {text:?}"
            )));
        }
        Ok(Self(normalized))
    }

    /// Returns the normalized name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LabelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_allowed_label_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '~' | '{' | '}' | '%' | '+')
}

/// An ordered set of normalized label names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSet {
    names: BTreeSet<LabelName>,
}

impl LabelSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a label. Returns true if the set changed.
    pub fn insert(&mut self, name: LabelName) -> bool {
        self.names.insert(name)
    }

    /// Removes a label. Returns true if it was present.
    pub fn remove(&mut self, name: &LabelName) -> bool {
        self.names.remove(name)
    }

    /// Returns true if the set contains the label.
    #[must_use]
    pub fn contains(&self, name: &LabelName) -> bool {
        self.names.contains(name)
    }

    /// Returns the number of labels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns true if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Iterates over the labels in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &LabelName> {
        self.names.iter()
    }

    /// Returns the labels present in `self` but not in `other`.
    ///
    /// With `self` as the local set and `other` as the remote set this is
    /// the list of labels to add remotely; with the arguments swapped it is
    /// the list to remove.
    #[must_use]
    pub fn difference(&self, other: &LabelSet) -> Vec<LabelName> {
        self.names.difference(&other.names).cloned().collect()
    }
}

impl FromIterator<LabelName> for LabelSet {
    fn from_iter<I: IntoIterator<Item = LabelName>>(iter: I) -> Self {
        Self {
            names: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parse_normalizes() {
        let name = LabelName::parse("  Release-Notes ").unwrap();
        assert_eq!(name.as_str(), "release-notes");
    }

    #[test]
    fn parse_rejects_bad_characters() {
        assert!(LabelName::parse("").is_err());
        assert!(LabelName::parse("   ").is_err());
        assert!(LabelName::parse("two words").is_err());
        assert!(LabelName::parse("semi;colon").is_err());
        assert!(LabelName::parse("a/b").is_err());
    }

    #[test]
    fn parse_accepts_policy_characters() {
        for name in ["abc123", "a_b", "a-b", "a~b", "{macro}", "50%", "c++"] {
            assert!(LabelName::parse(name).is_ok(), "rejected {name}");
        }
    }

    #[test]
    fn insert_is_idempotent() {
        let mut set = LabelSet::new();
        assert!(set.insert(LabelName::parse("Docs").unwrap()));
        assert!(!set.insert(LabelName::parse("docs").unwrap()));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn remove_reports_change() {
        let mut set = LabelSet::new();
        set.insert(LabelName::parse("a").unwrap());
        assert!(set.remove(&LabelName::parse("A").unwrap()));
        assert!(!set.remove(&LabelName::parse("a").unwrap()));
    }

    #[test]
    fn difference_is_symmetric_complement() {
        let local: LabelSet = ["a", "b"]
            .iter()
            .map(|n| LabelName::parse(n).unwrap())
            .collect();
        let remote: LabelSet = ["b", "c"]
            .iter()
            .map(|n| LabelName::parse(n).unwrap())
            .collect();

        let to_add = local.difference(&remote);
        let to_remove = remote.difference(&local);
        assert_eq!(to_add, vec![LabelName::parse("a").unwrap()]);
        assert_eq!(to_remove, vec![LabelName::parse("c").unwrap()]);
    }

    proptest! {
        #[test]
        fn normalization_is_idempotent(raw in "[A-Za-z0-9_~{}%+-]{1,20}") {
            let once = LabelName::parse(&raw).unwrap();
            let twice = LabelName::parse(once.as_str()).unwrap();
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn double_insert_keeps_one(raw in "[a-z0-9-]{1,12}") {
            let mut set = LabelSet::new();
            set.insert(LabelName::parse(&raw).unwrap());
            set.insert(LabelName::parse(&raw.to_ascii_uppercase()).unwrap());
            prop_assert_eq!(set.len(), 1);
        }
    }
}
