//! Wrapper around globset's Glob type that couples a `|`-separated pattern
//! with its compiled matchers, so patterns can be stored, compared, and
//! serialized as the string patch authors wrote.

use globset::{Glob, GlobMatcher};
use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};

pub use globset::Error;

/// A name pattern from the patch language: `|`-separated alternatives, each a
/// glob anchored at both ends where `*` matches any run of characters and `?`
/// matches exactly one (the patch language reserves `?` as the stand-in for a
/// literal space).
#[derive(Debug, Clone)]
pub struct NamePattern {
    source: String,
    alternatives: Vec<GlobMatcher>,
}

impl NamePattern {
    pub fn new(pattern: &str) -> Result<Self, Error> {
        let mut alternatives = Vec::new();
        for alternative in pattern.split('|') {
            alternatives.push(Glob::new(alternative)?.compile_matcher());
        }

        Ok(NamePattern {
            source: pattern.to_owned(),
            alternatives,
        })
    }

    pub fn is_match(&self, value: &str) -> bool {
        self.alternatives.iter().any(|m| m.is_match(value))
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

impl PartialEq for NamePattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for NamePattern {}

impl Serialize for NamePattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

impl<'de> Deserialize<'de> for NamePattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let pattern = <&str as Deserialize>::deserialize(deserializer)?;

        NamePattern::new(pattern).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn star_matches_any_run() {
        let pattern = NamePattern::new("bl*h").unwrap();

        assert!(pattern.is_match("blah"));
        assert!(pattern.is_match("blablah"));
        assert!(pattern.is_match("bleh"));
        assert!(pattern.is_match("blh"));
        assert!(!pattern.is_match("blag"));
        assert!(!pattern.is_match("ablah"));
    }

    #[test]
    fn alternatives() {
        let pattern = NamePattern::new("table*|chair").unwrap();

        assert!(pattern.is_match("tableCloth"));
        assert!(pattern.is_match("chair"));
        assert!(!pattern.is_match("chairLeg"));
    }

    #[test]
    fn question_mark_matches_one_character() {
        let pattern = NamePattern::new("?").unwrap();

        assert!(pattern.is_match("1"));
        assert!(!pattern.is_match("16"));
        assert!(!pattern.is_match(""));
    }

    #[test]
    fn no_wildcards_is_equality() {
        let pattern = NamePattern::new("table").unwrap();

        assert!(pattern.is_match("table"));
        assert!(!pattern.is_match("tableCloth"));
    }
}
