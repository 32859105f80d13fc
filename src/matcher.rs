//! Compiles a (type, name pattern, constraints) triple into a predicate over
//! nodes. All validation happens at construction; `is_match` never fails.

use thiserror::Error;

use crate::glob::NamePattern;
use crate::node::Node;
use crate::tag::brackets_balanced;

#[derive(Debug, Error)]
pub enum MatcherError {
    #[error("node type must not be empty")]
    EmptyType,

    #[error("name pattern must not be empty")]
    EmptyPattern,

    #[error("constraint list must not be empty")]
    EmptyConstraints,

    #[error("constraint list is not bracket-balanced")]
    UnbalancedConstraints,

    #[error("constraint `{constraint}` must start with `@` or `#`")]
    ConstraintSigil { constraint: String },

    #[error("constraint `{constraint}` is missing a key")]
    ConstraintKey { constraint: String },

    #[error("constraint `{constraint}` has text after its bracket")]
    ConstraintTrailer { constraint: String },

    #[error("invalid pattern: {0}")]
    Pattern(#[from] crate::glob::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConstraintKind {
    /// `@TYPE[pattern]`: a child node of the given type whose `name` value
    /// matches the pattern.
    Child,
    /// `#key[pattern]`: a value under the given key matching the pattern.
    Value,
}

#[derive(Debug, Clone)]
struct Constraint {
    kind: ConstraintKind,
    key: String,
    /// `None` is the open form: presence of the child/value is enough.
    pattern: Option<NamePattern>,
}

impl Constraint {
    fn holds(&self, node: &Node) -> bool {
        match self.kind {
            ConstraintKind::Child => node.children().iter().any(|child| {
                child.name() == self.key
                    && match &self.pattern {
                        None => true,
                        Some(pattern) => child
                            .name_value()
                            .map_or(false, |value| pattern.is_match(value)),
                    }
            }),
            ConstraintKind::Value => node.values().iter().any(|(key, value)| {
                key == &self.key
                    && self
                        .pattern
                        .as_ref()
                        .map_or(true, |pattern| pattern.is_match(value))
            }),
        }
    }
}

/// A compiled predicate over nodes: type equality, an optional glob over the
/// node's `name` value, and a conjunction of structural constraints.
#[derive(Debug, Clone)]
pub struct NodeMatcher {
    node_type: String,
    name_pattern: Option<NamePattern>,
    constraints: Vec<Constraint>,
}

impl NodeMatcher {
    pub fn new(
        node_type: &str,
        name_pattern: Option<&str>,
        constraints: Option<&str>,
    ) -> Result<Self, MatcherError> {
        if node_type.is_empty() {
            return Err(MatcherError::EmptyType);
        }

        let name_pattern = match name_pattern {
            None => None,
            Some("") => return Err(MatcherError::EmptyPattern),
            Some(pattern) => Some(NamePattern::new(pattern)?),
        };

        let constraints = match constraints {
            None => Vec::new(),
            Some("") => return Err(MatcherError::EmptyConstraints),
            Some(list) => {
                if !brackets_balanced(list) {
                    return Err(MatcherError::UnbalancedConstraints);
                }
                parse_constraints(list)?
            }
        };

        Ok(NodeMatcher {
            node_type: node_type.to_owned(),
            name_pattern,
            constraints,
        })
    }

    pub fn node_type(&self) -> &str {
        &self.node_type
    }

    pub fn is_match(&self, node: &Node) -> bool {
        if node.name() != self.node_type {
            return false;
        }

        if let Some(pattern) = &self.name_pattern {
            match node.name_value() {
                Some(value) => {
                    if !pattern.is_match(value) {
                        return false;
                    }
                }
                None => return false,
            }
        }

        self.constraints.iter().all(|c| c.holds(node))
    }
}

fn parse_constraints(list: &str) -> Result<Vec<Constraint>, MatcherError> {
    let mut constraints = Vec::new();

    for raw in split_top_level(list) {
        let raw = raw.trim();

        let (kind, rest) = match raw.chars().next() {
            Some('@') => (ConstraintKind::Child, &raw[1..]),
            Some('#') => (ConstraintKind::Value, &raw[1..]),
            _ => {
                return Err(MatcherError::ConstraintSigil {
                    constraint: raw.to_owned(),
                })
            }
        };

        let (key, pattern) = match rest.find('[') {
            None => (rest, None),
            Some(open) => {
                if !rest.ends_with(']') {
                    return Err(MatcherError::ConstraintTrailer {
                        constraint: raw.to_owned(),
                    });
                }
                (&rest[..open], Some(&rest[open + 1..rest.len() - 1]))
            }
        };

        if key.is_empty() {
            return Err(MatcherError::ConstraintKey {
                constraint: raw.to_owned(),
            });
        }

        constraints.push(Constraint {
            kind,
            key: key.to_owned(),
            pattern: pattern.map(NamePattern::new).transpose()?,
        });
    }

    Ok(constraints)
}

/// Splits on commas that are not inside brackets.
fn split_top_level(list: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0;
    let mut start = 0;

    for (i, c) in list.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(&list[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&list[start..]);

    parts
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn type_only() {
        let matcher = NodeMatcher::new("NODE", None, None).unwrap();

        assert!(matcher.is_match(&Node::new("NODE")));
        assert!(!matcher.is_match(&Node::new("OTHER")));
        // With no pattern, a missing name value is fine.
        assert!(matcher.is_match(&Node::new("NODE").with_value("x", "y")));
    }

    #[test]
    fn name_pattern_globs() {
        let matcher = NodeMatcher::new("NODE", Some("bl*h"), None).unwrap();

        for name in ["blah", "blablah", "bleh"] {
            let node = Node::new("NODE").with_value("name", name);
            assert!(matcher.is_match(&node), "{} should match", name);
        }

        let miss = Node::new("NODE").with_value("name", "blag");
        assert!(!matcher.is_match(&miss));

        // A missing or empty name value never matches a non-null pattern.
        assert!(!matcher.is_match(&Node::new("NODE")));
    }

    #[test]
    fn name_pattern_alternatives() {
        let matcher = NodeMatcher::new("NODE", Some("table*|chair"), None).unwrap();

        assert!(matcher.is_match(&Node::new("NODE").with_value("name", "tableCloth")));
        assert!(matcher.is_match(&Node::new("NODE").with_value("name", "chair")));
        assert!(!matcher.is_match(&Node::new("NODE").with_value("name", "stool")));
    }

    #[test]
    fn child_constraints() {
        let matcher = NodeMatcher::new("FURN", None, Some("@PART[leg*]")).unwrap();

        let with_leg = Node::new("FURN").with_child(Node::new("PART").with_value("name", "legLeft"));
        let with_top = Node::new("FURN").with_child(Node::new("PART").with_value("name", "top"));
        let unnamed_part = Node::new("FURN").with_child(Node::new("PART"));

        assert!(matcher.is_match(&with_leg));
        assert!(!matcher.is_match(&with_top));
        assert!(!matcher.is_match(&unnamed_part));

        // Open form: presence of the child type is enough.
        let open = NodeMatcher::new("FURN", None, Some("@PART")).unwrap();
        assert!(open.is_match(&unnamed_part));
        assert!(!open.is_match(&Node::new("FURN")));
    }

    #[test]
    fn value_constraints() {
        let matcher = NodeMatcher::new("FURN", None, Some("#price[4]")).unwrap();
        assert!(matcher.is_match(&Node::new("FURN").with_value("price", "4")));
        assert!(!matcher.is_match(&Node::new("FURN").with_value("price", "42")));

        // Trailing `*` is the open (prefix) form.
        let open = NodeMatcher::new("FURN", None, Some("#price[4*]")).unwrap();
        assert!(open.is_match(&Node::new("FURN").with_value("price", "42")));

        // No bracket requires presence only.
        let presence = NodeMatcher::new("FURN", None, Some("#price")).unwrap();
        assert!(presence.is_match(&Node::new("FURN").with_value("price", "anything")));
        assert!(!presence.is_match(&Node::new("FURN")));
    }

    #[test]
    fn conjunction() {
        let matcher = NodeMatcher::new("FURN", None, Some("@PART[leg*],#price[4*]")).unwrap();

        let both = Node::new("FURN")
            .with_value("price", "40")
            .with_child(Node::new("PART").with_value("name", "legLeft"));
        let one = Node::new("FURN")
            .with_value("price", "40")
            .with_child(Node::new("PART").with_value("name", "top"));

        assert!(matcher.is_match(&both));
        assert!(!matcher.is_match(&one));
    }

    #[test]
    fn construction_errors() {
        assert!(matches!(
            NodeMatcher::new("", None, None),
            Err(MatcherError::EmptyType)
        ));
        assert!(matches!(
            NodeMatcher::new("NODE", Some(""), None),
            Err(MatcherError::EmptyPattern)
        ));
        assert!(matches!(
            NodeMatcher::new("NODE", None, Some("")),
            Err(MatcherError::EmptyConstraints)
        ));
        assert!(matches!(
            NodeMatcher::new("NODE", None, Some("@PART[leg")),
            Err(MatcherError::UnbalancedConstraints)
        ));
        assert!(matches!(
            NodeMatcher::new("NODE", None, Some("PART[leg]")),
            Err(MatcherError::ConstraintSigil { .. })
        ));
        assert!(matches!(
            NodeMatcher::new("NODE", None, Some("@[leg]")),
            Err(MatcherError::ConstraintKey { .. })
        ));
        assert!(matches!(
            NodeMatcher::new("NODE", None, Some("@PART[leg]x")),
            Err(MatcherError::ConstraintTrailer { .. })
        ));
    }
}
