//! The generic tree record that patches are written against, plus the record
//! hosts use to hand trees to the engine.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// The key under which a node stores its identity value, as opposed to its
/// type (which is the node name itself).
pub const NAME_KEY: &str = "name";

/// A generic ordered tree record: a name, an ordered list of key/value string
/// pairs (keys may repeat), and an ordered list of child nodes (names may
/// repeat). There is no schema; names ending in sigils and `:NEEDS[...]`
/// suffixes carry patch semantics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Node {
    name: String,
    #[serde(default)]
    values: Vec<(String, String)>,
    #[serde(default)]
    children: Vec<Node>,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Node {
            name: name.into(),
            values: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder-style value append, mostly for tests and hosts constructing
    /// trees by hand.
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.push((key.into(), value.into()));
        self
    }

    /// Builder-style child append.
    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn values(&self) -> &[(String, String)] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut Vec<(String, String)> {
        &mut self.values
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut Vec<Node> {
        &mut self.children
    }

    /// First value stored under `key`, if any.
    pub fn value(&self, key: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// The node's identity value (first value under `name`). Distinct from
    /// the node name, which acts as its type.
    pub fn name_value(&self) -> Option<&str> {
        self.value(NAME_KEY)
    }

    /// First child with the given name, if any.
    pub fn child(&self, name: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.name == name)
    }
}

/// One host-supplied root node, tagged with the capability ("mod") that
/// contributed it and the file it came from. The mod name is required so that
/// patches with no explicit pass specifier can be scheduled into their
/// contributing mod's default bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceTree {
    pub mod_name: String,
    pub path: PathBuf,
    pub root: Node,
}

impl SourceTree {
    pub fn new(mod_name: impl Into<String>, path: impl Into<PathBuf>, root: Node) -> Self {
        SourceTree {
            mod_name: mod_name.into(),
            path: path.into(),
            root,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn duplicate_keys_and_children_preserve_order() {
        let node = Node::new("FURN")
            .with_value("name", "table")
            .with_value("price", "5")
            .with_value("price", "7")
            .with_child(Node::new("PART"))
            .with_child(Node::new("PART"));

        assert_eq!(node.value("price"), Some("5"));
        assert_eq!(node.values().len(), 3);
        assert_eq!(node.children().len(), 2);
        assert_eq!(node.name_value(), Some("table"));
    }

    #[test]
    fn serde_round_trip() {
        let node = Node::new("FURN")
            .with_value("name", "table")
            .with_child(Node::new("PART").with_value("name", "leg"));

        let encoded = serde_json::to_string(&node).unwrap();
        let decoded: Node = serde_json::from_str(&encoded).unwrap();

        assert_eq!(node, decoded);
    }
}
