//! Compiled patch operations and the algorithm that applies them to the
//! working forest. Matching walks the forest depth-first; a matched node is
//! replaced (or copied, or removed) at its position, and the traversal does
//! not descend into nodes it just matched.

use std::rc::Rc;
use std::sync::Arc;

use crate::matcher::NodeMatcher;
use crate::node::Node;
use crate::path_stack::NodePath;
use crate::report::{PatchSource, Report};

use super::modify::modify_node;
use super::pass::PassSpecifier;

/// A marker child inside an edit body requesting that the edit be re-applied
/// to its own output until the matcher no longer matches. Convergence is the
/// patch author's responsibility; the matcher is the only bound.
pub const PATCH_LOOP_MARKER: &str = "MM_PATCH_LOOP";

/// One executable patch, scheduled into a pass.
#[derive(Debug)]
pub struct Patch {
    pub source: Arc<PatchSource>,
    pub pass: PassSpecifier,
    pub op: PatchOp,
}

#[derive(Debug)]
pub enum PatchOp {
    Edit {
        matcher: NodeMatcher,
        body: Node,
        looped: bool,
    },
    Copy {
        matcher: NodeMatcher,
        body: Node,
    },
    Delete {
        matcher: NodeMatcher,
    },
    Insert {
        node: Node,
    },
}

impl Patch {
    /// Applies this patch to the whole forest, reporting one event per
    /// affected node. Per-node failures never abort the remaining matches.
    pub fn apply(&self, forest: &mut Vec<Node>, report: &Report) {
        let root = NodePath::new();

        let affected = match &self.op {
            PatchOp::Edit {
                matcher,
                body,
                looped,
            } => {
                if *looped {
                    log::info!(
                        "{}: edit of `{}` loops until its matcher stops matching",
                        self.source,
                        matcher.node_type()
                    );
                }
                edit_nodes(
                    forest,
                    &root,
                    matcher,
                    body,
                    *looped,
                    self.source.as_ref(),
                    report,
                )
            }
            PatchOp::Copy { matcher, body } => {
                copy_nodes(forest, &root, matcher, body, self.source.as_ref(), report)
            }
            PatchOp::Delete { matcher } => delete_nodes(forest, &root, matcher, report),
            PatchOp::Insert { node } => {
                report.applying("insert", node.name());
                forest.push(node.clone());
                1
            }
        };

        if affected > 0 {
            report.patch_applied();
        }
    }
}

fn edit_nodes(
    nodes: &mut Vec<Node>,
    path: &NodePath,
    matcher: &NodeMatcher,
    body: &Node,
    looped: bool,
    source: &PatchSource,
    report: &Report,
) -> u64 {
    let mut affected = 0;

    for node in nodes.iter_mut() {
        let node_path = path.push(Rc::from(node.name()));

        if matcher.is_match(node) {
            report.applying("edit", &node_path.dotted());

            let mut new = modify_node(node, body, &node_path, source, report);
            if looped {
                while matcher.is_match(&new) {
                    new = modify_node(&new, body, &node_path, source, report);
                }
            }
            *node = new;
            affected += 1;
        } else {
            affected += edit_nodes(
                node.children_mut(),
                &node_path,
                matcher,
                body,
                looped,
                source,
                report,
            );
        }
    }

    affected
}

fn copy_nodes(
    nodes: &mut Vec<Node>,
    path: &NodePath,
    matcher: &NodeMatcher,
    body: &Node,
    source: &PatchSource,
    report: &Report,
) -> u64 {
    let mut affected = 0;
    let mut i = 0;

    while i < nodes.len() {
        let node_path = path.push(Rc::from(nodes[i].name()));

        if matcher.is_match(&nodes[i]) {
            let copy = modify_node(&nodes[i], body, &node_path, source, report);

            if copy.name_value() == nodes[i].name_value() {
                report.failure(
                    Some(source),
                    format_args!(
                        "copy of {} must end up with a different `name` value",
                        node_path.dotted()
                    ),
                );
                i += 1;
            } else {
                report.applying("copy", &node_path.dotted());
                nodes.insert(i + 1, copy);
                affected += 1;
                // Skip the node we just inserted.
                i += 2;
            }
        } else {
            affected += copy_nodes(
                nodes[i].children_mut(),
                &node_path,
                matcher,
                body,
                source,
                report,
            );
            i += 1;
        }
    }

    affected
}

fn delete_nodes(
    nodes: &mut Vec<Node>,
    path: &NodePath,
    matcher: &NodeMatcher,
    report: &Report,
) -> u64 {
    let mut affected = 0;
    let mut i = 0;

    while i < nodes.len() {
        if matcher.is_match(&nodes[i]) {
            report.applying("delete", &path.dotted_child(nodes[i].name()));
            nodes.remove(i);
            affected += 1;
        } else {
            let node_path = path.push(Rc::from(nodes[i].name()));
            affected += delete_nodes(nodes[i].children_mut(), &node_path, matcher, report);
            i += 1;
        }
    }

    affected
}
