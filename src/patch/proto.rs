//! Validation of a parsed tag list into an immutable, typed patch
//! descriptor, and compilation of that descriptor into an executable patch.
//! Any validation error drops the whole candidate (after the full tag scan,
//! so every problem gets reported); warnings apply a best-effort default.

use std::sync::Arc;

use crate::matcher::NodeMatcher;
use crate::node::Node;
use crate::report::{PatchSource, Report};
use crate::sigil::Command;
use crate::tag::{Tag, TagList};

use super::apply::{Patch, PatchOp, PATCH_LOOP_MARKER};
use super::pass::PassSpecifier;

/// A validated, not-yet-compiled patch: command, target, conditions, pass,
/// and the (already needs-pruned) body it will apply.
#[derive(Debug)]
pub struct ProtoPatch {
    pub source: Arc<PatchSource>,
    pub command: Command,
    pub node_type: String,
    pub name: Option<String>,
    pub needs: Option<String>,
    pub has: Option<String>,
    pub pass: PassSpecifier,
    pub body: Node,
}

impl ProtoPatch {
    /// Builds a proto-patch from a root command and its parsed tag list.
    /// Returns `None` if any validation error was reported.
    pub fn build(
        source: Arc<PatchSource>,
        command: Command,
        tags: TagList,
        body: Node,
        report: &Report,
    ) -> Option<ProtoPatch> {
        let mut ok = true;
        let mut error = |message: String| {
            report.error(Some(source.as_ref()), &message);
            ok = false;
        };

        let node_type = tags.primary.key.clone();

        warn_trailer(&tags.primary, source.as_ref(), report);

        let name = match &tags.primary.value {
            Some(value) if value.is_empty() => {
                report.warning(
                    Some(source.as_ref()),
                    format_args!("`{}`: empty name brackets, treating as no name", node_type),
                );
                None
            }
            Some(value) => Some(value.clone()),
            None => None,
        };

        if command == Command::Insert && name.is_some() {
            error(format!(
                "`{}`: insert nodes are not patches, a name specifier is not allowed",
                node_type
            ));
        }

        let mut needs: Option<String> = None;
        let mut has: Option<String> = None;
        let mut pass: Option<PassSpecifier> = None;

        for tag in &tags.secondary {
            warn_trailer(tag, source.as_ref(), report);

            let key = tag.key.to_ascii_uppercase();
            match key.as_str() {
                "NEEDS" => match required_value(tag, &key) {
                    Ok(value) => set_condition(&mut needs, &key, value, source.as_ref(), report),
                    Err(message) => error(message),
                },
                "HAS" => {
                    if command == Command::Insert {
                        error(format!("`{}`: HAS is not valid on an insert node", node_type));
                        continue;
                    }
                    match required_value(tag, &key) {
                        Ok(value) => set_condition(&mut has, &key, value, source.as_ref(), report),
                        Err(message) => error(message),
                    }
                }
                "FIRST" | "FINAL" => {
                    if command == Command::Insert {
                        error(format!(
                            "`{}`: pass specifiers are not valid on insert nodes",
                            node_type
                        ));
                        continue;
                    }
                    if tag.value.is_some() {
                        report.warning(
                            Some(source.as_ref()),
                            format_args!("`{}` does not take a value, ignoring it", key),
                        );
                    }
                    let specifier = if key == "FIRST" {
                        PassSpecifier::First
                    } else {
                        PassSpecifier::Final
                    };
                    set_pass(&mut pass, specifier, source.as_ref(), report);
                }
                "BEFORE" | "FOR" | "AFTER" | "LAST" => {
                    if command == Command::Insert {
                        error(format!(
                            "`{}`: pass specifiers are not valid on insert nodes",
                            node_type
                        ));
                        continue;
                    }
                    match required_value(tag, &key) {
                        Ok(value) => {
                            let specifier = match key.as_str() {
                                "BEFORE" => PassSpecifier::Before(value),
                                "FOR" => PassSpecifier::For(value),
                                "AFTER" => PassSpecifier::After(value),
                                _ => PassSpecifier::Last(value),
                            };
                            set_pass(&mut pass, specifier, source.as_ref(), report);
                        }
                        Err(message) => error(message),
                    }
                }
                _ => {
                    report.warning(
                        Some(source.as_ref()),
                        format_args!("unrecognized tag `{}`", tag.key),
                    );
                }
            }
        }

        if !ok {
            return None;
        }

        let pass = pass.unwrap_or(match command {
            Command::Insert => PassSpecifier::Insert,
            _ => PassSpecifier::Legacy,
        });

        Some(ProtoPatch {
            source,
            command,
            node_type,
            name,
            needs,
            has,
            pass,
            body,
        })
    }

    /// Compiles the proto-patch into an executable one, building the node
    /// matcher from the type, name pattern, and `HAS` constraints.
    pub fn compile(self, report: &Report) -> Option<Patch> {
        let op = match self.command {
            Command::Insert => {
                let mut node = self.body;
                node.set_name(&self.node_type);
                PatchOp::Insert { node }
            }
            command => {
                let matcher = match NodeMatcher::new(
                    &self.node_type,
                    self.name.as_deref(),
                    self.has.as_deref(),
                ) {
                    Ok(matcher) => matcher,
                    Err(err) => {
                        report.error(Some(self.source.as_ref()), err);
                        return None;
                    }
                };

                match command {
                    Command::Edit => {
                        let mut body = self.body;
                        let children = body.children_mut();
                        let had_loop = children.iter().any(|c| c.name() == PATCH_LOOP_MARKER);
                        children.retain(|c| c.name() != PATCH_LOOP_MARKER);

                        PatchOp::Edit {
                            matcher,
                            body,
                            looped: had_loop,
                        }
                    }
                    Command::Copy => PatchOp::Copy {
                        matcher,
                        body: self.body,
                    },
                    Command::Delete => PatchOp::Delete { matcher },
                    _ => {
                        report.error(
                            Some(self.source.as_ref()),
                            format_args!("{} is not a root-level command", command),
                        );
                        return None;
                    }
                }
            }
        };

        Some(Patch {
            source: self.source,
            pass: self.pass,
            op,
        })
    }
}

fn warn_trailer(tag: &Tag, source: &PatchSource, report: &Report) {
    if let Some(trailer) = &tag.trailer {
        report.warning(
            Some(source),
            format_args!("unrecognized trailer `{}` on tag `{}`", trailer, tag.key),
        );
    }
}

fn required_value(tag: &Tag, key: &str) -> Result<String, String> {
    match &tag.value {
        Some(value) if !value.is_empty() => Ok(value.clone()),
        _ => Err(format!("`{}` requires a value", key)),
    }
}

fn set_condition(
    slot: &mut Option<String>,
    key: &str,
    value: String,
    source: &PatchSource,
    report: &Report,
) {
    if slot.is_some() {
        report.warning(
            Some(source),
            format_args!("duplicate `{}` tag, keeping the first", key),
        );
    } else {
        *slot = Some(value);
    }
}

fn set_pass(
    slot: &mut Option<PassSpecifier>,
    specifier: PassSpecifier,
    source: &PatchSource,
    report: &Report,
) {
    if let Some(first) = slot.as_ref() {
        report.warning(
            Some(source),
            format_args!(
                "duplicate pass specifier {}, keeping the first ({})",
                specifier, first
            ),
        );
    } else {
        *slot = Some(specifier);
    }
}
