//! The node-modification algorithm: builds a new node from a target and a
//! patch body, never mutating the target. Keys in the body carry a leading
//! command sigil, a trailing operator sigil, and an optional `,N`/`,*`
//! duplicate selector; the same rules apply recursively to child nodes.

use std::rc::Rc;

use regex::Regex;

use crate::node::Node;
use crate::path_stack::NodePath;
use crate::report::{PatchSource, Report};
use crate::sigil::{Command, Index, Operator};

/// Produces the modified copy of `target` according to `body`. `path` is the
/// dotted context of `target` itself, so failures carry the full path from
/// the patch's root.
pub fn modify_node(
    target: &Node,
    body: &Node,
    path: &NodePath,
    source: &PatchSource,
    report: &Report,
) -> Node {
    let mut out = target.clone();

    for (raw_key, operand) in body.values() {
        apply_value_directive(&mut out, raw_key, operand, path, source, report);
    }

    for directive in body.children() {
        apply_child_directive(&mut out, directive, path, source, report);
    }

    out
}

fn apply_value_directive(
    out: &mut Node,
    raw_key: &str,
    operand: &str,
    path: &NodePath,
    source: &PatchSource,
    report: &Report,
) {
    let (command, rest) = Command::classify(raw_key);

    if command == Command::Special {
        report.warning(
            Some(source),
            format_args!(
                "unrecognized special directive `{}` at {}",
                rest,
                path.dotted()
            ),
        );
        return;
    }

    let (operator, rest) = Operator::classify(rest);
    let (key, index) = Index::classify(rest);
    let key = key.to_owned();

    let values = out.values_mut();
    let positions: Vec<usize> = values
        .iter()
        .enumerate()
        .filter(|(_, (k, _))| k == &key)
        .map(|(i, _)| i)
        .collect();
    let selected = index.select(&positions);

    match command {
        Command::Insert | Command::Edit => {
            if selected.is_empty() {
                if command == Command::Insert
                    && operator == Operator::Assign
                    && positions.is_empty()
                {
                    values.push((key, operand.to_owned()));
                } else {
                    report.failure(
                        Some(source),
                        format_args!(
                            "no value `{}` to {} at {}",
                            key,
                            operator,
                            path.dotted()
                        ),
                    );
                }
                return;
            }
            for &i in &selected {
                let current = values[i].1.clone();
                if let Some(new) =
                    apply_operator(operator, &current, operand, &key, path, source, report)
                {
                    values[i].1 = new;
                }
            }
        }
        Command::Delete => {
            for &i in selected.iter().rev() {
                values.remove(i);
            }
        }
        Command::Copy => {
            if selected.is_empty() {
                report.failure(
                    Some(source),
                    format_args!("no value `{}` to copy at {}", key, path.dotted()),
                );
                return;
            }
            for &i in selected.iter().rev() {
                let current = values[i].1.clone();
                if let Some(new) =
                    apply_operator(operator, &current, operand, &key, path, source, report)
                {
                    values.insert(i + 1, (key.clone(), new));
                }
            }
        }
        Command::Replace => {
            values.retain(|(k, _)| k != &key);
            values.push((key, operand.to_owned()));
        }
        Command::Create => {
            values.push((key, operand.to_owned()));
        }
        Command::Rename => {
            if selected.is_empty() {
                report.failure(
                    Some(source),
                    format_args!("no value `{}` to rename at {}", key, path.dotted()),
                );
                return;
            }
            for &i in &selected {
                values[i].0 = operand.to_owned();
            }
        }
        Command::Paste => match selected.first() {
            Some(&i) => values.insert(i, (key, operand.to_owned())),
            None => values.push((key, operand.to_owned())),
        },
        Command::Special => unreachable!("handled above"),
    }
}

fn apply_child_directive(
    out: &mut Node,
    directive: &Node,
    path: &NodePath,
    source: &PatchSource,
    report: &Report,
) {
    let (command, rest) = Command::classify(directive.name());

    if command == Command::Insert {
        // A plain child is appended verbatim; there is nothing to select.
        out.children_mut().push(directive.clone());
        return;
    }

    if command == Command::Special {
        report.warning(
            Some(source),
            format_args!(
                "unrecognized special directive `{}` at {}",
                rest,
                path.dotted()
            ),
        );
        return;
    }

    let (name, index) = Index::classify(rest);
    let name = name.to_owned();

    let positions: Vec<usize> = out
        .children()
        .iter()
        .enumerate()
        .filter(|(_, child)| child.name() == name)
        .map(|(i, _)| i)
        .collect();
    let selected = index.select(&positions);

    match command {
        Command::Edit => {
            if selected.is_empty() {
                report.failure(
                    Some(source),
                    format_args!("no child `{}` to edit at {}", name, path.dotted()),
                );
                return;
            }
            for &i in &selected {
                let child_path = path.push(Rc::from(name.as_str()));
                let new_child =
                    modify_node(&out.children()[i], directive, &child_path, source, report);
                out.children_mut()[i] = new_child;
            }
        }
        Command::Delete => {
            for &i in selected.iter().rev() {
                out.children_mut().remove(i);
            }
        }
        Command::Copy => {
            if selected.is_empty() {
                report.failure(
                    Some(source),
                    format_args!("no child `{}` to copy at {}", name, path.dotted()),
                );
                return;
            }
            for &i in selected.iter().rev() {
                let child_path = path.push(Rc::from(name.as_str()));
                let duplicate =
                    modify_node(&out.children()[i], directive, &child_path, source, report);
                out.children_mut().insert(i + 1, duplicate);
            }
        }
        Command::Replace => {
            if selected.is_empty() {
                report.failure(
                    Some(source),
                    format_args!("no child `{}` to replace at {}", name, path.dotted()),
                );
                return;
            }
            for &i in &selected {
                let mut copy = directive.clone();
                copy.set_name(&name);
                out.children_mut()[i] = copy;
            }
        }
        Command::Create => {
            if positions.is_empty() {
                let mut copy = directive.clone();
                copy.set_name(&name);
                out.children_mut().push(copy);
            }
        }
        Command::Paste => {
            let mut copy = directive.clone();
            copy.set_name(&name);
            match selected.first() {
                Some(&i) => out.children_mut().insert(i, copy),
                None => out.children_mut().push(copy),
            }
        }
        Command::Rename => {
            report.failure(
                Some(source),
                format_args!(
                    "rename is not valid for child nodes (`{}` at {})",
                    name,
                    path.dotted()
                ),
            );
        }
        Command::Insert | Command::Special => unreachable!("handled above"),
    }
}

fn apply_operator(
    operator: Operator,
    current: &str,
    operand: &str,
    key: &str,
    path: &NodePath,
    source: &PatchSource,
    report: &Report,
) -> Option<String> {
    match operator {
        Operator::Assign => Some(operand.to_owned()),

        Operator::RegexReplace => {
            let (pattern, replacement) = match operand.split_once('/') {
                Some(parts) => parts,
                None => {
                    report.failure(
                        Some(source),
                        format_args!(
                            "regex operand for `{}` must be `pattern/replacement` at {}",
                            key,
                            path.dotted()
                        ),
                    );
                    return None;
                }
            };
            match Regex::new(pattern) {
                Ok(regex) => Some(regex.replace_all(current, replacement).into_owned()),
                Err(err) => {
                    report.failure(
                        Some(source),
                        format_args!("invalid regex for `{}` at {}: {}", key, path.dotted(), err),
                    );
                    None
                }
            }
        }

        _ => {
            let current_number: f64 = match current.trim().parse() {
                Ok(n) => n,
                Err(_) => {
                    report.failure(
                        Some(source),
                        format_args!(
                            "value `{}` of `{}` at {} is not numeric",
                            current,
                            key,
                            path.dotted()
                        ),
                    );
                    return None;
                }
            };
            let operand_number: f64 = match operand.trim().parse() {
                Ok(n) => n,
                Err(_) => {
                    report.failure(
                        Some(source),
                        format_args!(
                            "operand `{}` for `{}` at {} is not numeric",
                            operand,
                            key,
                            path.dotted()
                        ),
                    );
                    return None;
                }
            };

            let result = match operator {
                Operator::Add => current_number + operand_number,
                Operator::Subtract => current_number - operand_number,
                Operator::Multiply => current_number * operand_number,
                Operator::Divide => current_number / operand_number,
                Operator::Exponentiate => current_number.powf(operand_number),
                _ => unreachable!(),
            };

            if !result.is_finite() {
                report.failure(
                    Some(source),
                    format_args!(
                        "{} on `{}` at {} has no finite result",
                        operator,
                        key,
                        path.dotted()
                    ),
                );
                return None;
            }

            Some(format_number(result))
        }
    }
}

fn format_number(value: f64) -> String {
    // f64's Display prints integral values without a fraction.
    format!("{}", value)
}
