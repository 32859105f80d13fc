//! The capability ("needs") expression evaluator: boolean formulas over mod
//! names and host directory paths, used to gate whole patches and to prune
//! values and subtrees carrying `:NEEDS[...]` suffixes.
//!
//! The grammar is deliberately flat: `|` (OR) over `&`/`,` (AND, synonymous)
//! over an optional `!` per atom. There is no parenthesization.

use std::collections::HashSet;
use std::rc::Rc;

use thiserror::Error;

use crate::node::Node;
use crate::path_stack::NodePath;
use crate::report::Report;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NeedsError {
    #[error("empty needs token")]
    EmptyToken,

    #[error("empty needs expression")]
    EmptyExpression,
}

/// Host-side directory existence queries. Mod tokens are matched
/// case-insensitively against the declared set; directory tokens are handed
/// to the host as written (the lookup is case-sensitive).
pub trait DirectoryProvider {
    /// `path` has its leading/trailing slashes stripped, e.g. `mod/2`.
    fn dir_exists(&self, path: &str) -> bool;
}

/// A provider with no directories at all.
pub struct NoopDirectories;

impl DirectoryProvider for NoopDirectories {
    fn dir_exists(&self, _path: &str) -> bool {
        false
    }
}

/// A set-backed provider for tests and simple hosts.
#[derive(Debug, Default)]
pub struct MemoryDirectories {
    dirs: HashSet<String>,
}

impl MemoryDirectories {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, path: impl Into<String>) {
        let path = path.into();
        self.dirs.insert(path.trim_matches('/').to_owned());
    }
}

impl DirectoryProvider for MemoryDirectories {
    fn dir_exists(&self, path: &str) -> bool {
        self.dirs.contains(path)
    }
}

pub struct NeedsChecker<D> {
    known_mods: HashSet<String>,
    dirs: D,
}

impl<D: DirectoryProvider> NeedsChecker<D> {
    pub fn new(mods: &[String], dirs: D) -> Self {
        NeedsChecker {
            known_mods: mods.iter().map(|m| m.to_ascii_lowercase()).collect(),
            dirs,
        }
    }

    /// The primitive single-token check: a bare mod name, or a `/`-delimited
    /// directory path that must exist on the host.
    pub fn check(&self, token: &str) -> Result<bool, NeedsError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(NeedsError::EmptyToken);
        }

        if token.contains('/') {
            Ok(self.dirs.dir_exists(token.trim_matches('/')))
        } else {
            Ok(self.known_mods.contains(&token.to_ascii_lowercase()))
        }
    }

    /// Evaluates a full needs expression: OR of AND of optionally-negated
    /// atoms, AND binding tighter, left to right.
    pub fn check_expression(&self, expression: &str) -> Result<bool, NeedsError> {
        if expression.trim().is_empty() {
            return Err(NeedsError::EmptyExpression);
        }

        for group in expression.split('|') {
            let mut all = true;
            for atom in group.split(|c| c == '&' || c == ',') {
                let atom = atom.trim();
                let (negated, token) = match atom.strip_prefix('!') {
                    Some(rest) => (true, rest),
                    None => (false, atom),
                };
                if self.check(token)? == negated {
                    all = false;
                }
            }
            if all {
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// Walks `node` depth-first, removing every value and child whose
    /// `:NEEDS[expr]` suffix evaluates false (preserving the order of the
    /// survivors) and stripping the suffix from those that stay. This is the
    /// one in-place mutation in the engine; it runs on a uniquely-owned
    /// working copy before the node is published.
    ///
    /// `path` is the dotted context of `node` itself; removal events carry
    /// the full path of the removed entry. Running this on an already-pruned
    /// node is a no-op.
    pub fn prune(&self, node: &mut Node, path: &NodePath, report: &Report) {
        let values = node.values_mut();
        let mut i = 0;
        while i < values.len() {
            let split = split_needs_suffix(&values[i].0)
                .map(|(base, expr)| (base.to_owned(), expr.to_owned()));
            match split {
                Some((base, expr)) => match self.check_expression(&expr) {
                    Ok(true) => {
                        values[i].0 = base;
                        i += 1;
                    }
                    Ok(false) => {
                        report.needs_unsatisfied(&path.dotted_child(&base));
                        values.remove(i);
                    }
                    Err(err) => {
                        report.error(None, format_args!("{}: {}", path.dotted_child(&base), err));
                        values[i].0 = base;
                        i += 1;
                    }
                },
                None => i += 1,
            }
        }

        let children = node.children_mut();
        let mut i = 0;
        while i < children.len() {
            let split = split_needs_suffix(children[i].name())
                .map(|(base, expr)| (base.to_owned(), expr.to_owned()));
            if let Some((base, expr)) = split {
                match self.check_expression(&expr) {
                    Ok(true) => children[i].set_name(&base),
                    Ok(false) => {
                        report.needs_unsatisfied(&path.dotted_child(&base));
                        children.remove(i);
                        continue;
                    }
                    Err(err) => {
                        report.error(None, format_args!("{}: {}", path.dotted_child(&base), err));
                        children[i].set_name(&base);
                    }
                }
            }

            let child_path = path.push(Rc::from(children[i].name()));
            self.prune(&mut children[i], &child_path, report);
            i += 1;
        }
    }
}

/// Splits a trailing `:NEEDS[expr]` suffix (case-insensitive key) off a name,
/// returning the base name and the expression. The suffix must close at the
/// very end of the name.
fn split_needs_suffix(name: &str) -> Option<(&str, &str)> {
    if !name.ends_with(']') {
        return None;
    }

    let lowered = name.to_ascii_lowercase();
    let start = lowered.rfind(":needs[")?;
    let expr_start = start + ":needs[".len();

    // The opening bracket must be the one closed by the final character.
    let mut depth = 0;
    for (i, c) in name[expr_start..].char_indices() {
        match c {
            '[' => depth += 1,
            ']' => {
                if depth == 0 {
                    if expr_start + i == name.len() - 1 {
                        return Some((&name[..start], &name[expr_start..name.len() - 1]));
                    }
                    return None;
                }
                depth -= 1;
            }
            _ => {}
        }
    }

    None
}
