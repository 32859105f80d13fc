//! Pass specifiers and the deterministic pass schedule every collected patch
//! is placed into.

use std::collections::HashMap;
use std::fmt;

use crate::needs::{DirectoryProvider, NeedsChecker};
use crate::report::Report;

use super::apply::Patch;

/// Where in the global pass order a patch belongs. `Insert` is implicit for
/// non-patch nodes; `Legacy` is the historical no-explicit-specifier bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassSpecifier {
    Insert,
    Legacy,
    First,
    Before(String),
    For(String),
    After(String),
    Last(String),
    Final,
}

impl PassSpecifier {
    /// Before/For/After name a mod they depend on; a patch whose specifier
    /// names an unknown mod is dropped, with the specifier reporting its own
    /// event. All other specifiers carry no needs of their own.
    pub fn needs_satisfied<D: DirectoryProvider>(
        &self,
        needs: &NeedsChecker<D>,
        report: &Report,
    ) -> bool {
        let mod_name = match self {
            PassSpecifier::Before(m) | PassSpecifier::For(m) | PassSpecifier::After(m) => m,
            _ => return true,
        };

        match needs.check(mod_name) {
            Ok(true) => true,
            Ok(false) => {
                report.needs_unsatisfied(&format!("pass specifier {}", self));
                false
            }
            Err(err) => {
                report.error(None, format_args!("pass specifier {}: {}", self, err));
                false
            }
        }
    }
}

impl fmt::Display for PassSpecifier {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PassSpecifier::Insert => formatter.write_str("INSERT"),
            PassSpecifier::Legacy => formatter.write_str("LEGACY"),
            PassSpecifier::First => formatter.write_str("FIRST"),
            PassSpecifier::Before(m) => write!(formatter, "BEFORE[{}]", m),
            PassSpecifier::For(m) => write!(formatter, "FOR[{}]", m),
            PassSpecifier::After(m) => write!(formatter, "AFTER[{}]", m),
            PassSpecifier::Last(m) => write!(formatter, "LAST[{}]", m),
            PassSpecifier::Final => formatter.write_str("FINAL"),
        }
    }
}

/// A named bucket of patches that runs to completion before the next one
/// starts.
#[derive(Debug)]
pub struct Pass {
    pub name: String,
    pub patches: Vec<Patch>,
}

/// Collects every compiled patch into its bucket, then flattens the buckets
/// into the fixed pass sequence: `INSERT`, then `BEFORE[m]`/`FOR[m]`/
/// `AFTER[m]` per declared mod in declaration order, then `LAST[m]` per
/// referenced mod in first-reference order, then `FINAL`.
///
/// First patches run at the tail of the `INSERT` pass; Legacy patches run in
/// their contributing mod's `FOR[m]` pass ahead of explicitly-tagged ones.
#[derive(Debug)]
pub struct PatchList {
    mods: Vec<String>,
    insert: Vec<Patch>,
    first: Vec<Patch>,
    before: HashMap<String, Vec<Patch>>,
    legacy: HashMap<String, Vec<Patch>>,
    explicit_for: HashMap<String, Vec<Patch>>,
    after: HashMap<String, Vec<Patch>>,
    last: Vec<(String, Vec<Patch>)>,
    last_pass: Vec<Patch>,
}

impl PatchList {
    pub fn new(mods: Vec<String>) -> Self {
        let empty_buckets = || {
            mods.iter()
                .map(|m| (m.to_ascii_lowercase(), Vec::new()))
                .collect::<HashMap<_, _>>()
        };

        PatchList {
            before: empty_buckets(),
            legacy: empty_buckets(),
            explicit_for: empty_buckets(),
            after: empty_buckets(),
            mods,
            insert: Vec::new(),
            first: Vec::new(),
            last: Vec::new(),
            last_pass: Vec::new(),
        }
    }

    /// Places a patch into its bucket. Returns false (and reports an error)
    /// when the resolved bucket does not exist: a Legacy patch from an
    /// undeclared source mod, or a specifier naming an undeclared mod.
    pub fn place(&mut self, patch: Patch, report: &Report) -> bool {
        match patch.pass.clone() {
            PassSpecifier::Insert => self.insert.push(patch),
            PassSpecifier::First => self.first.push(patch),
            PassSpecifier::Final => self.last_pass.push(patch),
            PassSpecifier::Legacy => {
                let key = patch.source.mod_name.to_ascii_lowercase();
                match self.legacy.get_mut(&key) {
                    Some(bucket) => bucket.push(patch),
                    None => {
                        report.error(
                            Some(patch.source.as_ref()),
                            format_args!("mod `{}` is not declared", patch.source.mod_name),
                        );
                        return false;
                    }
                }
            }
            PassSpecifier::Before(m) => {
                return place_in_mod_bucket(&mut self.before, patch, &m, report);
            }
            PassSpecifier::For(m) => {
                return place_in_mod_bucket(&mut self.explicit_for, patch, &m, report);
            }
            PassSpecifier::After(m) => {
                return place_in_mod_bucket(&mut self.after, patch, &m, report);
            }
            PassSpecifier::Last(m) => {
                let key = m.to_ascii_lowercase();
                match self.last.iter_mut().find(|(k, _)| *k == key) {
                    Some((_, bucket)) => bucket.push(patch),
                    None => self.last.push((key, vec![patch])),
                }
            }
        }

        true
    }

    /// Flattens the buckets into the executable pass sequence. Every
    /// declared mod contributes its three passes even when empty, so the
    /// total pass count is `1 + 3N + L + 1`.
    pub fn into_passes(mut self) -> Vec<Pass> {
        let mut passes = Vec::with_capacity(2 + 3 * self.mods.len() + self.last.len());

        let mut insert = self.insert;
        insert.append(&mut self.first);
        passes.push(Pass {
            name: "INSERT".to_owned(),
            patches: insert,
        });

        for mod_name in &self.mods {
            let key = mod_name.to_ascii_lowercase();

            passes.push(Pass {
                name: format!("BEFORE[{}]", mod_name),
                patches: self.before.remove(&key).unwrap_or_default(),
            });

            let mut for_patches = self.legacy.remove(&key).unwrap_or_default();
            for_patches.append(&mut self.explicit_for.remove(&key).unwrap_or_default());
            passes.push(Pass {
                name: format!("FOR[{}]", mod_name),
                patches: for_patches,
            });

            passes.push(Pass {
                name: format!("AFTER[{}]", mod_name),
                patches: self.after.remove(&key).unwrap_or_default(),
            });
        }

        for (mod_name, patches) in self.last {
            passes.push(Pass {
                name: format!("LAST[{}]", mod_name),
                patches,
            });
        }

        passes.push(Pass {
            name: "FINAL".to_owned(),
            patches: self.last_pass,
        });

        passes
    }
}

fn place_in_mod_bucket(
    buckets: &mut HashMap<String, Vec<Patch>>,
    patch: Patch,
    mod_name: &str,
    report: &Report,
) -> bool {
    match buckets.get_mut(&mod_name.to_ascii_lowercase()) {
        Some(bucket) => {
            bucket.push(patch);
            true
        }
        None => {
            report.error(
                Some(patch.source.as_ref()),
                format_args!("pass specifier {} names an undeclared mod", patch.pass),
            );
            false
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use super::super::apply::{Patch, PatchOp};
    use super::*;
    use crate::matcher::NodeMatcher;
    use crate::report::PatchSource;

    fn patch(mod_name: &str, pass: PassSpecifier) -> Patch {
        Patch {
            source: Arc::new(PatchSource::new(mod_name, format!("{}/file.txt", mod_name))),
            pass,
            op: PatchOp::Delete {
                matcher: NodeMatcher::new("NODE", None, None).unwrap(),
            },
        }
    }

    fn mods(names: &[&str]) -> Vec<String> {
        names.iter().map(|m| (*m).to_owned()).collect()
    }

    #[test]
    fn pass_count_formula() {
        let _ = env_logger::try_init();
        let report = Report::new();

        // N = 2 declared mods, L = 1 distinct Last mod.
        let mut list = PatchList::new(mods(&["mod1", "mod2"]));
        assert!(list.place(patch("mod1", PassSpecifier::Insert), &report));
        assert!(list.place(patch("mod1", PassSpecifier::Last("mod2".to_owned())), &report));
        assert!(list.place(patch("mod2", PassSpecifier::Last("MOD2".to_owned())), &report));

        let passes = list.into_passes();
        assert_eq!(passes.len(), 1 + 3 * 2 + 1 + 1);

        let names: Vec<&str> = passes.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "INSERT",
                "BEFORE[mod1]",
                "FOR[mod1]",
                "AFTER[mod1]",
                "BEFORE[mod2]",
                "FOR[mod2]",
                "AFTER[mod2]",
                "LAST[mod2]",
                "FINAL",
            ]
        );
        assert_eq!(passes[7].patches.len(), 2);
    }

    #[test]
    fn legacy_runs_before_explicit_for() {
        let _ = env_logger::try_init();
        let report = Report::new();

        let mut list = PatchList::new(mods(&["mod1"]));
        assert!(list.place(patch("mod1", PassSpecifier::For("mod1".to_owned())), &report));
        assert!(list.place(patch("mod1", PassSpecifier::Legacy), &report));

        let passes = list.into_passes();
        let for_pass = &passes[2];
        assert_eq!(for_pass.name, "FOR[mod1]");
        assert_eq!(for_pass.patches.len(), 2);
        assert_eq!(for_pass.patches[0].pass, PassSpecifier::Legacy);
        assert_eq!(
            for_pass.patches[1].pass,
            PassSpecifier::For("mod1".to_owned())
        );
    }

    #[test]
    fn first_runs_in_the_insert_pass_after_inserts() {
        let _ = env_logger::try_init();
        let report = Report::new();

        let mut list = PatchList::new(mods(&["mod1"]));
        assert!(list.place(patch("mod1", PassSpecifier::First), &report));
        assert!(list.place(patch("mod1", PassSpecifier::Insert), &report));

        let passes = list.into_passes();
        assert_eq!(passes[0].name, "INSERT");
        assert_eq!(passes[0].patches[0].pass, PassSpecifier::Insert);
        assert_eq!(passes[0].patches[1].pass, PassSpecifier::First);
    }

    #[test]
    fn undeclared_buckets_are_dropped() {
        let _ = env_logger::try_init();
        let report = Report::new();

        let mut list = PatchList::new(mods(&["mod1"]));
        assert!(!list.place(patch("ghost", PassSpecifier::Legacy), &report));
        assert!(!list.place(patch("mod1", PassSpecifier::Before("ghost".to_owned())), &report));
        assert_eq!(report.snapshot().errors, 2);
    }

    #[test]
    fn specifier_needs() {
        use crate::needs::{NeedsChecker, NoopDirectories};

        let _ = env_logger::try_init();
        let report = Report::new();
        let needs = NeedsChecker::new(&mods(&["mod1"]), NoopDirectories);

        assert!(PassSpecifier::Before("MOD1".to_owned()).needs_satisfied(&needs, &report));
        assert!(!PassSpecifier::For("mod9".to_owned()).needs_satisfied(&needs, &report));
        assert!(PassSpecifier::Last("mod9".to_owned()).needs_satisfied(&needs, &report));
        assert!(PassSpecifier::Final.needs_satisfied(&needs, &report));
        assert_eq!(report.snapshot().needs_unsatisfied, 1);
    }

    #[test]
    fn specifier_display() {
        assert_eq!(PassSpecifier::Insert.to_string(), "INSERT");
        assert_eq!(
            PassSpecifier::Before("mod1".to_owned()).to_string(),
            "BEFORE[mod1]"
        );
        assert_eq!(
            PassSpecifier::Last("mod1".to_owned()).to_string(),
            "LAST[mod1]"
        );
    }
}
