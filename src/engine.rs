//! The extraction-then-apply pipeline: turns a forest of host-supplied
//! source trees into a scheduled patch list, then executes it pass by pass
//! against a working forest. Single-threaded and free of I/O; nothing here
//! may abort the overall run.

use std::rc::Rc;
use std::sync::Arc;

use anyhow::bail;

use crate::needs::{DirectoryProvider, NeedsChecker};
use crate::node::{Node, SourceTree};
use crate::patch::{PatchList, ProtoPatch};
use crate::path_stack::NodePath;
use crate::report::{CounterSnapshot, PatchSource, Report};
use crate::sigil::Command;
use crate::tag::{brackets_balanced, parse_tag_list};

/// The result of one pipeline run: the final forest plus a snapshot of the
/// aggregate counters at completion.
#[derive(Debug)]
pub struct Outcome {
    pub forest: Vec<Node>,
    pub counters: CounterSnapshot,
}

impl Outcome {
    /// Driver-level strictness hook: the engine itself never fails, but a
    /// host may decide accumulated errors should fail the overall process.
    pub fn ensure_clean(self) -> anyhow::Result<Vec<Node>> {
        let problems = self.counters.errors + self.counters.failures;
        if problems > 0 {
            bail!(
                "patching finished with {} errors ({} of them during application)",
                problems,
                self.counters.failures
            );
        }
        Ok(self.forest)
    }
}

pub struct Engine<D> {
    mods: Vec<String>,
    needs: NeedsChecker<D>,
    report: Arc<Report>,
}

impl<D: DirectoryProvider> Engine<D> {
    /// `mods` is the full set of capability names, in declaration order; the
    /// order fixes the pass sequence.
    pub fn new(mods: Vec<String>, dirs: D) -> Self {
        let needs = NeedsChecker::new(&mods, dirs);
        Engine {
            mods,
            needs,
            report: Arc::new(Report::new()),
        }
    }

    /// The shared progress object. Counters stay readable from other threads
    /// while a run is in progress.
    pub fn report(&self) -> Arc<Report> {
        Arc::clone(&self.report)
    }

    /// Runs the whole pipeline once, start to finish. The working forest
    /// starts empty and is populated by the `INSERT` pass.
    pub fn run(&self, sources: Vec<SourceTree>) -> Outcome {
        let mut list = PatchList::new(self.mods.clone());

        for tree in &sources {
            self.extract(tree, &mut list);
        }

        let passes = list.into_passes();
        log::info!(
            "{} patches scheduled across {} passes",
            self.report.snapshot().total_patches,
            passes.len()
        );

        let mut forest = Vec::new();
        for pass in &passes {
            log::debug!("running pass {} ({} patches)", pass.name, pass.patches.len());
            for patch in &pass.patches {
                patch.apply(&mut forest, &self.report);
            }
        }

        Outcome {
            forest,
            counters: self.report.snapshot(),
        }
    }

    fn extract(&self, tree: &SourceTree, list: &mut PatchList) {
        let source = Arc::new(PatchSource::new(&tree.mod_name, &tree.path));
        let raw_name = tree.root.name();

        if !brackets_balanced(raw_name) {
            self.report.error(
                Some(source.as_ref()),
                format_args!(
                    "`{}`: brackets not balanced, or use `?` instead of a literal space",
                    raw_name
                ),
            );
            return;
        }

        let (command, rest) = Command::classify(raw_name);
        if !command.valid_at_root() {
            self.report.error(
                Some(source.as_ref()),
                format_args!("`{}`: {} is not valid on a root node", raw_name, command),
            );
            return;
        }

        let tags = match parse_tag_list(rest, &self.report) {
            Ok(tags) => tags,
            Err(err) => {
                self.report
                    .error(Some(source.as_ref()), format_args!("`{}`: {}", raw_name, err));
                return;
            }
        };

        // The body is always pruned, whatever becomes of the patch itself.
        let mut body = tree.root.clone();
        let path = NodePath::new().push(Rc::from(tags.primary.key.as_str()));
        self.needs.prune(&mut body, &path, &self.report);

        let proto = match ProtoPatch::build(source, command, tags, body, &self.report) {
            Some(proto) => proto,
            None => return,
        };

        if let Some(expression) = &proto.needs {
            match self.needs.check_expression(expression) {
                Ok(true) => {}
                Ok(false) => {
                    self.report
                        .needs_unsatisfied(&format!("{} (root)", path.dotted()));
                    return;
                }
                Err(err) => {
                    self.report.error(
                        Some(proto.source.as_ref()),
                        format_args!("`{}`: {}", expression, err),
                    );
                    return;
                }
            }
        }

        if !proto.pass.needs_satisfied(&self.needs, &self.report) {
            return;
        }

        if let Some(patch) = proto.compile(&self.report) {
            if list.place(patch, &self.report) {
                self.report.patch_scheduled();
            }
        }
    }
}
