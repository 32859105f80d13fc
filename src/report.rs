//! The shared progress object threaded through the pipeline: discrete events
//! go out through the `log` facade, aggregate counters are plain atomics so
//! the one worker thread can write them while any other thread reads.

use std::{
    collections::HashMap,
    fmt,
    path::PathBuf,
    sync::{
        atomic::{AtomicU64, Ordering},
        Mutex,
    },
};

use serde::Serialize;

/// Where a patch came from, for diagnostics and per-file tallies.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatchSource {
    pub mod_name: String,
    pub path: PathBuf,
}

impl PatchSource {
    pub fn new(mod_name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        PatchSource {
            mod_name: mod_name.into(),
            path: path.into(),
        }
    }
}

impl fmt::Display for PatchSource {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "{} ({})", self.path.display(), self.mod_name)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FileTally {
    pub errors: u64,
    pub warnings: u64,
}

/// A point-in-time copy of the aggregate counters.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct CounterSnapshot {
    pub total_patches: u64,
    pub applied_patches: u64,
    pub patched_nodes: u64,
    pub warnings: u64,
    pub errors: u64,
    pub failures: u64,
    pub needs_unsatisfied: u64,
}

#[derive(Debug, Default)]
pub struct Report {
    total_patches: AtomicU64,
    applied_patches: AtomicU64,
    patched_nodes: AtomicU64,
    warnings: AtomicU64,
    errors: AtomicU64,
    failures: AtomicU64,
    needs_unsatisfied: AtomicU64,
    per_file: Mutex<HashMap<PathBuf, FileTally>>,
}

impl Report {
    pub fn new() -> Self {
        Report::default()
    }

    pub fn warning(&self, source: Option<&PatchSource>, message: impl fmt::Display) {
        match source {
            Some(source) => log::warn!("{}: {}", source, message),
            None => log::warn!("{}", message),
        }
        self.warnings.fetch_add(1, Ordering::Relaxed);
        if let Some(source) = source {
            self.bump_file(source, false);
        }
    }

    pub fn error(&self, source: Option<&PatchSource>, message: impl fmt::Display) {
        match source {
            Some(source) => log::error!("{}: {}", source, message),
            None => log::error!("{}", message),
        }
        self.errors.fetch_add(1, Ordering::Relaxed);
        if let Some(source) = source {
            self.bump_file(source, true);
        }
    }

    /// A per-node/per-entry failure caught during patch application. The
    /// patch keeps running against its remaining matches.
    pub fn failure(&self, source: Option<&PatchSource>, message: impl fmt::Display) {
        match source {
            Some(source) => log::error!("{}: {}", source, message),
            None => log::error!("{}", message),
        }
        self.failures.fetch_add(1, Ordering::Relaxed);
        if let Some(source) = source {
            self.bump_file(source, true);
        }
    }

    /// An expected, info-level outcome: a needs expression gated out a value,
    /// child, or whole candidate patch at the given dotted path.
    pub fn needs_unsatisfied(&self, path: &str) {
        log::info!("needs unsatisfied: {}", path);
        self.needs_unsatisfied.fetch_add(1, Ordering::Relaxed);
    }

    /// A progress event for one affected node.
    pub fn applying(&self, verb: impl fmt::Display, path: &str) {
        log::info!("applying {} to {}", verb, path);
        self.patched_nodes.fetch_add(1, Ordering::Relaxed);
    }

    /// A patch survived validation and was scheduled into a pass.
    pub fn patch_scheduled(&self) {
        self.total_patches.fetch_add(1, Ordering::Relaxed);
    }

    /// A patch affected at least one node during its pass.
    pub fn patch_applied(&self) {
        self.applied_patches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            total_patches: self.total_patches.load(Ordering::Relaxed),
            applied_patches: self.applied_patches.load(Ordering::Relaxed),
            patched_nodes: self.patched_nodes.load(Ordering::Relaxed),
            warnings: self.warnings.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            needs_unsatisfied: self.needs_unsatisfied.load(Ordering::Relaxed),
        }
    }

    pub fn file_tallies(&self) -> HashMap<PathBuf, FileTally> {
        self.per_file.lock().unwrap().clone()
    }

    fn bump_file(&self, source: &PatchSource, is_error: bool) {
        let mut per_file = self.per_file.lock().unwrap();
        let tally = per_file.entry(source.path.clone()).or_default();
        if is_error {
            tally.errors += 1;
        } else {
            tally.warnings += 1;
        }
    }
}
