//! A declarative tree-patching engine. Hosts contribute a forest of ordered,
//! loosely-typed configuration trees; patch directives encoded in node names
//! (a compact tag syntax with command and operator sigils) mutate that forest
//! across a fixed sequence of deterministic passes, so patch authors can
//! depend on, precede, or follow each other's contributions without a
//! central build step.

mod engine;
mod glob;
mod matcher;
mod needs;
mod node;
mod patch;
mod path_stack;
mod report;
mod sigil;
mod tag;
mod worker;

pub use crate::engine::{Engine, Outcome};
pub use crate::glob::NamePattern;
pub use crate::matcher::{MatcherError, NodeMatcher};
pub use crate::needs::{
    DirectoryProvider, MemoryDirectories, NeedsChecker, NeedsError, NoopDirectories,
};
pub use crate::node::{Node, SourceTree, NAME_KEY};
pub use crate::patch::{
    modify_node, Pass, PassSpecifier, Patch, PatchList, PatchOp, ProtoPatch, PATCH_LOOP_MARKER,
};
pub use crate::path_stack::{ImmutableStack, NodePath};
pub use crate::report::{CounterSnapshot, FileTally, PatchSource, Report};
pub use crate::sigil::{Command, Index, Operator};
pub use crate::tag::{brackets_balanced, parse_tag_list, Tag, TagError, TagList};
pub use crate::worker::PipelineWorker;
