//! The patch subsystem: validated patch descriptors, the deterministic pass
//! schedule, and the algorithms that compile and apply patches to the
//! working forest.
//!
//! Proto-patches and compiled patches are created once during extraction and
//! are immutable afterwards; only the working forest mutates, one pass at a
//! time, always by swapping freshly built nodes into place by position.

mod apply;
mod modify;
mod pass;
mod proto;


pub use apply::{Patch, PatchOp, PATCH_LOOP_MARKER};
pub use modify::modify_node;
pub use pass::{Pass, PassSpecifier, PatchList};
pub use proto::ProtoPatch;
