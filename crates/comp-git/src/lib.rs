//! Git porcelain wrapper for the composition agent
//!
//! Mutating operations shell out to the system `git` binary and parse its
//! porcelain output; read-only lookups (discovery, current branch, upstream)
//! go through `git2`. Nothing here reimplements Git internals.

pub mod command;
pub mod error;
pub mod merge;
pub mod repo;
pub mod status;

pub use command::{GitCommand, GitOutput};
pub use error::{Error, Result};
pub use merge::{MergeOutcome, Resolution, ResolutionNote, aside_branch_name, merge_accept_mine};
pub use repo::{GitRepo, Upstream};
pub use status::{ChangeKind, ConflictState, StatusEntry, parse_porcelain};
