//! Managed marker blocks in hash-commented text files.
//!
//! A block is a region owned by the agent inside a file that is otherwise
//! edited by people, delimited by two fixed comment lines:
//!
//! ```text
//! # BEGIN composition:managed-packages
//! /wp-content/plugins/foo/
//! # END composition:managed-packages
//! ```
//!
//! Everything outside the markers is preserved byte for byte.

pub mod error;
pub mod file;
pub mod parser;
pub mod writer;

pub use error::{Error, Result};
pub use file::sync_block_in_file;
pub use parser::{Block, find_block, has_block, parse_blocks};
pub use writer::{insert_block, remove_block, update_block, upsert_block};
