//! Shared test utilities for the composition workspace.
//!
//! Dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`git`] — git repository fixtures, including a working clone wired to a
//!   bare `origin`
//! - [`site`] — [`site::TestSite`] builder for WordPress site trees, manifests
//!   and lock files

pub mod git;
pub mod site;
