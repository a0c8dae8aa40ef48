//! mvc runs a version control command, such as `status` or `pull`, on a
//! set of CVS/Git/Hg/SVN checkouts rather than just one.
//!
//! Checkouts come from two sources: a `.mvc-checkouts` file listing
//! them per repository root, and an optional filesystem search for the
//! metadata directories (`.git`, `.hg`, `.svn`, `CVS`, `.bzr`) that
//! mark working copies. The two sources are merged and deduplicated on
//! the identity (repository type, canonical directory, module), then an
//! action runs the right commands per system and rewrites their output
//! into a terse, directory-qualified stream.

pub mod application;
pub mod common;
pub mod domain;
pub mod infrastructure;
pub mod presentation;

pub use common::error::MvcError;
pub use common::result::MvcResult;
