//! Per-system knowledge: reading working-copy metadata and aligning
//! local directories with repository paths.

pub mod git_remote;
pub mod hgrc;
pub mod identity;
pub mod path_align;
pub mod svn_info;
