//! Infrastructure: configuration parsing, filesystem discovery,
//! per-system metadata readers, and process execution.

pub mod config;
pub mod filesystem;
pub mod process;
pub mod scm;
