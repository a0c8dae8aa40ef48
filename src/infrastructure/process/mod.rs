//! Running external version control commands.

pub mod runner;

pub use runner::{CommandExecution, CommandInvocation, CommandOutcome, CommandRunner};
