//! Application use cases.

pub mod run_action;

pub use run_action::{ListFormat, ProgramOptions, RunActionUseCase};
