//! Application layer: command planning and the action runner.

pub mod dispatch;
pub mod use_cases;
