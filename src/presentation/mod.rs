//! Presentation layer.

pub mod cli;
