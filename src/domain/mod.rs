//! Core domain model: checkouts, repository types, actions, and the
//! output-rewrite rules applied to version control tool output.

pub mod entities;
pub mod value_objects;
