//! Value objects for the checkout domain.

pub mod action;
pub mod repo_type;
pub mod replacer;

pub use action::Action;
pub use repo_type::RepoType;
pub use replacer::Replacer;
