use crate::common::error::MvcError;

/// Result alias used throughout the crate.
pub type MvcResult<T> = Result<T, MvcError>;
