//! Reading the checkouts file.

pub mod checkouts_file;

pub use checkouts_file::CheckoutsFileReader;
