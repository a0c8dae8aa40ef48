//! Filesystem discovery of working copies.

pub mod scanner;

pub use scanner::{CheckoutScanner, MarkerHit};
