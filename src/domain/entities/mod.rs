//! Domain entities.

pub mod checkout;

pub use checkout::{Checkout, CheckoutSet};
