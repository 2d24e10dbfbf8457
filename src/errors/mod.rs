//! Error types shared across the crate.

mod observable_errors;

pub use observable_errors::*;
