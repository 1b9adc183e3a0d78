//! Type aliases shared across crates.

pub mod aliases;

pub use aliases::*;
