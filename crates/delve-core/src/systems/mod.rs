//! Systems - logic that operates on components

mod exploration;

pub use exploration::*;
