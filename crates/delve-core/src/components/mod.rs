//! Component definitions for the exploration ECS.
//!
//! Components are plain data attached to entities; the state machine that
//! drives them lives in systems.

mod agent;

pub use agent::*;
