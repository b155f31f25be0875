//! Delve Core - Dungeon Exploration Engine
//!
//! Generates dungeon levels with `delve-logic` and lets a party of explorers
//! loose in them under fog of war, each with a fixed food budget.
//!
//! # Architecture
//!
//! Explorers are `hecs` entities:
//! - **Components**: Pure data attached to entities ([`components::Agent`])
//! - **Systems**: The exploration state machine, ticked once per step
//! - **Engine**: [`engine::ExplorationRunner`] owns the world, the level and the run seed
//!
//! # Example
//!
//! ```rust,no_run
//! use delve_core::prelude::*;
//! use delve_logic::config::RunConfig;
//!
//! let mut runner = ExplorationRunner::new(RunConfig::default()).unwrap();
//! let report = runner.run_once().unwrap();
//! println!("{:?} after {} ticks", report.termination, report.ticks);
//! ```

pub mod components;
pub mod engine;
pub mod error;
pub mod systems;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::components::*;
    pub use crate::engine::{ExplorationRunner, RunReport, SoakReport, Termination};
    pub use crate::error::{AgentError, RunError};
}
