//! Pure dungeon logic for Delve.
//!
//! Everything here is engine-free: functions and types take plain data and
//! return results, so they are unit-testable and reusable from the
//! exploration engine, the soak harness, or a renderer.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | Run parameters and their validation |
//! | [`dungeon`] | Level generation: scatter, repair, difficulty, exit, critical path |
//! | [`error`] | Structural graph errors |
//! | [`export`] | Graphviz DOT export |
//! | [`graph`] | Attributed node/edge arena with Dijkstra and components |
//! | [`ids`] | Node, edge and agent identities; seedable id source |
//! | [`visibility`] | Per-agent fog of war over a dungeon |

pub mod config;
pub mod dungeon;
pub mod error;
pub mod export;
pub mod graph;
pub mod ids;
pub mod visibility;

pub use dungeon::{Dungeon, LevelStats, ENTRY, EXIT};
pub use error::GraphError;
pub use graph::{Attribute, AttributeKey, Edge, Graph, Node};
pub use ids::{AgentId, EdgeId, NodeId};
pub use visibility::VisibilityGate;
