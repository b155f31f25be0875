//! Error types for the exploration engine.

use delve_logic::config::ConfigError;
use delve_logic::ids::{AgentId, EdgeId, NodeId};
use delve_logic::GraphError;
use thiserror::Error;

/// Failures of a single explorer action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AgentError {
    /// No food left. Recovered inside the state machine (retreat or death).
    #[error("{agent} is out of food")]
    OutOfBudget { agent: AgentId },

    /// The gate could not resolve an edge from the agent's own room.
    #[error("{agent} cannot resolve edge {edge} from {node}")]
    UnknownEdge {
        agent: AgentId,
        node: NodeId,
        edge: EdgeId,
    },

    /// The agent stands in a room it has no read access to.
    #[error("{agent} is standing in unseen room {node}")]
    LostInFog { agent: AgentId, node: NodeId },

    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Failures that abort a whole run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("invalid run configuration: {0:?}")]
    InvalidConfig(Vec<ConfigError>),

    #[error("level generation failed")]
    Generation(#[source] GraphError),

    #[error("{agent} failed")]
    Agent {
        agent: AgentId,
        #[source]
        source: AgentError,
    },

    #[error("no run in progress")]
    NotStarted,
}
