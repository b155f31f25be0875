//! Structural errors for the dungeon graph.
//!
//! Every variant here means a graph contract was broken by the caller.
//! Generation never retries on them; the owning run is aborted instead.

use thiserror::Error;

use crate::ids::{EdgeId, NodeId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// A node id was referenced that the graph does not contain.
    #[error("node not found: {id}")]
    NodeNotFound { id: NodeId },

    /// An explicit node id collided with an existing one.
    #[error("duplicate node id: {id}")]
    DuplicateId { id: NodeId },

    /// The edge id is not one of the outgoing edges of `node`.
    #[error("unknown edge {edge} on node {node}")]
    UnknownEdge { node: NodeId, edge: EdgeId },

    /// No path connects the two nodes.
    #[error("no path from {from} to {to}")]
    Unreachable { from: NodeId, to: NodeId },
}
