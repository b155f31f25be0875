//! Fog of war.
//!
//! Each agent may only read the structure of rooms it has visited. The
//! [`VisibilityGate`] trait is the only surface agents get; a miss is
//! `None`, never an error.

use std::collections::{HashMap, HashSet};

use crate::dungeon::Dungeon;
use crate::error::GraphError;
use crate::graph::Edge;
use crate::ids::{AgentId, EdgeId, NodeId};

/// Grow-only (agent, room) → readable table.
#[derive(Debug, Clone, Default)]
pub struct PermissionTable {
    readable: HashMap<AgentId, HashSet<NodeId>>,
}

impl PermissionTable {
    /// Returns `true` if this grant is new.
    pub fn grant(&mut self, agent: AgentId, node: NodeId) -> bool {
        self.readable.entry(agent).or_default().insert(node)
    }

    pub fn can_read(&self, agent: AgentId, node: &NodeId) -> bool {
        self.readable
            .get(&agent)
            .is_some_and(|nodes| nodes.contains(node))
    }

    pub fn readable_count(&self, agent: AgentId) -> usize {
        self.readable.get(&agent).map_or(0, HashSet::len)
    }
}

/// Gated read access to a level, keyed by agent.
pub trait VisibilityGate {
    /// Reveal `node` to `agent`. Idempotent.
    fn visit(&mut self, agent: AgentId, node: &NodeId) -> Result<(), GraphError>;

    fn check_read(&self, agent: AgentId, node: &NodeId) -> bool;

    /// Edge targets of `node`, or `None` if the agent hasn't been there.
    fn node_edge_targets(&self, agent: AgentId, node: &NodeId) -> Option<Vec<NodeId>>;

    /// Edges (with ids) of `node`, or `None` if the agent hasn't been there.
    fn node_edges(&self, agent: AgentId, node: &NodeId) -> Option<Vec<Edge>>;

    fn edge_target(&self, agent: AgentId, node: &NodeId, edge: &EdgeId) -> Option<NodeId>;

    /// Every room this agent may read, in graph insertion order.
    fn visible_nodes(&self, agent: AgentId) -> Vec<NodeId>;
}

impl VisibilityGate for Dungeon {
    fn visit(&mut self, agent: AgentId, node: &NodeId) -> Result<(), GraphError> {
        if !self.graph.contains_node(node) {
            return Err(GraphError::NodeNotFound { id: node.clone() });
        }
        self.permissions.grant(agent, node.clone());
        Ok(())
    }

    fn check_read(&self, agent: AgentId, node: &NodeId) -> bool {
        self.permissions.can_read(agent, node)
    }

    fn node_edge_targets(&self, agent: AgentId, node: &NodeId) -> Option<Vec<NodeId>> {
        if !self.check_read(agent, node) {
            return None;
        }
        self.graph.edge_targets(node).ok()
    }

    fn node_edges(&self, agent: AgentId, node: &NodeId) -> Option<Vec<Edge>> {
        if !self.check_read(agent, node) {
            return None;
        }
        self.graph.node_edges(node).ok()
    }

    fn edge_target(&self, agent: AgentId, node: &NodeId, edge: &EdgeId) -> Option<NodeId> {
        if !self.check_read(agent, node) {
            return None;
        }
        self.graph.edge_target(node, edge).ok()
    }

    fn visible_nodes(&self, agent: AgentId) -> Vec<NodeId> {
        self.graph
            .nodes()
            .map(|n| n.id())
            .filter(|id| self.check_read(agent, id))
            .cloned()
            .collect()
    }
}

impl Dungeon {
    /// How many rooms `agent` has revealed.
    pub fn revealed_count(&self, agent: AgentId) -> usize {
        self.permissions.readable_count(agent)
    }
}
