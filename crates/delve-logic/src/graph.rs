//! Attributed, logically undirected graph stored as an arena of nodes.
//!
//! Nodes live in an insertion-ordered map keyed by [`NodeId`]; edges hold the
//! id of their target rather than a reference, so there are no ownership
//! cycles. Every logical connection is stored as two directed edges, one on
//! each endpoint, each with its own [`EdgeId`].

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::GraphError;
use crate::ids::{EdgeId, IdSource, NodeId};

/// Which attribute slot to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttributeKey {
    Difficulty,
    OnCriticalPath,
}

/// Typed node attribute. Only these two kinds exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Attribute {
    /// BFS depth from the entry node.
    Difficulty(u32),
    /// Whether the node lies on the shortest entry→exit route.
    OnCriticalPath(bool),
}

impl Attribute {
    pub fn key(&self) -> AttributeKey {
        match self {
            Attribute::Difficulty(_) => AttributeKey::Difficulty,
            Attribute::OnCriticalPath(_) => AttributeKey::OnCriticalPath,
        }
    }
}

/// One directed half of a connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    id: EdgeId,
    target: NodeId,
}

impl Edge {
    pub fn id(&self) -> &EdgeId {
        &self.id
    }

    pub fn target(&self) -> &NodeId {
        &self.target
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    difficulty: Option<u32>,
    on_critical_path: Option<bool>,
    /// Cosmetic size for renderers and the DOT export.
    width: f32,
    height: f32,
    edges: IndexMap<EdgeId, Edge>,
}

impl Node {
    fn new(id: NodeId, (width, height): (f32, f32)) -> Self {
        Self {
            id,
            difficulty: None,
            on_critical_path: None,
            width,
            height,
            edges: IndexMap::new(),
        }
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn difficulty(&self) -> Option<u32> {
        self.difficulty
    }

    pub fn on_critical_path(&self) -> bool {
        self.on_critical_path.unwrap_or(false)
    }

    pub fn footprint(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    /// Outgoing edges in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn edge_targets(&self) -> Vec<NodeId> {
        self.edges.values().map(|e| e.target.clone()).collect()
    }

    pub fn has_edge_to(&self, target: &NodeId) -> bool {
        self.edges.values().any(|e| &e.target == target)
    }

    pub fn attribute(&self, key: AttributeKey) -> Option<Attribute> {
        match key {
            AttributeKey::Difficulty => self.difficulty.map(Attribute::Difficulty),
            AttributeKey::OnCriticalPath => self.on_critical_path.map(Attribute::OnCriticalPath),
        }
    }

    fn set_attribute(&mut self, attribute: Attribute) {
        match attribute {
            Attribute::Difficulty(level) => self.difficulty = Some(level),
            Attribute::OnCriticalPath(flag) => self.on_critical_path = Some(flag),
        }
    }

    fn add_edge_to(&mut self, id: EdgeId, target: NodeId) {
        self.edges.insert(id.clone(), Edge { id, target });
    }
}

/// Generic attributed graph. Knows nothing about dungeons.
#[derive(Debug, Clone)]
pub struct Graph {
    nodes: IndexMap<NodeId, Node>,
    ids: IdSource,
}

impl Graph {
    /// Graph whose generated ids come from OS entropy.
    pub fn new() -> Self {
        Self {
            nodes: IndexMap::new(),
            ids: IdSource::from_entropy(),
        }
    }

    /// Graph with reproducible generated ids and footprints.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            nodes: IndexMap::new(),
            ids: IdSource::from_seed(seed),
        }
    }

    /// Add a node, either with a fresh random id or with `id` if given.
    pub fn add_node(&mut self, id: Option<&str>) -> Result<NodeId, GraphError> {
        let id = match id {
            Some(explicit) => {
                let id = NodeId::new(explicit);
                if self.nodes.contains_key(&id) {
                    return Err(GraphError::DuplicateId { id });
                }
                // Keep generated ids from ever landing on this one.
                self.ids.claim(explicit);
                id
            }
            None => NodeId::new(self.ids.fresh()),
        };
        let footprint = self.ids.footprint();
        self.nodes.insert(id.clone(), Node::new(id.clone(), footprint));
        Ok(id)
    }

    /// Connect `from` and `to` with a reciprocal edge pair.
    ///
    /// Returns `Ok(false)` without touching the graph for self-loops and for
    /// pairs that are already connected.
    pub fn add_edge(&mut self, from: &NodeId, to: &NodeId) -> Result<bool, GraphError> {
        // Both endpoints are checked before anything is written.
        let a = self.node(from)?;
        self.node(to)?;

        if from == to || a.has_edge_to(to) {
            return Ok(false);
        }

        let forward = EdgeId::new(self.ids.fresh());
        let backward = EdgeId::new(self.ids.fresh());

        if let Some(a) = self.nodes.get_mut(from) {
            a.add_edge_to(forward, to.clone());
        }
        if let Some(b) = self.nodes.get_mut(to) {
            b.add_edge_to(backward, from.clone());
        }
        Ok(true)
    }

    pub fn node(&self, id: &NodeId) -> Result<&Node, GraphError> {
        self.nodes
            .get(id)
            .ok_or_else(|| GraphError::NodeNotFound { id: id.clone() })
    }

    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Targets of `id`'s outgoing edges, in edge insertion order.
    pub fn edge_targets(&self, id: &NodeId) -> Result<Vec<NodeId>, GraphError> {
        Ok(self.node(id)?.edge_targets())
    }

    /// Outgoing edges of `id` (with their ids), in insertion order.
    pub fn node_edges(&self, id: &NodeId) -> Result<Vec<Edge>, GraphError> {
        Ok(self.node(id)?.edges().cloned().collect())
    }

    pub fn edge_target(&self, node: &NodeId, edge: &EdgeId) -> Result<NodeId, GraphError> {
        self.node(node)?
            .edges
            .get(edge)
            .map(|e| e.target.clone())
            .ok_or_else(|| GraphError::UnknownEdge {
                node: node.clone(),
                edge: edge.clone(),
            })
    }

    /// All node ids in insertion order.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.keys().cloned().collect()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of logical connections (each stored as two directed edges).
    pub fn edge_count(&self) -> usize {
        self.directed_edge_count() / 2
    }

    pub fn directed_edge_count(&self) -> usize {
        self.nodes.values().map(|n| n.edges.len()).sum()
    }

    pub fn set_attribute(&mut self, id: &NodeId, attribute: Attribute) -> Result<(), GraphError> {
        self.nodes
            .get_mut(id)
            .ok_or_else(|| GraphError::NodeNotFound { id: id.clone() })?
            .set_attribute(attribute);
        Ok(())
    }

    pub fn attribute(
        &self,
        id: &NodeId,
        key: AttributeKey,
    ) -> Result<Option<Attribute>, GraphError> {
        Ok(self.node(id)?.attribute(key))
    }

    /// Read an attribute, falling back to `default` (whose kind selects the slot).
    pub fn attribute_or(&self, id: &NodeId, default: Attribute) -> Result<Attribute, GraphError> {
        Ok(self.attribute(id, default.key())?.unwrap_or(default))
    }

    pub fn difficulty(&self, id: &NodeId) -> Result<Option<u32>, GraphError> {
        Ok(self.node(id)?.difficulty())
    }

    pub fn on_critical_path(&self, id: &NodeId) -> Result<bool, GraphError> {
        Ok(self.node(id)?.on_critical_path())
    }

    /// Dijkstra over unit-weight edges.
    ///
    /// Among unvisited nodes with equal tentative distance the one inserted
    /// first is extracted first, so results are stable for a given graph.
    /// Fails with [`GraphError::Unreachable`] when no route exists.
    pub fn shortest_path(&self, from: &NodeId, to: &NodeId) -> Result<Vec<NodeId>, GraphError> {
        let start = self.index_of(from)?;
        let goal = self.index_of(to)?;

        let count = self.nodes.len();
        let mut dist = vec![usize::MAX; count];
        let mut prev: Vec<Option<usize>> = vec![None; count];
        let mut visited = vec![false; count];
        dist[start] = 0;

        loop {
            let mut best: Option<usize> = None;
            for i in 0..count {
                if visited[i] || dist[i] == usize::MAX {
                    continue;
                }
                if best.map_or(true, |b| dist[i] < dist[b]) {
                    best = Some(i);
                }
            }
            let Some(current) = best else {
                break;
            };
            visited[current] = true;
            if current == goal {
                break;
            }

            let (_, node) = self
                .nodes
                .get_index(current)
                .ok_or_else(|| GraphError::NodeNotFound { id: from.clone() })?;
            for edge in node.edges.values() {
                let target = self.index_of(&edge.target)?;
                let alt = dist[current] + 1;
                if !visited[target] && alt < dist[target] {
                    dist[target] = alt;
                    prev[target] = Some(current);
                }
            }
        }

        if dist[goal] == usize::MAX {
            return Err(GraphError::Unreachable {
                from: from.clone(),
                to: to.clone(),
            });
        }

        let mut path = vec![to.clone()];
        let mut cursor = goal;
        while let Some(p) = prev[cursor] {
            if let Some((id, _)) = self.nodes.get_index(p) {
                path.push(id.clone());
            }
            cursor = p;
        }
        path.reverse();
        Ok(path)
    }

    /// Partition the node set into connected components.
    ///
    /// Components come out in order of their first node's insertion; members
    /// in flood-fill discovery order.
    pub fn connected_components(&self) -> Vec<Vec<NodeId>> {
        let count = self.nodes.len();
        let mut assigned = vec![false; count];
        let mut components = Vec::new();

        for seed in 0..count {
            if assigned[seed] {
                continue;
            }
            assigned[seed] = true;
            let mut component = Vec::new();
            let mut stack = vec![seed];

            while let Some(current) = stack.pop() {
                let Some((id, node)) = self.nodes.get_index(current) else {
                    continue;
                };
                component.push(id.clone());
                for edge in node.edges.values() {
                    if let Some(next) = self.nodes.get_index_of(&edge.target) {
                        if !assigned[next] {
                            assigned[next] = true;
                            stack.push(next);
                        }
                    }
                }
            }
            components.push(component);
        }
        components
    }

    fn index_of(&self, id: &NodeId) -> Result<usize, GraphError> {
        self.nodes
            .get_index_of(id)
            .ok_or_else(|| GraphError::NodeNotFound { id: id.clone() })
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}
