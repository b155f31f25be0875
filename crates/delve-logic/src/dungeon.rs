//! Level generation - turns an empty graph into a connected, labelled dungeon.
//!
//! Pipeline:
//! 1. scatter `entry` plus N rooms
//! 2. scatter M random corridors
//! 3. repair connectivity until a single component remains
//! 4. label difficulty as BFS depth from `entry`
//! 5. attach `exit` to every deepest room
//! 6. mark the shortest `entry` → `exit` route as the critical path

use std::collections::VecDeque;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::GraphError;
use crate::graph::{Attribute, Graph};
use crate::ids::NodeId;
use crate::visibility::PermissionTable;

/// Reserved id of the starting room.
pub const ENTRY: &str = "entry";
/// Reserved id of the goal room.
pub const EXIT: &str = "exit";

pub fn entry_id() -> NodeId {
    NodeId::new(ENTRY)
}

pub fn exit_id() -> NodeId {
    NodeId::new(EXIT)
}

/// Summary of one `generate_level` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelStats {
    /// Rooms including `entry` and `exit`.
    pub node_count: usize,
    /// Logical corridors (edge pairs).
    pub edge_count: usize,
    /// Components right after the random scatter.
    pub initial_components: usize,
    /// Repair passes needed to reach a single component.
    pub repair_passes: usize,
    /// Difficulty of `exit`, which is the deepest room.
    pub max_difficulty: u32,
    pub critical_path: Vec<NodeId>,
}

/// A level: one graph plus the per-agent fog-of-war table.
#[derive(Debug, Clone)]
pub struct Dungeon {
    pub(crate) graph: Graph,
    pub(crate) permissions: PermissionTable,
}

impl Dungeon {
    pub fn new() -> Self {
        Self {
            graph: Graph::new(),
            permissions: PermissionTable::default(),
        }
    }

    /// Dungeon whose generated room and corridor ids are reproducible.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            graph: Graph::with_seed(seed),
            permissions: PermissionTable::default(),
        }
    }

    /// Dungeon whose id stream is seeded from `rng`, so it stays independent
    /// of the stream that later drives `generate_level`.
    pub fn from_rng(rng: &mut impl Rng) -> Self {
        Self::with_seed(rng.gen())
    }

    /// Full, ungated view of the level. For exporters and renderers only.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Build the level in place.
    ///
    /// Any error here is a broken graph contract; callers should abandon the
    /// dungeon rather than retry. Calling this twice fails on `entry`.
    pub fn generate_level(
        &mut self,
        node_count: usize,
        edge_count: usize,
        rng: &mut impl Rng,
    ) -> Result<LevelStats, GraphError> {
        log::info!(
            "Generating level: {} rooms, {} seed corridors",
            node_count,
            edge_count
        );

        let rooms = self.scatter_rooms(node_count)?;
        self.scatter_corridors(&rooms, edge_count, rng)?;
        let (initial_components, repair_passes) = self.repair_connectivity(rng)?;
        let deepest = self.label_difficulty()?;
        let max_difficulty = self.inject_exit(deepest)?;
        let critical_path = self.mark_critical_path()?;

        let stats = LevelStats {
            node_count: self.graph.node_count(),
            edge_count: self.graph.edge_count(),
            initial_components,
            repair_passes,
            max_difficulty,
            critical_path,
        };

        log::info!(
            "Level ready: {} rooms, {} corridors, {} repair passes, exit at depth {}",
            stats.node_count,
            stats.edge_count,
            stats.repair_passes,
            stats.max_difficulty
        );
        Ok(stats)
    }

    fn scatter_rooms(&mut self, count: usize) -> Result<Vec<NodeId>, GraphError> {
        let mut rooms = Vec::with_capacity(count + 1);
        rooms.push(self.graph.add_node(Some(ENTRY))?);
        for _ in 0..count {
            rooms.push(self.graph.add_node(None)?);
        }
        Ok(rooms)
    }

    fn scatter_corridors(
        &mut self,
        rooms: &[NodeId],
        count: usize,
        rng: &mut impl Rng,
    ) -> Result<(), GraphError> {
        for _ in 0..count {
            let (Some(a), Some(b)) = (rooms.choose(rng), rooms.choose(rng)) else {
                break;
            };
            // Self-loops and repeats are rejected by the graph and simply skipped.
            self.graph.add_edge(a, b)?;
        }
        Ok(())
    }

    /// Join components until one is left. Returns (initial components, passes).
    fn repair_connectivity(&mut self, rng: &mut impl Rng) -> Result<(usize, usize), GraphError> {
        let mut initial = None;
        let mut passes = 0;

        loop {
            let components = self.graph.connected_components();
            let count = components.len();
            initial.get_or_insert(count);
            if count <= 1 {
                break;
            }

            passes += 1;
            log::debug!("Repair pass {}: {} components", passes, count);

            for (i, component) in components.iter().enumerate() {
                let mut other = rng.gen_range(0..count - 1);
                if other >= i {
                    other += 1;
                }
                if let (Some(a), Some(b)) =
                    (component.choose(rng), components[other].choose(rng))
                {
                    self.graph.add_edge(a, b)?;
                }
            }
        }

        Ok((initial.unwrap_or(0), passes))
    }

    /// Breadth-first labelling from `entry`. Returns the deepest level seen.
    fn label_difficulty(&mut self) -> Result<u32, GraphError> {
        let entry = entry_id();
        self.graph.set_attribute(&entry, Attribute::Difficulty(0))?;

        let mut deepest = 0;
        let mut queue = VecDeque::from([(entry, 0u32)]);
        while let Some((node, level)) = queue.pop_front() {
            deepest = deepest.max(level);
            for target in self.graph.edge_targets(&node)? {
                if self.graph.difficulty(&target)?.is_none() {
                    self.graph.set_attribute(&target, Attribute::Difficulty(level + 1))?;
                    queue.push_back((target, level + 1));
                }
            }
        }
        Ok(deepest)
    }

    /// Attach `exit` below every room at `deepest`. Returns the exit's level.
    fn inject_exit(&mut self, deepest: u32) -> Result<u32, GraphError> {
        let frontier: Vec<NodeId> = self
            .graph
            .nodes()
            .filter(|n| n.difficulty() == Some(deepest))
            .map(|n| n.id().clone())
            .collect();

        let exit = self.graph.add_node(Some(EXIT))?;
        for room in &frontier {
            self.graph.add_edge(room, &exit)?;
        }

        let level = deepest + 1;
        self.graph.set_attribute(&exit, Attribute::Difficulty(level))?;
        Ok(level)
    }

    fn mark_critical_path(&mut self) -> Result<Vec<NodeId>, GraphError> {
        let path = self.graph.shortest_path(&entry_id(), &exit_id())?;
        for node in &path {
            self.graph.set_attribute(node, Attribute::OnCriticalPath(true))?;
        }
        Ok(path)
    }
}

impl Default for Dungeon {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn generate(seed: u64, nodes: usize, edges: usize) -> (Dungeon, LevelStats) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut dungeon = Dungeon::with_seed(seed);
        let stats = dungeon.generate_level(nodes, edges, &mut rng).unwrap();
        (dungeon, stats)
    }

    #[test]
    fn test_empty_level_is_entry_and_exit() {
        let (dungeon, stats) = generate(1, 0, 0);
        let g = dungeon.graph();

        assert_eq!(g.node_ids(), vec![entry_id(), exit_id()]);
        assert_eq!(g.edge_count(), 1);
        assert_eq!(g.difficulty(&entry_id()).unwrap(), Some(0));
        assert_eq!(g.difficulty(&exit_id()).unwrap(), Some(1));
        assert_eq!(stats.critical_path, vec![entry_id(), exit_id()]);
        assert_eq!(stats.max_difficulty, 1);
        assert_eq!(stats.repair_passes, 0);
    }

    #[test]
    fn test_generated_level_is_connected() {
        let (dungeon, stats) = generate(42, 60, 15);
        assert_eq!(dungeon.graph().connected_components().len(), 1);
        assert_eq!(stats.node_count, 62);
        assert!(stats.initial_components > 1);
        assert!(stats.repair_passes >= 1);
    }

    #[test]
    fn test_every_room_is_labelled_with_bfs_depth() {
        let (dungeon, _) = generate(7, 40, 40);
        let g = dungeon.graph();
        for node in g.nodes() {
            let depth = g.shortest_path(&entry_id(), node.id()).unwrap().len() as u32 - 1;
            assert_eq!(node.difficulty(), Some(depth), "room {}", node.id());
        }
    }

    #[test]
    fn test_exit_is_deepest_and_attached_to_previous_frontier() {
        let (dungeon, stats) = generate(9, 30, 20);
        let g = dungeon.graph();
        let max = g.nodes().filter_map(|n| n.difficulty()).max().unwrap();
        assert_eq!(g.difficulty(&exit_id()).unwrap(), Some(max));
        assert_eq!(stats.max_difficulty, max);

        for target in g.edge_targets(&exit_id()).unwrap() {
            assert_eq!(g.difficulty(&target).unwrap(), Some(max - 1));
        }
    }

    #[test]
    fn test_critical_path_flags() {
        let (dungeon, stats) = generate(13, 50, 30);
        let g = dungeon.graph();
        assert_eq!(stats.critical_path.first(), Some(&entry_id()));
        assert_eq!(stats.critical_path.last(), Some(&exit_id()));
        assert_eq!(stats.critical_path.len() as u32, stats.max_difficulty + 1);

        for node in g.nodes() {
            let expected = stats.critical_path.contains(node.id());
            assert_eq!(node.on_critical_path(), expected, "room {}", node.id());
        }
    }

    #[test]
    fn test_same_seed_same_level() {
        let (a, sa) = generate(77, 25, 10);
        let (b, sb) = generate(77, 25, 10);
        assert_eq!(sa, sb);
        assert_eq!(a.graph().node_ids(), b.graph().node_ids());
    }

    #[test]
    fn test_id_stream_is_split_from_generation_rng() {
        let split = |seed| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let mut dungeon = Dungeon::from_rng(&mut rng);
            dungeon.generate_level(10, 5, &mut rng).unwrap();
            dungeon.graph().node_ids()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        let mut shared = Dungeon::with_seed(21);
        shared.generate_level(10, 5, &mut rng).unwrap();

        assert_eq!(split(21), split(21));
        assert_ne!(split(21), shared.graph().node_ids());
    }

    #[test]
    fn test_generating_twice_fails() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut dungeon = Dungeon::with_seed(0);
        dungeon.generate_level(3, 3, &mut rng).unwrap();
        let err = dungeon.generate_level(3, 3, &mut rng).unwrap_err();
        assert_eq!(err, GraphError::DuplicateId { id: entry_id() });
    }
}
