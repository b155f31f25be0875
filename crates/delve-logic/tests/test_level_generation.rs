//! Integration tests for the full level generation pipeline.
//!
//! Exercises: scatter → connectivity repair → difficulty → exit → critical path
//! → fog of war → DOT export, over many seeds.

use delve_logic::dungeon::{entry_id, exit_id, Dungeon, LevelStats};
use delve_logic::export::export_dot;
use delve_logic::ids::AgentId;
use delve_logic::visibility::VisibilityGate;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

// ── Helpers ────────────────────────────────────────────────────────────

fn generate(seed: u64, nodes: usize, edges: usize) -> (Dungeon, LevelStats) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut dungeon = Dungeon::with_seed(seed);
    let stats = dungeon
        .generate_level(nodes, edges, &mut rng)
        .unwrap_or_else(|e| panic!("seed {} failed: {}", seed, e));
    (dungeon, stats)
}

fn assert_level_invariants(seed: u64, dungeon: &Dungeon, stats: &LevelStats) {
    let g = dungeon.graph();

    let components = g.connected_components();
    assert_eq!(components.len(), 1, "seed {}: {} components", seed, components.len());

    let max = g.nodes().filter_map(|n| n.difficulty()).max();
    assert_eq!(g.difficulty(&exit_id()).unwrap(), max, "seed {}", seed);
    assert!(g.nodes().all(|n| n.difficulty().is_some()), "seed {}", seed);

    let path = g.shortest_path(&entry_id(), &exit_id()).unwrap();
    assert_eq!(path, stats.critical_path, "seed {}", seed);
    assert_eq!(path.len() as u32, stats.max_difficulty + 1, "seed {}", seed);

    for node in g.nodes() {
        assert_eq!(
            node.on_critical_path(),
            path.contains(node.id()),
            "seed {}: critical flag on {}",
            seed,
            node.id()
        );
    }

    // Reciprocal edge pairs.
    for node in g.nodes() {
        for target in node.edge_targets() {
            let back = g.edge_targets(&target).unwrap();
            assert!(back.contains(node.id()), "seed {}: {} -> {} one-way", seed, node.id(), target);
            assert_ne!(&target, node.id(), "seed {}: self loop", seed);
        }
    }
}

// ── Soak ───────────────────────────────────────────────────────────────

#[test]
fn small_sparse_levels_always_converge() {
    for seed in 0..1000 {
        let (dungeon, stats) = generate(seed, 25, 10);
        assert_eq!(stats.node_count, 27);
        assert_level_invariants(seed, &dungeon, &stats);
    }
}

#[test]
fn dense_levels_hold_invariants() {
    for seed in 0..50 {
        let (dungeon, stats) = generate(seed, 100, 200);
        assert_level_invariants(seed, &dungeon, &stats);
    }
}

#[test]
fn edgeless_levels_are_repaired() {
    for seed in 0..50 {
        let (dungeon, stats) = generate(seed, 40, 0);
        assert_eq!(stats.initial_components, 41);
        assert_level_invariants(seed, &dungeon, &stats);
    }
}

// ── Scenarios ──────────────────────────────────────────────────────────

#[test]
fn empty_level_scenario() {
    let (dungeon, stats) = generate(0, 0, 0);
    let g = dungeon.graph();
    assert_eq!(g.node_ids(), vec![entry_id(), exit_id()]);
    assert_eq!(g.edge_targets(&entry_id()).unwrap(), vec![exit_id()]);
    assert_eq!(g.edge_targets(&exit_id()).unwrap(), vec![entry_id()]);
    assert_eq!(g.difficulty(&entry_id()).unwrap(), Some(0));
    assert_eq!(g.difficulty(&exit_id()).unwrap(), Some(1));
    assert_eq!(stats.critical_path, vec![entry_id(), exit_id()]);
}

#[test]
fn fog_of_war_on_generated_level() {
    let (mut dungeon, _) = generate(21, 30, 30);
    let scout = AgentId(0);

    for room in dungeon.graph().node_ids() {
        assert_eq!(dungeon.node_edge_targets(scout, &room), None);
    }

    dungeon.visit(scout, &entry_id()).unwrap();
    let neighbours = dungeon.node_edge_targets(scout, &entry_id()).unwrap();
    assert_eq!(neighbours, dungeon.graph().edge_targets(&entry_id()).unwrap());

    // Seeing a room's corridors does not reveal the rooms behind them.
    for room in &neighbours {
        assert_eq!(dungeon.node_edges(scout, room), None);
    }
    assert_eq!(dungeon.visible_nodes(scout), vec![entry_id()]);
}

#[test]
fn export_covers_whole_level() {
    let (dungeon, stats) = generate(8, 25, 10);
    let dot = export_dot(dungeon.graph());
    assert_eq!(dot.matches("shape=square").count(), stats.node_count);
    assert_eq!(dot.matches(" -> ").count(), stats.edge_count * 2);
    assert_eq!(dot.matches("color=red").count(), stats.critical_path.len());
}
