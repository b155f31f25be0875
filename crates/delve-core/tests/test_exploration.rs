//! Integration tests for full exploration runs.
//!
//! Exercises: generate level → spawn explorers → tick to termination → report,
//! over many seeds and party sizes.

use delve_core::prelude::*;
use delve_logic::config::RunConfig;
use delve_logic::dungeon::entry_id;
use delve_logic::ids::AgentId;
use delve_logic::VisibilityGate;

// ── Helpers ────────────────────────────────────────────────────────────

fn config(seed: u64, agents: u32, food: u32) -> RunConfig {
    RunConfig {
        node_count: 30,
        edge_count: 20,
        agent_count: agents,
        food,
        max_ticks: 2_000,
        seed: Some(seed),
    }
}

fn assert_report_consistent(report: &RunReport, config: &RunConfig) {
    assert_eq!(report.agents.len(), config.agent_count as usize, "run {}", report.run);
    assert!(report.ticks <= config.max_ticks, "run {}", report.run);

    for agent in &report.agents {
        assert_eq!(agent.food + agent.moves, config.food, "{}", agent.id);
        assert!(agent.rooms_revealed >= 1, "{}", agent.id);
        assert!(agent.rooms_revealed as u32 <= agent.moves + 1, "{}", agent.id);
        if agent.alive && agent.state == AgentState::Resting {
            assert_eq!(agent.location, entry_id(), "{} resting away from home", agent.id);
        }
    }

    let survivors = report.survivors();
    match report.termination {
        Termination::AllFallen => assert_eq!(survivors, 0),
        Termination::LastAgentStanding => {
            assert!(config.agent_count > 1);
            assert_eq!(survivors, 1);
        }
        Termination::AllResting => assert!(survivors >= 1),
        Termination::TickCeiling => assert_eq!(report.ticks, config.max_ticks),
    }
}

// ── Single runs ────────────────────────────────────────────────────────

#[test]
fn test_runs_terminate_across_seeds() {
    for seed in 0..40 {
        for agents in [1, 2, 5] {
            let cfg = config(seed, agents, 15);
            let mut runner = ExplorationRunner::new(cfg.clone()).unwrap();
            let report = runner.run_once().unwrap();
            assert_report_consistent(&report, &cfg);
        }
    }
}

#[test]
fn test_reports_are_reproducible() {
    let cfg = config(99, 4, 20);
    let a = ExplorationRunner::new(cfg.clone()).unwrap().run_many(3);
    let b = ExplorationRunner::new(cfg).unwrap().run_many(3);
    assert_eq!(a, b);
}

#[test]
fn test_manual_stepping_matches_run_once() {
    let cfg = config(17, 3, 10);

    let expected = ExplorationRunner::new(cfg.clone()).unwrap().run_once().unwrap();

    let mut runner = ExplorationRunner::new(cfg).unwrap();
    runner.start_run().unwrap();
    let termination = loop {
        if let Some(reason) = runner.step().unwrap() {
            break reason;
        }
    };
    assert_eq!(runner.tick(), expected.ticks);
    assert_eq!(runner.finish_run(termination).unwrap(), expected);
}

#[test]
fn test_resting_explorer_can_be_sent_out_again() {
    // Plenty of food on a small level: the explorer comes home alive.
    let cfg = RunConfig {
        node_count: 5,
        edge_count: 5,
        ..config(3, 1, 200)
    };
    let mut runner = ExplorationRunner::new(cfg).unwrap();
    let report = runner.run_once().unwrap();
    assert_eq!(report.termination, Termination::AllResting);

    let before = report.agents[0].moves;
    let dungeon = runner.dungeon().unwrap();
    let seen = dungeon
        .visible_nodes(AgentId(0))
        .into_iter()
        .find(|room| *room != entry_id())
        .unwrap();
    assert!(runner.command(AgentId(0), AgentCommand::TravelTo(seen)));

    let mut steps = 0;
    while runner.step().unwrap().is_none() && steps < 500 {
        steps += 1;
    }
    let after = runner.agents();
    assert!(after[0].moves > before, "explorer never left entry");
}

#[test]
fn test_fog_matches_reported_reveals() {
    let mut runner = ExplorationRunner::new(config(23, 3, 12)).unwrap();
    let report = runner.run_once().unwrap();
    let dungeon = runner.dungeon().unwrap();

    for agent in &report.agents {
        let visible = dungeon.visible_nodes(agent.id);
        assert_eq!(visible.len(), agent.rooms_revealed);
        assert!(visible.contains(&entry_id()));
        assert!(visible.contains(&agent.location));
    }
}

// ── Soak ───────────────────────────────────────────────────────────────

#[test]
fn test_run_many_reports_every_run() {
    let mut runner = ExplorationRunner::new(config(1_000, 4, 25)).unwrap();
    let soak = runner.run_many(50);
    assert_eq!(soak.reports.len() + soak.failures.len(), 50);
    assert!(soak.failures.is_empty(), "{:?}", soak.failures);

    let levels: std::collections::HashSet<Vec<String>> = soak
        .reports
        .iter()
        .map(|r| r.level.critical_path.iter().map(|n| n.to_string()).collect())
        .collect();
    assert!(levels.len() > 1, "every run got the same level");
}

#[test]
fn test_soak_report_serializes() {
    let mut runner = ExplorationRunner::new(config(5, 2, 10)).unwrap();
    let soak = runner.run_many(2);
    let json = serde_json::to_string(&soak).unwrap();
    let back: SoakReport = serde_json::from_str(&json).unwrap();
    assert_eq!(back, soak);
}
