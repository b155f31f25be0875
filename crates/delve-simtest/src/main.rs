//! Delve Headless Soak Harness
//!
//! Generates levels, sends explorers into them and checks the invariants of
//! both. Runs entirely in-process: no renderer, no persistence.
//!
//! Usage:
//!   cargo run -p delve-simtest
//!   cargo run -p delve-simtest -- --runs 1000 --nodes 25 --edges 10
//!   cargo run -p delve-simtest -- --config run.json --dot level.dot --json
//!
//! Logging goes through `RUST_LOG` (e.g. `RUST_LOG=delve_core=debug`).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;

use delve_core::prelude::*;
use delve_core::systems::{command_agent, move_to_location, spawn_explorer};
use delve_logic::config::{validate_config, RunConfig};
use delve_logic::dungeon::{entry_id, exit_id};
use delve_logic::ids::{AgentId, NodeId};
use delve_logic::{Dungeon, LevelStats, VisibilityGate};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Headless soak harness for Delve levels and explorers.
#[derive(Parser)]
#[command(name = "delve-simtest", about = "Generate levels, run explorers, check invariants")]
struct Cli {
    /// JSON run configuration. The flags below override its fields.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Rooms to scatter besides entry and exit.
    #[arg(long)]
    nodes: Option<usize>,

    /// Random corridors to scatter before connectivity repair.
    #[arg(long)]
    edges: Option<usize>,

    /// Explorers spawned at entry.
    #[arg(long)]
    agents: Option<u32>,

    /// Movement budget per explorer.
    #[arg(long)]
    food: Option<u32>,

    /// Tick ceiling per run.
    #[arg(long)]
    max_ticks: Option<u64>,

    /// Base seed (default: random, printed at startup).
    #[arg(long)]
    seed: Option<u64>,

    /// Number of soak runs.
    #[arg(long, default_value_t = 100)]
    runs: u64,

    /// Write the last level as Graphviz DOT to this path.
    #[arg(long)]
    dot: Option<PathBuf>,

    /// Print the soak report as JSON.
    #[arg(long)]
    json: bool,

    /// Print every check, not just failures.
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Config file (or defaults) with any flags laid over it.
    fn run_config(&self) -> Result<RunConfig, String> {
        let mut config = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .map_err(|e| format!("{}: {}", path.display(), e))?;
                serde_json::from_str(&text).map_err(|e| format!("{}: {}", path.display(), e))?
            }
            None => RunConfig::default(),
        };

        if let Some(nodes) = self.nodes {
            config.node_count = nodes;
        }
        if let Some(edges) = self.edges {
            config.edge_count = edges;
        }
        if let Some(agents) = self.agents {
            config.agent_count = agents;
        }
        if let Some(food) = self.food {
            config.food = food;
        }
        if let Some(max_ticks) = self.max_ticks {
            config.max_ticks = max_ticks;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        Ok(config)
    }
}

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = match cli.run_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    };
    let verbose = cli.verbose;
    println!("=== Delve Soak Harness ===\n");

    let mut results = Vec::new();

    // 1. Configuration
    results.extend(validate_run_config(&config));
    let mut runner = match ExplorationRunner::new(config) {
        Ok(runner) => runner,
        Err(e) => {
            log::error!("Runner rejected configuration: {}", e);
            print_summary(&results, verbose);
            process::exit(1);
        }
    };

    // Every check below derives from this one seed.
    let seed = runner.base_seed();
    println!("Base seed: {}\n", seed);

    // 2. Level generation invariants
    results.extend(validate_generation(runner.config(), seed, verbose));

    // 3. Fog of war
    results.extend(validate_fog_of_war(seed));

    // 4. Food budget
    results.extend(validate_budget(seed));

    // 5. Soak runs
    let soak = run_soak(&mut runner, cli.runs, cli.dot.as_deref(), &mut results);

    if cli.json {
        match serde_json::to_string_pretty(&soak) {
            Ok(json) => println!("{}", json),
            Err(e) => results.push(TestResult {
                name: "json_report".into(),
                passed: false,
                detail: format!("serialize error: {}", e),
            }),
        }
    }

    let failed = print_summary(&results, verbose);
    if failed > 0 {
        process::exit(1);
    }
}

fn print_summary(results: &[TestResult], verbose: bool) -> usize {
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );
    failed
}

// ── 1. Configuration ────────────────────────────────────────────────────

fn validate_run_config(config: &RunConfig) -> Vec<TestResult> {
    println!("--- Configuration ---");
    let errors = validate_config(config);
    vec![TestResult {
        name: "config_valid".into(),
        passed: errors.is_empty(),
        detail: if errors.is_empty() {
            format!(
                "{} rooms, {} corridors, {} explorers x {} food, {} tick ceiling",
                config.node_count,
                config.edge_count,
                config.agent_count,
                config.food,
                config.max_ticks
            )
        } else {
            errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ")
        },
    }]
}

// ── 2. Level generation ─────────────────────────────────────────────────

fn generate(seed: u64, nodes: usize, edges: usize) -> Result<(Dungeon, LevelStats), String> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut dungeon = Dungeon::from_rng(&mut rng);
    let stats = dungeon
        .generate_level(nodes, edges, &mut rng)
        .map_err(|e| e.to_string())?;
    Ok((dungeon, stats))
}

fn validate_generation(config: &RunConfig, seed: u64, verbose: bool) -> Vec<TestResult> {
    println!("--- Level Generation ---");
    let mut results = Vec::new();

    // Smallest possible level
    match generate(seed, 0, 0) {
        Ok((dungeon, stats)) => {
            let g = dungeon.graph();
            results.push(TestResult {
                name: "empty_level".into(),
                passed: g.node_count() == 2
                    && g.edge_count() == 1
                    && g.difficulty(&entry_id()) == Ok(Some(0))
                    && g.difficulty(&exit_id()) == Ok(Some(1))
                    && stats.critical_path == vec![entry_id(), exit_id()],
                detail: "(0, 0) → entry - exit, one corridor".into(),
            });
        }
        Err(e) => results.push(TestResult {
            name: "empty_level".into(),
            passed: false,
            detail: e,
        }),
    }

    let (dungeon, stats) = match generate(seed, config.node_count, config.edge_count) {
        Ok(level) => level,
        Err(e) => {
            results.push(TestResult {
                name: "generate_level".into(),
                passed: false,
                detail: e,
            });
            return results;
        }
    };
    let g = dungeon.graph();

    if verbose {
        println!(
            "  {} rooms, {} corridors, {} islands before repair, {} repair passes",
            stats.node_count, stats.edge_count, stats.initial_components, stats.repair_passes
        );
    }

    let components = g.connected_components().len();
    results.push(TestResult {
        name: "single_component".into(),
        passed: components == 1,
        detail: format!("{} component(s)", components),
    });

    let deepest = g.nodes().filter_map(|n| n.difficulty()).max();
    let exit_depth = g.difficulty(&exit_id()).ok().flatten();
    results.push(TestResult {
        name: "exit_is_deepest".into(),
        passed: exit_depth.is_some() && exit_depth == deepest,
        detail: format!("exit {:?}, deepest {:?}", exit_depth, deepest),
    });

    let labelled = g.nodes().filter(|n| n.difficulty().is_some()).count();
    results.push(TestResult {
        name: "all_rooms_labelled".into(),
        passed: labelled == g.node_count(),
        detail: format!("{}/{} rooms have a difficulty", labelled, g.node_count()),
    });

    let path = g.shortest_path(&entry_id(), &exit_id()).unwrap_or_default();
    results.push(TestResult {
        name: "critical_path_length".into(),
        passed: !path.is_empty() && exit_depth == Some(path.len() as u32 - 1),
        detail: format!("{} rooms from entry to exit", path.len()),
    });

    let mismatched: Vec<&NodeId> = g
        .nodes()
        .filter(|n| n.on_critical_path() != path.contains(n.id()))
        .map(|n| n.id())
        .collect();
    results.push(TestResult {
        name: "critical_path_marked".into(),
        passed: mismatched.is_empty(),
        detail: format!("{} rooms flagged wrongly", mismatched.len()),
    });

    let one_way = g
        .nodes()
        .flat_map(|n| n.edge_targets().into_iter().map(move |t| (n.id(), t)))
        .filter(|(from, to)| !g.edge_targets(to).map(|back| back.contains(*from)).unwrap_or(false))
        .count();
    results.push(TestResult {
        name: "corridors_reciprocal".into(),
        passed: one_way == 0,
        detail: format!("{} one-way corridors", one_way),
    });

    results
}

// ── 3. Fog of war ───────────────────────────────────────────────────────

fn validate_fog_of_war(seed: u64) -> Vec<TestResult> {
    println!("--- Fog of War ---");
    let mut results = Vec::new();

    let (mut dungeon, _) = match generate(seed, 10, 5) {
        Ok(level) => level,
        Err(e) => {
            results.push(TestResult {
                name: "fog_level".into(),
                passed: false,
                detail: e,
            });
            return results;
        }
    };
    let scout = AgentId(0);

    results.push(TestResult {
        name: "fog_hides_unvisited".into(),
        passed: dungeon.node_edges(scout, &entry_id()).is_none()
            && dungeon.visible_nodes(scout).is_empty(),
        detail: "nothing readable before the first visit".into(),
    });

    let visited = dungeon.visit(scout, &entry_id());
    let through_gate = dungeon.node_edge_targets(scout, &entry_id());
    let direct = dungeon.graph().edge_targets(&entry_id()).ok();
    results.push(TestResult {
        name: "fog_reveals_visited".into(),
        passed: visited.is_ok() && through_gate.is_some() && through_gate == direct,
        detail: "entry corridors match the full graph after visiting".into(),
    });

    results.push(TestResult {
        name: "fog_is_per_agent".into(),
        passed: !dungeon.check_read(AgentId(1), &entry_id()),
        detail: "a second explorer still sees nothing".into(),
    });

    results
}

// ── 4. Food budget ──────────────────────────────────────────────────────

fn validate_budget(seed: u64) -> Vec<TestResult> {
    println!("--- Food Budget ---");
    let mut results = Vec::new();

    let (mut dungeon, _) = match generate(seed, 0, 0) {
        Ok(level) => level,
        Err(e) => {
            results.push(TestResult {
                name: "budget_level".into(),
                passed: false,
                detail: e,
            });
            return results;
        }
    };

    let mut agent = match spawn_explorer(&mut dungeon, AgentId(0), entry_id(), 1) {
        Ok(agent) => agent,
        Err(e) => {
            results.push(TestResult {
                name: "budget_spawn".into(),
                passed: false,
                detail: e.to_string(),
            });
            return results;
        }
    };
    let corridor = dungeon
        .node_edges(agent.id, &entry_id())
        .and_then(|edges| edges.first().map(|e| e.id().clone()));
    let Some(corridor) = corridor else {
        results.push(TestResult {
            name: "budget_corridor".into(),
            passed: false,
            detail: "entry has no corridor".into(),
        });
        return results;
    };

    let first = move_to_location(&mut agent, &mut dungeon, &corridor);
    results.push(TestResult {
        name: "move_costs_one_food".into(),
        passed: first.is_ok() && agent.food == 0 && agent.location == exit_id(),
        detail: format!("food left {}", agent.food),
    });

    let back = dungeon
        .node_edges(agent.id, &exit_id())
        .and_then(|edges| edges.first().map(|e| e.id().clone()));
    let starved = back.map(|edge| move_to_location(&mut agent, &mut dungeon, &edge));
    results.push(TestResult {
        name: "no_food_no_move".into(),
        passed: matches!(starved, Some(Err(AgentError::OutOfBudget { .. })))
            && agent.location == exit_id()
            && agent.moves == 1,
        detail: "empty budget fails without moving".into(),
    });

    results.push(TestResult {
        name: "busy_agent_ignores_commands".into(),
        passed: {
            let accepted = command_agent(&mut agent, &dungeon, AgentCommand::Explore);
            let again = command_agent(&mut agent, &dungeon, AgentCommand::Explore);
            accepted && !again
        },
        detail: "commands only reach resting explorers".into(),
    });

    results
}

// ── 5. Soak runs ────────────────────────────────────────────────────────

fn run_soak(
    runner: &mut ExplorationRunner,
    runs: u64,
    dot: Option<&Path>,
    results: &mut Vec<TestResult>,
) -> SoakReport {
    println!("--- Soak Runs ---");
    log::info!("Soaking {} runs from base seed {}", runs, runner.base_seed());

    let soak = runner.run_many(runs);
    let food = runner.config().food;
    let max_ticks = runner.config().max_ticks;

    results.push(TestResult {
        name: "soak_no_failures".into(),
        passed: soak.failures.is_empty(),
        detail: match soak.failures.first() {
            Some(f) => format!(
                "{} failed, first: run {} (seed {}): {}",
                soak.failures.len(),
                f.run,
                f.seed,
                f.error
            ),
            None => format!("{} runs from base seed {}", soak.reports.len(), runner.base_seed()),
        },
    });

    results.push(TestResult {
        name: "soak_all_reported".into(),
        passed: (soak.reports.len() + soak.failures.len()) as u64 == runs,
        detail: format!("{} reports", soak.reports.len()),
    });

    let split_levels = soak
        .reports
        .iter()
        .filter(|r| r.level.critical_path.len() as u32 != r.level.max_difficulty + 1)
        .count();
    results.push(TestResult {
        name: "soak_levels_consistent".into(),
        passed: split_levels == 0,
        detail: format!("{} levels with a bad critical path", split_levels),
    });

    let overspent = soak
        .reports
        .iter()
        .flat_map(|r| r.agents.iter())
        .filter(|a| a.food + a.moves != food)
        .count();
    results.push(TestResult {
        name: "soak_budget_respected".into(),
        passed: overspent == 0,
        detail: format!("{} explorers with food + moves != {}", overspent, food),
    });

    let mut outcomes: BTreeMap<String, usize> = BTreeMap::new();
    for r in &soak.reports {
        *outcomes.entry(format!("{:?}", r.termination)).or_default() += 1;
    }
    let survivors: usize = soak.reports.iter().map(|r| r.survivors()).sum();
    let total_ticks: u64 = soak.reports.iter().map(|r| r.ticks).sum();
    results.push(TestResult {
        name: "soak_terminated".into(),
        passed: soak.reports.iter().all(|r| r.ticks <= max_ticks),
        detail: format!(
            "{:?}, {} survivors, avg {:.1} ticks",
            outcomes,
            survivors,
            total_ticks as f64 / soak.reports.len().max(1) as f64
        ),
    });

    if let Some(path) = dot {
        let written = runner
            .export_dot()
            .ok_or_else(|| "no level generated".to_string())
            .and_then(|text| std::fs::write(path, text).map_err(|e| e.to_string()));
        results.push(TestResult {
            name: "dot_export".into(),
            passed: written.is_ok(),
            detail: match written {
                Ok(()) => format!("last level written to {}", path.display()),
                Err(e) => format!("{}: {}", path.display(), e),
            },
        });
    }

    soak
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;
    use clap::CommandFactory;

    fn cli(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("delve-simtest").chain(args.iter().copied()))
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_defaults() {
        let cli = cli(&[]).unwrap();
        assert_eq!(cli.run_config().unwrap(), RunConfig::default());
        assert_eq!(cli.runs, 100);
        assert!(!cli.json && !cli.verbose);
        assert!(cli.dot.is_none());
    }

    #[test]
    fn test_parse_flags() {
        let cli = cli(&[
            "--nodes=25",
            "--edges",
            "10",
            "--agents",
            "2",
            "--max-ticks",
            "50",
            "--seed",
            "9",
            "--runs",
            "3",
            "--dot",
            "out.dot",
            "-v",
        ])
        .unwrap();
        let config = cli.run_config().unwrap();
        assert_eq!(config.node_count, 25);
        assert_eq!(config.edge_count, 10);
        assert_eq!(config.agent_count, 2);
        assert_eq!(config.max_ticks, 50);
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.food, RunConfig::default().food);
        assert_eq!(cli.runs, 3);
        assert_eq!(cli.dot, Some(PathBuf::from("out.dot")));
        assert!(cli.verbose);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(cli(&["--nodes", "lots"]).is_err());
        assert!(cli(&["--food"]).is_err());
        assert!(cli(&["--frobnicate"]).is_err());
    }

    #[test]
    fn test_help_prints_usage() {
        let err = cli(&["--help"]).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_flags_override_config_file() {
        let path = std::env::temp_dir().join(format!("delve-simtest-{}.json", process::id()));
        std::fs::write(&path, r#"{"node_count": 7, "food": 3, "seed": 5}"#).unwrap();
        let path_arg = path.to_string_lossy().into_owned();

        let config = cli(&["--config", &path_arg, "--food", "8"])
            .unwrap()
            .run_config()
            .unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.node_count, 7);
        assert_eq!(config.food, 8);
        assert_eq!(config.seed, Some(5));
        assert_eq!(config.edge_count, RunConfig::default().edge_count);
    }

    #[test]
    fn test_missing_config_file_is_reported() {
        let cli = cli(&["--config", "/nonexistent/delve.json"]).unwrap();
        assert!(cli.run_config().is_err());
    }

    #[test]
    fn test_checks_share_the_runner_seed() {
        let config = RunConfig {
            node_count: 25,
            edge_count: 10,
            seed: None,
            ..RunConfig::default()
        };
        let runner = ExplorationRunner::new(config.clone()).unwrap();
        let seed = runner.base_seed();
        let results: Vec<TestResult> = validate_run_config(&config)
            .into_iter()
            .chain(validate_generation(runner.config(), seed, false))
            .chain(validate_fog_of_war(seed))
            .chain(validate_budget(seed))
            .collect();
        for r in &results {
            assert!(r.passed, "seed {}: {}: {}", seed, r.name, r.detail);
        }
    }

    #[test]
    fn test_soak_checks_pass() {
        let config = RunConfig {
            node_count: 25,
            edge_count: 10,
            seed: Some(11),
            ..RunConfig::default()
        };
        let mut runner = ExplorationRunner::new(config).unwrap();
        let mut results = Vec::new();
        let soak = run_soak(&mut runner, 5, None, &mut results);
        assert_eq!(soak.reports.len(), 5);
        for r in &results {
            assert!(r.passed, "{}: {}", r.name, r.detail);
        }
    }

    #[test]
    fn test_invalid_config_fails_check() {
        let config = RunConfig {
            agent_count: 0,
            ..RunConfig::default()
        };
        let results = validate_run_config(&config);
        assert!(!results[0].passed);
    }
}
