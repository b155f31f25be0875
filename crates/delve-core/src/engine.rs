//! Exploration runner - main entry point for generating a level and letting
//! explorers loose in it.

use hecs::World;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use delve_logic::config::{validate_config, RunConfig};
use delve_logic::dungeon::entry_id;
use delve_logic::export::export_dot;
use delve_logic::ids::AgentId;
use delve_logic::{Dungeon, LevelStats};

use crate::components::{Agent, AgentCommand, AgentState, AgentSummary};
use crate::error::RunError;
use crate::systems::{command_agent, exploration_system, spawn_explorer};

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Termination {
    /// Multi-agent run with at most one explorer left alive.
    LastAgentStanding,
    /// Every explorer died.
    AllFallen,
    /// Every living explorer is resting; nobody can act without a new command.
    AllResting,
    /// The tick ceiling was reached.
    TickCeiling,
}

/// Outcome of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub run: u64,
    pub seed: u64,
    pub level: LevelStats,
    pub ticks: u64,
    pub termination: Termination,
    /// Survivors and the fallen, by agent id.
    pub agents: Vec<AgentSummary>,
}

impl RunReport {
    pub fn survivors(&self) -> usize {
        self.agents.iter().filter(|a| a.alive).count()
    }
}

/// A run that was aborted by a structural failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunFailure {
    pub run: u64,
    pub seed: u64,
    pub error: String,
}

/// Outcome of `run_many`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SoakReport {
    pub reports: Vec<RunReport>,
    pub failures: Vec<RunFailure>,
}

/// Drives explorers through freshly generated dungeons.
pub struct ExplorationRunner {
    /// ECS world holding the current run's explorers
    pub world: World,
    config: RunConfig,
    base_seed: u64,
    runs_started: u64,
    rng: ChaCha8Rng,
    // Current run
    run: u64,
    seed: u64,
    dungeon: Option<Dungeon>,
    level: Option<LevelStats>,
    tick: u64,
    fallen: Vec<AgentSummary>,
    #[cfg(test)]
    sabotaged_runs: Vec<u64>,
}

impl ExplorationRunner {
    /// Create a runner. Fails if the configuration does not validate.
    pub fn new(config: RunConfig) -> Result<Self, RunError> {
        let errors = validate_config(&config);
        if !errors.is_empty() {
            return Err(RunError::InvalidConfig(errors));
        }

        let base_seed = config.seed.unwrap_or_else(rand::random);
        Ok(Self {
            world: World::new(),
            config,
            base_seed,
            runs_started: 0,
            rng: ChaCha8Rng::seed_from_u64(base_seed),
            run: 0,
            seed: base_seed,
            dungeon: None,
            level: None,
            tick: 0,
            fallen: Vec::new(),
            #[cfg(test)]
            sabotaged_runs: Vec::new(),
        })
    }

    /// Build a fresh dungeon and spawn explorers at the entry, all exploring.
    pub fn start_run(&mut self) -> Result<&LevelStats, RunError> {
        let run = self.runs_started;
        self.runs_started += 1;
        let seed = self.base_seed.wrapping_add(run);

        self.world.clear();
        self.fallen.clear();
        self.dungeon = None;
        self.level = None;
        self.tick = 0;
        self.run = run;
        self.seed = seed;
        self.rng = ChaCha8Rng::seed_from_u64(seed);

        log::info!("Run {} (seed {}) starting", run, seed);

        let mut dungeon = Dungeon::from_rng(&mut self.rng);
        #[cfg(test)]
        if self.sabotaged_runs.contains(&run) {
            // Pre-built level makes the real generation collide on `entry`.
            dungeon
                .generate_level(0, 0, &mut self.rng)
                .map_err(RunError::Generation)?;
        }
        let level = dungeon
            .generate_level(self.config.node_count, self.config.edge_count, &mut self.rng)
            .map_err(RunError::Generation)?;

        for i in 0..self.config.agent_count {
            let id = AgentId(i);
            let mut agent = spawn_explorer(&mut dungeon, id, entry_id(), self.config.food)
                .map_err(|source| RunError::Agent { agent: id, source })?;
            command_agent(&mut agent, &dungeon, AgentCommand::Explore);
            self.world.spawn((agent,));
        }

        self.dungeon = Some(dungeon);
        Ok(&*self.level.insert(level))
    }

    /// Check for termination, otherwise advance every explorer by one tick.
    ///
    /// Returns the termination reason once the run is over.
    pub fn step(&mut self) -> Result<Option<Termination>, RunError> {
        let Some(dungeon) = self.dungeon.as_mut() else {
            return Err(RunError::NotStarted);
        };

        if let Some(reason) = check_termination(
            &self.world,
            self.config.agent_count,
            self.tick,
            self.config.max_ticks,
        ) {
            return Ok(Some(reason));
        }

        let fallen = exploration_system(&mut self.world, dungeon, &mut self.rng)?;
        self.fallen.extend(fallen);
        self.tick += 1;
        Ok(None)
    }

    /// Summarise the current run.
    pub fn finish_run(&self, termination: Termination) -> Result<RunReport, RunError> {
        let level = self.level.clone().ok_or(RunError::NotStarted)?;

        if termination == Termination::TickCeiling {
            log::warn!(
                "Run {} hit the tick ceiling ({}) with {} explorers still alive",
                self.run,
                self.config.max_ticks,
                self.living_count()
            );
        }

        let report = RunReport {
            run: self.run,
            seed: self.seed,
            level,
            ticks: self.tick,
            termination,
            agents: self.agents(),
        };
        log::info!(
            "Run {} finished after {} ticks: {:?}, {} of {} explorers alive",
            report.run,
            report.ticks,
            report.termination,
            report.survivors(),
            report.agents.len()
        );
        Ok(report)
    }

    /// Generate, explore until a termination condition, and report.
    pub fn run_once(&mut self) -> Result<RunReport, RunError> {
        self.start_run()?;
        let termination = loop {
            if let Some(reason) = self.step()? {
                break reason;
            }
        };
        self.finish_run(termination)
    }

    /// Run `n` independent runs back to back.
    ///
    /// A failed run is logged and recorded; it never stops the runs after it.
    pub fn run_many(&mut self, n: u64) -> SoakReport {
        let mut soak = SoakReport::default();
        for _ in 0..n {
            match self.run_once() {
                Ok(report) => soak.reports.push(report),
                Err(e) => {
                    log::warn!("Run {} (seed {}) aborted: {}", self.run, self.seed, e);
                    soak.failures.push(RunFailure {
                        run: self.run,
                        seed: self.seed,
                        error: e.to_string(),
                    });
                }
            }
        }
        soak
    }

    /// Give a command to one explorer of the current run.
    pub fn command(&mut self, agent: AgentId, command: AgentCommand) -> bool {
        let Some(dungeon) = self.dungeon.as_ref() else {
            return false;
        };
        for (_, explorer) in self.world.query_mut::<&mut Agent>() {
            if explorer.id == agent {
                return command_agent(explorer, dungeon, command);
            }
        }
        false
    }

    /// DOT export of the current (or last) level, ignoring fog of war.
    pub fn export_dot(&self) -> Option<String> {
        self.dungeon.as_ref().map(|d| export_dot(d.graph()))
    }

    pub fn dungeon(&self) -> Option<&Dungeon> {
        self.dungeon.as_ref()
    }

    /// Snapshot of every explorer this run, living and fallen, by id.
    pub fn agents(&self) -> Vec<AgentSummary> {
        let Some(dungeon) = self.dungeon.as_ref() else {
            return Vec::new();
        };
        let mut agents: Vec<AgentSummary> = self
            .world
            .query::<&Agent>()
            .iter()
            .map(|(_, agent)| agent.summary(dungeon))
            .chain(self.fallen.iter().cloned())
            .collect();
        agents.sort_by_key(|a| a.id);
        agents
    }

    pub fn living_count(&self) -> usize {
        count_living(&self.world)
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn base_seed(&self) -> u64 {
        self.base_seed
    }
}

fn count_living(world: &World) -> usize {
    world
        .query::<&Agent>()
        .iter()
        .filter(|(_, agent)| agent.is_alive())
        .count()
}

fn check_termination(
    world: &World,
    agent_count: u32,
    tick: u64,
    max_ticks: u64,
) -> Option<Termination> {
    let living = count_living(world);
    if living == 0 {
        return Some(Termination::AllFallen);
    }
    if agent_count > 1 && living <= 1 {
        return Some(Termination::LastAgentStanding);
    }

    let all_resting = world
        .query::<&Agent>()
        .iter()
        .filter(|(_, agent)| agent.is_alive())
        .all(|(_, agent)| agent.state == AgentState::Resting);
    if all_resting {
        return Some(Termination::AllResting);
    }

    if tick >= max_ticks {
        return Some(Termination::TickCeiling);
    }
    None
}
