//! Explorer components.

use std::collections::VecDeque;
use std::fmt;

use delve_logic::ids::{AgentId, EdgeId, NodeId};
use delve_logic::Dungeon;
use serde::{Deserialize, Serialize};

/// What an explorer is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentState {
    /// Waiting for a command.
    Resting,
    /// Following a pre-plotted route.
    Traveling,
    /// Wandering into rooms it has not seen yet.
    Adventuring,
    /// Ran into trouble (or ran out of food). Backtracking to the entry.
    Nope,
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AgentState::Resting => "Resting",
            AgentState::Traveling => "Traveling",
            AgentState::Adventuring => "Adventuring",
            AgentState::Nope => "NOPE",
        };
        f.write_str(name)
    }
}

/// Orders a resting explorer can receive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentCommand {
    /// Start adventuring from the current room.
    Explore,
    /// Walk to a room the explorer has already seen.
    TravelTo(NodeId),
}

/// An explorer. Lives as a component on a `hecs` entity.
#[derive(Debug, Clone)]
pub struct Agent {
    pub id: AgentId,
    pub alive: bool,
    pub state: AgentState,
    pub location: NodeId,
    /// Remaining moves.
    pub food: u32,
    /// Edges still to walk while traveling or retreating.
    pub route: VecDeque<EdgeId>,
    /// Successful moves so far.
    pub moves: u32,
    /// Rooms arrived at, in order (not including the spawn room).
    pub trail: Vec<NodeId>,
}

impl Agent {
    pub fn new(id: AgentId, location: NodeId, food: u32) -> Self {
        Self {
            id,
            alive: true,
            state: AgentState::Resting,
            location,
            food,
            route: VecDeque::new(),
            moves: 0,
            trail: Vec::new(),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Read-only snapshot for reports and renderers.
    pub fn summary(&self, dungeon: &Dungeon) -> AgentSummary {
        AgentSummary {
            id: self.id,
            alive: self.alive,
            state: self.state,
            location: self.location.clone(),
            food: self.food,
            moves: self.moves,
            rooms_revealed: dungeon.revealed_count(self.id),
        }
    }
}

/// Serializable view of an explorer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSummary {
    pub id: AgentId,
    pub alive: bool,
    pub state: AgentState,
    pub location: NodeId,
    pub food: u32,
    pub moves: u32,
    pub rooms_revealed: usize,
}
