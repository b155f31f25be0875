//! Exploration system - drives the explorer state machine one tick at a time.
//!
//! Explorers only ever touch the level through [`VisibilityGate`], so they
//! can route and choose moves over rooms they have personally seen.
//!
//! ```text
//! Resting --command--> Traveling | Adventuring
//! Traveling   --route empty--> Resting (at entry) | Adventuring
//! Adventuring --no food / dead end--> NOPE
//! NOPE        --reached entry--> Resting
//! NOPE        --out of food--> dead
//! ```

use std::collections::{HashMap, HashSet, VecDeque};

use hecs::World;
use rand::seq::SliceRandom;
use rand::Rng;

use delve_logic::dungeon::entry_id;
use delve_logic::ids::{AgentId, EdgeId, NodeId};
use delve_logic::{Dungeon, VisibilityGate};

use crate::components::{Agent, AgentCommand, AgentState, AgentSummary};
use crate::error::{AgentError, RunError};

/// Create an explorer standing in `at` and reveal that room to it.
pub fn spawn_explorer<G: VisibilityGate + ?Sized>(
    gate: &mut G,
    id: AgentId,
    at: NodeId,
    food: u32,
) -> Result<Agent, AgentError> {
    gate.visit(id, &at)?;
    Ok(Agent::new(id, at, food))
}

/// Hand a command to a resting explorer. Returns whether it was accepted.
pub fn command_agent<G: VisibilityGate + ?Sized>(
    agent: &mut Agent,
    gate: &G,
    command: AgentCommand,
) -> bool {
    if !agent.is_alive() || agent.state != AgentState::Resting {
        log::debug!("{} ignored {:?} while {}", agent.id, command, agent.state);
        return false;
    }

    match command {
        AgentCommand::Explore => {
            agent.route.clear();
            agent.state = AgentState::Adventuring;
            true
        }
        AgentCommand::TravelTo(destination) => {
            match plot_route(gate, agent.id, &agent.location, &destination) {
                Some(route) => {
                    agent.route = route;
                    agent.state = AgentState::Traveling;
                    true
                }
                None => {
                    log::debug!("{} has no known route to {}", agent.id, destination);
                    false
                }
            }
        }
    }
}

/// Shortest route from `from` to `to` using only rooms `agent` has seen.
///
/// Breadth-first over gated edges, so ties follow corridor insertion order.
/// Returns `None` if `to` is unseen or not connected through seen rooms.
pub fn plot_route<G: VisibilityGate + ?Sized>(
    gate: &G,
    agent: AgentId,
    from: &NodeId,
    to: &NodeId,
) -> Option<VecDeque<EdgeId>> {
    if from == to {
        return Some(VecDeque::new());
    }
    if !gate.check_read(agent, to) {
        return None;
    }

    let mut came_from: HashMap<NodeId, (NodeId, EdgeId)> = HashMap::new();
    let mut seen = HashSet::from([from.clone()]);
    let mut queue = VecDeque::from([from.clone()]);

    while let Some(current) = queue.pop_front() {
        let Some(edges) = gate.node_edges(agent, &current) else {
            continue;
        };
        for edge in edges {
            let next = edge.target();
            if seen.contains(next) || !gate.check_read(agent, next) {
                continue;
            }
            seen.insert(next.clone());
            came_from.insert(next.clone(), (current.clone(), edge.id().clone()));

            if next == to {
                let mut route = VecDeque::new();
                let mut cursor = to.clone();
                while let Some((prev, via)) = came_from.get(&cursor) {
                    route.push_front(via.clone());
                    cursor = prev.clone();
                }
                return Some(route);
            }
            queue.push_back(next.clone());
        }
    }

    None
}

/// Walk one corridor out of the explorer's current room.
///
/// Fails without side effects if the explorer has no food or the edge is not
/// one of its room's corridors. On success the food drops by exactly one and
/// the new room is revealed.
pub fn move_to_location<G: VisibilityGate + ?Sized>(
    agent: &mut Agent,
    gate: &mut G,
    edge: &EdgeId,
) -> Result<NodeId, AgentError> {
    if agent.food == 0 {
        return Err(AgentError::OutOfBudget { agent: agent.id });
    }

    let target = gate
        .edge_target(agent.id, &agent.location, edge)
        .ok_or_else(|| AgentError::UnknownEdge {
            agent: agent.id,
            node: agent.location.clone(),
            edge: edge.clone(),
        })?;

    agent.food -= 1;
    agent.moves += 1;
    agent.location = target.clone();
    gate.visit(agent.id, &target)?;
    on_arrival(agent, &target);
    Ok(target)
}

/// Hook run after every move. Looking around a room is just remembering it for now.
fn on_arrival(agent: &mut Agent, room: &NodeId) {
    agent.trail.push(room.clone());
}

/// Advance one explorer by one tick.
pub fn tick_agent<G: VisibilityGate + ?Sized>(
    agent: &mut Agent,
    gate: &mut G,
    rng: &mut impl Rng,
) -> Result<(), AgentError> {
    if !agent.is_alive() {
        return Ok(());
    }

    match agent.state {
        AgentState::Resting => Ok(()),
        AgentState::Traveling => travel_tick(agent, gate),
        AgentState::Adventuring => adventure_tick(agent, gate, rng),
        AgentState::Nope => retreat_tick(agent, gate),
    }
}

fn travel_tick<G: VisibilityGate + ?Sized>(
    agent: &mut Agent,
    gate: &mut G,
) -> Result<(), AgentError> {
    let Some(edge) = agent.route.pop_front() else {
        finish_travel(agent);
        return Ok(());
    };

    match move_to_location(agent, gate, &edge) {
        Ok(_) => {
            if agent.route.is_empty() {
                finish_travel(agent);
            }
            Ok(())
        }
        Err(AgentError::OutOfBudget { .. }) => {
            begin_retreat(agent, gate);
            Ok(())
        }
        Err(e) => Err(e),
    }
}

fn finish_travel(agent: &mut Agent) {
    agent.state = if agent.location == entry_id() {
        AgentState::Resting
    } else {
        AgentState::Adventuring
    };
}

fn adventure_tick<G: VisibilityGate + ?Sized>(
    agent: &mut Agent,
    gate: &mut G,
    rng: &mut impl Rng,
) -> Result<(), AgentError> {
    if agent.food == 0 {
        begin_retreat(agent, gate);
        return Ok(());
    }

    let edges = gate
        .node_edges(agent.id, &agent.location)
        .ok_or_else(|| AgentError::LostInFog {
            agent: agent.id,
            node: agent.location.clone(),
        })?;

    let unexplored: Vec<&EdgeId> = edges
        .iter()
        .filter(|e| !gate.check_read(agent.id, e.target()))
        .map(|e| e.id())
        .collect();

    match unexplored.choose(rng) {
        Some(&edge) => {
            let edge = edge.clone();
            move_to_location(agent, gate, &edge)?;
        }
        None => begin_retreat(agent, gate),
    }
    Ok(())
}

fn retreat_tick<G: VisibilityGate + ?Sized>(
    agent: &mut Agent,
    gate: &mut G,
) -> Result<(), AgentError> {
    if agent.location == entry_id() {
        arrive_home(agent);
        return Ok(());
    }

    let Some(edge) = agent.route.pop_front() else {
        // Route ran dry away from home; plot again from here.
        begin_retreat(agent, gate);
        return Ok(());
    };

    match move_to_location(agent, gate, &edge) {
        Ok(_) => {
            if agent.location == entry_id() {
                arrive_home(agent);
            }
            Ok(())
        }
        Err(AgentError::OutOfBudget { .. }) => {
            die(agent, "starved on the way back");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Switch to NOPE and plot the way home over seen rooms.
fn begin_retreat<G: VisibilityGate + ?Sized>(agent: &mut Agent, gate: &G) {
    if agent.location == entry_id() {
        arrive_home(agent);
        return;
    }

    match plot_route(gate, agent.id, &agent.location, &entry_id()) {
        Some(route) if !route.is_empty() => {
            log::debug!(
                "{} retreating from {} ({} moves home, {} food)",
                agent.id,
                agent.location,
                route.len(),
                agent.food
            );
            agent.route = route;
            agent.state = AgentState::Nope;
        }
        _ => die(agent, "lost with no known way home"),
    }
}

fn arrive_home(agent: &mut Agent) {
    agent.route.clear();
    agent.state = AgentState::Resting;
}

fn die(agent: &mut Agent, reason: &str) {
    log::warn!("{} died at {}: {}", agent.id, agent.location, reason);
    agent.alive = false;
    agent.route.clear();
}

/// Tick every living explorer once, in spawn order.
///
/// Explorers that die this tick are despawned; their final summaries are
/// returned. A structural failure from any explorer aborts the tick.
pub fn exploration_system(
    world: &mut World,
    dungeon: &mut Dungeon,
    rng: &mut impl Rng,
) -> Result<Vec<AgentSummary>, RunError> {
    let mut roster: Vec<(hecs::Entity, AgentId)> = world
        .query::<&Agent>()
        .iter()
        .filter(|(_, agent)| agent.is_alive())
        .map(|(entity, agent)| (entity, agent.id))
        .collect();
    roster.sort_by_key(|(_, id)| *id);

    let mut fallen = Vec::new();
    for (entity, id) in roster {
        let Ok(mut agent) = world.get::<&mut Agent>(entity) else {
            continue;
        };
        tick_agent(&mut agent, dungeon, rng)
            .map_err(|source| RunError::Agent { agent: id, source })?;
        if !agent.is_alive() {
            fallen.push((entity, agent.summary(dungeon)));
        }
    }

    Ok(fallen
        .into_iter()
        .map(|(entity, summary)| {
            let _ = world.despawn(entity);
            summary
        })
        .collect())
}
