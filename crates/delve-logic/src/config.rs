//! Run configuration for exploration runs and soak tests.
//!
//! ```
//! use delve_logic::config::{validate_config, RunConfig};
//!
//! let config = RunConfig {
//!     node_count: 25,
//!     edge_count: 10,
//!     ..Default::default()
//! };
//! assert!(validate_config(&config).is_empty());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound on rooms per level.
pub const MAX_NODE_COUNT: usize = 100_000;
/// Upper bound on seed corridors per level.
pub const MAX_EDGE_COUNT: usize = 1_000_000;

/// Parameters for one exploration run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Rooms to scatter besides `entry` and `exit`.
    pub node_count: usize,
    /// Random corridors to scatter before connectivity repair.
    pub edge_count: usize,
    /// Explorers spawned at `entry`.
    pub agent_count: u32,
    /// Movement budget each explorer starts with.
    pub food: u32,
    /// Hard ceiling on exploration ticks per run.
    pub max_ticks: u64,
    /// Base seed (None = random).
    pub seed: Option<u64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            node_count: 100,
            edge_count: 200,
            agent_count: 4,
            food: 40,
            max_ticks: 10_000,
            seed: None,
        }
    }
}

/// Configuration validation error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("at least one agent is required")]
    NoAgents,
    #[error("agents need a non-zero movement budget")]
    NoFood,
    #[error("max_ticks must be non-zero")]
    NoTicks,
    #[error("node count {0} exceeds {max}", max = MAX_NODE_COUNT)]
    TooManyNodes(usize),
    #[error("edge count {0} exceeds {max}", max = MAX_EDGE_COUNT)]
    TooManyEdges(usize),
}

/// Validate a run configuration, returning all errors found.
pub fn validate_config(config: &RunConfig) -> Vec<ConfigError> {
    let mut errors = Vec::new();

    if config.agent_count == 0 {
        errors.push(ConfigError::NoAgents);
    }
    if config.food == 0 {
        errors.push(ConfigError::NoFood);
    }
    if config.max_ticks == 0 {
        errors.push(ConfigError::NoTicks);
    }
    if config.node_count > MAX_NODE_COUNT {
        errors.push(ConfigError::TooManyNodes(config.node_count));
    }
    if config.edge_count > MAX_EDGE_COUNT {
        errors.push(ConfigError::TooManyEdges(config.edge_count));
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(validate_config(&RunConfig::default()).is_empty());
    }

    #[test]
    fn test_collects_every_error() {
        let config = RunConfig {
            agent_count: 0,
            food: 0,
            max_ticks: 0,
            node_count: MAX_NODE_COUNT + 1,
            edge_count: MAX_EDGE_COUNT + 1,
            seed: None,
        };
        let errors = validate_config(&config);
        assert_eq!(errors.len(), 5);
        assert!(errors.contains(&ConfigError::NoAgents));
        assert!(errors.contains(&ConfigError::TooManyNodes(MAX_NODE_COUNT + 1)));
    }

    #[test]
    fn test_empty_level_is_allowed() {
        let config = RunConfig {
            node_count: 0,
            edge_count: 0,
            ..Default::default()
        };
        assert!(validate_config(&config).is_empty());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: RunConfig =
            serde_json::from_str(r#"{ "node_count": 25, "edge_count": 10, "seed": 3 }"#).unwrap();
        assert_eq!(config.node_count, 25);
        assert_eq!(config.seed, Some(3));
        assert_eq!(config.agent_count, RunConfig::default().agent_count);
    }
}
