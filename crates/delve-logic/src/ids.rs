//! String identities for graph nodes and edges, numeric identities for agents,
//! and the seedable source that mints fresh ids.

use std::collections::HashSet;
use std::fmt;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Identity of a node in a [`Graph`](crate::graph::Graph).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(String);

/// Identity of a single directed edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeId(String);

/// Identity of an exploring agent. Assigned by the runner in spawn order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub u32);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl EdgeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "agent-{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl PartialEq<str> for NodeId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for NodeId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Mints `id_XXXXXXXX` identities and remembers every id it has seen,
/// so a generated id never shadows an explicit one.
#[derive(Debug, Clone)]
pub struct IdSource {
    rng: ChaCha8Rng,
    issued: HashSet<String>,
}

impl IdSource {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            issued: HashSet::new(),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: ChaCha8Rng::from_entropy(),
            issued: HashSet::new(),
        }
    }

    /// Record an explicitly chosen id. Returns `false` if it was already taken.
    pub fn claim(&mut self, id: &str) -> bool {
        self.issued.insert(id.to_string())
    }

    /// Draw a fresh, never-before-seen id.
    pub fn fresh(&mut self) -> String {
        loop {
            let candidate = format!("id_{:08x}", self.rng.gen::<u32>());
            if self.issued.insert(candidate.clone()) {
                return candidate;
            }
        }
    }

    /// Cosmetic footprint for a new node, in `[0.5, 4.0)` on each axis.
    pub fn footprint(&mut self) -> (f32, f32) {
        (self.rng.gen_range(0.5..4.0), self.rng.gen_range(0.5..4.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_ids_are_unique_and_prefixed() {
        let mut ids = IdSource::from_seed(7);
        let a = ids.fresh();
        let b = ids.fresh();
        assert_ne!(a, b);
        assert!(a.starts_with("id_"));
        assert_eq!(a.len(), 11);
    }

    #[test]
    fn same_seed_same_sequence() {
        let mut a = IdSource::from_seed(99);
        let mut b = IdSource::from_seed(99);
        for _ in 0..10 {
            assert_eq!(a.fresh(), b.fresh());
        }
    }

    #[test]
    fn claim_rejects_taken_ids() {
        let mut ids = IdSource::from_seed(1);
        assert!(ids.claim("entry"));
        assert!(!ids.claim("entry"));
    }

    #[test]
    fn node_id_compares_with_str() {
        let id = NodeId::new("exit");
        assert_eq!(id, "exit");
        assert_eq!(id.to_string(), "exit");
        assert_eq!(AgentId(3).to_string(), "agent-3");
    }
}
