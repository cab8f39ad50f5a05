use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::domain::utils::id::NodeId;

/// Planar position of a radio node, used by distance-based topologies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Position) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// A mesh node. Immutable once the topology is built.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,

    /// Only set for topologies which are derived from node placement (grid, unit disk).
    pub position: Option<Position>,

    /// Nodes reachable with a single hop, kept sorted so traversals are reproducible.
    pub neighbors: BTreeSet<NodeId>,
}

impl Node {
    pub fn new(id: NodeId, position: Option<Position>) -> Self {
        Self { id, position, neighbors: BTreeSet::new() }
    }

    pub fn degree(&self) -> usize {
        self.neighbors.len()
    }
}
