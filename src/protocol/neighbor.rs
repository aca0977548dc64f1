use crate::types::{Link, LinkCost, RouterId, VectorEntry};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Direct link costs to each configured neighbor.
///
/// Only config reloads write here. Neighbors are added or re-costed,
/// never removed.
#[derive(Debug, Clone, Default)]
pub struct LinkState {
    costs: BTreeMap<RouterId, LinkCost>,
}

impl LinkState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the cost of the link to `neighbor`, returning the previous one.
    pub fn set_cost(&mut self, neighbor: RouterId, cost: LinkCost) -> Option<LinkCost> {
        self.costs.insert(neighbor, cost)
    }

    pub fn cost(&self, neighbor: RouterId) -> Option<LinkCost> {
        self.costs.get(&neighbor).copied()
    }

    pub fn contains(&self, neighbor: RouterId) -> bool {
        self.costs.contains_key(&neighbor)
    }

    pub fn neighbors(&self) -> Vec<RouterId> {
        self.costs.keys().copied().collect()
    }

    pub fn links(&self) -> Vec<Link> {
        self.costs
            .iter()
            .map(|(neighbor, cost)| Link {
                neighbor: *neighbor,
                cost: *cost,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.costs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.costs.is_empty()
    }
}

/// Last advertisement heard from a neighbor.
#[derive(Debug, Clone, Serialize)]
pub struct NeighborVector {
    pub entries: Vec<VectorEntry>,
    pub received_at: DateTime<Utc>,
}

/// Most recent vector per neighbor. A new vector replaces the old one
/// whole; entries are never merged.
#[derive(Debug, Clone, Default)]
pub struct NeighborVectorCache {
    vectors: BTreeMap<RouterId, NeighborVector>,
}

impl NeighborVectorCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&mut self, neighbor: RouterId, entries: Vec<VectorEntry>) {
        self.vectors.insert(
            neighbor,
            NeighborVector {
                entries,
                received_at: Utc::now(),
            },
        );
    }

    pub fn get(&self, neighbor: RouterId) -> Option<&NeighborVector> {
        self.vectors.get(&neighbor)
    }

    pub fn iter(&self) -> impl Iterator<Item = (RouterId, &NeighborVector)> {
        self.vectors.iter().map(|(id, vector)| (*id, vector))
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}
