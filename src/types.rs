use serde::{Deserialize, Serialize};
use std::fmt;

/// Default base of the port range: router `id` listens on `BASE_PORT + id`.
pub const BASE_PORT: u16 = 8000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouterId(pub u16);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkCost(pub u16);

impl LinkCost {
    pub const ZERO: LinkCost = LinkCost(0);

    /// Additive composition of two costs. `None` when the sum leaves the
    /// 16-bit range the wire format can carry.
    pub fn checked_add(self, other: LinkCost) -> Option<LinkCost> {
        self.0.checked_add(other.0).map(LinkCost)
    }
}

impl fmt::Display for RouterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for LinkCost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One forwarding decision: reach `destination` through `next_hop` at `cost`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RouteEntry {
    pub destination: RouterId,
    pub next_hop: RouterId,
    pub cost: LinkCost,
}

impl RouteEntry {
    pub fn new(destination: RouterId, next_hop: RouterId, cost: LinkCost) -> Self {
        Self {
            destination,
            next_hop,
            cost,
        }
    }

    /// Route a router holds to itself.
    pub fn self_route(id: RouterId) -> Self {
        Self::new(id, id, LinkCost::ZERO)
    }

    /// Advertised form of the route; the next hop is never sent.
    pub fn to_vector_entry(&self) -> VectorEntry {
        VectorEntry {
            destination: self.destination,
            cost: self.cost,
        }
    }
}

/// A (destination, cost) pair as carried in an advertisement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VectorEntry {
    pub destination: RouterId,
    pub cost: LinkCost,
}

impl VectorEntry {
    pub fn new(destination: RouterId, cost: LinkCost) -> Self {
        Self { destination, cost }
    }
}

/// A configured direct link to a neighbor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub neighbor: RouterId,
    pub cost: LinkCost,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_add_rejects_wraparound() {
        assert_eq!(LinkCost(3).checked_add(LinkCost(4)), Some(LinkCost(7)));
        assert_eq!(LinkCost(u16::MAX).checked_add(LinkCost(1)), None);
    }

    #[test]
    fn test_vector_entry_drops_next_hop() {
        let route = RouteEntry::new(RouterId(4), RouterId(2), LinkCost(9));
        assert_eq!(route.to_vector_entry(), VectorEntry::new(RouterId(4), LinkCost(9)));
    }

    #[test]
    fn test_ids_serialize_as_plain_numbers() {
        let route = RouteEntry::new(RouterId(1), RouterId(2), LinkCost(3));
        let json = serde_json::to_string(&route).unwrap();
        assert_eq!(json, r#"{"destination":1,"next_hop":2,"cost":3}"#);
    }
}
