use super::neighbor::{LinkState, NeighborVectorCache};
use crate::types::{Link, LinkCost, RouteEntry, RouterId};
use log::debug;

/// What a recomputation pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Recomputation {
    pub changed: bool,
    /// Senders with a cached vector but no configured link; their vectors were skipped.
    pub unknown_senders: Vec<RouterId>,
    /// Candidates dropped because link cost plus advertised cost left the 16-bit range.
    pub overflowed: usize,
}

/// The router's own best route per destination, the write side from
/// which the forwarding table is published.
///
/// Routes only ever improve: a candidate replaces an existing route when
/// it is strictly cheaper, and nothing is removed or aged out. When the
/// current next hop later advertises a higher cost, the old route stays
/// in place, so link-cost increases do not propagate and the usual
/// count-to-infinity exposure of distance-vector routing remains.
#[derive(Debug, Clone, Default)]
pub struct DistanceVectorStore {
    routes: Vec<RouteEntry>,
}

impl DistanceVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Self route plus one direct route per configured link.
    pub fn seed(own_id: RouterId, links: &[Link]) -> Self {
        let mut store = Self {
            routes: vec![RouteEntry::self_route(own_id)],
        };
        for link in links {
            if link.neighbor == own_id {
                continue;
            }
            store.upsert(RouteEntry::new(link.neighbor, link.neighbor, link.cost));
        }
        store
    }

    pub fn routes(&self) -> &[RouteEntry] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn route_to(&self, destination: RouterId) -> Option<&RouteEntry> {
        self.routes.iter().find(|r| r.destination == destination)
    }

    pub fn cost_to(&self, destination: RouterId) -> Option<LinkCost> {
        self.route_to(destination).map(|r| r.cost)
    }

    fn upsert(&mut self, route: RouteEntry) {
        match self
            .routes
            .iter_mut()
            .find(|r| r.destination == route.destination)
        {
            Some(slot) => *slot = route,
            None => self.routes.push(route),
        }
    }

    /// Bellman-Ford relaxation over every cached neighbor vector.
    pub fn recompute(
        &mut self,
        own_id: RouterId,
        links: &LinkState,
        vectors: &NeighborVectorCache,
    ) -> Recomputation {
        let mut outcome = Recomputation::default();

        for (neighbor, vector) in vectors.iter() {
            let Some(link_cost) = links.cost(neighbor) else {
                debug!("No link configured to {}, skipping its vector", neighbor);
                outcome.unknown_senders.push(neighbor);
                continue;
            };

            for advertised in &vector.entries {
                if advertised.destination == own_id {
                    continue;
                }

                let Some(candidate) = link_cost.checked_add(advertised.cost) else {
                    debug!(
                        "Dropping route to {} via {}: {} + {} overflows",
                        advertised.destination, neighbor, link_cost, advertised.cost
                    );
                    outcome.overflowed += 1;
                    continue;
                };

                match self
                    .routes
                    .iter_mut()
                    .find(|r| r.destination == advertised.destination)
                {
                    None => {
                        debug!(
                            "New destination {} via {} cost {}",
                            advertised.destination, neighbor, candidate
                        );
                        self.routes
                            .push(RouteEntry::new(advertised.destination, neighbor, candidate));
                        outcome.changed = true;
                    }
                    Some(existing) if candidate < existing.cost => {
                        debug!(
                            "Better route to {}: via {} cost {} (was via {} cost {})",
                            advertised.destination, neighbor, candidate, existing.next_hop, existing.cost
                        );
                        existing.next_hop = neighbor;
                        existing.cost = candidate;
                        outcome.changed = true;
                    }
                    Some(_) => {}
                }
            }
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::VectorEntry;

    fn link(neighbor: u16, cost: u16) -> Link {
        Link {
            neighbor: RouterId(neighbor),
            cost: LinkCost(cost),
        }
    }

    fn entry(dest: u16, cost: u16) -> VectorEntry {
        VectorEntry::new(RouterId(dest), LinkCost(cost))
    }

    fn links_of(pairs: &[Link]) -> LinkState {
        let mut links = LinkState::new();
        for l in pairs {
            links.set_cost(l.neighbor, l.cost);
        }
        links
    }

    #[test]
    fn test_seed_has_self_and_direct_routes() {
        let store = DistanceVectorStore::seed(RouterId(0), &[link(1, 4), link(2, 7)]);
        assert_eq!(
            store.routes(),
            &[
                RouteEntry::new(RouterId(0), RouterId(0), LinkCost(0)),
                RouteEntry::new(RouterId(1), RouterId(1), LinkCost(4)),
                RouteEntry::new(RouterId(2), RouterId(2), LinkCost(7)),
            ]
        );
    }

    #[test]
    fn test_seed_keeps_destinations_unique() {
        let store = DistanceVectorStore::seed(RouterId(0), &[link(1, 4), link(0, 3), link(1, 2)]);
        assert_eq!(store.len(), 2);
        assert_eq!(store.cost_to(RouterId(0)), Some(LinkCost(0)));
        assert_eq!(store.cost_to(RouterId(1)), Some(LinkCost(2)));
    }

    #[test]
    fn test_new_destination_is_appended() {
        let pairs = [link(1, 3)];
        let mut store = DistanceVectorStore::seed(RouterId(0), &pairs);
        let mut cache = NeighborVectorCache::new();
        cache.store(RouterId(1), vec![entry(1, 0), entry(2, 5)]);

        let outcome = store.recompute(RouterId(0), &links_of(&pairs), &cache);
        assert!(outcome.changed);
        assert_eq!(
            store.route_to(RouterId(2)),
            Some(&RouteEntry::new(RouterId(2), RouterId(1), LinkCost(8)))
        );
    }

    #[test]
    fn test_only_strictly_cheaper_candidates_replace() {
        let pairs = [link(1, 1), link(2, 1)];
        let links = links_of(&pairs);
        let mut store = DistanceVectorStore::seed(RouterId(0), &pairs);
        let mut cache = NeighborVectorCache::new();

        cache.store(RouterId(1), vec![entry(3, 4)]);
        assert!(store.recompute(RouterId(0), &links, &cache).changed);

        // Same cost through another neighbor: keep the first one.
        cache.store(RouterId(2), vec![entry(3, 4)]);
        assert!(!store.recompute(RouterId(0), &links, &cache).changed);
        assert_eq!(store.route_to(RouterId(3)).unwrap().next_hop, RouterId(1));

        cache.store(RouterId(2), vec![entry(3, 2)]);
        assert!(store.recompute(RouterId(0), &links, &cache).changed);
        assert_eq!(
            store.route_to(RouterId(3)),
            Some(&RouteEntry::new(RouterId(3), RouterId(2), LinkCost(3)))
        );
    }

    #[test]
    fn test_recompute_never_raises_existing_cost() {
        let pairs = [link(1, 2), link(2, 9)];
        let links = links_of(&pairs);
        let mut store = DistanceVectorStore::seed(RouterId(0), &pairs);
        let mut cache = NeighborVectorCache::new();
        cache.store(RouterId(1), vec![entry(2, 1), entry(5, 3)]);
        cache.store(RouterId(2), vec![entry(1, 0), entry(5, 0)]);

        let before: Vec<_> = store.routes().to_vec();
        store.recompute(RouterId(0), &links, &cache);

        for old in before {
            let new_cost = store.cost_to(old.destination).unwrap();
            assert!(new_cost <= old.cost, "cost to {} went up", old.destination);
        }
    }

    #[test]
    fn test_own_id_is_never_learned() {
        let pairs = [link(1, 1)];
        let mut store = DistanceVectorStore::new();
        let mut cache = NeighborVectorCache::new();
        cache.store(RouterId(1), vec![entry(0, 0), entry(1, 0)]);

        store.recompute(RouterId(0), &links_of(&pairs), &cache);
        assert!(store.route_to(RouterId(0)).is_none());
    }

    #[test]
    fn test_unknown_sender_is_skipped() {
        let pairs = [link(1, 1)];
        let mut store = DistanceVectorStore::seed(RouterId(0), &pairs);
        let mut cache = NeighborVectorCache::new();
        cache.store(RouterId(7), vec![entry(8, 1)]);

        let outcome = store.recompute(RouterId(0), &links_of(&pairs), &cache);
        assert!(!outcome.changed);
        assert_eq!(outcome.unknown_senders, vec![RouterId(7)]);
        assert!(store.route_to(RouterId(8)).is_none());
    }

    #[test]
    fn test_overflowing_candidate_is_dropped() {
        let pairs = [link(1, 10)];
        let mut store = DistanceVectorStore::seed(RouterId(0), &pairs);
        let mut cache = NeighborVectorCache::new();
        cache.store(RouterId(1), vec![entry(2, u16::MAX - 5)]);

        let outcome = store.recompute(RouterId(0), &links_of(&pairs), &cache);
        assert_eq!(outcome.overflowed, 1);
        assert!(store.route_to(RouterId(2)).is_none());
    }

    #[test]
    fn test_cost_increase_from_current_next_hop_is_not_applied() {
        let pairs = [link(1, 1)];
        let links = links_of(&pairs);
        let mut store = DistanceVectorStore::seed(RouterId(0), &pairs);
        let mut cache = NeighborVectorCache::new();

        cache.store(RouterId(1), vec![entry(2, 1)]);
        store.recompute(RouterId(0), &links, &cache);
        cache.store(RouterId(1), vec![entry(2, 50)]);
        let outcome = store.recompute(RouterId(0), &links, &cache);

        assert!(!outcome.changed);
        assert_eq!(store.cost_to(RouterId(2)), Some(LinkCost(2)));
    }
}
