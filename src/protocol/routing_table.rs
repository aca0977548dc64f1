use crate::types::{LinkCost, RouteEntry, RouterId};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Externally visible routing state: destination -> (next hop, cost).
///
/// All reads and writes go through one lock owned by the table. Callers
/// take snapshots instead of holding the lock, so it is never held across
/// a network call.
#[derive(Debug, Default)]
pub struct ForwardingTable {
    entries: Mutex<BTreeMap<RouterId, (RouterId, LinkCost)>>,
}

impl ForwardingTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<RouterId, (RouterId, LinkCost)>> {
        // A panic while holding the lock cannot leave the map half-written:
        // every mutation is a single insert or a whole swap.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Consistent copy of every entry, ordered by destination.
    pub fn snapshot(&self) -> Vec<RouteEntry> {
        self.lock()
            .iter()
            .map(|(dest, (next_hop, cost))| RouteEntry::new(*dest, *next_hop, *cost))
            .collect()
    }

    /// Replace the whole table. Readers see either the old or the new contents.
    pub fn reset(&self, entries: &[RouteEntry]) {
        let fresh: BTreeMap<_, _> = entries
            .iter()
            .map(|e| (e.destination, (e.next_hop, e.cost)))
            .collect();
        *self.lock() = fresh;
    }

    pub fn size(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn find_cost_to_destination(&self, destination: RouterId) -> Option<LinkCost> {
        self.lock().get(&destination).map(|(_, cost)| *cost)
    }

    /// Cost to `destination`, only if the route goes through `next_hop`.
    pub fn find_cost(&self, destination: RouterId, next_hop: RouterId) -> Option<LinkCost> {
        self.lock()
            .get(&destination)
            .filter(|(hop, _)| *hop == next_hop)
            .map(|(_, cost)| *cost)
    }

    pub fn get_route(&self, destination: RouterId) -> Option<RouteEntry> {
        self.lock()
            .get(&destination)
            .map(|(next_hop, cost)| RouteEntry::new(destination, *next_hop, *cost))
    }

    /// Insert or overwrite the entry for `entry.destination`.
    pub fn add_entry(&self, entry: RouteEntry) {
        self.lock()
            .insert(entry.destination, (entry.next_hop, entry.cost));
    }

    /// Overwrite an existing entry. Returns false if the destination is unknown.
    pub fn replace_entry(&self, entry: RouteEntry) -> bool {
        let mut guard = self.lock();
        match guard.get_mut(&entry.destination) {
            Some(slot) => {
                *slot = (entry.next_hop, entry.cost);
                true
            }
            None => false,
        }
    }
}

impl fmt::Display for ForwardingTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ID\tNextHop\tCost")?;
        for route in self.snapshot() {
            writeln!(f, "{}\t{}\t{}", route.destination, route.next_hop, route.cost)?;
        }
        Ok(())
    }
}
