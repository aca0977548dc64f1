use crate::config::{DaemonSettings, NeighborConfig};
use crate::network::{PortMap, Transport};
use crate::protocol::{
    Advertisement, DistanceVectorStore, ForwardingTable, LinkState, NeighborVector,
    NeighborVectorCache,
};
use crate::types::{Link, RouteEntry, RouterId, VectorEntry};
use anyhow::Context;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::Serialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// What a config reload changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReloadOutcome {
    pub router_id: RouterId,
    pub first_load: bool,
    /// Neighbors seen for the first time on this reload.
    pub new_neighbors: usize,
    /// Neighbors whose link cost differs from the previous reload.
    pub changed_costs: usize,
}

/// Routing state mutated by both the reload timer and the receive loop.
/// The engine keeps it behind one lock so the two never interleave.
#[derive(Debug, Default)]
pub struct RoutingState {
    own_id: Option<RouterId>,
    links: LinkState,
    vectors: NeighborVectorCache,
    store: DistanceVectorStore,
}

impl RoutingState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn own_id(&self) -> Option<RouterId> {
        self.own_id
    }

    pub fn links(&self) -> &LinkState {
        &self.links
    }

    pub fn vectors(&self) -> &NeighborVectorCache {
        &self.vectors
    }

    pub fn store(&self) -> &DistanceVectorStore {
        &self.store
    }

    /// Apply a freshly read config.
    ///
    /// The first load records the id and seeds the store and table with the
    /// self route and direct routes. Every load refreshes link costs, but
    /// later loads leave the store and table alone: a changed cost only
    /// matters once an advertisement triggers a recomputation.
    pub fn apply_config(&mut self, config: &NeighborConfig, table: &ForwardingTable) -> ReloadOutcome {
        let first_load = self.own_id.is_none();
        let own_id = *self.own_id.get_or_insert(config.router_id);

        if config.router_id != own_id {
            warn!(
                "Config now declares router id {} but this router is {}, keeping {}",
                config.router_id, own_id, own_id
            );
        }

        let mut new_neighbors = 0;
        let mut changed_costs = 0;
        for link in &config.links {
            if link.neighbor == own_id {
                warn!("Ignoring link from router {} to itself", own_id);
                continue;
            }
            match self.links.set_cost(link.neighbor, link.cost) {
                None => new_neighbors += 1,
                Some(previous) if previous != link.cost => {
                    info!(
                        "Link cost to {} changed from {} to {}",
                        link.neighbor, previous, link.cost
                    );
                    changed_costs += 1;
                }
                Some(_) => {}
            }
        }

        if first_load {
            self.store = DistanceVectorStore::seed(own_id, &config.links);
            table.reset(self.store.routes());
            info!(
                "Router {} initialised with {} direct neighbors",
                own_id,
                self.links.len()
            );
        }

        ReloadOutcome {
            router_id: own_id,
            first_load,
            new_neighbors,
            changed_costs,
        }
    }

    /// Cache the vector a neighbor sent and recompute. Publishes the store
    /// into the table and returns true when any route changed.
    pub fn apply_advertisement(
        &mut self,
        sender: RouterId,
        entries: Vec<VectorEntry>,
        table: &ForwardingTable,
    ) -> bool {
        let Some(own_id) = self.own_id else {
            debug!("Advertisement from {} before first config load, ignoring", sender);
            return false;
        };

        if !self.links.contains(sender) && self.vectors.get(sender).is_none() {
            warn!(
                "Router {} is not a configured neighbor, its vectors are ignored until a link to it is configured",
                sender
            );
        }

        self.vectors.store(sender, entries);
        let outcome = self.store.recompute(own_id, &self.links, &self.vectors);
        if outcome.changed {
            table.reset(self.store.routes());
        }
        outcome.changed
    }
}

/// A serializable view of a router, written out for operators.
#[derive(Debug, Clone, Serialize)]
pub struct RouterStatus {
    pub router_id: Option<RouterId>,
    pub generated_at: DateTime<Utc>,
    pub routes: Vec<RouteEntry>,
    pub links: Vec<Link>,
    pub neighbors: Vec<NeighborStatus>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NeighborStatus {
    pub router_id: RouterId,
    #[serde(flatten)]
    pub vector: NeighborVector,
}

/// One router: owns the forwarding table, the routing state and the socket.
pub struct RouterEngine {
    config_path: PathBuf,
    settings: DaemonSettings,
    table: ForwardingTable,
    state: Mutex<RoutingState>,
    transport: Transport,
}

impl RouterEngine {
    pub fn new(config_path: impl Into<PathBuf>, settings: DaemonSettings) -> Self {
        let ports = PortMap::new(settings.bind_address, settings.base_port);
        Self {
            config_path: config_path.into(),
            settings,
            table: ForwardingTable::new(),
            state: Mutex::new(RoutingState::new()),
            transport: Transport::new(ports),
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn settings(&self) -> &DaemonSettings {
        &self.settings
    }

    pub fn forwarding_table(&self) -> &ForwardingTable {
        &self.table
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub async fn router_id(&self) -> Option<RouterId> {
        self.state.lock().await.own_id()
    }

    /// Re-read the config file, refresh link state, then advertise the table.
    pub async fn reload_config(&self) -> anyhow::Result<ReloadOutcome> {
        let config = NeighborConfig::load(&self.config_path)
            .with_context(|| format!("failed to load {}", self.config_path.display()))?;

        let outcome = {
            let mut state = self.state.lock().await;
            if state.own_id().is_none() {
                self.transport
                    .bind(config.router_id)
                    .await
                    .with_context(|| format!("failed to bind router {}", config.router_id))?;
            }
            state.apply_config(&config, &self.table)
        };

        debug!(
            "Reloaded config for router {} ({} new neighbors, {} cost changes)",
            outcome.router_id, outcome.new_neighbors, outcome.changed_costs
        );

        self.broadcast().await;
        Ok(outcome)
    }

    /// Handle one received datagram. Returns whether the table changed.
    pub async fn handle_datagram(&self, payload: &[u8], from: SocketAddr) -> anyhow::Result<bool> {
        let sender = self
            .transport
            .ports()
            .router_id_of(from)
            .with_context(|| format!("source {} does not map to a router id", from))?;

        let advertisement = Advertisement::decode(payload)
            .with_context(|| format!("malformed advertisement from router {}", sender))?;

        debug!(
            "Received {} entries from router {}",
            advertisement.len(),
            sender
        );

        let changed = {
            let mut state = self.state.lock().await;
            state.apply_advertisement(sender, advertisement.entries, &self.table)
        };

        if changed {
            info!("Forwarding table changed after update from {}", sender);
            debug!("Forwarding table:\n{}", self.table);
            self.broadcast().await;
        }

        Ok(changed)
    }

    /// Send the current table to every configured neighbor. Next hops are
    /// not advertised. A table too large for one message and per-neighbor
    /// send failures are logged and skipped; the routing state is already
    /// committed by the time this runs. Returns how many sends succeeded.
    pub async fn broadcast(&self) -> usize {
        let neighbors = self.state.lock().await.links().neighbors();
        let advertisement = Advertisement::from_routes(&self.table.snapshot());
        let payload = match advertisement.encode() {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Skipping advertisement: {}", e);
                return 0;
            }
        };

        let mut sent = 0;
        for neighbor in neighbors {
            match self.transport.send_to(neighbor, &payload).await {
                Ok(()) => sent += 1,
                Err(e) => warn!("Failed to send update to router {}: {}", neighbor, e),
            }
        }

        debug!(
            "Advertised {} routes to {} neighbors",
            advertisement.len(),
            sent
        );
        sent
    }

    pub async fn status(&self) -> RouterStatus {
        let state = self.state.lock().await;
        RouterStatus {
            router_id: state.own_id(),
            generated_at: Utc::now(),
            routes: self.table.snapshot(),
            links: state.links().links(),
            neighbors: state
                .vectors()
                .iter()
                .map(|(router_id, vector)| NeighborStatus {
                    router_id,
                    vector: vector.clone(),
                })
                .collect(),
        }
    }

    /// Write `status()` as JSON to the configured status file, if any.
    pub async fn write_status(&self) -> anyhow::Result<()> {
        let Some(path) = &self.settings.status_file else {
            return Ok(());
        };
        let status = self.status().await;
        let content = serde_json::to_string_pretty(&status)?;
        tokio::fs::write(path, content)
            .await
            .with_context(|| format!("failed to write status to {}", path.display()))?;
        Ok(())
    }
}
