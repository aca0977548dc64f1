pub mod config;
pub mod network;
pub mod protocol;
pub mod router;
pub mod types;

pub use config::{DaemonSettings, NeighborConfig};
pub use protocol::{start_tasks, RouterHandle};
pub use router::{RouterEngine, RouterStatus};
pub use types::{LinkCost, RouteEntry, RouterId, VectorEntry, BASE_PORT};
