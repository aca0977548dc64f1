pub mod messages;
pub mod neighbor;
pub mod route_manager;
pub mod routing_table;
pub mod task_manager;

pub use messages::*;
pub use neighbor::*;
pub use route_manager::*;
pub use routing_table::*;
pub use task_manager::*;
