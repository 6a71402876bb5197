//! Connection management

mod backoff;
mod manager;
mod state;

pub use backoff::Backoff;
pub use manager::ConnectionManager;
pub use state::{ConnectionEvent, ConnectionState, ConnectionStats, DisconnectReason};
