//! Core types module

mod config;
mod endpoint;
mod source;
mod state;

pub use config::{ConnectionConfig, ReceiverConfig, ReceiverConfigBuilder};
pub use endpoint::{ReceiverEndpoint, ReceiverInfo};
pub use source::SourceMapping;
pub use state::{ReceiverState, ZoneState};

#[cfg(test)]
mod tests;
