//! # onkyo-eiscp
//!
//! A network control client for Onkyo, Integra and Pioneer AV receivers
//! speaking eISCP (ISCP over TCP port 60128).
//!
//! ## Features
//!
//! - Receiver discovery over UDP broadcast
//! - One persistent connection per receiver with exponential-backoff reconnects
//! - Typed, validated commands for power, volume, muting, inputs, presets,
//!   HDMI output and listening mode on all four zones
//! - Receiver state tracked only from the receiver's own status reports,
//!   with change notifications
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use onkyo_eiscp::{ReceiverClient, ReceiverConfig, Zone};
//!
//! # async fn example() -> Result<(), onkyo_eiscp::OnkyoError> {
//! // Find a receiver
//! let receivers = onkyo_eiscp::scan(Duration::from_secs(5)).await?;
//!
//! if let Some(info) = receivers.first() {
//!     let client = ReceiverClient::from_discovery(info, ReceiverConfig::default());
//!     client.connect().await?;
//!
//!     client.zone(Zone::Main).turn_on().await?;
//!     client.zone(Zone::Zone2).select_source("Radio").await?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! The library is organized into layers:
//!
//! - **High-level**: `ReceiverClient` and `ZoneController`
//! - **Mid-level**: `ConnectionManager` and `StateTracker`
//! - **Low-level**: `protocol` - eISCP framing, commands and status messages

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Public modules
/// Error types
pub mod error;
/// State tracking
pub mod state;
/// Core types
pub mod types;

/// Testing utilities
pub mod testing;

mod client;
pub mod connection;
pub mod control;
pub mod discovery;
pub mod protocol;

// Re-exports
pub use client::{ReceiverClient, discover_clients, quick_connect};
pub use connection::{ConnectionEvent, ConnectionManager, ConnectionState};
pub use control::{VolumeScale, ZoneController};
pub use discovery::{DiscoveryOptions, discover, scan};
pub use error::{OnkyoError, Result};
pub use protocol::{
    Action, Command, HdmiOutput, InputSource, ListeningMode, PowerState, Property, Status,
    StatusMessage, Zone,
};
pub use state::{StateChange, StateTracker};
pub use types::{
    ReceiverConfig, ReceiverEndpoint, ReceiverInfo, ReceiverState, SourceMapping, ZoneState,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude for common imports
///
/// Convenient re-exports
pub mod prelude {
    pub use crate::{
        Action, Command, OnkyoError, Property, ReceiverClient, ReceiverConfig, ReceiverEndpoint,
        ReceiverState, StateChange, Zone, ZoneController, discover, quick_connect, scan,
    };
}
