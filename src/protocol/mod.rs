//! eISCP wire protocol
//!
//! ISCP messages (`!1PWR01`) travel inside a 16-byte eISCP header over TCP
//! for control and over UDP for discovery.

pub mod codec;
pub mod command;
pub mod message;
pub mod packet;
pub mod values;

#[cfg(test)]
mod tests;

pub use codec::{EiscpCodec, EiscpCodecError};
pub use command::{Action, Command, MAX_PRESET, Property};
pub use message::{EOF, Status, StatusMessage};
pub use packet::{EiscpHeader, EiscpPacket, PacketError};
pub use values::{HdmiOutput, InformationReport, InputSource, ListeningMode, PowerState, Zone};

/// TCP and UDP port receivers listen on
pub const DEFAULT_PORT: u16 = 60128;
