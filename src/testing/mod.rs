//! Testing utilities

pub mod mock_receiver;

pub use mock_receiver::{MockReceiver, MockReceiverConfig};

use crate::protocol::{Status, StatusMessage, Zone};

/// Build a status message the way a receiver would send it.
#[must_use]
pub fn status(zone: Zone, status: Status) -> StatusMessage {
    StatusMessage::new(zone, status)
}
