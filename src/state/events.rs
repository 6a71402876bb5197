//! State change notifications

use tokio::sync::broadcast;

use crate::protocol::{Property, Status, Zone};

/// One observable change to the tracked receiver state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateChange {
    /// A zone answered for the first time
    ZoneDiscovered {
        /// The zone
        zone: Zone,
    },
    /// A property took a new value
    Updated {
        /// The zone
        zone: Zone,
        /// The confirmed value
        status: Status,
    },
    /// A property no longer has a value
    Cleared {
        /// The zone
        zone: Zone,
        /// The property that was removed
        property: Property,
    },
}

impl StateChange {
    /// Zone the change belongs to
    #[must_use]
    pub fn zone(&self) -> Zone {
        match self {
            StateChange::ZoneDiscovered { zone }
            | StateChange::Updated { zone, .. }
            | StateChange::Cleared { zone, .. } => *zone,
        }
    }

    /// Property affected, `None` for zone discovery
    #[must_use]
    pub fn property(&self) -> Option<Property> {
        match self {
            StateChange::ZoneDiscovered { .. } => None,
            StateChange::Updated { status, .. } => status.property(),
            StateChange::Cleared { property, .. } => Some(*property),
        }
    }
}

/// Receiver for state changes, optionally filtered
///
/// Only sees changes published after it was created.
pub struct ChangeFilter {
    rx: broadcast::Receiver<StateChange>,
    filter: Box<dyn Fn(&StateChange) -> bool + Send>,
}

impl ChangeFilter {
    /// Create a filtered change receiver
    pub fn new<F>(rx: broadcast::Receiver<StateChange>, filter: F) -> Self
    where
        F: Fn(&StateChange) -> bool + Send + 'static,
    {
        Self {
            rx,
            filter: Box::new(filter),
        }
    }

    /// Changes of one zone only
    #[must_use]
    pub fn zone(rx: broadcast::Receiver<StateChange>, zone: Zone) -> Self {
        Self::new(rx, move |change| change.zone() == zone)
    }

    /// Receive the next matching change, `None` once the tracker is gone
    ///
    /// Changes dropped because this receiver lagged are skipped.
    pub async fn recv(&mut self) -> Option<StateChange> {
        loop {
            match self.rx.recv().await {
                Ok(change) if (self.filter)(&change) => return Some(change),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "state change subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
