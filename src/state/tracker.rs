//! Receiver state cache fed by decoded status messages

use tokio::sync::{broadcast, watch};

use super::events::{ChangeFilter, StateChange};
use crate::protocol::{Property, Status, StatusMessage, Zone};
use crate::types::{ReceiverState, ZoneState};

/// Default buffered changes per subscriber
const DEFAULT_CAPACITY: usize = 256;

/// Last known receiver state
///
/// The only writer is [`apply`](Self::apply), which is fed exclusively
/// with messages decoded from the receiver; commands that were sent but
/// not yet confirmed never show up here. Reads never wait for the writer.
pub struct StateTracker {
    state: watch::Sender<ReceiverState>,
    changes: broadcast::Sender<StateChange>,
}

impl Default for StateTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl StateTracker {
    /// Create an empty tracker
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create an empty tracker buffering `capacity` changes per subscriber
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (state, _) = watch::channel(ReceiverState::default());
        let (changes, _) = broadcast::channel(capacity.max(1));
        Self { state, changes }
    }

    /// Snapshot of the current state
    #[must_use]
    pub fn current_state(&self) -> ReceiverState {
        self.state.borrow().clone()
    }

    /// Snapshot of one zone, `None` if it has not been seen
    #[must_use]
    pub fn zone(&self, zone: Zone) -> Option<ZoneState> {
        self.state.borrow().zone(zone).cloned()
    }

    /// Changes published from now on
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.changes.subscribe()
    }

    /// Changes of one zone published from now on
    #[must_use]
    pub fn subscribe_zone(&self, zone: Zone) -> ChangeFilter {
        ChangeFilter::zone(self.changes.subscribe(), zone)
    }

    /// Full state, re-delivered whenever it changes
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<ReceiverState> {
        self.state.subscribe()
    }

    /// Fold one status message into the state
    ///
    /// Returns the changes it caused, which are also published to
    /// subscribers. Messages that change nothing return an empty list.
    pub fn apply(&self, message: &StatusMessage) -> Vec<StateChange> {
        let mut changes = Vec::new();
        self.state.send_if_modified(|state| {
            let before = state.zone(message.zone).cloned();
            apply_to(state, message, &mut changes);
            // capability flags can flip without a visible change
            let modified = state.zone(message.zone) != before.as_ref();
            if modified {
                state.touch();
            }
            modified
        });

        for change in &changes {
            tracing::trace!(?change, "state changed");
            let _ = self.changes.send(change.clone());
        }
        changes
    }
}

fn apply_to(state: &mut ReceiverState, message: &StatusMessage, changes: &mut Vec<StateChange>) {
    let zone = message.zone;

    if !state.has_zone(zone) {
        // an N/A answer means the zone does not exist
        if matches!(message.status, Status::NotAvailable(_) | Status::Unknown { .. }) {
            return;
        }
        changes.push(StateChange::ZoneDiscovered { zone });
    }
    let z = state.zone_mut(zone);
    let mut updates = Updates { zone, changes };

    match &message.status {
        Status::Power(power) => {
            updates.set(&mut z.power, *power, Status::Power);
            if !power.is_on() {
                updates.clear(&mut z.audio_information, Property::AudioInformation);
                updates.clear(&mut z.video_information, Property::VideoInformation);
                updates.clear(&mut z.preset, Property::Preset);
                updates.clear(&mut z.hdmi_output, Property::HdmiOutput);
            }
        }
        Status::Volume(volume) => updates.set(&mut z.volume, *volume, Status::Volume),
        Status::Mute(muted) => updates.set(&mut z.muted, *muted, Status::Mute),
        Status::Input(input) => {
            updates.set(&mut z.input, *input, Status::Input);
            if !input.is_tuner() {
                updates.clear(&mut z.preset, Property::Preset);
            }
        }
        Status::Preset(preset) => {
            if z.is_tuner() {
                updates.set(&mut z.preset, *preset, Status::Preset);
            } else {
                updates.clear(&mut z.preset, Property::Preset);
            }
        }
        Status::HdmiOutput(output) => updates.set(&mut z.hdmi_output, *output, Status::HdmiOutput),
        Status::ListeningMode(mode) => {
            updates.set(&mut z.listening_mode, *mode, Status::ListeningMode);
        }
        Status::AudioInformation(report) => {
            z.supports_audio_information = true;
            updates.set(&mut z.audio_information, report.clone(), Status::AudioInformation);
        }
        Status::VideoInformation(report) => {
            z.supports_video_information = true;
            updates.set(&mut z.video_information, report.clone(), Status::VideoInformation);
        }
        Status::Display(text) => updates.set(&mut z.display, text.clone(), Status::Display),
        Status::NotAvailable(Property::AudioInformation) => {
            z.supports_audio_information = true;
            updates.clear(&mut z.audio_information, Property::AudioInformation);
        }
        Status::NotAvailable(Property::VideoInformation) => {
            z.supports_video_information = true;
            updates.clear(&mut z.video_information, Property::VideoInformation);
        }
        Status::NotAvailable(_) | Status::Unknown { .. } => {}
    }
}

/// Writes fields and records what actually changed
struct Updates<'a> {
    zone: Zone,
    changes: &'a mut Vec<StateChange>,
}

impl Updates<'_> {
    fn set<T: Clone + PartialEq>(
        &mut self,
        field: &mut Option<T>,
        value: T,
        status: impl FnOnce(T) -> Status,
    ) {
        if field.as_ref() != Some(&value) {
            *field = Some(value.clone());
            self.changes.push(StateChange::Updated {
                zone: self.zone,
                status: status(value),
            });
        }
    }

    fn clear<T>(&mut self, field: &mut Option<T>, property: Property) {
        if field.take().is_some() {
            self.changes.push(StateChange::Cleared {
                zone: self.zone,
                property,
            });
        }
    }
}
