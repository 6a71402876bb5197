use std::collections::BTreeMap;
use std::time::SystemTime;

use crate::protocol::{
    HdmiOutput, InformationReport, InputSource, ListeningMode, PowerState, Zone,
};

/// Last known state of one zone
///
/// Every field starts as `None` and is only filled in from the receiver's
/// own reports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ZoneState {
    /// Power state
    pub power: Option<PowerState>,
    /// Raw volume step, absent until reported (some zones have fixed volume)
    pub volume: Option<u8>,
    /// Muting
    pub muted: Option<bool>,
    /// Selected input
    pub input: Option<InputSource>,
    /// Tuner preset, only while a tuner input is selected
    pub preset: Option<u8>,
    /// HDMI output (main zone)
    pub hdmi_output: Option<HdmiOutput>,
    /// Listening mode (main zone)
    pub listening_mode: Option<ListeningMode>,
    /// Last audio information report (main zone)
    pub audio_information: Option<InformationReport>,
    /// Last video information report (main zone)
    pub video_information: Option<InformationReport>,
    /// Front-panel display text (main zone)
    pub display: Option<String>,
    /// The receiver has answered an audio information query
    pub supports_audio_information: bool,
    /// The receiver has answered a video information query
    pub supports_video_information: bool,
}

impl ZoneState {
    /// Check if the zone is powered on
    #[must_use]
    pub fn is_on(&self) -> bool {
        self.power.is_some_and(PowerState::is_on)
    }

    /// Check if the zone reports a volume level
    #[must_use]
    pub fn supports_volume(&self) -> bool {
        self.volume.is_some()
    }

    /// Check if presets apply to the current input
    #[must_use]
    pub fn is_tuner(&self) -> bool {
        self.input.is_some_and(InputSource::is_tuner)
    }
}

/// Snapshot of everything known about a receiver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiverState {
    zones: BTreeMap<Zone, ZoneState>,
    last_updated: Option<SystemTime>,
}

impl Default for ReceiverState {
    fn default() -> Self {
        Self {
            zones: BTreeMap::from([(Zone::Main, ZoneState::default())]),
            last_updated: None,
        }
    }
}

impl ReceiverState {
    /// Main zone state
    #[must_use]
    pub fn main(&self) -> &ZoneState {
        // always present
        &self.zones[&Zone::Main]
    }

    /// State of a zone, `None` if the receiver has not shown it exists
    #[must_use]
    pub fn zone(&self, zone: Zone) -> Option<&ZoneState> {
        self.zones.get(&zone)
    }

    /// Check if a zone is known to exist
    #[must_use]
    pub fn has_zone(&self, zone: Zone) -> bool {
        self.zones.contains_key(&zone)
    }

    /// Known zones in protocol order
    pub fn zones(&self) -> impl Iterator<Item = (Zone, &ZoneState)> {
        self.zones.iter().map(|(zone, state)| (*zone, state))
    }

    /// When a message last changed this state
    #[must_use]
    pub fn last_updated(&self) -> Option<SystemTime> {
        self.last_updated
    }

    pub(crate) fn zone_mut(&mut self, zone: Zone) -> &mut ZoneState {
        self.zones.entry(zone).or_default()
    }

    pub(crate) fn touch(&mut self) {
        self.last_updated = Some(SystemTime::now());
    }
}
