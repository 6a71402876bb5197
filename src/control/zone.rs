//! Per-zone controller

use std::sync::Arc;

use super::volume::VolumeScale;
use crate::connection::ConnectionManager;
use crate::error::{OnkyoError, Result};
use crate::protocol::{Action, Command, HdmiOutput, ListeningMode, Property, Zone};
use crate::state::StateTracker;
use crate::types::{SourceMapping, ZoneState};

/// Queries that rebuild a zone's state, in send order
///
/// The input goes before the preset: a preset reply is only kept while a
/// tuner input is known to be selected.
const MAIN_BACKFILL: &[Property] = &[
    Property::Power,
    Property::Volume,
    Property::Input,
    Property::Preset,
    Property::Mute,
    Property::HdmiOutput,
    Property::ListeningMode,
    Property::AudioInformation,
    Property::VideoInformation,
];

const ZONE_BACKFILL: &[Property] = &[
    Property::Power,
    Property::Volume,
    Property::Input,
    Property::Preset,
    Property::Mute,
];

/// Controls one zone of a receiver
///
/// Commands go straight to the receiver. Getters read the tracked state,
/// which only changes once the receiver confirms.
#[derive(Clone)]
pub struct ZoneController {
    zone: Zone,
    connection: Arc<ConnectionManager>,
    tracker: Arc<StateTracker>,
    sources: Arc<SourceMapping>,
    scale: VolumeScale,
}

impl ZoneController {
    /// Create a controller for `zone`
    #[must_use]
    pub fn new(
        zone: Zone,
        connection: Arc<ConnectionManager>,
        tracker: Arc<StateTracker>,
        sources: Arc<SourceMapping>,
        scale: VolumeScale,
    ) -> Self {
        Self {
            zone,
            connection,
            tracker,
            sources,
            scale,
        }
    }

    /// The zone controlled
    #[must_use]
    pub fn zone(&self) -> Zone {
        self.zone
    }

    /// Last confirmed state, `None` until the zone has answered
    #[must_use]
    pub fn state(&self) -> Option<ZoneState> {
        self.tracker.zone(self.zone)
    }

    /// Check if the receiver has this zone
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.tracker.current_state().has_zone(self.zone)
    }

    /// Send an action to this zone
    ///
    /// # Errors
    ///
    /// Returns `InvalidCommand` if the zone does not support the action,
    /// otherwise the connection's send errors.
    pub async fn send(&self, action: Action) -> Result<()> {
        let command = Command::new(self.zone, action)?;
        self.connection.send(&command).await
    }

    /// Ask the receiver to report a property
    ///
    /// # Errors
    ///
    /// See [`send`](Self::send).
    pub async fn query(&self, property: Property) -> Result<()> {
        self.send(Action::Query(property)).await
    }

    /// Query everything this zone tracks
    ///
    /// # Errors
    ///
    /// Stops at the first failed send.
    pub async fn backfill(&self) -> Result<()> {
        let properties = if self.zone == Zone::Main {
            MAIN_BACKFILL
        } else {
            ZONE_BACKFILL
        };
        for property in properties {
            self.query(*property).await?;
        }
        Ok(())
    }

    // === Power ===

    /// Power the zone on
    ///
    /// # Errors
    ///
    /// Returns the connection's send errors.
    pub async fn turn_on(&self) -> Result<()> {
        self.send(Action::PowerOn).await
    }

    /// Put the zone in standby
    ///
    /// # Errors
    ///
    /// Returns the connection's send errors.
    pub async fn turn_off(&self) -> Result<()> {
        self.send(Action::Standby).await
    }

    // === Volume ===

    /// Set the volume on the configured `0.0..=1.0` scale
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` for levels outside `0.0..=1.0`.
    pub async fn set_volume_level(&self, level: f64) -> Result<()> {
        let raw = self.scale.to_raw(level)?.min(self.zone.max_volume());
        self.send(Action::SetVolume(raw)).await
    }

    /// Confirmed volume on the configured scale
    #[must_use]
    pub fn volume_level(&self) -> Option<f64> {
        self.state()
            .and_then(|z| z.volume)
            .map(|raw| self.scale.to_level(raw))
    }

    /// One step up
    ///
    /// # Errors
    ///
    /// Returns the connection's send errors.
    pub async fn volume_up(&self) -> Result<()> {
        self.send(Action::VolumeUp).await
    }

    /// One step down
    ///
    /// # Errors
    ///
    /// Returns the connection's send errors.
    pub async fn volume_down(&self) -> Result<()> {
        self.send(Action::VolumeDown).await
    }

    /// Mute or unmute
    ///
    /// # Errors
    ///
    /// Returns the connection's send errors.
    pub async fn set_mute(&self, muted: bool) -> Result<()> {
        self.send(Action::Mute(muted)).await
    }

    /// Toggle muting
    ///
    /// # Errors
    ///
    /// Returns the connection's send errors.
    pub async fn toggle_mute(&self) -> Result<()> {
        self.send(Action::ToggleMute).await
    }

    // === Sources ===

    /// Select an input by friendly name or receiver alias
    ///
    /// # Errors
    ///
    /// Returns `UnknownSource` if the name matches no input.
    pub async fn select_source(&self, name: &str) -> Result<()> {
        let input = self.sources.resolve(name)?;
        self.send(Action::SelectInput(input)).await
    }

    /// Friendly name of the confirmed input
    #[must_use]
    pub fn source(&self) -> Option<String> {
        self.state()
            .and_then(|z| z.input)
            .map(|input| self.sources.friendly_name(input))
    }

    /// Friendly names that can be selected
    #[must_use]
    pub fn source_list(&self) -> Vec<String> {
        self.sources
            .source_list()
            .into_iter()
            .map(ToString::to_string)
            .collect()
    }

    /// Recall a radio preset
    ///
    /// # Errors
    ///
    /// Returns `InvalidCommand` unless a tuner input is selected, or if the
    /// preset is outside `1..=40`.
    pub async fn play_preset(&self, preset: u8) -> Result<()> {
        if !self.state().is_some_and(|z| z.is_tuner()) {
            return Err(OnkyoError::invalid_command(format!(
                "{} is not on a tuner input",
                self.zone.label()
            )));
        }
        self.send(Action::SelectPreset(preset)).await
    }

    // === Main zone ===

    /// Select an HDMI output
    ///
    /// # Errors
    ///
    /// Returns `InvalidCommand` outside the main zone.
    pub async fn select_hdmi_output(&self, output: HdmiOutput) -> Result<()> {
        self.send(Action::SelectHdmiOutput(output)).await
    }

    /// Select a listening mode
    ///
    /// # Errors
    ///
    /// Returns `InvalidCommand` outside the main zone.
    pub async fn set_listening_mode(&self, mode: ListeningMode) -> Result<()> {
        self.send(Action::SelectListeningMode(mode)).await
    }

    /// Select a listening mode by name, e.g. `stereo`
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` for unknown names.
    pub async fn set_listening_mode_by_name(&self, name: &str) -> Result<()> {
        let mode = ListeningMode::from_name(name).ok_or_else(|| OnkyoError::InvalidParameter {
            name: "listening_mode".to_string(),
            message: format!("unknown listening mode {name:?}"),
        })?;
        self.set_listening_mode(mode).await
    }
}
