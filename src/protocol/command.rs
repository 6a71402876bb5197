//! Outbound ISCP commands

use std::fmt;
use std::str::FromStr;

use super::message::Status;
use super::packet::EiscpPacket;
use super::values::{HdmiOutput, InputSource, ListeningMode, PowerState, Zone};
use crate::error::{OnkyoError, Result};

/// Largest preset number a tuner accepts
pub const MAX_PRESET: u8 = 40;

/// A zone property the receiver can report or be asked about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Property {
    /// Power / standby
    Power,
    /// Master volume level
    Volume,
    /// Audio muting
    Mute,
    /// Input selector
    Input,
    /// Tuner preset
    Preset,
    /// HDMI output selector (main only)
    HdmiOutput,
    /// Listening mode (main only)
    ListeningMode,
    /// Audio signal information (main only)
    AudioInformation,
    /// Video signal information (main only)
    VideoInformation,
    /// Front-panel display text (main only)
    Display,
}

const PROPERTY_CODES: &[(Zone, Property, &str)] = &[
    (Zone::Main, Property::Power, "PWR"),
    (Zone::Main, Property::Volume, "MVL"),
    (Zone::Main, Property::Mute, "AMT"),
    (Zone::Main, Property::Input, "SLI"),
    (Zone::Main, Property::Preset, "PRS"),
    (Zone::Main, Property::HdmiOutput, "HDO"),
    (Zone::Main, Property::ListeningMode, "LMD"),
    (Zone::Main, Property::AudioInformation, "IFA"),
    (Zone::Main, Property::VideoInformation, "IFV"),
    (Zone::Main, Property::Display, "FLD"),
    (Zone::Zone2, Property::Power, "ZPW"),
    (Zone::Zone2, Property::Volume, "ZVL"),
    (Zone::Zone2, Property::Mute, "ZMT"),
    (Zone::Zone2, Property::Input, "SLZ"),
    (Zone::Zone2, Property::Preset, "PRZ"),
    (Zone::Zone3, Property::Power, "PW3"),
    (Zone::Zone3, Property::Volume, "VL3"),
    (Zone::Zone3, Property::Mute, "MT3"),
    (Zone::Zone3, Property::Input, "SL3"),
    (Zone::Zone3, Property::Preset, "PR3"),
    (Zone::Zone4, Property::Power, "PW4"),
    (Zone::Zone4, Property::Volume, "VL4"),
    (Zone::Zone4, Property::Mute, "MT4"),
    (Zone::Zone4, Property::Input, "SL4"),
    (Zone::Zone4, Property::Preset, "PR4"),
];

impl Property {
    /// Three-letter ISCP code for this property in `zone`
    #[must_use]
    pub fn code(self, zone: Zone) -> Option<&'static str> {
        PROPERTY_CODES
            .iter()
            .find(|(z, p, _)| *z == zone && *p == self)
            .map(|(_, _, code)| *code)
    }

    /// Reverse lookup of an ISCP code
    #[must_use]
    pub fn from_code(code: &str) -> Option<(Zone, Property)> {
        PROPERTY_CODES
            .iter()
            .find(|(_, _, c)| *c == code)
            .map(|(zone, property, _)| (*zone, *property))
    }

    /// Name used in textual commands
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Property::Power => "power",
            Property::Volume => "volume",
            Property::Mute => "mute",
            Property::Input => "input",
            Property::Preset => "preset",
            Property::HdmiOutput => "hdmi-output",
            Property::ListeningMode => "listening-mode",
            Property::AudioInformation => "audio-information",
            Property::VideoInformation => "video-information",
            Property::Display => "display",
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Property {
    type Err = OnkyoError;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim().to_ascii_lowercase().replace('_', "-");
        let property = match name.as_str() {
            "power" | "system-power" => Property::Power,
            "volume" | "master-volume" => Property::Volume,
            "mute" | "muting" | "audio-muting" => Property::Mute,
            "input" | "selector" | "input-selector" | "source" => Property::Input,
            "preset" => Property::Preset,
            "hdmi-output" | "hdmi-output-selector" => Property::HdmiOutput,
            "listening-mode" => Property::ListeningMode,
            "audio-information" => Property::AudioInformation,
            "video-information" => Property::VideoInformation,
            "display" | "fl-display-information" => Property::Display,
            _ => {
                return Err(OnkyoError::invalid_command(format!(
                    "{s:?} is not a known property"
                )));
            }
        };
        Ok(property)
    }
}

/// What a command asks the receiver to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Power the zone on
    PowerOn,
    /// Put the zone in standby
    Standby,
    /// Absolute volume step
    SetVolume(u8),
    /// One volume step up
    VolumeUp,
    /// One volume step down
    VolumeDown,
    /// 1 dB up
    VolumeUpFine,
    /// 1 dB down
    VolumeDownFine,
    /// Set muting
    Mute(bool),
    /// Toggle muting
    ToggleMute,
    /// Select an input
    SelectInput(InputSource),
    /// Next input
    InputUp,
    /// Previous input
    InputDown,
    /// Recall a tuner preset
    SelectPreset(u8),
    /// Next preset
    PresetUp,
    /// Previous preset
    PresetDown,
    /// Select an HDMI output
    SelectHdmiOutput(HdmiOutput),
    /// Next HDMI output
    CycleHdmiOutput,
    /// Select a listening mode
    SelectListeningMode(ListeningMode),
    /// Next listening mode
    ListeningModeUp,
    /// Previous listening mode
    ListeningModeDown,
    /// Ask the receiver to report a property
    Query(Property),
}

impl Action {
    /// Property this action addresses
    #[must_use]
    pub fn property(self) -> Property {
        match self {
            Action::PowerOn | Action::Standby => Property::Power,
            Action::SetVolume(_)
            | Action::VolumeUp
            | Action::VolumeDown
            | Action::VolumeUpFine
            | Action::VolumeDownFine => Property::Volume,
            Action::Mute(_) | Action::ToggleMute => Property::Mute,
            Action::SelectInput(_) | Action::InputUp | Action::InputDown => Property::Input,
            Action::SelectPreset(_) | Action::PresetUp | Action::PresetDown => Property::Preset,
            Action::SelectHdmiOutput(_) | Action::CycleHdmiOutput => Property::HdmiOutput,
            Action::SelectListeningMode(_)
            | Action::ListeningModeUp
            | Action::ListeningModeDown => Property::ListeningMode,
            Action::Query(property) => property,
        }
    }

    /// ISCP parameter string
    #[must_use]
    pub fn parameter(self) -> String {
        match self {
            Action::PowerOn => "01".to_string(),
            Action::Standby => "00".to_string(),
            Action::Mute(on) => if on { "01" } else { "00" }.to_string(),
            Action::ToggleMute => "TG".to_string(),
            Action::SetVolume(level) | Action::SelectPreset(level) => format!("{level:02X}"),
            Action::SelectInput(input) => format!("{:02X}", input.code()),
            Action::SelectHdmiOutput(output) => format!("{:02X}", output.code()),
            Action::SelectListeningMode(mode) => format!("{:02X}", mode.code()),
            Action::VolumeUp
            | Action::InputUp
            | Action::PresetUp
            | Action::CycleHdmiOutput
            | Action::ListeningModeUp => "UP".to_string(),
            Action::VolumeDown
            | Action::InputDown
            | Action::PresetDown
            | Action::ListeningModeDown => "DOWN".to_string(),
            Action::VolumeUpFine => "UP1".to_string(),
            Action::VolumeDownFine => "DOWN1".to_string(),
            Action::Query(_) => "QSTN".to_string(),
        }
    }

    /// Status a receiver reports after applying an absolute action
    ///
    /// Relative steps, toggles and queries depend on device state and
    /// have no fixed answer.
    #[must_use]
    pub fn expected_status(self) -> Option<Status> {
        match self {
            Action::PowerOn => Some(Status::Power(PowerState::On)),
            Action::Standby => Some(Status::Power(PowerState::Standby)),
            Action::SetVolume(level) => Some(Status::Volume(level)),
            Action::Mute(on) => Some(Status::Mute(on)),
            Action::SelectInput(input) => Some(Status::Input(input)),
            Action::SelectPreset(preset) => Some(Status::Preset(preset)),
            Action::SelectHdmiOutput(output) => Some(Status::HdmiOutput(output)),
            Action::SelectListeningMode(mode) => Some(Status::ListeningMode(mode)),
            _ => None,
        }
    }

    fn is_query(self) -> bool {
        matches!(self, Action::Query(_))
    }
}

/// A validated command for one zone
///
/// Construction checks zone support and value ranges, so encoding a
/// `Command` cannot fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    zone: Zone,
    action: Action,
}

impl Command {
    /// Build a command
    ///
    /// # Errors
    ///
    /// Returns `InvalidCommand` if the zone lacks the property or a value is out of range.
    pub fn new(zone: Zone, action: Action) -> Result<Self> {
        let property = action.property();
        if property.code(zone).is_none() {
            return Err(OnkyoError::invalid_command(format!(
                "{property} is not available in {zone}"
            )));
        }
        if matches!(property, Property::AudioInformation | Property::VideoInformation)
            && !action.is_query()
        {
            return Err(OnkyoError::invalid_command(format!(
                "{property} can only be queried"
            )));
        }

        match action {
            Action::SetVolume(level) if level > zone.max_volume() => {
                Err(OnkyoError::invalid_command(format!(
                    "volume {level} out of range 0..={} for {zone}",
                    zone.max_volume()
                )))
            }
            Action::SelectPreset(preset) if !(1..=MAX_PRESET).contains(&preset) => {
                Err(OnkyoError::invalid_command(format!(
                    "preset {preset} out of range 1..={MAX_PRESET}"
                )))
            }
            _ => Ok(Self { zone, action }),
        }
    }

    /// Build a main-zone command
    ///
    /// # Errors
    ///
    /// Returns `InvalidCommand` if a value is out of range.
    pub fn main(action: Action) -> Result<Self> {
        Self::new(Zone::Main, action)
    }

    /// Query a property
    ///
    /// # Errors
    ///
    /// Returns `InvalidCommand` if the zone lacks the property.
    pub fn query(zone: Zone, property: Property) -> Result<Self> {
        Self::new(zone, Action::Query(property))
    }

    /// Target zone
    #[must_use]
    pub fn zone(&self) -> Zone {
        self.zone
    }

    /// Requested action
    #[must_use]
    pub fn action(&self) -> Action {
        self.action
    }

    /// ISCP body, e.g. `ZVL28`
    #[must_use]
    pub fn encode(&self) -> String {
        // validated in `new`
        let code = self.action.property().code(self.zone).unwrap_or("???");
        format!("{code}{}", self.action.parameter())
    }

    /// Wrap in an eISCP packet
    #[must_use]
    pub fn to_packet(&self) -> EiscpPacket {
        EiscpPacket::iscp(&self.encode())
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}={}", self.zone, self.action.property(), self.action.parameter())
    }
}

fn parse_decimal(property: Property, value: &str) -> Result<u8> {
    value.parse::<u8>().map_err(|_| {
        OnkyoError::invalid_command(format!("{value:?} is not a valid {property} value"))
    })
}

fn parse_action(property: Property, value: &str) -> Result<Action> {
    let value = value.trim().to_ascii_lowercase();
    if value == "query" || value == "qstn" {
        return Ok(Action::Query(property));
    }
    let unknown = || OnkyoError::invalid_command(format!("{value:?} is not a valid {property} value"));

    let action = match property {
        Property::Power => match value.as_str() {
            "on" => Action::PowerOn,
            "off" | "standby" => Action::Standby,
            _ => return Err(unknown()),
        },
        Property::Volume => match value.as_str() {
            "up" | "level-up" => Action::VolumeUp,
            "down" | "level-down" => Action::VolumeDown,
            "up1" | "level-up-1db-step" => Action::VolumeUpFine,
            "down1" | "level-down-1db-step" => Action::VolumeDownFine,
            other => Action::SetVolume(parse_decimal(property, other)?),
        },
        Property::Mute => match value.as_str() {
            "on" => Action::Mute(true),
            "off" => Action::Mute(false),
            "toggle" => Action::ToggleMute,
            _ => return Err(unknown()),
        },
        Property::Input => match value.as_str() {
            "up" => Action::InputUp,
            "down" => Action::InputDown,
            other => Action::SelectInput(InputSource::from_alias(other).ok_or_else(|| {
                OnkyoError::UnknownSource {
                    name: other.to_string(),
                }
            })?),
        },
        Property::Preset => match value.as_str() {
            "up" => Action::PresetUp,
            "down" => Action::PresetDown,
            other => Action::SelectPreset(parse_decimal(property, other)?),
        },
        Property::HdmiOutput => match value.as_str() {
            "up" => Action::CycleHdmiOutput,
            other => Action::SelectHdmiOutput(HdmiOutput::from_name(other).ok_or_else(unknown)?),
        },
        Property::ListeningMode => match value.as_str() {
            "up" => Action::ListeningModeUp,
            "down" => Action::ListeningModeDown,
            other => {
                Action::SelectListeningMode(ListeningMode::from_name(other).ok_or_else(unknown)?)
            }
        },
        Property::AudioInformation | Property::VideoInformation | Property::Display => {
            return Err(unknown());
        }
    };
    Ok(action)
}

/// Parse the textual command form
///
/// Accepted shapes, zone defaulting to `main`:
///
/// ```text
/// power=on            main.power=on
/// zone2.volume=40     zone2 volume 40
/// volume query        input=pc
/// ```
///
/// Numeric values are decimal.
impl FromStr for Command {
    type Err = OnkyoError;

    fn from_str(s: &str) -> Result<Self> {
        let (target, value) = match s.split_once(['=', ':']) {
            Some((target, value)) => (target.trim(), value.trim()),
            None => match s.trim().rsplit_once([' ', '.']) {
                Some((target, value)) => (target.trim(), value.trim()),
                None => {
                    return Err(OnkyoError::invalid_command(
                        "need at least a property and a value",
                    ));
                }
            },
        };

        let parts: Vec<&str> = target
            .split(['.', ' '])
            .filter(|p| !p.is_empty())
            .collect();
        let (zone, property) = match parts.as_slice() {
            [property] => (Zone::Main, property.parse::<Property>()?),
            [zone, property] => (zone.parse::<Zone>()?, property.parse::<Property>()?),
            _ => {
                return Err(OnkyoError::invalid_command(format!(
                    "cannot parse command {s:?}"
                )));
            }
        };

        Self::new(zone, parse_action(property, value)?)
    }
}
