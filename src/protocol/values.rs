//! Typed parameter values carried by ISCP commands and status messages

use std::fmt;
use std::str::FromStr;

use crate::error::OnkyoError;

/// An independently controlled output area of the receiver
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Zone {
    /// Main zone, always present
    Main,
    /// Zone 2
    Zone2,
    /// Zone 3
    Zone3,
    /// Zone 4
    Zone4,
}

impl Zone {
    /// Every zone in protocol order
    pub const ALL: [Zone; 4] = [Zone::Main, Zone::Zone2, Zone::Zone3, Zone::Zone4];

    /// Zones that may or may not exist on a given model
    pub const EXTRA: [Zone; 3] = [Zone::Zone2, Zone::Zone3, Zone::Zone4];

    /// Identifier used in configuration and logs
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Zone::Main => "main",
            Zone::Zone2 => "zone2",
            Zone::Zone3 => "zone3",
            Zone::Zone4 => "zone4",
        }
    }

    /// Human-readable label
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Zone::Main => "Main Zone",
            Zone::Zone2 => "Zone 2",
            Zone::Zone3 => "Zone 3",
            Zone::Zone4 => "Zone 4",
        }
    }

    /// Largest raw volume step the zone accepts
    #[must_use]
    pub fn max_volume(self) -> u8 {
        match self {
            Zone::Zone4 => 100,
            _ => 200,
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Zone {
    type Err = OnkyoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "main" => Ok(Zone::Main),
            "zone2" => Ok(Zone::Zone2),
            "zone3" => Ok(Zone::Zone3),
            "zone4" => Ok(Zone::Zone4),
            other => Err(OnkyoError::InvalidParameter {
                name: "zone".to_string(),
                message: format!("{other:?} is not a valid zone"),
            }),
        }
    }
}

/// Power state reported for a zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PowerState {
    /// Zone is powered on
    On,
    /// Zone is in standby
    Standby,
}

impl PowerState {
    /// Check if powered on
    #[must_use]
    pub fn is_on(self) -> bool {
        matches!(self, PowerState::On)
    }
}

/// Parse a two-character upper- or lower-case hex parameter
pub(crate) fn parse_hex_u8(value: &str) -> Option<u8> {
    if value.len() != 2 || !value.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u8::from_str_radix(value, 16).ok()
}

/// An input selector position
///
/// The receiver identifies inputs by a hex code; users know them by
/// aliases such as `pc`, `bd` or `fm`. One code can carry several aliases
/// because labels differ between model generations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InputSource(u8);

const INPUT_TABLE: &[(u8, &[&str])] = &[
    (0x00, &["video1", "vcr", "dvr", "stb"]),
    (0x01, &["video2", "cbl", "sat"]),
    (0x02, &["video3", "game/tv", "game", "game1"]),
    (0x03, &["video4", "aux1"]),
    (0x04, &["video5", "aux2", "game2"]),
    (0x05, &["video6", "pc"]),
    (0x06, &["video7"]),
    (0x07, &["07"]),
    (0x08, &["08"]),
    (0x09, &["09"]),
    (0x10, &["dvd", "bd"]),
    (0x11, &["strm-box"]),
    (0x12, &["tv"]),
    (0x20, &["tape-1", "tv/tape"]),
    (0x21, &["tape2"]),
    (0x22, &["phono"]),
    (0x23, &["cd", "tv/cd"]),
    (0x24, &["fm"]),
    (0x25, &["am"]),
    (0x26, &["tuner"]),
    (0x27, &["music-server", "p4s", "dlna"]),
    (0x28, &["internet-radio", "iradio-favorite"]),
    (0x29, &["usb"]),
    (0x2A, &["usb-rear"]),
    (0x2B, &["network", "net"]),
    (0x2C, &["usb-toggle"]),
    (0x2D, &["airplay"]),
    (0x2E, &["bluetooth"]),
    (0x2F, &["usb-dac-in"]),
    (0x30, &["multi-ch"]),
    (0x31, &["xm"]),
    (0x32, &["sirius"]),
    (0x33, &["dab"]),
    (0x40, &["universal-port"]),
    (0x41, &["line"]),
    (0x42, &["line2"]),
    (0x44, &["optical"]),
    (0x45, &["coaxial"]),
    (0x55, &["hdmi-5"]),
    (0x56, &["hdmi-6"]),
    (0x57, &["hdmi-7"]),
];

impl InputSource {
    /// FM tuner
    pub const FM: Self = Self(0x24);
    /// AM tuner
    pub const AM: Self = Self(0x25);
    /// Generic tuner (zones)
    pub const TUNER: Self = Self(0x26);

    /// Wrap a raw selector code
    #[must_use]
    pub fn from_code(code: u8) -> Self {
        Self(code)
    }

    /// Resolve an alias (`"pc"`, `"video6"`), case-insensitively
    #[must_use]
    pub fn from_alias(alias: &str) -> Option<Self> {
        let alias = alias.trim().to_ascii_lowercase();
        INPUT_TABLE
            .iter()
            .find(|(_, names)| names.contains(&alias.as_str()))
            .map(|(code, _)| Self(*code))
    }

    /// Raw selector code
    #[must_use]
    pub fn code(self) -> u8 {
        self.0
    }

    /// Known aliases, empty for codes this crate has no name for
    #[must_use]
    pub fn aliases(self) -> &'static [&'static str] {
        INPUT_TABLE
            .iter()
            .find(|(code, _)| *code == self.0)
            .map(|(_, names)| *names)
            .unwrap_or(&[])
    }

    /// Whether radio presets apply to this input
    #[must_use]
    pub fn is_tuner(self) -> bool {
        matches!(self, Self::FM | Self::AM | Self::TUNER)
    }
}

impl fmt::Display for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.aliases().first() {
            Some(name) => f.write_str(name),
            None => write!(f, "{:02X}", self.0),
        }
    }
}

/// HDMI output selector position (main zone)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HdmiOutput {
    /// No HDMI output / analog
    No,
    /// Main output
    Main,
    /// Sub output (HDBaseT on some models)
    Sub,
    /// Main and sub
    Both,
    /// Both, main priority
    BothMain,
    /// Both, sub priority
    BothSub,
}

impl HdmiOutput {
    const ALL: [HdmiOutput; 6] = [
        HdmiOutput::No,
        HdmiOutput::Main,
        HdmiOutput::Sub,
        HdmiOutput::Both,
        HdmiOutput::BothMain,
        HdmiOutput::BothSub,
    ];

    /// Raw selector code
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            HdmiOutput::No => 0x00,
            HdmiOutput::Main => 0x01,
            HdmiOutput::Sub => 0x02,
            HdmiOutput::Both => 0x03,
            HdmiOutput::BothMain => 0x04,
            HdmiOutput::BothSub => 0x05,
        }
    }

    /// Look up by raw code
    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|o| o.code() == code)
    }

    /// Names the receiver documentation uses for this position
    #[must_use]
    pub fn names(self) -> &'static [&'static str] {
        match self {
            HdmiOutput::No => &["no", "analog"],
            HdmiOutput::Main => &["yes", "out"],
            HdmiOutput::Sub => &["out-sub", "sub", "hdbaset"],
            HdmiOutput::Both => &["both", "sub"],
            HdmiOutput::BothMain => &["both"],
            HdmiOutput::BothSub => &["both"],
        }
    }

    /// Resolve a user-supplied name; the first matching position wins
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|o| o.names().contains(&name.as_str()))
    }
}

impl fmt::Display for HdmiOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.names().join(","))
    }
}

/// Surround / listening mode (main zone)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListeningMode(u8);

const LISTENING_MODE_TABLE: &[(u8, &[&str])] = &[
    (0x00, &["stereo"]),
    (0x01, &["direct"]),
    (0x02, &["surround"]),
    (0x03, &["film", "game-rpg"]),
    (0x04, &["thx"]),
    (0x05, &["action", "game-action"]),
    (0x06, &["musical", "game-rock"]),
    (0x07, &["mono-movie"]),
    (0x08, &["orchestra"]),
    (0x09, &["unplugged"]),
    (0x0A, &["studio-mix"]),
    (0x0B, &["tv-logic"]),
    (0x0C, &["all-ch-stereo"]),
    (0x0D, &["theater-dimensional"]),
    (0x0E, &["enhanced-7", "enhance", "game-sports"]),
    (0x0F, &["mono"]),
    (0x11, &["pure-audio"]),
    (0x12, &["multiplex"]),
    (0x13, &["full-mono"]),
    (0x14, &["dolby-virtual", "surround-enhancer"]),
    (0x15, &["dts-surround-sensation"]),
    (0x16, &["audyssey-dsx"]),
    (0x1F, &["whole-house"]),
    (0x40, &["straight-decode"]),
    (0x41, &["dolby-ex"]),
    (0x42, &["thx-cinema"]),
    (0x43, &["thx-surround-ex"]),
    (0x44, &["thx-music"]),
    (0x45, &["thx-games"]),
    (0x80, &["pliix-movie", "dolby-atmos", "dolby-surround"]),
    (0x81, &["pliix-music"]),
    (0x82, &["neo-6-cinema", "neo-x-cinema", "dts-x", "neural-x"]),
    (0x83, &["neo-6-music", "neo-x-music"]),
    (0x86, &["pliix-game"]),
    (0x87, &["neural-surr"]),
    (0x88, &["neural-thx", "neural-surround"]),
    (0x90, &["pliiz-height"]),
    (0x93, &["neural-digital-music"]),
    (0x9A, &["neo-x-game"]),
    (0xFF, &["auto-surround"]),
];

impl ListeningMode {
    /// Wrap a raw mode code
    #[must_use]
    pub fn from_code(code: u8) -> Self {
        Self(code)
    }

    /// Resolve a mode by name, case-insensitively
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        LISTENING_MODE_TABLE
            .iter()
            .find(|(_, names)| names.contains(&name.as_str()))
            .map(|(code, _)| Self(*code))
    }

    /// Raw mode code
    #[must_use]
    pub fn code(self) -> u8 {
        self.0
    }

    /// Known names, empty for unknown codes
    #[must_use]
    pub fn names(self) -> &'static [&'static str] {
        LISTENING_MODE_TABLE
            .iter()
            .find(|(code, _)| *code == self.0)
            .map(|(_, names)| *names)
            .unwrap_or(&[])
    }
}

impl fmt::Display for ListeningMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.names().first() {
            Some(name) => f.write_str(name),
            None => write!(f, "{:02X}", self.0),
        }
    }
}

const AUDIO_INFORMATION_FIELDS: &[&str] = &[
    "audio_input_port",
    "input_signal_format",
    "input_frequency",
    "input_channels",
    "listening_mode",
    "output_channels",
    "output_frequency",
    "precision_quartz_lock_system",
    "auto_phase_control_delay",
    "auto_phase_control_phase",
];

const VIDEO_INFORMATION_FIELDS: &[&str] = &[
    "video_input_port",
    "input_resolution",
    "input_color_schema",
    "input_color_depth",
    "video_output_port",
    "output_resolution",
    "output_color_schema",
    "output_color_depth",
    "picture_mode",
];

/// Comma-separated information report with positional field names
///
/// Empty fields are dropped; extra trailing fields beyond the known names
/// are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InformationReport {
    raw: String,
    fields: Vec<(&'static str, String)>,
}

impl InformationReport {
    fn parse(names: &'static [&'static str], raw: &str) -> Self {
        let fields = names
            .iter()
            .zip(raw.split(','))
            .filter(|(_, value)| !value.trim().is_empty())
            .map(|(name, value)| (*name, value.trim().to_string()))
            .collect();
        Self {
            raw: raw.to_string(),
            fields,
        }
    }

    /// Parse an `IFA` payload
    #[must_use]
    pub fn audio(raw: &str) -> Self {
        Self::parse(AUDIO_INFORMATION_FIELDS, raw)
    }

    /// Parse an `IFV` payload
    #[must_use]
    pub fn video(raw: &str) -> Self {
        Self::parse(VIDEO_INFORMATION_FIELDS, raw)
    }

    /// Value of a named field
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Fields in report order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.fields.iter().map(|(n, v)| (*n, v.as_str()))
    }

    /// The report exactly as received
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Number of non-empty fields
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when no field carried a value
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
