//! Inbound ISCP status messages

use std::fmt;
use std::fmt::Write as _;

use super::command::Property;
use super::packet::EiscpPacket;
use super::values::{
    HdmiOutput, InformationReport, InputSource, ListeningMode, PowerState, Zone, parse_hex_u8,
};
use crate::error::{OnkyoError, Result};

/// End-of-message marker receivers append before CR/LF
pub const EOF: u8 = 0x1A;

const NOT_AVAILABLE: &str = "N/A";

/// Decoded value of a status message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    /// Power state
    Power(PowerState),
    /// Raw volume step
    Volume(u8),
    /// Muting
    Mute(bool),
    /// Selected input
    Input(InputSource),
    /// Tuner preset
    Preset(u8),
    /// HDMI output
    HdmiOutput(HdmiOutput),
    /// Listening mode
    ListeningMode(ListeningMode),
    /// Audio signal information
    AudioInformation(InformationReport),
    /// Video signal information
    VideoInformation(InformationReport),
    /// Front-panel display text
    Display(String),
    /// The receiver answered `N/A`; the property is not supported here
    NotAvailable(Property),
    /// A code this crate does not model
    Unknown {
        /// Three-letter code
        code: String,
        /// Parameter text
        value: String,
    },
}

impl Status {
    /// Property this status reports on, `None` for unknown codes
    #[must_use]
    pub fn property(&self) -> Option<Property> {
        Some(match self {
            Status::Power(_) => Property::Power,
            Status::Volume(_) => Property::Volume,
            Status::Mute(_) => Property::Mute,
            Status::Input(_) => Property::Input,
            Status::Preset(_) => Property::Preset,
            Status::HdmiOutput(_) => Property::HdmiOutput,
            Status::ListeningMode(_) => Property::ListeningMode,
            Status::AudioInformation(_) => Property::AudioInformation,
            Status::VideoInformation(_) => Property::VideoInformation,
            Status::Display(_) => Property::Display,
            Status::NotAvailable(property) => *property,
            Status::Unknown { .. } => return None,
        })
    }

    fn parameter(&self) -> String {
        match self {
            Status::Power(state) => if state.is_on() { "01" } else { "00" }.to_string(),
            Status::Mute(on) => if *on { "01" } else { "00" }.to_string(),
            Status::Volume(value) | Status::Preset(value) => format!("{value:02X}"),
            Status::Input(input) => format!("{:02X}", input.code()),
            Status::HdmiOutput(output) => format!("{:02X}", output.code()),
            Status::ListeningMode(mode) => format!("{:02X}", mode.code()),
            Status::AudioInformation(report) | Status::VideoInformation(report) => {
                report.raw().to_string()
            }
            Status::Display(text) => text.bytes().fold(String::new(), |mut out, b| {
                let _ = write!(out, "{b:02X}");
                out
            }),
            Status::NotAvailable(_) => NOT_AVAILABLE.to_string(),
            Status::Unknown { value, .. } => value.clone(),
        }
    }
}

/// A status report for one zone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    /// Zone the report concerns
    pub zone: Zone,
    /// Decoded value
    pub status: Status,
}

impl StatusMessage {
    /// Create a status message
    #[must_use]
    pub fn new(zone: Zone, status: Status) -> Self {
        Self { zone, status }
    }

    /// Decode a framed payload as received from the codec
    ///
    /// The payload must start with `!1` and end with EOF, optionally
    /// followed by CR, LF or CRLF.
    ///
    /// # Errors
    ///
    /// Returns `MalformedMessage` if the framing or the parameter is invalid.
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let mut end = payload.len();
        while end > 0 && matches!(payload[end - 1], b'\r' | b'\n') {
            end -= 1;
        }
        if end == 0 || payload[end - 1] != EOF {
            return Err(OnkyoError::malformed(payload, "missing end-of-message marker"));
        }
        let framed = &payload[..end - 1];

        let Some(body) = framed.strip_prefix(EiscpPacket::RECEIVER_UNIT.as_bytes()) else {
            return Err(OnkyoError::malformed(payload, "missing !1 start marker"));
        };
        let body = std::str::from_utf8(body)
            .map_err(|_| OnkyoError::malformed(payload, "payload is not valid UTF-8"))?;

        Self::parse_body(body)
    }

    /// Parse an unframed body such as `PWR01`
    ///
    /// # Errors
    ///
    /// Returns `MalformedMessage` if the code is truncated or the parameter invalid.
    pub fn parse_body(body: &str) -> Result<Self> {
        let Some(code) = body.get(..3) else {
            return Err(OnkyoError::malformed(body, "message shorter than a command code"));
        };
        let value = &body[3..];

        let Some((zone, property)) = Property::from_code(code) else {
            if !code.bytes().all(|b| b.is_ascii_alphanumeric()) {
                return Err(OnkyoError::malformed(body, "command code is not alphanumeric"));
            }
            return Ok(Self::new(
                Zone::Main,
                Status::Unknown {
                    code: code.to_string(),
                    value: value.to_string(),
                },
            ));
        };

        if value == NOT_AVAILABLE {
            return Ok(Self::new(zone, Status::NotAvailable(property)));
        }

        let hex = || {
            parse_hex_u8(value)
                .ok_or_else(|| OnkyoError::malformed(body, format!("invalid {property} value")))
        };
        let flag = || match value {
            "00" => Ok(false),
            "01" => Ok(true),
            _ => Err(OnkyoError::malformed(body, format!("invalid {property} value"))),
        };

        let status = match property {
            Property::Power => Status::Power(if flag()? {
                PowerState::On
            } else {
                PowerState::Standby
            }),
            Property::Volume => Status::Volume(hex()?),
            Property::Mute => Status::Mute(flag()?),
            Property::Input => Status::Input(InputSource::from_code(hex()?)),
            Property::Preset => Status::Preset(hex()?),
            Property::HdmiOutput => Status::HdmiOutput(
                HdmiOutput::from_code(hex()?)
                    .ok_or_else(|| OnkyoError::malformed(body, "unknown hdmi output"))?,
            ),
            Property::ListeningMode => Status::ListeningMode(ListeningMode::from_code(hex()?)),
            Property::AudioInformation => Status::AudioInformation(InformationReport::audio(value)),
            Property::VideoInformation => Status::VideoInformation(InformationReport::video(value)),
            Property::Display => Status::Display(decode_display(value)),
        };
        Ok(Self::new(zone, status))
    }

    /// Property this message reports on
    #[must_use]
    pub fn property(&self) -> Option<Property> {
        self.status.property()
    }

    /// Unframed body, e.g. `ZVL28`
    #[must_use]
    pub fn encode_body(&self) -> String {
        let code = match (&self.status, self.property()) {
            (Status::Unknown { code, .. }, _) => code.as_str(),
            (_, Some(property)) => property.code(self.zone).unwrap_or("???"),
            (_, None) => "???",
        };
        format!("{code}{}", self.status.parameter())
    }

    /// Frame the message the way a receiver sends it
    #[must_use]
    pub fn to_packet(&self) -> EiscpPacket {
        EiscpPacket::raw(format!("!1{}\u{1a}\r\n", self.encode_body()))
    }
}

impl fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.zone, self.encode_body())
    }
}

/// FLD carries the display text as hex-encoded bytes
fn decode_display(value: &str) -> String {
    if value.len() % 2 != 0 || !value.bytes().all(|b| b.is_ascii_hexdigit()) {
        return value.to_string();
    }
    let bytes: Vec<u8> = value
        .as_bytes()
        .chunks(2)
        .filter_map(|pair| std::str::from_utf8(pair).ok().and_then(parse_hex_u8))
        .collect();
    String::from_utf8_lossy(&bytes).trim().to_string()
}
