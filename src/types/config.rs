use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::endpoint::ReceiverEndpoint;
use super::source::SourceMapping;
use crate::error::{OnkyoError, Result};
use crate::protocol::DEFAULT_PORT;

/// Durations as (fractional) seconds in configuration files
mod seconds {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(de::Error::custom)
    }
}

/// Connection and reconnection behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Timeout for one TCP connection attempt (default: 5 seconds)
    #[serde(with = "seconds")]
    pub connect_timeout: Duration,

    /// First delay after a failed attempt (default: 1 second)
    #[serde(with = "seconds")]
    pub initial_backoff: Duration,

    /// Factor applied to the delay after each failure (default: 2.0)
    pub backoff_multiplier: f64,

    /// Upper bound for the delay (default: 60 seconds)
    #[serde(with = "seconds")]
    pub max_backoff: Duration,

    /// Buffered connection events per subscriber (default: 100)
    pub event_capacity: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            initial_backoff: Duration::from_secs(1),
            backoff_multiplier: 2.0,
            max_backoff: Duration::from_secs(60),
            event_capacity: 100,
        }
    }
}

impl ConnectionConfig {
    /// Check the backoff settings are usable
    ///
    /// # Errors
    ///
    /// Returns `Config` describing the first bad value.
    pub fn validate(&self) -> Result<()> {
        if self.connect_timeout.is_zero() {
            return Err(config_error("connect_timeout must be positive"));
        }
        if self.initial_backoff.is_zero() {
            return Err(config_error("initial_backoff must be positive"));
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(config_error("backoff_multiplier must be at least 1.0"));
        }
        if self.max_backoff < self.initial_backoff {
            return Err(config_error("max_backoff must not be below initial_backoff"));
        }
        Ok(())
    }
}

/// Configuration for one receiver
///
/// Mirrors the platform configuration (`host`, `name`, `sources`) plus the
/// volume scaling options. Loadable from JSON:
///
/// ```json
/// {
///   "host": "192.168.1.20",
///   "name": "Living Room",
///   "max_volume": 80,
///   "sources": { "pc": "HTPC", "fm": "Radio" }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiverConfig {
    /// Receiver address; `None` means find it through discovery
    pub host: Option<String>,

    /// Control port (default: 60128)
    pub port: u16,

    /// Friendly name
    pub name: Option<String>,

    /// Input aliases shown under friendly names
    pub sources: SourceMapping,

    /// Percentage of the receiver's range reachable at full scale, 1-100 (default: 100)
    pub max_volume: u8,

    /// Raw volume steps the receiver maps to full scale (default: 80)
    pub receiver_max_volume: u8,

    /// Connection settings
    pub connection: ConnectionConfig,

    /// Wait before refreshing audio/video information after a change (default: 8 seconds)
    #[serde(with = "seconds")]
    pub av_info_delay: Duration,

    /// How long discovery listens for replies (default: 5 seconds)
    #[serde(with = "seconds")]
    pub discovery_timeout: Duration,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: DEFAULT_PORT,
            name: None,
            sources: SourceMapping::default(),
            max_volume: 100,
            receiver_max_volume: 80,
            connection: ConnectionConfig::default(),
            av_info_delay: Duration::from_secs(8),
            discovery_timeout: Duration::from_secs(5),
        }
    }
}

impl ReceiverConfig {
    /// Create a new config builder
    #[must_use]
    pub fn builder() -> ReceiverConfigBuilder {
        ReceiverConfigBuilder::default()
    }

    /// Parse and validate a JSON document
    ///
    /// # Errors
    ///
    /// Returns `Config` if the JSON is invalid or a value is out of range.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| OnkyoError::Config {
            message: format!("invalid configuration: {e}"),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON file
    ///
    /// # Errors
    ///
    /// Returns `Config` if the file cannot be read or parsed.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| OnkyoError::Config {
                message: format!("cannot read {}: {e}", path.display()),
            })?;
        Self::from_json(&json)
    }

    /// Serialize as pretty JSON
    ///
    /// # Errors
    ///
    /// Returns `Config` if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| OnkyoError::Config {
            message: e.to_string(),
        })
    }

    /// Check value ranges and source aliases
    ///
    /// # Errors
    ///
    /// Returns `Config` describing the first bad value.
    pub fn validate(&self) -> Result<()> {
        if !(1..=100).contains(&self.max_volume) {
            return Err(config_error(format!(
                "max_volume {} out of range 1..=100",
                self.max_volume
            )));
        }
        if !(1..=200).contains(&self.receiver_max_volume) {
            return Err(config_error(format!(
                "receiver_max_volume {} out of range 1..=200",
                self.receiver_max_volume
            )));
        }
        if self.host.as_deref().is_some_and(|h| h.trim().is_empty()) {
            return Err(config_error("host must not be empty"));
        }
        self.sources.validate()?;
        self.connection.validate()
    }

    /// Endpoint for the configured host
    ///
    /// # Errors
    ///
    /// Returns `Config` if no host is set.
    pub fn endpoint(&self) -> Result<ReceiverEndpoint> {
        let host = self
            .host
            .as_deref()
            .ok_or_else(|| config_error("no host configured"))?;
        let endpoint = ReceiverEndpoint::new(host).with_port(self.port);
        Ok(match &self.name {
            Some(name) => endpoint.with_name(name.clone()),
            None => endpoint,
        })
    }
}

fn config_error(message: impl Into<String>) -> OnkyoError {
    OnkyoError::Config {
        message: message.into(),
    }
}

/// Builder for `ReceiverConfig`
#[derive(Debug, Clone, Default)]
pub struct ReceiverConfigBuilder {
    config: ReceiverConfig,
}

impl ReceiverConfigBuilder {
    /// Set receiver host
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = Some(host.into());
        self
    }

    /// Set control port
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set friendly name
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = Some(name.into());
        self
    }

    /// Replace the source mapping
    #[must_use]
    pub fn sources(mut self, sources: SourceMapping) -> Self {
        self.config.sources = sources;
        self
    }

    /// Set the full-scale percentage
    #[must_use]
    pub fn max_volume(mut self, max_volume: u8) -> Self {
        self.config.max_volume = max_volume;
        self
    }

    /// Set the receiver's raw full-scale step
    #[must_use]
    pub fn receiver_max_volume(mut self, steps: u8) -> Self {
        self.config.receiver_max_volume = steps;
        self
    }

    /// Set connection timeout
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connection.connect_timeout = timeout;
        self
    }

    /// Set the reconnect backoff schedule
    #[must_use]
    pub fn backoff(mut self, initial: Duration, multiplier: f64, max: Duration) -> Self {
        self.config.connection.initial_backoff = initial;
        self.config.connection.backoff_multiplier = multiplier;
        self.config.connection.max_backoff = max;
        self
    }

    /// Set the audio/video information refresh delay
    #[must_use]
    pub fn av_info_delay(mut self, delay: Duration) -> Self {
        self.config.av_info_delay = delay;
        self
    }

    /// Set discovery timeout
    #[must_use]
    pub fn discovery_timeout(mut self, timeout: Duration) -> Self {
        self.config.discovery_timeout = timeout;
        self
    }

    /// Validate and build the configuration
    ///
    /// # Errors
    ///
    /// Returns `Config` if a value is out of range.
    pub fn build(self) -> Result<ReceiverConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
