use std::io;
use thiserror::Error;

/// Errors that can occur while talking to a receiver
#[derive(Debug, Error)]
pub enum OnkyoError {
    // ===== Connection Errors =====
    /// Failed to establish the TCP connection
    #[error("connection failed to {endpoint}: {message}")]
    ConnectionFailed {
        /// The `host:port` that was dialed
        endpoint: String,
        /// Description of the failure
        message: String,
        /// The underlying source of the error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Connection attempt timed out
    #[error("connection timeout after {duration:?}")]
    ConnectionTimeout {
        /// The duration of the timeout
        duration: std::time::Duration,
    },

    /// No live connection to send on
    #[error("not connected to {endpoint}")]
    NotConnected {
        /// The `host:port` of the receiver
        endpoint: String,
    },

    /// Connection was closed by the receiver
    #[error("receiver disconnected: {endpoint}")]
    Disconnected {
        /// The `host:port` of the receiver
        endpoint: String,
    },

    /// The manager has been shut down
    #[error("connection manager shut down")]
    Shutdown,

    // ===== Protocol Errors =====
    /// eISCP header could not be parsed; the byte stream is out of sync
    #[error("framing error: {message}")]
    Framing {
        /// Description of the error
        message: String,
    },

    /// A well-framed message that could not be understood
    #[error("malformed message {raw:?}: {reason}")]
    MalformedMessage {
        /// The offending payload, lossily decoded
        raw: String,
        /// Why it was rejected
        reason: String,
    },

    // ===== Command Errors =====
    /// Command is not valid for the zone or value range
    #[error("invalid command: {message}")]
    InvalidCommand {
        /// Description of the error
        message: String,
    },

    /// Invalid parameter provided
    #[error("invalid parameter: {name} - {message}")]
    InvalidParameter {
        /// The name of the parameter
        name: String,
        /// Description of the error
        message: String,
    },

    /// Source name is neither a configured friendly name nor a known alias
    #[error("unknown source: {name}")]
    UnknownSource {
        /// The requested source
        name: String,
    },

    // ===== Discovery Errors =====
    /// UDP discovery failed
    #[error("discovery failed: {message}")]
    DiscoveryFailed {
        /// Description of the failure
        message: String,
        /// The underlying source of the error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // ===== Configuration Errors =====
    /// Configuration could not be loaded or is inconsistent
    #[error("configuration error: {message}")]
    Config {
        /// Description of the error
        message: String,
    },

    // ===== I/O Errors =====
    /// Network I/O error
    #[error("network error: {0}")]
    NetworkError(#[from] io::Error),
}

impl OnkyoError {
    /// Check if this error is recoverable by retrying
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed { .. }
                | Self::ConnectionTimeout { .. }
                | Self::NotConnected { .. }
                | Self::Disconnected { .. }
                | Self::NetworkError(_)
        )
    }

    /// Check if this error indicates connection loss
    #[must_use]
    pub fn is_connection_lost(&self) -> bool {
        matches!(
            self,
            Self::Disconnected { .. }
                | Self::ConnectionFailed { .. }
                | Self::ConnectionTimeout { .. }
                | Self::NotConnected { .. }
        )
    }

    pub(crate) fn malformed(raw: impl AsRef<[u8]>, reason: impl Into<String>) -> Self {
        Self::MalformedMessage {
            raw: String::from_utf8_lossy(raw.as_ref()).trim_end().to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_command(message: impl Into<String>) -> Self {
        Self::InvalidCommand {
            message: message.into(),
        }
    }
}

/// Result type alias for receiver operations
pub type Result<T> = std::result::Result<T, OnkyoError>;
