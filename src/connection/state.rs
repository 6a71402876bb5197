//! Connection state management

use std::time::{Duration, Instant};

use crate::types::ReceiverEndpoint;

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected
    Disconnected,
    /// TCP connection in progress
    Connecting,
    /// Connected and ready to send
    Connected,
    /// Connection lost, waiting before the next attempt
    Reconnecting,
    /// Connection closed on request, waiting for `resume`
    Halted,
    /// Shut down, no further attempts
    Closed,
}

impl ConnectionState {
    /// Check if currently connected or trying to connect
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(
            self,
            ConnectionState::Connecting | ConnectionState::Connected | ConnectionState::Reconnecting
        )
    }

    /// Check if connected
    #[must_use]
    pub fn is_connected(self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

/// Connection events
#[derive(Debug, Clone)]
pub enum ConnectionEvent {
    /// State changed
    StateChanged {
        /// The previous state
        old: ConnectionState,
        /// The new state
        new: ConnectionState,
    },
    /// Connection established, commands can be sent
    Connected {
        /// The receiver
        endpoint: ReceiverEndpoint,
    },
    /// Connection lost or closed
    Disconnected {
        /// The receiver
        endpoint: ReceiverEndpoint,
        /// The reason for disconnection
        reason: DisconnectReason,
    },
    /// A connection attempt failed and the next one is scheduled
    ReconnectScheduled {
        /// Consecutive failed attempts so far
        attempt: u32,
        /// Delay before the next attempt
        delay: Duration,
    },
    /// Error occurred
    Error {
        /// The error message
        message: String,
        /// Whether the error is recoverable
        recoverable: bool,
    },
}

/// Reason for disconnection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// `shutdown` was called
    UserRequested,
    /// `halt` was called
    Halted,
    /// Receiver closed the connection
    RemoteClosed,
    /// Socket error
    NetworkError(String),
    /// The byte stream lost eISCP framing
    ProtocolError(String),
}

/// Connection statistics
#[derive(Debug, Clone, Default)]
pub struct ConnectionStats {
    /// Time connection was established
    pub connected_at: Option<Instant>,
    /// Number of bytes sent
    pub bytes_sent: u64,
    /// Number of bytes received
    pub bytes_received: u64,
    /// Commands written to the socket
    pub messages_sent: u64,
    /// Status messages decoded
    pub messages_received: u64,
    /// Well-framed messages that failed to decode
    pub malformed_messages: u64,
    /// Number of failed connection attempts
    pub reconnect_attempts: u32,
    /// Last error message
    pub last_error: Option<String>,
}

impl ConnectionStats {
    /// Get connection uptime
    #[must_use]
    pub fn uptime(&self) -> Option<Duration> {
        self.connected_at.map(|t| t.elapsed())
    }

    /// Record one command sent
    pub fn record_sent(&mut self, bytes: usize) {
        self.bytes_sent += bytes as u64;
        self.messages_sent += 1;
    }

    /// Record bytes received
    pub fn record_received(&mut self, bytes: usize) {
        self.bytes_received += bytes as u64;
    }
}
