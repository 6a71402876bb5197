use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::protocol::DEFAULT_PORT;

/// Where a receiver's control port lives
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReceiverEndpoint {
    host: String,
    port: u16,
    name: Option<String>,
}

impl ReceiverEndpoint {
    /// Endpoint on the default eISCP port
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            name: None,
        }
    }

    /// Use another port
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Attach a friendly name
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Host name or address
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Control port
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Friendly name, if configured
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Name for display: the friendly name, else the host
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.host)
    }

    /// `host:port` suitable for dialing (IPv6 hosts are bracketed)
    #[must_use]
    pub fn address(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl From<SocketAddr> for ReceiverEndpoint {
    fn from(addr: SocketAddr) -> Self {
        Self::new(addr.ip().to_string()).with_port(addr.port())
    }
}

impl fmt::Display for ReceiverEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address())
    }
}

/// A receiver that answered a discovery query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiverInfo {
    /// Address the reply came from
    pub host: IpAddr,
    /// Control port the receiver advertised
    pub port: u16,
    /// Model name (e.g. `TX-NR656`)
    pub model: String,
    /// Destination area code (`DX`, `XX`, `JJ`...)
    pub area: String,
    /// Unique identifier, usually the MAC address
    pub identifier: String,
}

impl ReceiverInfo {
    /// Endpoint for connecting, named after the model
    #[must_use]
    pub fn endpoint(&self) -> ReceiverEndpoint {
        ReceiverEndpoint::new(self.host.to_string())
            .with_port(self.port)
            .with_name(self.model.clone())
    }
}

impl fmt::Display for ReceiverInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) at {}:{}",
            self.model, self.identifier, self.host, self.port
        )
    }
}
