use std::collections::HashSet;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use futures::Stream;
use tokio::net::UdpSocket;
use tokio::time::Instant;

use super::parser;
use crate::error::{OnkyoError, Result};
use crate::protocol::{DEFAULT_PORT, EiscpPacket};
use crate::types::{ReceiverConfig, ReceiverInfo};

/// Discovery queries for both device categories the receivers answer to
const QUERIES: [&[u8]; 2] = [b"!xECNQSTN\r", b"!pECNQSTN\r"];

/// Where and how long to look for receivers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryOptions {
    /// Broadcast address or a specific receiver
    pub target: SocketAddr,
    /// How long to wait for replies
    pub timeout: Duration,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            target: SocketAddr::from((Ipv4Addr::BROADCAST, DEFAULT_PORT)),
            timeout: Duration::from_secs(5),
        }
    }
}

impl DiscoveryOptions {
    /// Broadcast on the local network
    #[must_use]
    pub fn broadcast(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }

    /// Ask a single receiver
    #[must_use]
    pub fn unicast(target: SocketAddr, timeout: Duration) -> Self {
        Self { target, timeout }
    }

    /// Broadcast with the configured discovery timeout
    #[must_use]
    pub fn from_config(config: &ReceiverConfig) -> Self {
        Self::broadcast(config.discovery_timeout)
    }
}

/// UDP browser for receivers
pub struct ReceiverBrowser {
    options: DiscoveryOptions,
}

impl ReceiverBrowser {
    /// Create a browser
    #[must_use]
    pub fn new(options: DiscoveryOptions) -> Self {
        Self { options }
    }

    /// Send the queries and stream replies until the timeout
    ///
    /// Each receiver is reported once, keyed by its identifier.
    ///
    /// # Errors
    ///
    /// Returns `DiscoveryFailed` if the socket cannot be set up or the
    /// queries cannot be sent.
    pub async fn browse(self) -> Result<impl Stream<Item = ReceiverInfo>> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
            .await
            .map_err(|e| discovery_error("cannot bind discovery socket", e))?;
        socket
            .set_broadcast(true)
            .map_err(|e| discovery_error("cannot enable broadcast", e))?;

        tracing::debug!(target = %self.options.target, "sending discovery queries");
        for query in QUERIES {
            let datagram = EiscpPacket::raw(query).encode()?;
            socket
                .send_to(&datagram, self.options.target)
                .await
                .map_err(|e| discovery_error("cannot send discovery query", e))?;
        }

        let deadline = Instant::now() + self.options.timeout;
        let state = BrowseState {
            socket,
            deadline,
            seen: HashSet::new(),
        };
        Ok(futures::stream::unfold(state, |mut state| async move {
            let info = state.next_reply().await?;
            Some((info, state))
        }))
    }
}

struct BrowseState {
    socket: UdpSocket,
    deadline: Instant,
    seen: HashSet<String>,
}

impl BrowseState {
    async fn next_reply(&mut self) -> Option<ReceiverInfo> {
        let mut buf = [0u8; 1024];
        loop {
            let (len, from) =
                match tokio::time::timeout_at(self.deadline, self.socket.recv_from(&mut buf)).await
                {
                    Ok(Ok(received)) => received,
                    Ok(Err(e)) => {
                        tracing::warn!("discovery receive failed: {}", e);
                        return None;
                    }
                    Err(_) => return None,
                };

            let Ok(packet) = EiscpPacket::decode(&buf[..len]) else {
                tracing::debug!(%from, "ignoring non-eISCP datagram");
                continue;
            };
            let Some(info) = parser::parse_info(packet.payload(), from.ip()) else {
                continue;
            };
            if self.seen.insert(info.identifier.clone()) {
                tracing::info!(model = %info.model, host = %info.host, "receiver discovered");
                return Some(info);
            }
        }
    }
}

fn discovery_error(message: &str, e: std::io::Error) -> OnkyoError {
    OnkyoError::DiscoveryFailed {
        message: format!("{message}: {e}"),
        source: Some(Box::new(e)),
    }
}
