//! Mock eISCP receiver for testing purposes.
//!
//! Accepts TCP control connections, keeps a small per-zone model, applies
//! commands to it and answers like a real receiver: every reply is
//! broadcast to all connected clients. It also answers UDP discovery
//! queries. Tests can push unsolicited or garbage messages and drop
//! connections to exercise the client's recovery paths.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::sync::{RwLock, broadcast, watch};
use tokio_util::codec::{FramedRead, FramedWrite};

use crate::protocol::{
    EiscpCodec, EiscpPacket, HdmiOutput, InformationReport, InputSource, ListeningMode,
    MAX_PRESET, PowerState, Property, Status, StatusMessage, Zone,
};
use crate::types::ReceiverEndpoint;

/// Configuration for the mock receiver.
#[derive(Debug, Clone)]
pub struct MockReceiverConfig {
    /// TCP port to listen on, 0 for any.
    pub port: u16,
    /// Zones the receiver has; others answer `N/A`.
    pub zones: Vec<Zone>,
    /// Model name reported to discovery.
    pub model: String,
    /// Identifier reported to discovery.
    pub identifier: String,
    /// Area code reported to discovery.
    pub area: String,
    /// Raw `IFA` report, `None` answers `N/A`.
    pub audio_information: Option<String>,
    /// Raw `IFV` report, `None` answers `N/A`.
    pub video_information: Option<String>,
    /// Whether commands get a status reply.
    pub respond: bool,
}

impl Default for MockReceiverConfig {
    fn default() -> Self {
        Self {
            port: 0,
            zones: vec![Zone::Main, Zone::Zone2],
            model: "TX-NR656".to_string(),
            identifier: "0009B0123456".to_string(),
            area: "XX".to_string(),
            audio_information: Some("HDMI 1,PCM,48 kHz,2.0 ch,Stereo,2.0 ch,48 kHz,,,".to_string()),
            video_information: None,
            respond: true,
        }
    }
}

#[derive(Debug, Clone)]
struct MockZone {
    power: PowerState,
    volume: u8,
    muted: bool,
    input: InputSource,
    preset: u8,
    hdmi_output: HdmiOutput,
    listening_mode: ListeningMode,
}

impl Default for MockZone {
    fn default() -> Self {
        Self {
            power: PowerState::Standby,
            volume: 40,
            muted: false,
            input: InputSource::from_code(0x10),
            preset: 1,
            hdmi_output: HdmiOutput::Main,
            listening_mode: ListeningMode::from_code(0x00),
        }
    }
}

impl MockZone {
    fn apply(&mut self, status: Status) {
        match status {
            Status::Power(power) => self.power = power,
            Status::Volume(volume) => self.volume = volume,
            Status::Mute(muted) => self.muted = muted,
            Status::Input(input) => self.input = input,
            Status::Preset(preset) => self.preset = preset,
            Status::HdmiOutput(output) => self.hdmi_output = output,
            Status::ListeningMode(mode) => self.listening_mode = mode,
            _ => {}
        }
    }
}

/// Internal state of the mock receiver.
struct MockState {
    zones: BTreeMap<Zone, MockZone>,
    audio_information: Option<String>,
    video_information: Option<String>,
    display: String,
    received: Vec<String>,
    connections: usize,
}

impl MockState {
    fn status(&self, zone: Zone, property: Property) -> Status {
        let Some(z) = self.zones.get(&zone) else {
            return Status::NotAvailable(property);
        };
        match property {
            Property::Power => Status::Power(z.power),
            Property::Volume => Status::Volume(z.volume),
            Property::Mute => Status::Mute(z.muted),
            Property::Input => Status::Input(z.input),
            Property::Preset => Status::Preset(z.preset),
            Property::HdmiOutput => Status::HdmiOutput(z.hdmi_output),
            Property::ListeningMode => Status::ListeningMode(z.listening_mode),
            Property::AudioInformation => self
                .audio_information
                .as_deref()
                .map_or(Status::NotAvailable(property), |raw| {
                    Status::AudioInformation(InformationReport::audio(raw))
                }),
            Property::VideoInformation => self
                .video_information
                .as_deref()
                .map_or(Status::NotAvailable(property), |raw| {
                    Status::VideoInformation(InformationReport::video(raw))
                }),
            Property::Display => Status::Display(self.display.clone()),
        }
    }

    /// Apply a command body and produce the receiver's reply
    fn handle(&mut self, body: &str) -> Option<StatusMessage> {
        let code = body.get(..3)?;
        let value = &body[3..];
        let (zone, property) = Property::from_code(code)?;

        let Some(z) = self.zones.get_mut(&zone) else {
            return Some(StatusMessage::new(zone, Status::NotAvailable(property)));
        };

        if value != "QSTN" {
            match (property, value) {
                (Property::Volume, "UP" | "UP1") => {
                    z.volume = z.volume.saturating_add(1).min(zone.max_volume());
                }
                (Property::Volume, "DOWN" | "DOWN1") => z.volume = z.volume.saturating_sub(1),
                (Property::Mute, "TG") => z.muted = !z.muted,
                (Property::Preset, "UP") => z.preset = z.preset % MAX_PRESET + 1,
                (Property::Preset, "DOWN") => {
                    z.preset = if z.preset <= 1 { MAX_PRESET } else { z.preset - 1 };
                }
                _ => match StatusMessage::parse_body(body) {
                    Ok(message) => z.apply(message.status),
                    Err(_) => return None,
                },
            }
        }

        Some(StatusMessage::new(zone, self.status(zone, property)))
    }
}

#[derive(Debug, Clone)]
enum Outbound {
    Packet(EiscpPacket),
    Raw(Bytes),
    Drop,
}

/// A mock eISCP receiver.
pub struct MockReceiver {
    config: MockReceiverConfig,
    state: Arc<RwLock<MockState>>,
    outbound: broadcast::Sender<Outbound>,
    shutdown: Option<watch::Sender<bool>>,
    address: Option<SocketAddr>,
    discovery_address: Option<SocketAddr>,
}

impl MockReceiver {
    /// Creates a new mock receiver with the specified configuration.
    #[must_use]
    pub fn new(config: MockReceiverConfig) -> Self {
        let zones = config
            .zones
            .iter()
            .chain(std::iter::once(&Zone::Main))
            .map(|zone| (*zone, MockZone::default()))
            .collect();
        let (outbound, _) = broadcast::channel(256);

        Self {
            state: Arc::new(RwLock::new(MockState {
                zones,
                audio_information: config.audio_information.clone(),
                video_information: config.video_information.clone(),
                display: config.model.clone(),
                received: Vec::new(),
                connections: 0,
            })),
            config,
            outbound,
            shutdown: None,
            address: None,
            discovery_address: None,
        }
    }

    /// Creates a new mock receiver with default configuration.
    #[must_use]
    pub fn default_receiver() -> Self {
        Self::new(MockReceiverConfig::default())
    }

    fn shutdown_signal(&mut self) -> watch::Receiver<bool> {
        self.shutdown
            .get_or_insert_with(|| watch::channel(false).0)
            .subscribe()
    }

    /// Starts accepting control connections on 127.0.0.1.
    ///
    /// # Errors
    ///
    /// Returns an error if the TCP listener cannot be bound.
    pub async fn start(&mut self) -> Result<SocketAddr, std::io::Error> {
        let listener = TcpListener::bind(("127.0.0.1", self.config.port)).await?;
        let addr = listener.local_addr()?;
        self.address = Some(addr);

        let mut shutdown = self.shutdown_signal();
        let state = Arc::clone(&self.state);
        let outbound = self.outbound.clone();
        let respond = self.config.respond;

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => match result {
                        Ok((stream, _)) => {
                            // subscribe before counting so pushes after a count reach it
                            let rx = outbound.subscribe();
                            state.write().await.connections += 1;
                            tokio::spawn(Self::handle_connection(
                                stream,
                                Arc::clone(&state),
                                outbound.clone(),
                                rx,
                                respond,
                            ));
                        }
                        Err(e) => tracing::error!("Accept error: {}", e),
                    },
                    _ = shutdown.changed() => break,
                }
            }
        });

        Ok(addr)
    }

    /// Starts answering discovery queries on a UDP port of 127.0.0.1.
    ///
    /// The advertised control port is the one `start` bound.
    ///
    /// # Errors
    ///
    /// Returns an error if the UDP socket cannot be bound.
    pub async fn start_discovery(&mut self) -> Result<SocketAddr, std::io::Error> {
        let socket = UdpSocket::bind("127.0.0.1:0").await?;
        let addr = socket.local_addr()?;
        self.discovery_address = Some(addr);

        let mut shutdown = self.shutdown_signal();
        let reply = format!(
            "!1ECN{}/{:05}/{}/{}\u{1a}\r\n",
            self.config.model,
            self.address.map_or(self.config.port, |a| a.port()),
            self.config.area,
            self.config.identifier
        );

        tokio::spawn(async move {
            let mut buf = [0u8; 1024];
            loop {
                tokio::select! {
                    result = socket.recv_from(&mut buf) => {
                        let Ok((len, peer)) = result else { break };
                        let Ok(packet) = EiscpPacket::decode(&buf[..len]) else { continue };
                        let payload = packet.payload();
                        if !(payload.starts_with(b"!xECNQSTN") || payload.starts_with(b"!pECNQSTN")) {
                            continue;
                        }
                        if let Ok(datagram) = EiscpPacket::raw(reply.clone()).encode() {
                            let _ = socket.send_to(&datagram, peer).await;
                        }
                    }
                    _ = shutdown.changed() => break,
                }
            }
        });

        Ok(addr)
    }

    /// Stops the mock receiver and drops all connections.
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(true);
        }
        self.drop_connections();
    }

    /// Returns the control address.
    #[must_use]
    pub fn address(&self) -> Option<SocketAddr> {
        self.address
    }

    /// Returns the discovery address.
    #[must_use]
    pub fn discovery_address(&self) -> Option<SocketAddr> {
        self.discovery_address
    }

    /// Endpoint pointing at the control address.
    #[must_use]
    pub fn endpoint(&self) -> Option<ReceiverEndpoint> {
        self.address.map(ReceiverEndpoint::from)
    }

    /// Command bodies received so far, e.g. `PWR01`.
    pub async fn received_commands(&self) -> Vec<String> {
        self.state.read().await.received.clone()
    }

    /// Forget received commands.
    pub async fn clear_received(&self) {
        self.state.write().await.received.clear();
    }

    /// Number of accepted control connections.
    pub async fn connection_count(&self) -> usize {
        self.state.read().await.connections
    }

    /// Current model value of a property.
    pub async fn status(&self, zone: Zone, property: Property) -> Status {
        self.state.read().await.status(zone, property)
    }

    /// Change the model without notifying clients.
    pub async fn set_status(&self, zone: Zone, status: Status) {
        if let Some(z) = self.state.write().await.zones.get_mut(&zone) {
            z.apply(status);
        }
    }

    /// Apply a status to the model and send it to every client.
    pub async fn push(&self, message: StatusMessage) {
        self.set_status(message.zone, message.status.clone()).await;
        let _ = self.outbound.send(Outbound::Packet(message.to_packet()));
    }

    /// Write raw bytes to every client, bypassing framing.
    pub fn push_raw(&self, bytes: impl Into<Bytes>) {
        let _ = self.outbound.send(Outbound::Raw(bytes.into()));
    }

    /// Close every client connection.
    pub fn drop_connections(&self) {
        let _ = self.outbound.send(Outbound::Drop);
    }

    /// Poll until `count` control connections have been accepted.
    pub async fn wait_for_connections(&self, count: usize, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while self.connection_count().await < count {
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        true
    }

    /// Poll until a command body has been received.
    pub async fn wait_for_command(&self, body: &str, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.state.read().await.received.iter().any(|c| c == body) {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Handles a single client connection.
    async fn handle_connection(
        stream: TcpStream,
        state: Arc<RwLock<MockState>>,
        outbound: broadcast::Sender<Outbound>,
        mut rx: broadcast::Receiver<Outbound>,
        respond: bool,
    ) {
        let (reader, writer) = stream.into_split();
        let mut frames = FramedRead::new(reader, EiscpCodec::new());
        let mut sink = FramedWrite::new(writer, EiscpCodec::new());

        loop {
            tokio::select! {
                frame = frames.next() => {
                    let Some(Ok(packet)) = frame else { break };
                    let body = command_body(packet.payload());
                    let reply = {
                        let mut state = state.write().await;
                        state.received.push(body.clone());
                        if respond { state.handle(&body) } else { None }
                    };
                    if let Some(reply) = reply {
                        let _ = outbound.send(Outbound::Packet(reply.to_packet()));
                    }
                }
                out = rx.recv() => match out {
                    Ok(Outbound::Packet(packet)) => {
                        if sink.send(packet).await.is_err() {
                            break;
                        }
                    }
                    Ok(Outbound::Raw(bytes)) => {
                        let writer = sink.get_mut();
                        if writer.write_all(&bytes).await.is_err() || writer.flush().await.is_err() {
                            break;
                        }
                    }
                    Ok(Outbound::Drop) | Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(_)) => {}
                },
            }
        }
    }
}

impl Drop for MockReceiver {
    fn drop(&mut self) {
        self.stop();
    }
}

/// `!1PWR01\r` -> `PWR01`
fn command_body(payload: &[u8]) -> String {
    let text = String::from_utf8_lossy(payload);
    text.strip_prefix(EiscpPacket::RECEIVER_UNIT)
        .unwrap_or(&text)
        .trim_end_matches(['\r', '\n', '\u{1a}'])
        .to_string()
}
