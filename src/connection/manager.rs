//! Connection manager for a single receiver

use std::sync::{Arc, PoisonError, RwLock as StdRwLock};
use std::time::Instant;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{Mutex, RwLock, broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::codec::{FramedRead, FramedWrite};

use super::backoff::Backoff;
use super::state::{ConnectionEvent, ConnectionState, ConnectionStats, DisconnectReason};
use crate::error::{OnkyoError, Result};
use crate::protocol::{Command, EiscpCodec, EiscpCodecError, EiscpPacket, StatusMessage};
use crate::types::{ConnectionConfig, ReceiverEndpoint};

type ReceiveCallback = Arc<dyn Fn(&StatusMessage) + Send + Sync>;

/// Desired run state, written by the API and observed by the supervisor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    Run,
    Halt,
    Shutdown,
}

/// Keeps one TCP connection to a receiver alive
///
/// A supervisor task owns the read half: it decodes inbound messages,
/// invokes the registered callbacks in arrival order and reconnects with
/// exponential backoff when the connection drops. Sends from any number of
/// tasks are serialized on the write half.
pub struct ConnectionManager {
    inner: Arc<Inner>,
}

struct Inner {
    endpoint: ReceiverEndpoint,
    config: ConnectionConfig,
    state: RwLock<ConnectionState>,
    writer: Mutex<Option<FramedWrite<OwnedWriteHalf, EiscpCodec>>>,
    callbacks: StdRwLock<Vec<ReceiveCallback>>,
    stats: RwLock<ConnectionStats>,
    event_tx: broadcast::Sender<ConnectionEvent>,
    control: watch::Sender<Control>,
    supervisor: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectionManager {
    /// Create a manager; nothing is dialed until `connect` or `start`
    #[must_use]
    pub fn new(endpoint: ReceiverEndpoint, config: ConnectionConfig) -> Self {
        let (event_tx, _) = broadcast::channel(config.event_capacity.max(1));
        let (control, _) = watch::channel(Control::Run);

        Self {
            inner: Arc::new(Inner {
                endpoint,
                config,
                state: RwLock::new(ConnectionState::Disconnected),
                writer: Mutex::new(None),
                callbacks: StdRwLock::new(Vec::new()),
                stats: RwLock::new(ConnectionStats::default()),
                event_tx,
                control,
                supervisor: Mutex::new(None),
            }),
        }
    }

    /// The receiver this manager talks to
    #[must_use]
    pub fn endpoint(&self) -> &ReceiverEndpoint {
        &self.inner.endpoint
    }

    /// Get current connection state
    pub async fn state(&self) -> ConnectionState {
        *self.inner.state.read().await
    }

    /// Get connection statistics
    pub async fn stats(&self) -> ConnectionStats {
        self.inner.stats.read().await.clone()
    }

    /// Subscribe to connection events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.inner.event_tx.subscribe()
    }

    /// Register a callback for every decoded status message
    ///
    /// Callbacks run on the supervisor task in arrival order and must not
    /// block.
    pub fn on_receive<F>(&self, callback: F)
    where
        F: Fn(&StatusMessage) + Send + Sync + 'static,
    {
        self.inner
            .callbacks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(callback));
    }

    /// Connect once, then keep the connection alive in the background
    ///
    /// If the supervisor is already running this returns `Ok` when
    /// connected and `NotConnected` while it is still retrying.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionFailed` or `ConnectionTimeout` if the attempt fails,
    /// `Shutdown` after `shutdown`.
    pub async fn connect(&self) -> Result<()> {
        self.ensure_open()?;

        let mut supervisor = self.inner.supervisor.lock().await;
        if supervisor.as_ref().is_some_and(|h| !h.is_finished()) {
            return if self.state().await.is_connected() {
                Ok(())
            } else {
                Err(self.inner.not_connected())
            };
        }

        match self.inner.dial().await {
            Ok(reader) => {
                *supervisor = Some(tokio::spawn(Arc::clone(&self.inner).supervise(Some(reader))));
                Ok(())
            }
            Err(e) => {
                self.inner.set_state(ConnectionState::Disconnected).await;
                Err(e)
            }
        }
    }

    /// Start the supervisor without waiting for the first connection
    ///
    /// Failed attempts, including the first, are retried on the backoff
    /// schedule.
    ///
    /// # Errors
    ///
    /// Returns `Shutdown` after `shutdown`.
    pub async fn start(&self) -> Result<()> {
        self.ensure_open()?;

        let mut supervisor = self.inner.supervisor.lock().await;
        if supervisor.as_ref().is_none_or(JoinHandle::is_finished) {
            *supervisor = Some(tokio::spawn(Arc::clone(&self.inner).supervise(None)));
        }
        Ok(())
    }

    /// Send a command
    ///
    /// # Errors
    ///
    /// Returns `NotConnected` without a live connection, `Shutdown` after
    /// `shutdown`, or `NetworkError` if the write fails.
    pub async fn send(&self, command: &Command) -> Result<()> {
        self.send_packet(command.to_packet()).await?;
        tracing::debug!(endpoint = %self.inner.endpoint, %command, "sent");
        Ok(())
    }

    /// Send a pre-built packet
    ///
    /// # Errors
    ///
    /// Same as [`send`](Self::send).
    pub async fn send_packet(&self, packet: EiscpPacket) -> Result<()> {
        self.ensure_open()?;
        let len = packet.wire_len();

        {
            let mut writer = self.inner.writer.lock().await;
            let Some(sink) = writer.as_mut() else {
                return Err(self.inner.not_connected());
            };
            if let Err(e) = sink.send(packet).await {
                tracing::warn!(endpoint = %self.inner.endpoint, "write failed: {}", e);
                *writer = None;
                return Err(e.into());
            }
        }

        self.inner.stats.write().await.record_sent(len);
        Ok(())
    }

    /// Close the connection and stop reconnecting until `resume`
    pub async fn halt(&self) {
        let changed = self.inner.control.send_if_modified(|c| {
            if *c == Control::Run {
                *c = Control::Halt;
                true
            } else {
                false
            }
        });
        if changed {
            tracing::info!(endpoint = %self.inner.endpoint, "halting connection");
            self.inner.close_writer().await;
        }
    }

    /// Reconnect after `halt`
    pub fn resume(&self) {
        let changed = self.inner.control.send_if_modified(|c| {
            if *c == Control::Halt {
                *c = Control::Run;
                true
            } else {
                false
            }
        });
        if changed {
            tracing::info!(endpoint = %self.inner.endpoint, "resuming connection");
        }
    }

    /// Close the connection and stop reconnecting for good
    ///
    /// Commands still queued on the socket may be lost.
    pub async fn shutdown(&self) {
        if self.inner.control.send_replace(Control::Shutdown) == Control::Shutdown {
            return;
        }
        tracing::info!(endpoint = %self.inner.endpoint, "shutting down connection");

        self.inner.close_writer().await;
        let handle = self.inner.supervisor.lock().await.take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
        self.inner.set_state(ConnectionState::Closed).await;
    }

    /// Check if `shutdown` has been called
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        *self.inner.control.borrow() == Control::Shutdown
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_shut_down() {
            return Err(OnkyoError::Shutdown);
        }
        Ok(())
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.inner.control.send_replace(Control::Shutdown);
    }
}

impl Inner {
    fn not_connected(&self) -> OnkyoError {
        OnkyoError::NotConnected {
            endpoint: self.endpoint.to_string(),
        }
    }

    async fn set_state(&self, new_state: ConnectionState) {
        let old_state = {
            let mut state = self.state.write().await;
            let old = *state;
            *state = new_state;
            old
        };

        if old_state != new_state {
            self.send_event(ConnectionEvent::StateChanged {
                old: old_state,
                new: new_state,
            });
        }
    }

    fn send_event(&self, event: ConnectionEvent) {
        let _ = self.event_tx.send(event);
    }

    async fn close_writer(&self) {
        if let Some(mut writer) = self.writer.lock().await.take() {
            let _ = writer.close().await;
        }
    }

    /// One connection attempt; on success the write half is installed
    async fn dial(&self) -> Result<OwnedReadHalf> {
        self.set_state(ConnectionState::Connecting).await;
        let addr = self.endpoint.address();
        tracing::debug!("Connecting to {}", addr);

        let stream =
            match tokio::time::timeout(self.config.connect_timeout, TcpStream::connect(&addr))
                .await
            {
                Ok(Ok(stream)) => stream,
                Ok(Err(e)) => {
                    return Err(OnkyoError::ConnectionFailed {
                        endpoint: addr,
                        message: e.to_string(),
                        source: Some(Box::new(e)),
                    });
                }
                Err(_) => {
                    return Err(OnkyoError::ConnectionTimeout {
                        duration: self.config.connect_timeout,
                    });
                }
            };
        let _ = stream.set_nodelay(true);

        let (reader, writer) = stream.into_split();
        *self.writer.lock().await = Some(FramedWrite::new(writer, EiscpCodec::new()));
        {
            let mut stats = self.stats.write().await;
            stats.connected_at = Some(Instant::now());
            stats.last_error = None;
        }

        self.set_state(ConnectionState::Connected).await;
        tracing::info!(endpoint = %self.endpoint, "connected");
        self.send_event(ConnectionEvent::Connected {
            endpoint: self.endpoint.clone(),
        });
        Ok(reader)
    }

    /// Supervisor: read while connected, reconnect while allowed
    async fn supervise(self: Arc<Self>, mut initial: Option<OwnedReadHalf>) {
        let mut control = self.control.subscribe();
        let mut backoff = Backoff::from_config(&self.config);

        loop {
            let current = *control.borrow_and_update();
            match current {
                Control::Shutdown => break,
                Control::Halt => {
                    self.set_state(ConnectionState::Halted).await;
                    let resumed = control.wait_for(|c| *c != Control::Halt).await.is_ok();
                    if !resumed {
                        break;
                    }
                    continue;
                }
                Control::Run => {}
            }

            let reader = if let Some(reader) = initial.take() {
                reader
            } else {
                let attempt = tokio::select! {
                    result = self.dial() => Some(result),
                    () = stopped(&mut control) => None,
                };
                match attempt {
                    Some(Ok(reader)) => reader,
                    Some(Err(e)) => {
                        tracing::warn!(endpoint = %self.endpoint, "connection attempt failed: {}", e);
                        self.stats.write().await.last_error = Some(e.to_string());
                        self.send_event(ConnectionEvent::Error {
                            message: e.to_string(),
                            recoverable: e.is_recoverable(),
                        });
                        self.wait_backoff(&mut backoff, &mut control).await;
                        continue;
                    }
                    None => {
                        // halted or shut down while dialing
                        self.close_writer().await;
                        self.stats.write().await.connected_at = None;
                        continue;
                    }
                }
            };

            let established = Instant::now();
            let reason = self.read_loop(reader, &mut control).await;
            self.close_writer().await;
            self.stats.write().await.connected_at = None;

            // a connection that stayed up for a backoff period counts as stable
            let stable = established.elapsed() >= self.config.initial_backoff;
            if stable {
                backoff.reset();
            }

            match &reason {
                DisconnectReason::UserRequested | DisconnectReason::Halted => {
                    tracing::debug!(endpoint = %self.endpoint, ?reason, "connection closed");
                }
                other => {
                    tracing::warn!(endpoint = %self.endpoint, reason = ?other, "connection lost");
                    self.set_state(ConnectionState::Reconnecting).await;
                }
            }
            let lost = !matches!(reason, DisconnectReason::UserRequested | DisconnectReason::Halted);
            self.send_event(ConnectionEvent::Disconnected {
                endpoint: self.endpoint.clone(),
                reason,
            });

            // redial a stable connection at once, otherwise wait out the backoff
            if lost && !stable {
                self.wait_backoff(&mut backoff, &mut control).await;
            }
        }

        self.set_state(ConnectionState::Closed).await;
        tracing::debug!(endpoint = %self.endpoint, "supervisor stopped");
    }

    /// Sleep for the next backoff delay; false if interrupted by halt or shutdown
    async fn wait_backoff(
        &self,
        backoff: &mut Backoff,
        control: &mut watch::Receiver<Control>,
    ) -> bool {
        let delay = backoff.next_delay();
        let attempt = backoff.attempt();
        self.stats.write().await.reconnect_attempts += 1;
        self.set_state(ConnectionState::Reconnecting).await;
        tracing::debug!(endpoint = %self.endpoint, attempt, "retrying in {:?}", delay);
        self.send_event(ConnectionEvent::ReconnectScheduled { attempt, delay });

        tokio::select! {
            () = tokio::time::sleep(delay) => true,
            () = stopped(control) => false,
        }
    }

    async fn read_loop(
        &self,
        reader: OwnedReadHalf,
        control: &mut watch::Receiver<Control>,
    ) -> DisconnectReason {
        let mut frames = FramedRead::new(reader, EiscpCodec::new());

        loop {
            tokio::select! {
                changed = control.changed() => {
                    if changed.is_err() {
                        return DisconnectReason::UserRequested;
                    }
                    let current = *control.borrow_and_update();
                    match current {
                        Control::Run => {}
                        Control::Halt => return DisconnectReason::Halted,
                        Control::Shutdown => return DisconnectReason::UserRequested,
                    }
                }
                frame = frames.next() => match frame {
                    Some(Ok(packet)) => self.dispatch(&packet).await,
                    Some(Err(EiscpCodecError::Packet(e))) => {
                        tracing::warn!(endpoint = %self.endpoint, "framing lost: {}", e);
                        return DisconnectReason::ProtocolError(e.to_string());
                    }
                    Some(Err(EiscpCodecError::Io(e))) => {
                        return DisconnectReason::NetworkError(e.to_string());
                    }
                    None => return DisconnectReason::RemoteClosed,
                },
            }
        }
    }

    async fn dispatch(&self, packet: &EiscpPacket) {
        let decoded = StatusMessage::decode(packet.payload());
        {
            let mut stats = self.stats.write().await;
            stats.record_received(packet.wire_len());
            match &decoded {
                Ok(_) => stats.messages_received += 1,
                Err(_) => stats.malformed_messages += 1,
            }
        }

        let message = match decoded {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(endpoint = %self.endpoint, "discarding message: {}", e);
                return;
            }
        };
        tracing::debug!(endpoint = %self.endpoint, %message, "received");

        let callbacks = self
            .callbacks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for callback in callbacks {
            callback(&message);
        }
    }
}

async fn stopped(control: &mut watch::Receiver<Control>) {
    let _ = control.wait_for(|c| *c != Control::Run).await;
}
