//! High-level receiver client

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;

use crate::connection::{ConnectionEvent, ConnectionManager, ConnectionState, ConnectionStats};
use crate::control::{VolumeScale, ZoneController};
use crate::discovery::{DiscoveryOptions, scan_with_options};
use crate::error::{OnkyoError, Result};
use crate::protocol::{Command, Property, Status, StatusMessage, Zone};
use crate::state::{StateChange, StateTracker};
use crate::types::{ReceiverConfig, ReceiverEndpoint, ReceiverInfo, ReceiverState, SourceMapping};


/// Client for one Onkyo / Integra / Pioneer receiver
///
/// Owns the connection, feeds every decoded message into a
/// [`StateTracker`] and keeps the state complete: on each (re)connect it
/// probes for extra zones and queries everything it tracks, and after an
/// input change it refreshes the audio/video information once the
/// receiver has settled.
///
/// # Example
///
/// ```rust,no_run
/// use onkyo_eiscp::{ReceiverClient, ReceiverConfig, Zone};
///
/// # async fn example() -> Result<(), onkyo_eiscp::OnkyoError> {
/// let config = ReceiverConfig::builder().host("192.168.1.20").build()?;
/// let client = ReceiverClient::new(config)?;
/// client.connect().await?;
///
/// let main = client.zone(Zone::Main);
/// main.turn_on().await?;
/// main.set_volume_level(0.3).await?;
/// main.select_source("Bluray").await?;
///
/// client.shutdown().await;
/// # Ok(())
/// # }
/// ```
pub struct ReceiverClient {
    config: ReceiverConfig,
    connection: Arc<ConnectionManager>,
    tracker: Arc<StateTracker>,
    sources: Arc<SourceMapping>,
    scale: VolumeScale,
    maintenance: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for ReceiverClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReceiverClient")
            .field("config", &self.config)
            .field("scale", &self.scale)
            .finish_non_exhaustive()
    }
}

impl ReceiverClient {
    /// Create a client for the configured host
    ///
    /// # Errors
    ///
    /// Returns `Config` if the configuration has no host or is invalid.
    pub fn new(config: ReceiverConfig) -> Result<Self> {
        config.validate()?;
        let endpoint = config.endpoint()?;
        Ok(Self::with_endpoint(endpoint, config))
    }

    /// Create a client for a discovered receiver
    #[must_use]
    pub fn from_discovery(info: &ReceiverInfo, config: ReceiverConfig) -> Self {
        let endpoint = match &config.name {
            Some(name) => info.endpoint().with_name(name.clone()),
            None => info.endpoint(),
        };
        Self::with_endpoint(endpoint, config)
    }

    /// Create a client for an explicit endpoint; the config's host is ignored
    #[must_use]
    pub fn with_endpoint(endpoint: ReceiverEndpoint, config: ReceiverConfig) -> Self {
        let connection = Arc::new(ConnectionManager::new(
            endpoint,
            config.connection.clone(),
        ));
        let tracker = Arc::new(StateTracker::new());
        let refresher = Arc::new(AvRefresher::new(
            Arc::downgrade(&connection),
            Arc::clone(&tracker),
            config.av_info_delay,
        ));

        let sink = Arc::clone(&tracker);
        connection.on_receive(move |message| {
            sink.apply(message);
            if triggers_av_refresh(message) {
                refresher.schedule();
            }
        });

        Self {
            sources: Arc::new(config.sources.clone()),
            scale: VolumeScale::from_config(&config),
            config,
            connection,
            tracker,
            maintenance: Mutex::new(None),
        }
    }

    /// The receiver this client talks to
    #[must_use]
    pub fn endpoint(&self) -> &ReceiverEndpoint {
        self.connection.endpoint()
    }

    /// The configuration in use
    #[must_use]
    pub fn config(&self) -> &ReceiverConfig {
        &self.config
    }

    // === Connection ===

    /// Connect once and keep the connection alive
    ///
    /// # Errors
    ///
    /// Returns `ConnectionFailed` or `ConnectionTimeout` if the first attempt
    /// fails; nothing keeps retrying in that case. Returns `Shutdown` after
    /// [`shutdown`](Self::shutdown).
    pub async fn connect(&self) -> Result<()> {
        self.ensure_open()?;
        self.start_maintenance().await;
        self.connection.connect().await
    }

    /// Keep trying to connect in the background
    ///
    /// # Errors
    ///
    /// Returns `Shutdown` after [`shutdown`](Self::shutdown).
    pub async fn start(&self) -> Result<()> {
        self.ensure_open()?;
        self.start_maintenance().await;
        self.connection.start().await
    }

    /// Disconnect until [`resume`](Self::resume)
    pub async fn halt(&self) {
        self.connection.halt().await;
    }

    /// Reconnect after [`halt`](Self::halt)
    pub fn resume(&self) {
        self.connection.resume();
    }

    /// Disconnect for good
    pub async fn shutdown(&self) {
        self.connection.shutdown().await;
        if let Some(handle) = self.maintenance.lock().await.take() {
            handle.abort();
        }
    }

    /// Current connection state
    pub async fn connection_state(&self) -> ConnectionState {
        self.connection.state().await
    }

    /// Check if connected
    pub async fn is_connected(&self) -> bool {
        self.connection.state().await.is_connected()
    }

    /// Connection statistics
    pub async fn stats(&self) -> ConnectionStats {
        self.connection.stats().await
    }

    /// Connection events
    #[must_use]
    pub fn connection_events(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.connection.subscribe()
    }

    // === State ===

    /// Snapshot of the confirmed receiver state
    #[must_use]
    pub fn state(&self) -> ReceiverState {
        self.tracker.current_state()
    }

    /// State changes from now on
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.tracker.subscribe()
    }

    /// Full state, re-delivered on change
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<ReceiverState> {
        self.tracker.watch()
    }

    /// Zones the receiver has reported
    #[must_use]
    pub fn zones(&self) -> Vec<Zone> {
        self.tracker.current_state().zones().map(|(zone, _)| zone).collect()
    }

    // === Control ===

    /// Controller for one zone
    #[must_use]
    pub fn zone(&self, zone: Zone) -> ZoneController {
        ZoneController::new(
            zone,
            Arc::clone(&self.connection),
            Arc::clone(&self.tracker),
            Arc::clone(&self.sources),
            self.scale,
        )
    }

    /// Controller for the main zone
    #[must_use]
    pub fn main(&self) -> ZoneController {
        self.zone(Zone::Main)
    }

    /// Send a validated command
    ///
    /// # Errors
    ///
    /// Returns `NotConnected` without a connection.
    pub async fn send(&self, command: &Command) -> Result<()> {
        self.connection.send(command).await
    }

    /// Parse and send a textual command such as `zone2.volume=40`
    ///
    /// # Errors
    ///
    /// Returns the parse error, or the connection's send errors.
    pub async fn execute(&self, command: &str) -> Result<()> {
        let command: Command = command.parse()?;
        self.send(&command).await
    }

    /// Ask the receiver to report a property
    ///
    /// # Errors
    ///
    /// Returns `InvalidCommand` if the zone lacks the property.
    pub async fn query(&self, zone: Zone, property: Property) -> Result<()> {
        self.send(&Command::query(zone, property)?).await
    }

    /// Probe extra zones and re-query every known zone
    ///
    /// Runs automatically on each connect.
    ///
    /// # Errors
    ///
    /// Stops at the first failed send.
    pub async fn refresh(&self) -> Result<()> {
        refresh(&self.connection, &self.tracker, &self.sources, self.scale).await
    }

    /// Spawn the task that reacts to connects and newly found zones
    fn ensure_open(&self) -> Result<()> {
        if self.connection.is_shut_down() {
            return Err(OnkyoError::Shutdown);
        }
        Ok(())
    }

    /// Whether the background refresh task is running
    #[cfg(test)]
    pub(crate) async fn maintenance_running(&self) -> bool {
        self.maintenance
            .lock()
            .await
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    async fn start_maintenance(&self) {
        let mut maintenance = self.maintenance.lock().await;
        if maintenance.as_ref().is_some_and(|h| !h.is_finished()) {
            return;
        }

        // subscribe before the first dial so its Connected event is seen
        let mut events = self.connection.subscribe();
        let mut changes = self.tracker.subscribe();
        let connection = Arc::downgrade(&self.connection);
        let tracker = Arc::clone(&self.tracker);
        let sources = Arc::clone(&self.sources);
        let scale = self.scale;

        *maintenance = Some(tokio::spawn(async move {
            loop {
                tokio::select! {
                    event = events.recv() => match event {
                        Ok(ConnectionEvent::Connected { .. }) => {
                            let Some(connection) = connection.upgrade() else { break };
                            if let Err(e) = refresh(&connection, &tracker, &sources, scale).await {
                                tracing::debug!("state refresh interrupted: {}", e);
                            }
                        }
                        Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                    change = changes.recv() => match change {
                        Ok(StateChange::ZoneDiscovered { zone }) if zone != Zone::Main => {
                            let Some(connection) = connection.upgrade() else { break };
                            tracing::info!(zone = %zone, "zone discovered");
                            let controller = ZoneController::new(
                                zone,
                                connection,
                                Arc::clone(&tracker),
                                Arc::clone(&sources),
                                scale,
                            );
                            if let Err(e) = controller.backfill().await {
                                tracing::debug!(zone = %zone, "backfill interrupted: {}", e);
                            }
                        }
                        Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                }
            }
        }));
    }
}

impl Drop for ReceiverClient {
    fn drop(&mut self) {
        if let Ok(mut maintenance) = self.maintenance.try_lock() {
            if let Some(handle) = maintenance.take() {
                handle.abort();
            }
        }
    }
}

/// Connect using the configuration, discovering a receiver if no host is set
///
/// With a host the receiver is dialed directly; otherwise the first
/// receiver answering discovery within `discovery_timeout` is used.
///
/// # Errors
///
/// Returns `DiscoveryFailed` if no receiver answers, or the connection
/// errors of [`ReceiverClient::connect`].
pub async fn quick_connect(config: ReceiverConfig) -> Result<ReceiverClient> {
    let client = if config.host.is_some() {
        ReceiverClient::new(config)?
    } else {
        let found = scan_with_options(DiscoveryOptions::from_config(&config)).await?;
        let info = found.first().ok_or_else(|| OnkyoError::DiscoveryFailed {
            message: "no receiver answered".to_string(),
            source: None,
        })?;
        ReceiverClient::from_discovery(info, config)
    };
    client.connect().await?;
    Ok(client)
}

/// Create an unconnected client for every receiver discovery finds
///
/// # Errors
///
/// Returns `DiscoveryFailed` if the discovery socket cannot be set up.
pub async fn discover_clients(
    options: DiscoveryOptions,
    config: &ReceiverConfig,
) -> Result<Vec<ReceiverClient>> {
    let found = scan_with_options(options).await?;
    Ok(found
        .iter()
        .map(|info| ReceiverClient::from_discovery(info, config.clone()))
        .collect())
}

/// Zone detection plus backfill of every zone already known
async fn refresh(
    connection: &Arc<ConnectionManager>,
    tracker: &Arc<StateTracker>,
    sources: &Arc<SourceMapping>,
    scale: VolumeScale,
) -> Result<()> {
    tracing::debug!(endpoint = %connection.endpoint(), "refreshing receiver state");
    for zone in Zone::EXTRA {
        connection.send(&Command::query(zone, Property::Power)?).await?;
    }

    let known: Vec<Zone> = tracker.current_state().zones().map(|(zone, _)| zone).collect();
    for zone in known {
        ZoneController::new(
            zone,
            Arc::clone(connection),
            Arc::clone(tracker),
            Arc::clone(sources),
            scale,
        )
        .backfill()
        .await?;
    }
    Ok(())
}

/// An input change or new display text on the main zone means the signal
/// format may change shortly
fn triggers_av_refresh(message: &StatusMessage) -> bool {
    message.zone == Zone::Main
        && matches!(message.status, Status::Input(_) | Status::Display(_))
}

/// Delayed, de-duplicated audio/video information refresh
struct AvRefresher {
    connection: Weak<ConnectionManager>,
    tracker: Arc<StateTracker>,
    delay: Duration,
    pending: Arc<AtomicBool>,
}

impl AvRefresher {
    fn new(connection: Weak<ConnectionManager>, tracker: Arc<StateTracker>, delay: Duration) -> Self {
        Self {
            connection,
            tracker,
            delay,
            pending: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Queue one refresh unless one is already waiting
    fn schedule(&self) {
        if self.pending.swap(true, Ordering::AcqRel) {
            return;
        }

        let connection = self.connection.clone();
        let tracker = Arc::clone(&self.tracker);
        let pending = Arc::clone(&self.pending);
        let delay = self.delay;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            pending.store(false, Ordering::Release);

            let Some(connection) = connection.upgrade() else {
                return;
            };
            let main = tracker.current_state().main().clone();
            let wanted = [
                (main.supports_audio_information, Property::AudioInformation),
                (main.supports_video_information, Property::VideoInformation),
            ];
            for (supported, property) in wanted {
                if !supported {
                    continue;
                }
                let result = match Command::query(Zone::Main, property) {
                    Ok(command) => connection.send(&command).await,
                    Err(e) => Err(e),
                };
                if let Err(e) = result {
                    tracing::debug!(%property, "information refresh skipped: {}", e);
                    return;
                }
            }
        });
    }
}
