//! UDP discovery of receivers on the local network

mod browser;
pub mod parser;
#[cfg(test)]
mod tests;

pub use browser::{DiscoveryOptions, ReceiverBrowser};
pub use parser::parse_info;

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use futures::{Stream, StreamExt};

use crate::error::Result;
use crate::protocol::DEFAULT_PORT;
use crate::types::ReceiverInfo;

/// Discover receivers as they answer
///
/// Broadcasts the discovery queries and yields each receiver once. The
/// stream ends after the default timeout.
///
/// # Example
///
/// ```rust,no_run
/// use futures::StreamExt;
/// use onkyo_eiscp::discovery::discover;
///
/// # async fn example() -> Result<(), onkyo_eiscp::OnkyoError> {
/// let receivers = discover().await?;
/// futures::pin_mut!(receivers);
///
/// while let Some(info) = receivers.next().await {
///     println!("Found: {} at {}", info.model, info.host);
/// }
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns `DiscoveryFailed` if the UDP socket cannot be set up.
pub async fn discover() -> Result<impl Stream<Item = ReceiverInfo>> {
    discover_with_options(DiscoveryOptions::default()).await
}

/// Discover receivers with custom options
///
/// # Errors
///
/// Returns `DiscoveryFailed` if the UDP socket cannot be set up.
pub async fn discover_with_options(
    options: DiscoveryOptions,
) -> Result<impl Stream<Item = ReceiverInfo>> {
    ReceiverBrowser::new(options).browse().await
}

/// Scan for receivers with timeout
///
/// # Errors
///
/// Returns `DiscoveryFailed` if the UDP socket cannot be set up.
pub async fn scan(timeout: Duration) -> Result<Vec<ReceiverInfo>> {
    scan_with_options(DiscoveryOptions::broadcast(timeout)).await
}

/// Scan with custom options, collecting every receiver that answers
///
/// # Errors
///
/// Returns `DiscoveryFailed` if the UDP socket cannot be set up.
pub async fn scan_with_options(options: DiscoveryOptions) -> Result<Vec<ReceiverInfo>> {
    let stream = discover_with_options(options).await?;
    let receivers: HashMap<String, ReceiverInfo> = stream
        .map(|info| (info.identifier.clone(), info))
        .collect()
        .await;

    let mut receivers: Vec<_> = receivers.into_values().collect();
    receivers.sort_by(|a, b| a.host.cmp(&b.host).then_with(|| a.model.cmp(&b.model)));
    Ok(receivers)
}

/// Ask one known host for its identity
///
/// Returns `None` if it does not answer within `timeout`.
///
/// # Errors
///
/// Returns `DiscoveryFailed` if the UDP socket cannot be set up.
pub async fn interview(host: IpAddr, timeout: Duration) -> Result<Option<ReceiverInfo>> {
    interview_at(SocketAddr::new(host, DEFAULT_PORT), timeout).await
}

/// Like [`interview`], on a specific discovery port
///
/// # Errors
///
/// Returns `DiscoveryFailed` if the UDP socket cannot be set up.
pub async fn interview_at(target: SocketAddr, timeout: Duration) -> Result<Option<ReceiverInfo>> {
    let stream = discover_with_options(DiscoveryOptions::unicast(target, timeout)).await?;
    futures::pin_mut!(stream);
    Ok(stream.next().await)
}
