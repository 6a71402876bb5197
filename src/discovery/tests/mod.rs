mod parser_tests;

use std::time::Duration;

use futures::StreamExt;

use super::{DiscoveryOptions, interview_at, scan, scan_with_options};
use crate::testing::mock_receiver::{MockReceiver, MockReceiverConfig};

#[tokio::test]
async fn test_scan_with_timeout() {
    // may find nothing, but must not fail
    let result = scan(Duration::from_millis(100)).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_scan_finds_mock_receiver_once() {
    let mut receiver = MockReceiver::default_receiver();
    let control = receiver.start().await.unwrap();
    let discovery = receiver.start_discovery().await.unwrap();

    // both queries are answered, the receiver is reported once
    let found = scan_with_options(DiscoveryOptions::unicast(
        discovery,
        Duration::from_millis(300),
    ))
    .await
    .unwrap();

    assert_eq!(found.len(), 1);
    let info = &found[0];
    assert_eq!(info.model, "TX-NR656");
    assert_eq!(info.identifier, "0009B0123456");
    assert_eq!(info.area, "XX");
    assert_eq!(info.port, control.port());
    assert_eq!(info.host, discovery.ip());
}

#[tokio::test]
async fn test_discover_stream_ends_at_timeout() {
    let mut receiver = MockReceiver::new(MockReceiverConfig {
        identifier: "ABC".to_string(),
        ..MockReceiverConfig::default()
    });
    receiver.start().await.unwrap();
    let discovery = receiver.start_discovery().await.unwrap();

    let stream = super::discover_with_options(DiscoveryOptions::unicast(
        discovery,
        Duration::from_millis(200),
    ))
    .await
    .unwrap();
    let all: Vec<_> = tokio::time::timeout(Duration::from_secs(2), stream.collect::<Vec<_>>())
        .await
        .unwrap();

    assert_eq!(all.len(), 1);
    assert_eq!(all[0].identifier, "ABC");
}

#[tokio::test]
async fn test_interview() {
    let mut receiver = MockReceiver::default_receiver();
    receiver.start().await.unwrap();
    let discovery = receiver.start_discovery().await.unwrap();

    let info = interview_at(discovery, Duration::from_secs(1))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(info.endpoint().name(), Some("TX-NR656"));
}

#[tokio::test]
async fn test_interview_silent_host() {
    let silent = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let target = silent.local_addr().unwrap();

    let info = interview_at(target, Duration::from_millis(100)).await.unwrap();
    assert!(info.is_none());
}

#[test]
fn test_default_options_broadcast() {
    let options = DiscoveryOptions::default();
    assert_eq!(options.target.to_string(), "255.255.255.255:60128");
    assert_eq!(options.timeout, Duration::from_secs(5));
}
