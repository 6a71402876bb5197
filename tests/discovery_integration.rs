use std::time::Duration;

use futures::StreamExt;
use onkyo_eiscp::discovery::{DiscoveryOptions, discover_with_options, interview_at};
use onkyo_eiscp::testing::mock_receiver::{MockReceiver, MockReceiverConfig};
use onkyo_eiscp::{ReceiverClient, ReceiverConfig};

#[tokio::test]
async fn test_discover_then_connect() {
    let mut receiver = MockReceiver::new(MockReceiverConfig {
        model: "TX-RZ50".to_string(),
        identifier: "0009B0FFEE01".to_string(),
        ..MockReceiverConfig::default()
    });
    let control = receiver.start().await.unwrap();
    let discovery = receiver.start_discovery().await.unwrap();

    let found: Vec<_> = discover_with_options(DiscoveryOptions::unicast(
        discovery,
        Duration::from_millis(300),
    ))
    .await
    .unwrap()
    .collect()
    .await;
    assert_eq!(found.len(), 1);
    let info = &found[0];
    assert_eq!(info.model, "TX-RZ50");
    assert_eq!(info.port, control.port());

    let client = ReceiverClient::from_discovery(info, ReceiverConfig::default());
    client.connect().await.unwrap();
    client.main().turn_on().await.unwrap();
    assert!(receiver.wait_for_command("PWR01", Duration::from_secs(2)).await);
}

#[tokio::test]
async fn test_two_receivers_are_reported_separately() {
    let mut first = MockReceiver::default_receiver();
    first.start().await.unwrap();
    let first_discovery = first.start_discovery().await.unwrap();

    let mut second = MockReceiver::new(MockReceiverConfig {
        identifier: "SECOND".to_string(),
        ..MockReceiverConfig::default()
    });
    second.start().await.unwrap();
    let second_discovery = second.start_discovery().await.unwrap();

    let a = interview_at(first_discovery, Duration::from_secs(1))
        .await
        .unwrap()
        .unwrap();
    let b = interview_at(second_discovery, Duration::from_secs(1))
        .await
        .unwrap()
        .unwrap();
    assert_ne!(a.identifier, b.identifier);
    assert_ne!(a.port, b.port);
}
