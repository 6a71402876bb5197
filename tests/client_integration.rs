use std::sync::Arc;
use std::time::Duration;

use onkyo_eiscp::testing::mock_receiver::{MockReceiver, MockReceiverConfig};
use onkyo_eiscp::{
    ConnectionState, HdmiOutput, InputSource, PowerState, Property, ReceiverClient,
    ReceiverConfig, SourceMapping, StateChange, Status, StatusMessage, Zone,
};
use tokio::time::timeout;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

fn config_for(receiver: &MockReceiver) -> ReceiverConfig {
    let addr = receiver.address().expect("receiver not started");
    ReceiverConfig::builder()
        .host(addr.ip().to_string())
        .port(addr.port())
        .name("Living Room")
        .sources(
            SourceMapping::empty()
                .with("pc", "HTPC")
                .with("fm", "Radio")
                .with("bd", "Bluray"),
        )
        .max_volume(50)
        .backoff(Duration::from_millis(20), 2.0, Duration::from_millis(200))
        .av_info_delay(Duration::from_millis(50))
        .build()
        .expect("valid config")
}

async fn next_matching(
    rx: &mut tokio::sync::broadcast::Receiver<StateChange>,
    wanted: impl Fn(&StateChange) -> bool,
) -> StateChange {
    timeout(Duration::from_secs(3), async {
        loop {
            let change = rx.recv().await.expect("tracker closed");
            if wanted(&change) {
                return change;
            }
        }
    })
    .await
    .expect("change not seen")
}

#[tokio::test]
async fn test_client_integration_flow() {
    init_tracing();

    let mut receiver = MockReceiver::default_receiver();
    receiver.start().await.expect("Failed to start mock receiver");

    let client = ReceiverClient::new(config_for(&receiver)).unwrap();
    let mut changes = client.subscribe();
    assert_eq!(client.endpoint().display_name(), "Living Room");

    timeout(Duration::from_secs(5), client.connect())
        .await
        .expect("Connection timed out")
        .expect("Connection failed");
    assert_eq!(client.connection_state().await, ConnectionState::Connected);

    // zone 2 answers the probe
    next_matching(&mut changes, |c| {
        *c == StateChange::ZoneDiscovered { zone: Zone::Zone2 }
    })
    .await;

    let main = client.main();
    main.turn_on().await.unwrap();
    next_matching(&mut changes, |c| {
        *c == StateChange::Updated {
            zone: Zone::Main,
            status: Status::Power(PowerState::On),
        }
    })
    .await;

    // max_volume 50 of 80 steps: full scale is step 40
    main.set_volume_level(0.5).await.unwrap();
    assert!(receiver.wait_for_command("MVL14", Duration::from_secs(2)).await);
    next_matching(&mut changes, |c| {
        matches!(c, StateChange::Updated { status: Status::Volume(20), .. })
    })
    .await;
    assert!((main.volume_level().unwrap() - 0.5).abs() < f64::EPSILON);

    main.select_source("HTPC").await.unwrap();
    assert!(receiver.wait_for_command("SLI05", Duration::from_secs(2)).await);
    next_matching(&mut changes, |c| {
        *c == StateChange::Updated {
            zone: Zone::Main,
            status: Status::Input(InputSource::from_code(0x05)),
        }
    })
    .await;
    assert_eq!(main.source().as_deref(), Some("HTPC"));

    main.select_hdmi_output(HdmiOutput::Sub).await.unwrap();
    assert!(receiver.wait_for_command("HDO02", Duration::from_secs(2)).await);

    let zone2 = client.zone(Zone::Zone2);
    zone2.select_source("Radio").await.unwrap();
    next_matching(&mut changes, |c| {
        *c == StateChange::Updated {
            zone: Zone::Zone2,
            status: Status::Input(InputSource::FM),
        }
    })
    .await;
    zone2.play_preset(7).await.unwrap();
    assert!(receiver.wait_for_command("PRZ07", Duration::from_secs(2)).await);

    client.shutdown().await;
    assert_eq!(client.connection_state().await, ConnectionState::Closed);
}

#[tokio::test]
async fn test_standby_report_clears_session_attributes() {
    let mut receiver = MockReceiver::new(MockReceiverConfig {
        zones: vec![Zone::Main],
        ..MockReceiverConfig::default()
    });
    receiver.start().await.unwrap();
    let client = ReceiverClient::new(config_for(&receiver)).unwrap();
    let mut changes = client.subscribe();
    client.connect().await.unwrap();

    next_matching(&mut changes, |c| c.property() == Some(Property::HdmiOutput)).await;

    receiver
        .push(StatusMessage::new(Zone::Main, Status::Power(PowerState::On)))
        .await;
    receiver
        .push(StatusMessage::new(Zone::Main, Status::Power(PowerState::Standby)))
        .await;

    next_matching(&mut changes, |c| {
        *c == StateChange::Cleared {
            zone: Zone::Main,
            property: Property::HdmiOutput,
        }
    })
    .await;
    assert!(client.state().main().hdmi_output.is_none());
    assert!(client.state().main().audio_information.is_none());
}

#[tokio::test]
async fn test_concurrent_senders_are_serialized() {
    let mut receiver = MockReceiver::new(MockReceiverConfig {
        respond: false,
        ..MockReceiverConfig::default()
    });
    receiver.start().await.unwrap();
    let client = Arc::new(ReceiverClient::new(config_for(&receiver)).unwrap());
    client.connect().await.unwrap();
    // let the connect-time queries through first
    assert!(receiver.wait_for_command("PW4QSTN", Duration::from_secs(2)).await);
    assert!(receiver.wait_for_command("IFVQSTN", Duration::from_secs(2)).await);
    receiver.clear_received().await;

    let mut handles = Vec::new();
    for step in 0u8..20 {
        let client = Arc::clone(&client);
        handles.push(tokio::spawn(async move {
            client.execute(&format!("main.volume={step}")).await.unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while receiver.received_commands().await.len() < 20 {
        assert!(tokio::time::Instant::now() < deadline, "commands missing");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    // every command arrives intact, none interleaved
    let mut received = receiver.received_commands().await;
    received.sort();
    let mut expected: Vec<String> = (0u8..20).map(|v| format!("MVL{v:02X}")).collect();
    expected.sort();
    assert_eq!(received, expected);
}

#[tokio::test]
async fn test_unknown_source_is_rejected_locally() {
    let mut receiver = MockReceiver::new(MockReceiverConfig {
        zones: vec![Zone::Main],
        ..MockReceiverConfig::default()
    });
    receiver.start().await.unwrap();
    let client = ReceiverClient::new(config_for(&receiver)).unwrap();
    client.connect().await.unwrap();
    assert!(receiver.wait_for_command("IFVQSTN", Duration::from_secs(2)).await);

    assert!(client.main().select_source("Betamax").await.is_err());
    // aliases work without a mapping entry
    client.main().select_source("cd").await.unwrap();
    assert!(receiver.wait_for_command("SLI23", Duration::from_secs(2)).await);
    assert_eq!(
        receiver.status(Zone::Main, Property::Input).await,
        Status::Input(InputSource::from_code(0x23))
    );
}
