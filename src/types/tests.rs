use super::*;
use crate::error::OnkyoError;
use crate::protocol::{InputSource, Zone};
use std::time::Duration;

// --- config.rs tests ---

#[test]
fn test_config_defaults() {
    let config = ReceiverConfig::default();

    assert_eq!(config.host, None);
    assert_eq!(config.port, 60128);
    assert_eq!(config.max_volume, 100);
    assert_eq!(config.receiver_max_volume, 80);
    assert_eq!(config.av_info_delay, Duration::from_secs(8));
    assert_eq!(config.discovery_timeout, Duration::from_secs(5));
    assert_eq!(config.connection.initial_backoff, Duration::from_secs(1));
    assert!((config.connection.backoff_multiplier - 2.0).abs() < f64::EPSILON);
    assert_eq!(config.connection.max_backoff, Duration::from_secs(60));
    assert_eq!(config.sources, SourceMapping::default());
}

#[test]
fn test_config_builder() {
    let config = ReceiverConfig::builder()
        .host("192.168.1.20")
        .name("Living Room")
        .max_volume(80)
        .receiver_max_volume(160)
        .backoff(Duration::from_millis(100), 1.5, Duration::from_secs(5))
        .av_info_delay(Duration::from_secs(2))
        .build()
        .unwrap();

    assert_eq!(config.host.as_deref(), Some("192.168.1.20"));
    assert_eq!(config.max_volume, 80);
    assert_eq!(config.receiver_max_volume, 160);
    assert_eq!(config.connection.max_backoff, Duration::from_secs(5));

    let endpoint = config.endpoint().unwrap();
    assert_eq!(endpoint.address(), "192.168.1.20:60128");
    assert_eq!(endpoint.display_name(), "Living Room");
}

#[test]
fn test_config_builder_rejects_out_of_range() {
    assert!(ReceiverConfig::builder().max_volume(0).build().is_err());
    assert!(ReceiverConfig::builder().max_volume(101).build().is_err());
    assert!(ReceiverConfig::builder().receiver_max_volume(201).build().is_err());
    assert!(
        ReceiverConfig::builder()
            .backoff(Duration::from_secs(10), 2.0, Duration::from_secs(1))
            .build()
            .is_err()
    );
    assert!(
        ReceiverConfig::builder()
            .backoff(Duration::from_secs(1), 0.5, Duration::from_secs(60))
            .build()
            .is_err()
    );
}

#[test]
fn test_config_from_json() {
    let config = ReceiverConfig::from_json(
        r#"{
            "host": "avr.local",
            "name": "Den",
            "max_volume": 60,
            "sources": { "pc": "HTPC", "fm": "Radio" },
            "connection": { "max_backoff": 30, "initial_backoff": 0.5 },
            "av_info_delay": 2.5
        }"#,
    )
    .unwrap();

    assert_eq!(config.host.as_deref(), Some("avr.local"));
    assert_eq!(config.port, 60128);
    assert_eq!(config.max_volume, 60);
    assert_eq!(config.sources.len(), 2);
    assert_eq!(config.connection.initial_backoff, Duration::from_millis(500));
    assert_eq!(config.connection.max_backoff, Duration::from_secs(30));
    assert_eq!(config.connection.connect_timeout, Duration::from_secs(5));
    assert_eq!(config.av_info_delay, Duration::from_millis(2500));
}

#[test]
fn test_config_from_json_rejects_unknown_source() {
    let err = ReceiverConfig::from_json(r#"{ "sources": { "betamax": "Old" } }"#).unwrap_err();
    assert!(matches!(err, OnkyoError::Config { message } if message.contains("betamax")));
}

#[test]
fn test_config_from_json_source_keys_ignore_case() {
    let config = ReceiverConfig::from_json(r#"{ "sources": { "PC": "HTPC", "Fm": "Radio" } }"#)
        .unwrap();

    assert_eq!(config.sources.friendly_name(InputSource::from_code(0x05)), "HTPC");
    assert_eq!(config.sources.friendly_name(InputSource::FM), "Radio");
    assert_eq!(config.sources.resolve("htpc").unwrap().code(), 0x05);
    assert_eq!(config.sources, SourceMapping::empty().with("pc", "HTPC").with("fm", "Radio"));
}

#[test]
fn test_config_from_json_rejects_bad_json() {
    let err = ReceiverConfig::from_json("{ host: ").unwrap_err();
    assert!(matches!(err, OnkyoError::Config { .. }));
}

#[test]
fn test_config_json_roundtrip() {
    let config = ReceiverConfig::builder()
        .host("10.0.0.5")
        .sources(SourceMapping::empty().with("pc", "HTPC"))
        .build()
        .unwrap();

    let json = config.to_json().unwrap();
    assert_eq!(ReceiverConfig::from_json(&json).unwrap(), config);
}

#[tokio::test]
async fn test_config_load_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("receiver.json");
    tokio::fs::write(&path, r#"{ "host": "10.0.0.7", "port": 60129 }"#)
        .await
        .unwrap();

    let config = ReceiverConfig::load(&path).await.unwrap();
    assert_eq!(config.endpoint().unwrap().address(), "10.0.0.7:60129");

    let missing = ReceiverConfig::load(dir.path().join("missing.json")).await;
    assert!(matches!(missing, Err(OnkyoError::Config { .. })));
}

#[test]
fn test_config_endpoint_requires_host() {
    assert!(ReceiverConfig::default().endpoint().is_err());
}

// --- endpoint.rs tests ---

#[test]
fn test_endpoint_address() {
    assert_eq!(ReceiverEndpoint::new("avr").address(), "avr:60128");
    assert_eq!(
        ReceiverEndpoint::new("fe80::1").with_port(1234).address(),
        "[fe80::1]:1234"
    );

    let addr: std::net::SocketAddr = "127.0.0.1:5000".parse().unwrap();
    let endpoint = ReceiverEndpoint::from(addr);
    assert_eq!(endpoint.host(), "127.0.0.1");
    assert_eq!(endpoint.port(), 5000);
    assert_eq!(endpoint.display_name(), "127.0.0.1");
}

#[test]
fn test_receiver_info_endpoint() {
    let info = ReceiverInfo {
        host: "192.168.1.30".parse().unwrap(),
        port: 60128,
        model: "TX-NR656".to_string(),
        area: "XX".to_string(),
        identifier: "0009B0123456".to_string(),
    };

    let endpoint = info.endpoint();
    assert_eq!(endpoint.name(), Some("TX-NR656"));
    assert_eq!(endpoint.to_string(), "192.168.1.30:60128");
}

// --- source.rs tests ---

#[test]
fn test_default_sources() {
    let sources = SourceMapping::default();

    assert_eq!(sources.friendly_name(InputSource::FM), "Radio");
    assert_eq!(sources.friendly_name(InputSource::from_code(0x10)), "Bluray");
    assert_eq!(sources.friendly_name(InputSource::from_code(0x05)), "Video 6");
    assert!(sources.source_list().contains(&"Game"));
}

#[test]
fn test_unmapped_source_uses_aliases() {
    let sources = SourceMapping::empty();

    assert_eq!(
        sources.friendly_name(InputSource::from_code(0x2B)),
        "network_net"
    );
    assert_eq!(sources.friendly_name(InputSource::from_code(0x99)), "99");
}

#[test]
fn test_resolve_friendly_name_and_alias() {
    let sources = SourceMapping::empty().with("pc", "HTPC");

    assert_eq!(sources.resolve("HTPC").unwrap().code(), 0x05);
    assert_eq!(sources.resolve("htpc").unwrap().code(), 0x05);
    assert_eq!(sources.resolve("cd").unwrap().code(), 0x23);

    let err = sources.resolve("Betamax").unwrap_err();
    assert!(matches!(err, OnkyoError::UnknownSource { name } if name == "Betamax"));
}

// --- state.rs tests ---

#[test]
fn test_receiver_state_default_has_main_only() {
    let state = ReceiverState::default();

    assert!(state.has_zone(Zone::Main));
    assert!(!state.has_zone(Zone::Zone2));
    assert!(!state.main().is_on());
    assert!(state.last_updated().is_none());
}

#[test]
fn test_zone_state_helpers() {
    let zone = ZoneState {
        input: Some(InputSource::AM),
        volume: Some(10),
        ..ZoneState::default()
    };

    assert!(zone.is_tuner());
    assert!(zone.supports_volume());
    assert!(!zone.is_on());
}
