use bytes::BytesMut;
use tokio_util::codec::Decoder;

use super::*;
use crate::protocol::{
    EiscpCodec, HdmiOutput, InformationReport, InputSource, PowerState, Property, Status,
    StatusMessage, Zone,
};

fn msg(body: &str) -> StatusMessage {
    StatusMessage::parse_body(body).unwrap()
}

fn tuned_tracker() -> StateTracker {
    let tracker = StateTracker::new();
    for body in ["PWR01", "SLI24", "PRS05", "HDO01", "IFAHDMI 1,PCM,48 kHz,,,"] {
        tracker.apply(&msg(body));
    }
    tracker
}

#[test]
fn test_known_byte_fixture_decodes_to_state() {
    let mut wire = BytesMut::new();
    for body in ["PWR01", "MVL2A", "SLI10"] {
        let payload = format!("!1{body}\u{1a}\r\n");
        wire.extend_from_slice(b"ISCP\x00\x00\x00\x10");
        wire.extend_from_slice(&u32::try_from(payload.len()).unwrap().to_be_bytes());
        wire.extend_from_slice(&[0x01, 0x00, 0x00, 0x00]);
        wire.extend_from_slice(payload.as_bytes());
    }

    let tracker = StateTracker::new();
    let mut codec = EiscpCodec::new();
    while let Some(packet) = codec.decode(&mut wire).unwrap() {
        tracker.apply(&StatusMessage::decode(packet.payload()).unwrap());
    }

    let main = tracker.current_state().main().clone();
    assert_eq!(main.power, Some(PowerState::On));
    assert_eq!(main.volume, Some(42));
    assert_eq!(main.input, Some(InputSource::from_code(0x10)));
    assert!(tracker.current_state().last_updated().is_some());
}

#[test]
fn test_apply_reports_changes() {
    let tracker = StateTracker::new();

    let changes = tracker.apply(&msg("MVL14"));
    assert_eq!(
        changes,
        [StateChange::Updated {
            zone: Zone::Main,
            status: Status::Volume(20),
        }]
    );

    // same value again changes nothing
    assert!(tracker.apply(&msg("MVL14")).is_empty());
}

#[test]
fn test_standby_clears_session_attributes() {
    let tracker = tuned_tracker();
    assert_eq!(tracker.current_state().main().preset, Some(5));

    let changes = tracker.apply(&msg("PWR00"));

    let main = tracker.current_state().main().clone();
    assert_eq!(main.power, Some(PowerState::Standby));
    assert_eq!(main.preset, None);
    assert_eq!(main.hdmi_output, None);
    assert_eq!(main.audio_information, None);
    // the input survives standby
    assert_eq!(main.input, Some(InputSource::FM));
    assert!(changes.contains(&StateChange::Cleared {
        zone: Zone::Main,
        property: Property::HdmiOutput,
    }));
    assert_eq!(changes.len(), 4);
}

#[test]
fn test_preset_requires_tuner_input() {
    let tracker = StateTracker::new();

    tracker.apply(&msg("SLI10"));
    assert!(tracker.apply(&msg("PRS03")).is_empty());
    assert_eq!(tracker.current_state().main().preset, None);

    tracker.apply(&msg("SLI25"));
    tracker.apply(&msg("PRS03"));
    assert_eq!(tracker.current_state().main().preset, Some(3));

    let changes = tracker.apply(&msg("SLI10"));
    assert_eq!(tracker.current_state().main().preset, None);
    assert!(changes.contains(&StateChange::Cleared {
        zone: Zone::Main,
        property: Property::Preset,
    }));
}

#[test]
fn test_zone_discovery() {
    let tracker = StateTracker::new();

    assert!(tracker.apply(&msg("PW3N/A")).is_empty());
    assert!(!tracker.current_state().has_zone(Zone::Zone3));

    let changes = tracker.apply(&msg("ZPW00"));
    assert_eq!(
        changes,
        [
            StateChange::ZoneDiscovered { zone: Zone::Zone2 },
            StateChange::Updated {
                zone: Zone::Zone2,
                status: Status::Power(PowerState::Standby),
            },
        ]
    );
    assert!(tracker.zone(Zone::Zone2).is_some());
}

#[test]
fn test_not_available_volume_keeps_volume_unsupported() {
    let tracker = StateTracker::new();
    tracker.apply(&msg("ZPW01"));
    tracker.apply(&msg("ZVLN/A"));

    let zone2 = tracker.zone(Zone::Zone2).unwrap();
    assert!(!zone2.supports_volume());
    assert!(zone2.is_on());
}

#[test]
fn test_information_support_flags() {
    let tracker = StateTracker::new();
    let mut watch = tracker.watch();
    watch.borrow_and_update();

    // N/A still proves the receiver knows the query
    assert!(tracker.apply(&msg("IFVN/A")).is_empty());
    let main = tracker.current_state().main().clone();
    assert!(main.supports_video_information);
    assert!(!main.supports_audio_information);
    assert!(watch.has_changed().unwrap());

    tracker.apply(&msg("IFAHDMI 1,PCM,48 kHz,2.0 ch,,,"));
    let report = tracker.current_state().main().audio_information.clone().unwrap();
    assert_eq!(report, InformationReport::audio("HDMI 1,PCM,48 kHz,2.0 ch,,,"));

    tracker.apply(&msg("IFAN/A"));
    assert_eq!(tracker.current_state().main().audio_information, None);
    assert!(tracker.current_state().main().supports_audio_information);
}

#[test]
fn test_unknown_messages_are_ignored() {
    let tracker = StateTracker::new();
    let before = tracker.current_state();

    assert!(tracker.apply(&msg("NLTF300000000")).is_empty());
    assert_eq!(tracker.current_state(), before);
}

#[tokio::test]
async fn test_subscribe_sees_only_future_changes() {
    let tracker = StateTracker::new();
    tracker.apply(&msg("PWR01"));

    let mut rx = tracker.subscribe();
    tracker.apply(&msg("AMT01"));

    assert_eq!(
        rx.recv().await.unwrap(),
        StateChange::Updated {
            zone: Zone::Main,
            status: Status::Mute(true),
        }
    );
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_zone_filter() {
    let tracker = StateTracker::new();
    let mut zone2 = tracker.subscribe_zone(Zone::Zone2);

    tracker.apply(&msg("PWR01"));
    tracker.apply(&msg("ZPW01"));

    assert_eq!(
        zone2.recv().await,
        Some(StateChange::ZoneDiscovered { zone: Zone::Zone2 })
    );
    let next = zone2.recv().await.unwrap();
    assert_eq!(next.zone(), Zone::Zone2);
    assert_eq!(next.property(), Some(Property::Power));
}

#[tokio::test]
async fn test_filter_ends_with_tracker() {
    let tracker = StateTracker::new();
    let mut filter = tracker.subscribe_zone(Zone::Main);
    drop(tracker);

    assert_eq!(filter.recv().await, None);
}

#[test]
fn test_hdmi_output_change() {
    let tracker = tuned_tracker();
    tracker.apply(&msg("HDO02"));
    assert_eq!(
        tracker.current_state().main().hdmi_output,
        Some(HdmiOutput::Sub)
    );
}
