use crate::error::OnkyoError;
use crate::protocol::command::Property;
use crate::protocol::message::{Status, StatusMessage};
use crate::protocol::packet::EiscpPacket;
use crate::protocol::values::{HdmiOutput, InputSource, PowerState, Zone};

#[test]
fn test_decode_known_fixture() {
    let datagram = b"ISCP\x00\x00\x00\x10\x00\x00\x00\x0a\x01\x00\x00\x00!1MVL2A\x1a\r\n";
    let packet = EiscpPacket::decode(datagram).unwrap();

    let message = StatusMessage::decode(packet.payload()).unwrap();

    assert_eq!(message, StatusMessage::new(Zone::Main, Status::Volume(42)));
}

#[test]
fn test_decode_accepts_all_terminators() {
    for payload in [
        &b"!1PWR01\x1a"[..],
        b"!1PWR01\x1a\r",
        b"!1PWR01\x1a\n",
        b"!1PWR01\x1a\r\n",
    ] {
        let message = StatusMessage::decode(payload).unwrap();
        assert_eq!(message.status, Status::Power(PowerState::On));
    }
}

#[test]
fn test_decode_requires_eof_marker() {
    let err = StatusMessage::decode(b"!1PWR01\r\n").unwrap_err();
    assert!(matches!(err, OnkyoError::MalformedMessage { .. }));
}

#[test]
fn test_decode_requires_start_marker() {
    let err = StatusMessage::decode(b"PWR01\x1a").unwrap_err();
    assert!(matches!(err, OnkyoError::MalformedMessage { .. }));
}

#[test]
fn test_decode_rejects_invalid_utf8() {
    assert!(StatusMessage::decode(b"!1FLD\xff\xfe\x1a").is_err());
}

#[test]
fn test_parse_zone_replies() {
    let message = StatusMessage::parse_body("SLZ24").unwrap();
    assert_eq!(message.zone, Zone::Zone2);
    assert_eq!(message.status, Status::Input(InputSource::FM));

    let message = StatusMessage::parse_body("MT401").unwrap();
    assert_eq!(message.zone, Zone::Zone4);
    assert_eq!(message.status, Status::Mute(true));
}

#[test]
fn test_parse_not_available() {
    let message = StatusMessage::parse_body("PW3N/A").unwrap();
    assert_eq!(message.zone, Zone::Zone3);
    assert_eq!(message.status, Status::NotAvailable(Property::Power));
}

#[test]
fn test_parse_invalid_values() {
    for body in ["PWR02", "PWRZZ", "MVL1", "MVL+1", "AMTTG", "HDO09", "PW", ""] {
        let err = StatusMessage::parse_body(body).unwrap_err();
        assert!(
            matches!(err, OnkyoError::MalformedMessage { .. }),
            "{body} should be malformed"
        );
    }
}

#[test]
fn test_parse_unknown_code_is_kept() {
    let message = StatusMessage::parse_body("NLSC0P").unwrap();
    assert_eq!(
        message.status,
        Status::Unknown {
            code: "NLS".to_string(),
            value: "C0P".to_string()
        }
    );
    assert!(message.property().is_none());
}

#[test]
fn test_parse_audio_information() {
    let message =
        StatusMessage::parse_body("IFAHDMI 1,PCM,48 kHz,2.0 ch,All Ch Stereo,5.1 ch,,").unwrap();

    let Status::AudioInformation(report) = message.status else {
        panic!("expected audio information");
    };
    assert_eq!(report.get("audio_input_port"), Some("HDMI 1"));
    assert_eq!(report.get("input_channels"), Some("2.0 ch"));
    assert_eq!(report.get("output_channels"), Some("5.1 ch"));
    assert_eq!(report.get("output_frequency"), None);
    assert_eq!(report.len(), 6);
}

#[test]
fn test_parse_video_information() {
    let message = StatusMessage::parse_body("IFVHDMI 1,1920 x 1080p 60 Hz,RGB,24bit,HDMI Main,,,,Game").unwrap();

    let Status::VideoInformation(report) = message.status else {
        panic!("expected video information");
    };
    assert_eq!(report.get("input_resolution"), Some("1920 x 1080p 60 Hz"));
    assert_eq!(report.get("picture_mode"), Some("Game"));
    assert_eq!(report.get("output_resolution"), None);
}

#[test]
fn test_parse_display_text() {
    let message = StatusMessage::parse_body("FLD5475726E6572202020").unwrap();
    assert_eq!(message.status, Status::Display("Turner".to_string()));
}

#[test]
fn test_status_packet_uses_receiver_framing() {
    let message = StatusMessage::new(Zone::Main, Status::HdmiOutput(HdmiOutput::Main));
    assert_eq!(&message.to_packet().payload()[..], b"!1HDO01\x1a\r\n");
}

#[test]
fn test_status_encode_body_roundtrip() {
    let messages = [
        StatusMessage::new(Zone::Zone2, Status::Power(PowerState::Standby)),
        StatusMessage::new(Zone::Zone4, Status::NotAvailable(Property::Power)),
        StatusMessage::new(Zone::Main, Status::Display("NET".to_string())),
        StatusMessage::parse_body("IFVHDMI 1,,,,,,,,").unwrap(),
    ];

    for message in messages {
        let packet = message.to_packet();
        assert_eq!(StatusMessage::decode(packet.payload()).unwrap(), message);
    }
}
