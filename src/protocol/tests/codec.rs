use bytes::BytesMut;
use futures::StreamExt;
use tokio_util::codec::{Decoder, Encoder, FramedRead};

use crate::protocol::codec::{EiscpCodec, EiscpCodecError};
use crate::protocol::packet::{EiscpHeader, EiscpPacket, PacketError};

const POWER_ON_REPLY: &[u8] =
    b"ISCP\x00\x00\x00\x10\x00\x00\x00\x0a\x01\x00\x00\x00!1PWR01\x1a\r\n";

#[test]
fn test_encode_power_on_matches_wire_bytes() {
    let mut codec = EiscpCodec::new();
    let mut buf = BytesMut::new();

    codec.encode(EiscpPacket::iscp("PWR01"), &mut buf).unwrap();

    assert_eq!(
        &buf[..],
        b"ISCP\x00\x00\x00\x10\x00\x00\x00\x08\x01\x00\x00\x00!1PWR01\r"
    );
}

#[test]
fn test_decode_complete_packet() {
    let mut codec = EiscpCodec::new();
    let mut buf = BytesMut::from(POWER_ON_REPLY);

    let packet = codec.decode(&mut buf).unwrap().unwrap();

    assert_eq!(&packet.payload()[..], b"!1PWR01\x1a\r\n");
    assert!(buf.is_empty());
}

#[test]
fn test_decode_waits_for_header() {
    let mut codec = EiscpCodec::new();
    let mut buf = BytesMut::from(&POWER_ON_REPLY[..10]);

    assert!(codec.decode(&mut buf).unwrap().is_none());
    assert_eq!(buf.len(), 10);
}

#[test]
fn test_decode_waits_for_payload() {
    let mut codec = EiscpCodec::new();
    let mut buf = BytesMut::from(&POWER_ON_REPLY[..20]);

    assert!(codec.decode(&mut buf).unwrap().is_none());

    buf.extend_from_slice(&POWER_ON_REPLY[20..]);
    let packet = codec.decode(&mut buf).unwrap().unwrap();
    assert_eq!(&packet.payload()[..7], b"!1PWR01");
}

#[test]
fn test_decode_two_packets_in_one_buffer() {
    let mut codec = EiscpCodec::new();
    let mut buf = BytesMut::new();
    buf.extend_from_slice(POWER_ON_REPLY);
    buf.extend_from_slice(POWER_ON_REPLY);

    assert!(codec.decode(&mut buf).unwrap().is_some());
    assert!(codec.decode(&mut buf).unwrap().is_some());
    assert!(codec.decode(&mut buf).unwrap().is_none());
}

#[test]
fn test_decode_rejects_bad_magic() {
    let mut codec = EiscpCodec::new();
    let mut raw = POWER_ON_REPLY.to_vec();
    raw[..4].copy_from_slice(b"HTTP");
    let mut buf = BytesMut::from(&raw[..]);

    let err = codec.decode(&mut buf).unwrap_err();
    assert!(matches!(
        err,
        EiscpCodecError::Packet(PacketError::InvalidMagic(m)) if &m == b"HTTP"
    ));
}

#[test]
fn test_decode_rejects_wrong_header_size() {
    let mut codec = EiscpCodec::new();
    let mut raw = POWER_ON_REPLY.to_vec();
    raw[7] = 0x20;
    let mut buf = BytesMut::from(&raw[..]);

    let err = codec.decode(&mut buf).unwrap_err();
    assert!(matches!(
        err,
        EiscpCodecError::Packet(PacketError::InvalidHeaderSize(32))
    ));
}

#[test]
fn test_decode_rejects_oversized_payload() {
    let mut codec = EiscpCodec::new().with_max_payload(4);
    let mut buf = BytesMut::from(POWER_ON_REPLY);

    let err = codec.decode(&mut buf).unwrap_err();
    assert!(matches!(
        err,
        EiscpCodecError::Packet(PacketError::PayloadTooLarge { size: 10 })
    ));
}

#[test]
fn test_header_roundtrip() {
    let header = EiscpHeader::new(42);
    let mut buf = BytesMut::new();
    header.encode_into(&mut buf);

    assert_eq!(buf.len(), EiscpHeader::SIZE);
    assert_eq!(EiscpHeader::decode(&buf).unwrap(), header);
}

#[test]
fn test_packet_decode_truncated_datagram() {
    let err = EiscpPacket::decode(&POWER_ON_REPLY[..20]).unwrap_err();
    assert_eq!(
        err,
        PacketError::BufferTooSmall {
            needed: 26,
            have: 20
        }
    );
}

#[tokio::test]
async fn test_framed_read_split_across_reads() {
    let mock = tokio_test::io::Builder::new()
        .read(&POWER_ON_REPLY[..5])
        .read(&POWER_ON_REPLY[5..18])
        .read(&POWER_ON_REPLY[18..])
        .build();

    let mut framed = FramedRead::new(mock, EiscpCodec::new());
    let packet = framed.next().await.unwrap().unwrap();

    assert_eq!(&packet.payload()[..], b"!1PWR01\x1a\r\n");
    assert!(framed.next().await.is_none());
}
