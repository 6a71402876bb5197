use std::net::IpAddr;

use crate::discovery::parser::parse_info;

fn host() -> IpAddr {
    "192.168.1.30".parse().unwrap()
}

#[test]
fn test_parse_full_reply() {
    let info = parse_info(b"!1ECNTX-NR656/60128/DX/0009B0123456\x1a\r\n", host()).unwrap();

    assert_eq!(info.model, "TX-NR656");
    assert_eq!(info.port, 60128);
    assert_eq!(info.area, "DX");
    assert_eq!(info.identifier, "0009B0123456");
    assert_eq!(info.host, host());
}

#[test]
fn test_parse_reply_without_identifier() {
    let info = parse_info(b"!1ECNTX-NR609/60128/DX/\x1a", host()).unwrap();
    assert_eq!(info.model, "TX-NR609");
    assert_eq!(info.identifier, "");
}

#[test]
fn test_parse_truncates_long_identifier() {
    let info = parse_info(b"!1ECNVSX-LX503/60128/XX/0123456789ABCDEF", host()).unwrap();
    assert_eq!(info.identifier, "0123456789AB");
}

#[test]
fn test_parse_pioneer_category() {
    assert!(parse_info(b"!pECNSC-LX701/60128/XX/AABBCC", host()).is_none());
    assert!(parse_info(b"!7ECNSC-LX701/60128/XX/AABBCC", host()).is_some());
}

#[test]
fn test_parse_rejects_garbage() {
    for payload in [
        &b""[..],
        b"!1PWR01\x1a",
        b"!1ECNTX-NR656",
        b"!1ECNTX-NR656/6012/DX/1",
        b"!1ECNTX-NR656/60128/DXX/1",
        b"!xECNQSTN\r",
        b"\xff\xfe",
    ] {
        assert!(parse_info(payload, host()).is_none(), "{payload:?}");
    }
}
