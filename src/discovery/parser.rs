//! Parser for discovery replies

use std::net::IpAddr;

use crate::protocol::EOF;
use crate::types::ReceiverInfo;

const IDENTIFIER_MAX: usize = 12;

/// Parse an `ECN` discovery reply
///
/// The payload looks like `!1ECNTX-NR656/60128/DX/0009B0123456` followed
/// by the usual terminators; the identifier may be empty on older models.
/// `host` is the address the datagram came from.
#[must_use]
pub fn parse_info(payload: &[u8], host: IpAddr) -> Option<ReceiverInfo> {
    let text = std::str::from_utf8(payload).ok()?;
    let text = text.trim_end_matches(|c| c == char::from(EOF) || c == '\r' || c == '\n');

    let rest = text.strip_prefix('!')?;
    let mut chars = rest.chars();
    if !chars.next()?.is_ascii_digit() {
        return None;
    }
    let rest = chars.as_str().strip_prefix("ECN")?;

    let mut parts = rest.splitn(4, '/');
    let model = parts.next()?;
    let port = parts.next()?;
    let area = parts.next()?;
    let identifier = parts.next().unwrap_or("");

    if port.len() != 5 || !port.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if area.len() != 2 || !area.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }

    Some(ReceiverInfo {
        host,
        port: port.parse().ok()?,
        model: model.to_string(),
        area: area.to_string(),
        identifier: identifier.chars().take(IDENTIFIER_MAX).collect(),
    })
}
