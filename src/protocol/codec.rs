use bytes::{Buf, BytesMut};
use thiserror::Error;
use tokio_util::codec::{Decoder, Encoder};

use super::packet::{EiscpHeader, EiscpPacket, PacketError};
use crate::error::OnkyoError;

/// Errors raised by the stream codec
///
/// Any of these leaves the byte stream in an unknown position, so the
/// connection is recycled rather than resynchronized.
#[derive(Debug, Error)]
pub enum EiscpCodecError {
    /// Socket failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Header or size violation
    #[error("bad packet: {0}")]
    Packet(#[from] PacketError),
}

impl From<EiscpCodecError> for OnkyoError {
    fn from(err: EiscpCodecError) -> Self {
        match err {
            EiscpCodecError::Io(e) => OnkyoError::NetworkError(e),
            EiscpCodecError::Packet(e) => e.into(),
        }
    }
}

impl From<PacketError> for OnkyoError {
    fn from(err: PacketError) -> Self {
        OnkyoError::Framing {
            message: err.to_string(),
        }
    }
}

/// Length-delimited eISCP framing for a TCP stream
///
/// The decoder reads the 16-byte header, then waits until `data_size` bytes
/// of payload are buffered. Payload contents are not inspected here.
#[derive(Debug, Clone)]
pub struct EiscpCodec {
    max_payload: usize,
}

impl EiscpCodec {
    /// Default payload ceiling (64 KiB)
    pub const DEFAULT_MAX_PAYLOAD: usize = 64 * 1024;

    /// Create a codec with the default payload ceiling
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_payload: Self::DEFAULT_MAX_PAYLOAD,
        }
    }

    /// Set the largest payload accepted before the stream is declared corrupt
    #[must_use]
    pub fn with_max_payload(mut self, size: usize) -> Self {
        self.max_payload = size;
        self
    }
}

impl Default for EiscpCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for EiscpCodec {
    type Item = EiscpPacket;
    type Error = EiscpCodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < EiscpHeader::SIZE {
            return Ok(None);
        }

        let header = EiscpHeader::decode(&src[..EiscpHeader::SIZE])?;
        let size = header.data_size as usize;
        if size > self.max_payload {
            return Err(PacketError::PayloadTooLarge { size }.into());
        }

        let total = EiscpHeader::SIZE + size;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        src.advance(EiscpHeader::SIZE);
        let payload = src.split_to(size).freeze();
        Ok(Some(EiscpPacket::raw(payload)))
    }
}

impl Encoder<EiscpPacket> for EiscpCodec {
    type Error = EiscpCodecError;

    fn encode(&mut self, item: EiscpPacket, dst: &mut BytesMut) -> Result<(), Self::Error> {
        item.encode_into(dst)?;
        Ok(())
    }
}
