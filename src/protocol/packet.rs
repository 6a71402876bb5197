use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

/// Errors while parsing an eISCP header
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PacketError {
    #[error("buffer too small: need {needed}, have {have}")]
    BufferTooSmall { needed: usize, have: usize },

    #[error("invalid magic: {0:02x?}")]
    InvalidMagic([u8; 4]),

    #[error("unsupported header size: {0}")]
    InvalidHeaderSize(u32),

    #[error("payload too large: {size} bytes")]
    PayloadTooLarge { size: usize },
}

/// eISCP header (16 bytes)
///
/// ```text
/// 0      4          8          12   13       16
/// | ISCP | hdr size | data size | ver | reserved |
/// ```
///
/// Sizes are big-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EiscpHeader {
    /// Size of this header, always 16
    pub header_size: u32,
    /// Size of the ISCP payload that follows
    pub data_size: u32,
    /// Protocol version, 1 for every known device
    pub version: u8,
}

impl EiscpHeader {
    /// Header size on the wire
    pub const SIZE: usize = 16;
    /// Magic bytes at the start of every packet
    pub const MAGIC: [u8; 4] = *b"ISCP";
    /// Version sent in outbound packets
    pub const VERSION: u8 = 0x01;

    /// Header for a payload of `data_size` bytes
    #[must_use]
    pub fn new(data_size: u32) -> Self {
        Self {
            header_size: Self::SIZE as u32,
            data_size,
            version: Self::VERSION,
        }
    }

    /// Parse a header from the first 16 bytes of `buf`
    ///
    /// # Errors
    ///
    /// Returns `PacketError` on short input, bad magic or a header size other than 16.
    pub fn decode(buf: &[u8]) -> Result<Self, PacketError> {
        if buf.len() < Self::SIZE {
            return Err(PacketError::BufferTooSmall {
                needed: Self::SIZE,
                have: buf.len(),
            });
        }

        let magic = [buf[0], buf[1], buf[2], buf[3]];
        if magic != Self::MAGIC {
            return Err(PacketError::InvalidMagic(magic));
        }

        let header_size = u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]);
        if header_size as usize != Self::SIZE {
            return Err(PacketError::InvalidHeaderSize(header_size));
        }

        Ok(Self {
            header_size,
            data_size: u32::from_be_bytes([buf[8], buf[9], buf[10], buf[11]]),
            version: buf[12],
        })
    }

    /// Append the header to `dst`
    pub fn encode_into(&self, dst: &mut BytesMut) {
        dst.put_slice(&Self::MAGIC);
        dst.put_u32(self.header_size);
        dst.put_u32(self.data_size);
        dst.put_u8(self.version);
        dst.put_bytes(0, 3);
    }
}

/// One eISCP packet: a header plus an opaque payload
///
/// Control traffic carries ISCP messages (`!1PWR01\r`); discovery carries raw
/// queries such as `!xECNQSTN`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EiscpPacket {
    payload: Bytes,
}

impl EiscpPacket {
    /// Unit type character for a receiver
    pub const RECEIVER_UNIT: &'static str = "!1";

    /// Wrap an ISCP command body (`PWR01`) for transmission to a receiver
    #[must_use]
    pub fn iscp(body: &str) -> Self {
        let mut payload = BytesMut::with_capacity(body.len() + 3);
        payload.put_slice(Self::RECEIVER_UNIT.as_bytes());
        payload.put_slice(body.as_bytes());
        payload.put_u8(b'\r');
        Self {
            payload: payload.freeze(),
        }
    }

    /// Wrap an arbitrary payload without ISCP framing
    #[must_use]
    pub fn raw(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
        }
    }

    /// The payload bytes
    #[must_use]
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Total size on the wire
    #[must_use]
    pub fn wire_len(&self) -> usize {
        EiscpHeader::SIZE + self.payload.len()
    }

    /// Serialize header and payload into `dst`
    ///
    /// # Errors
    ///
    /// Returns `PacketError::PayloadTooLarge` if the payload does not fit a u32.
    pub fn encode_into(&self, dst: &mut BytesMut) -> Result<(), PacketError> {
        let size = u32::try_from(self.payload.len()).map_err(|_| PacketError::PayloadTooLarge {
            size: self.payload.len(),
        })?;
        dst.reserve(self.wire_len());
        EiscpHeader::new(size).encode_into(dst);
        dst.put_slice(&self.payload);
        Ok(())
    }

    /// Serialize to a fresh buffer
    ///
    /// # Errors
    ///
    /// Returns `PacketError::PayloadTooLarge` if the payload does not fit a u32.
    pub fn encode(&self) -> Result<Bytes, PacketError> {
        let mut buf = BytesMut::with_capacity(self.wire_len());
        self.encode_into(&mut buf)?;
        Ok(buf.freeze())
    }

    /// Parse one complete packet (used for UDP datagrams)
    ///
    /// # Errors
    ///
    /// Returns `PacketError` if the header is invalid or the datagram is truncated.
    pub fn decode(buf: &[u8]) -> Result<Self, PacketError> {
        let header = EiscpHeader::decode(buf)?;
        let end = EiscpHeader::SIZE + header.data_size as usize;
        if buf.len() < end {
            return Err(PacketError::BufferTooSmall {
                needed: end,
                have: buf.len(),
            });
        }
        Ok(Self {
            payload: Bytes::copy_from_slice(&buf[EiscpHeader::SIZE..end]),
        })
    }
}
