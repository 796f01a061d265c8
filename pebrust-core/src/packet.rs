//! Pebble protocol packet structure and encoding/decoding

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt;

use crate::{
    endpoint::Endpoint,
    error::{Error, Result},
};

/// Pebble protocol packet
///
/// # Packet Structure
///
/// ```text
/// ┌─────────────┬─────────────┬─────────────┐
/// │   Length    │  Endpoint   │   Payload   │
/// │   2 bytes   │   2 bytes   │   N bytes   │
/// │  (BE u16)   │  (BE u16)   │   (bytes)   │
/// └─────────────┴─────────────┴─────────────┘
/// ```
///
/// `Length` counts the payload only. Packets travel in the SPP byte stream
/// and may span several QEMU frames.
///
/// # Examples
///
/// ```
/// use pebrust_core::{Endpoint, Packet};
///
/// let packet = Packet::new(Endpoint::Screenshot, vec![0x00]);
/// let mut encoded = packet.encode().unwrap();
///
/// let decoded = Packet::decode(&mut encoded).unwrap();
/// assert_eq!(packet, decoded);
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Packet {
    /// Raw endpoint id
    pub endpoint: u16,

    /// Packet payload (endpoint-specific data)
    pub payload: Bytes,
}

impl Packet {
    /// Packet header size in bytes
    pub const HEADER_SIZE: usize = 4;

    /// Maximum payload size
    pub const MAX_PAYLOAD_SIZE: usize = u16::MAX as usize;

    /// Create a packet
    pub fn new(endpoint: impl Into<u16>, payload: impl Into<Bytes>) -> Self {
        Self {
            endpoint: endpoint.into(),
            payload: payload.into(),
        }
    }

    /// Known endpoint of this packet, if any
    pub fn kind(&self) -> Option<Endpoint> {
        Endpoint::try_from(self.endpoint).ok()
    }

    /// Encode packet to bytes
    ///
    /// # Errors
    ///
    /// Returns [`Error::PayloadTooLarge`] if the payload does not fit the
    /// 16-bit length field.
    pub fn encode(&self) -> Result<BytesMut> {
        if self.payload.len() > Self::MAX_PAYLOAD_SIZE {
            return Err(Error::PayloadTooLarge {
                size: self.payload.len(),
                max: Self::MAX_PAYLOAD_SIZE,
            });
        }

        let mut buf = BytesMut::with_capacity(self.size());

        buf.put_u16(self.payload.len() as u16);
        buf.put_u16(self.endpoint);
        buf.put_slice(&self.payload);

        Ok(buf)
    }

    /// Decode the next packet from a stream buffer
    ///
    /// Consumes the packet bytes on success. Returns `None` and leaves the
    /// buffer untouched when the packet is not complete yet.
    pub fn decode(buf: &mut BytesMut) -> Option<Self> {
        if buf.len() < Self::HEADER_SIZE {
            return None;
        }

        let length = u16::from_be_bytes([buf[0], buf[1]]) as usize;
        if buf.len() < Self::HEADER_SIZE + length {
            return None;
        }

        buf.advance(2);
        let endpoint = buf.get_u16();
        let payload = buf.split_to(length).freeze();

        Some(Self { endpoint, payload })
    }

    /// Get total packet size
    pub fn size(&self) -> usize {
        Self::HEADER_SIZE + self.payload.len()
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Packet");
        match self.kind() {
            Some(endpoint) => s.field("endpoint", &endpoint),
            None => s.field("endpoint", &self.endpoint),
        };
        s.field("payload_len", &self.payload.len())
            .field(
                "head",
                &hex::encode(&self.payload[..self.payload.len().min(16)]),
            )
            .finish()
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            Some(endpoint) => write!(f, "Packet[{}](len={})", endpoint, self.payload.len()),
            None => write!(f, "Packet[{}](len={})", self.endpoint, self.payload.len()),
        }
    }
}
