//! QEMU transport framing
//!
//! The emulator multiplexes several channels over one TCP socket. Every
//! frame looks like this:
//!
//! ```text
//! ┌─────────────┬─────────────┬─────────────┬─────────────┬─────────────┐
//! │  Signature  │   Channel   │   Length    │   Payload   │   Footer    │
//! │   0xFEED    │   2 bytes   │   2 bytes   │   N bytes   │   0xBEEF    │
//! │  (BE u16)   │  (BE u16)   │  (BE u16)   │   (bytes)   │  (BE u16)   │
//! └─────────────┴─────────────┴─────────────┴─────────────┴─────────────┘
//! ```
//!
//! Only the SPP channel carries Pebble protocol bytes. Frames on other
//! channels are consumed whole and dropped so the stream stays aligned.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt;
use tracing::{trace, warn};

use crate::constants::{channels, QEMU_FOOTER_SIGNATURE, QEMU_HEADER_SIGNATURE};
use crate::error::{Error, Result};

/// A single QEMU frame
#[derive(Clone, PartialEq, Eq)]
pub struct QemuFrame {
    /// Channel id
    pub channel: u16,

    /// Frame payload
    pub payload: Bytes,
}

impl QemuFrame {
    /// Header size in bytes (signature + channel + length)
    pub const HEADER_SIZE: usize = 6;

    /// Footer size in bytes
    pub const FOOTER_SIZE: usize = 2;

    /// Maximum payload size
    pub const MAX_PAYLOAD_SIZE: usize = u16::MAX as usize;

    /// Create a frame
    pub fn new(channel: u16, payload: impl Into<Bytes>) -> Self {
        Self {
            channel,
            payload: payload.into(),
        }
    }

    /// Create a frame on the SPP channel
    pub fn spp(payload: impl Into<Bytes>) -> Self {
        Self::new(channels::SPP, payload)
    }

    /// Encode frame to bytes
    ///
    /// # Examples
    ///
    /// ```
    /// use pebrust_core::QemuFrame;
    ///
    /// let bytes = QemuFrame::spp(vec![0xAA]).encode().unwrap();
    /// assert_eq!(&bytes[..], &[0xFE, 0xED, 0x00, 0x01, 0x00, 0x01, 0xAA, 0xBE, 0xEF]);
    /// ```
    pub fn encode(&self) -> Result<BytesMut> {
        if self.payload.len() > Self::MAX_PAYLOAD_SIZE {
            return Err(Error::PayloadTooLarge {
                size: self.payload.len(),
                max: Self::MAX_PAYLOAD_SIZE,
            });
        }

        let mut buf = BytesMut::with_capacity(self.size());
        buf.put_u16(QEMU_HEADER_SIGNATURE);
        buf.put_u16(self.channel);
        buf.put_u16(self.payload.len() as u16);
        buf.put_slice(&self.payload);
        buf.put_u16(QEMU_FOOTER_SIGNATURE);

        Ok(buf)
    }

    /// Get total frame size
    pub fn size(&self) -> usize {
        Self::HEADER_SIZE + self.payload.len() + Self::FOOTER_SIZE
    }
}

impl fmt::Debug for QemuFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QemuFrame")
            .field("channel", &channels::name(self.channel))
            .field("payload_len", &self.payload.len())
            .finish()
    }
}

/// Outcome of one decode step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// A complete SPP frame
    Frame(QemuFrame),

    /// A frame for another channel was consumed and dropped
    Skipped {
        channel: u16,
        length: usize,
    },

    /// Bytes were dropped to find the next frame boundary
    Resync {
        discarded: usize,
    },
}

/// Incremental frame decoder
///
/// Bytes are appended with [`push`](Self::push) or read directly into
/// [`buffer_mut`](Self::buffer_mut); [`decode`](Self::decode) then cuts
/// frames off the front.
#[derive(Debug, Default)]
pub struct FrameCodec {
    buffer: BytesMut,
}

impl FrameCodec {
    /// Create a new frame codec
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
        }
    }

    /// Add received data to the buffer
    pub fn push(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Buffer to read socket data into
    pub fn buffer_mut(&mut self) -> &mut BytesMut {
        &mut self.buffer
    }

    /// Number of buffered, not yet decoded bytes
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Try to decode the next frame
    ///
    /// Returns `None` when more bytes are needed.
    pub fn decode(&mut self) -> Option<Decoded> {
        if self.buffer.len() < 2 {
            return None;
        }

        let signature = u16::from_be_bytes([self.buffer[0], self.buffer[1]]);
        if signature != QEMU_HEADER_SIGNATURE {
            let discarded = self.resync();
            warn!(
                signature = format!("0x{:04X}", signature),
                discarded, "Bad frame signature, resynchronising"
            );
            return Some(Decoded::Resync { discarded });
        }

        if self.buffer.len() < QemuFrame::HEADER_SIZE {
            return None;
        }

        let channel = u16::from_be_bytes([self.buffer[2], self.buffer[3]]);
        let length = u16::from_be_bytes([self.buffer[4], self.buffer[5]]) as usize;
        let total = QemuFrame::HEADER_SIZE + length + QemuFrame::FOOTER_SIZE;

        if self.buffer.len() < total {
            return None;
        }

        let mut frame = self.buffer.split_to(total);
        frame.advance(QemuFrame::HEADER_SIZE);
        let payload = frame.split_to(length).freeze();
        let footer = frame.get_u16();

        if channel != channels::SPP {
            trace!(
                channel = channels::name(channel),
                length, "Skipping frame for another channel"
            );
            return Some(Decoded::Skipped { channel, length });
        }

        if footer != QEMU_FOOTER_SIGNATURE {
            warn!(
                footer = format!("0x{:04X}", footer),
                length, "Bad frame footer, dropping frame"
            );
            return Some(Decoded::Resync { discarded: total });
        }

        trace!(length, "Decoded SPP frame");

        Some(Decoded::Frame(QemuFrame { channel, payload }))
    }

    /// Drop bytes up to the next possible header signature
    fn resync(&mut self) -> usize {
        let signature = QEMU_HEADER_SIGNATURE.to_be_bytes();

        let skip = self.buffer[1..]
            .windows(2)
            .position(|window| window == signature)
            .map(|pos| pos + 1)
            .unwrap_or_else(|| {
                // A trailing first signature byte may start the next frame
                if self.buffer.last() == Some(&signature[0]) {
                    self.buffer.len() - 1
                } else {
                    self.buffer.len()
                }
            });

        self.buffer.advance(skip);
        skip
    }
}
