//! # pebrust-core
//!
//! Core protocol implementation for the Pebble QEMU emulator.
//!
//! This crate provides the low-level protocol primitives:
//! - QEMU frame encoding/decoding and channel demultiplexing
//! - Pebble packet structure
//! - Typed inbound/outbound messages
//! - STM32 CRC used by PutBytes
//! - Session bookkeeping

pub mod checksum;
pub mod constants;
pub mod endpoint;
pub mod error;
pub mod frame;
pub mod message;
pub mod packet;
pub mod session;

pub use endpoint::Endpoint;
pub use error::{Error, Result};
pub use frame::{Decoded, FrameCodec, QemuFrame};
pub use message::{
    AppFetchStatus, AppLogLine, AppVersionResponse, BlobCommand, BlobDatabase, BlobStatus,
    DataLoggingCommand, Inbound, ObjectType, Outbound, PutBytesCommand, PutBytesResult,
};
pub use packet::Packet;
pub use session::{NegotiationState, Session};
