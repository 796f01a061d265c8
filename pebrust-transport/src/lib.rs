//! Transport layer for the Pebble QEMU emulator
//!
//! Provides the TCP connection to the emulator's Pebble protocol port,
//! turning the multiplexed frame stream into Pebble packets and back.

pub mod error;
pub mod qemu;

pub use error::{Error, Result};
pub use qemu::QemuTransport;
