//! Type definitions for pebrust
//!
//! Value types shared between the protocol layer and the high-level
//! emulator API: parsed app headers, screenshots, data logging sessions
//! and firmware information.

pub mod app;
pub mod datalogging;
pub mod error;
pub mod firmware;
pub mod screenshot;

pub use app::{AppFlags, AppMetadata, Version};
pub use datalogging::{DataItemType, DataLoggingSession};
pub use error::{Error, Result};
pub use firmware::FirmwareInfo;
pub use screenshot::Screenshot;
