//! # pebrust
//!
//! Drive the Pebble QEMU emulator over its Pebble protocol socket.
//!
//! ## Features
//!
//! - Version negotiation with the emulated watch
//! - App installation from `.pbw` packages (BlobDB + PutBytes)
//! - Screenshots, data logging control, ping and app log streaming
//! - Async/await API using Tokio
//!
//! ## Quick Start
//!
//! ```no_run
//! use pebrust::Emulator;
//!
//! #[tokio::main]
//! async fn main() -> pebrust::Result<()> {
//!     let emulator = Emulator::connect(12344).await?;
//!
//!     let app = emulator.install("build/app.pbw", "basalt").await?;
//!     println!("Installed {}", app.metadata);
//!
//!     let shot = emulator.screenshot().await?;
//!     pebrust::save_png(&shot, "screenshot.png")?;
//!
//!     emulator.disconnect().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod datalogging;
pub mod dispatch;
pub mod emulator;
pub mod error;
pub mod install;
pub mod logging;
pub mod negotiation;
pub mod pbw;
pub mod putbytes;
pub mod screenshot;

#[cfg(test)]
mod testing;

// Re-exports
pub use config::BridgeConfig;
pub use dispatch::{DefaultHandler, PacketHandler};
pub use emulator::Emulator;
pub use error::{Error, Phase, Result};
pub use install::{AppInstallContext, InstallState};
pub use pbw::{AppBundle, Package};
pub use putbytes::TransferSession;
pub use screenshot::save_png;

// Re-export protocol and value types
pub use pebrust_core::{Inbound, NegotiationState, ObjectType, Outbound, Packet, Session};
pub use pebrust_transport::QemuTransport;
pub use pebrust_types::{AppMetadata, DataLoggingSession, FirmwareInfo, Screenshot};
