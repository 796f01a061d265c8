//! Handling of packets nobody is waiting for
//!
//! Every bounded wait in the protocol flows hands unrelated traffic to a
//! [`PacketHandler`]. The default one keeps the watch happy (pings, version
//! requests) and prints app logs; callers that speak AppMessage plug in
//! their own.

use async_trait::async_trait;
use tracing::{debug, info};

use pebrust_core::{AppVersionResponse, Inbound, Outbound};
use pebrust_transport::QemuTransport;

use crate::error::Result;

/// Receives every inbound message the current flow does not consume
#[async_trait]
pub trait PacketHandler: Send + Sync {
    async fn handle(&self, transport: &QemuTransport, message: Inbound) -> Result<()>;
}

/// Answers keep-alives and version requests, prints app logs
#[derive(Debug, Clone)]
pub struct DefaultHandler {
    print_app_logs: bool,
}

impl DefaultHandler {
    pub fn new(print_app_logs: bool) -> Self {
        Self { print_app_logs }
    }
}

impl Default for DefaultHandler {
    fn default() -> Self {
        Self::new(true)
    }
}

#[async_trait]
impl PacketHandler for DefaultHandler {
    async fn handle(&self, transport: &QemuTransport, message: Inbound) -> Result<()> {
        match message {
            Inbound::Ping { cookie, .. } => {
                debug!(cookie, "Answering ping");
                transport.send(&Outbound::Pong { cookie }).await?;
            }
            Inbound::AppVersionRequest => {
                debug!("Answering phone version request");
                transport
                    .send(&Outbound::AppVersionResponse(AppVersionResponse::default()))
                    .await?;
            }
            Inbound::AppLog(line) if self.print_app_logs => {
                println!("{}", line);
            }
            Inbound::AppLog(line) => {
                info!(file = %line.filename, line = line.line, "{}", line.message);
            }
            Inbound::Unknown(packet) => {
                debug!(packet = %packet, "Ignoring packet");
            }
            other => {
                debug!(message = other.name(), "Ignoring message");
            }
        }

        Ok(())
    }
}
