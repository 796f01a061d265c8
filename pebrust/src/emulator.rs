//! High-level emulator interface

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use pebrust_core::{Inbound, Outbound, Packet, Session};
use pebrust_transport::QemuTransport;

use crate::config::BridgeConfig;
use crate::dispatch::{DefaultHandler, PacketHandler};
use crate::error::{Error, Phase, Result};

/// Pebble QEMU emulator
///
/// High-level interface for driving the emulated watch over its Pebble
/// protocol socket.
///
/// # Examples
///
/// ```no_run
/// use pebrust::Emulator;
///
/// #[tokio::main]
/// async fn main() -> pebrust::Result<()> {
///     let emulator = Emulator::connect(12344).await?;
///
///     if let Some(firmware) = emulator.negotiate().await? {
///         println!("Watch: {}", firmware);
///     }
///
///     let rtt = emulator.ping().await?;
///     println!("Pong after {:?}", rtt);
///
///     emulator.disconnect().await?;
///     Ok(())
/// }
/// ```
pub struct Emulator {
    transport: Arc<QemuTransport>,
    session: Session,
    config: BridgeConfig,
    handler: Arc<dyn PacketHandler>,
}

impl Emulator {
    /// Connect to an emulator on localhost with default settings
    pub async fn connect(port: u16) -> Result<Self> {
        Self::connect_with("127.0.0.1", port, BridgeConfig::default()).await
    }

    /// Connect to an emulator at `host:port`
    pub async fn connect_with(host: &str, port: u16, config: BridgeConfig) -> Result<Self> {
        info!("Connecting to {}:{}...", host, port);
        let transport = QemuTransport::connect_to(host, port, config.connect_timeout).await?;
        Ok(Self::from_transport(transport, config))
    }

    /// Drive an already established transport
    pub fn from_transport(transport: QemuTransport, config: BridgeConfig) -> Self {
        let handler = Arc::new(DefaultHandler::new(config.print_app_logs));
        Self {
            transport: Arc::new(transport),
            session: Session::new(),
            config,
            handler,
        }
    }

    /// Replace the handler for unsolicited traffic
    pub fn with_handler(mut self, handler: impl PacketHandler + 'static) -> Self {
        self.handler = Arc::new(handler);
        self
    }

    pub fn transport(&self) -> &Arc<QemuTransport> {
        &self.transport
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Send a message to the watch
    pub async fn send(&self, message: &Outbound) -> Result<()> {
        self.transport.send(message).await?;
        Ok(())
    }

    /// Close the connection
    pub async fn disconnect(&self) -> Result<()> {
        self.transport.shutdown().await?;
        info!("Disconnected");
        Ok(())
    }

    /// Measure the round trip of a ping
    ///
    /// # Errors
    ///
    /// [`Error::Timeout`] without a pong, [`Error::Rejected`] when the pong
    /// carries another cookie.
    pub async fn ping(&self) -> Result<Duration> {
        let cookie: u32 = rand::random();
        let started = Instant::now();

        self.send(&Outbound::Ping { cookie, idle: false }).await?;

        let answered = self
            .wait_for(Phase::Ping, self.config.ping_timeout, |message| match message {
                Inbound::Pong { cookie } => Ok(cookie),
                other => Err(other),
            })
            .await?;

        if answered != cookie {
            return Err(Error::rejected(
                Phase::Ping,
                format!("pong cookie 0x{:08X} does not match 0x{:08X}", answered, cookie),
            ));
        }

        let rtt = started.elapsed();
        debug!(cookie, ?rtt, "Pong");
        Ok(rtt)
    }

    /// Hand every inbound message to the handler
    ///
    /// Runs until `limit` elapses or the emulator closes the connection.
    pub async fn stream_logs(&self, limit: Option<Duration>) -> Result<()> {
        self.send(&Outbound::AppLogShipping { enable: true }).await?;
        info!("Streaming app logs");

        let deadline = limit.map(|limit| Instant::now() + limit);
        loop {
            let received = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    self.transport.try_recv_packet(remaining).await
                }
                None => self.transport.next_packet().await.map(Some),
            };

            let packet = match received {
                Ok(Some(packet)) => packet,
                Ok(None) => break,
                Err(pebrust_transport::Error::ConnectionClosed) => {
                    info!("Emulator closed the connection");
                    break;
                }
                Err(e) => return Err(e.into()),
            };

            if let Some(message) = self.decode(&packet)? {
                self.dispatch(message).await?;
            }
        }

        Ok(())
    }

    /// Install a package, then stream its logs
    pub async fn install_and_stream_logs(
        &self,
        path: impl AsRef<Path>,
        platform: &str,
        limit: Option<Duration>,
    ) -> Result<()> {
        self.install(path, platform).await?;
        self.stream_logs(limit).await
    }

    pub(crate) async fn dispatch(&self, message: Inbound) -> Result<()> {
        self.handler.handle(&self.transport, message).await
    }

    /// Decode a packet; undecodable packets are logged and skipped
    fn decode(&self, packet: &Packet) -> Result<Option<Inbound>> {
        match Inbound::decode(packet) {
            Ok(message) => Ok(Some(message)),
            Err(e) if e.is_recoverable() => {
                warn!(packet = %packet, error = %e, "Skipping undecodable packet");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Wait for the message `pick` accepts
    ///
    /// `pick` hands back what it does not want; those messages go to the
    /// handler. The whole wait is bounded by `limit`.
    pub(crate) async fn wait_for<T>(
        &self,
        phase: Phase,
        limit: Duration,
        mut pick: impl FnMut(Inbound) -> std::result::Result<T, Inbound>,
    ) -> Result<T> {
        let deadline = Instant::now() + limit;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let packet = match self.transport.recv_packet(remaining).await {
                Ok(packet) => packet,
                Err(pebrust_transport::Error::ReadTimeout) => {
                    return Err(Error::Timeout { phase, after: limit });
                }
                Err(e) => return Err(e.into()),
            };

            let Some(message) = self.decode(&packet)? else {
                continue;
            };

            match pick(message) {
                Ok(value) => return Ok(value),
                Err(other) => self.dispatch(other).await?,
            }
        }
    }

    /// Next message, or `None` once the watch stayed quiet for `idle`
    pub(crate) async fn next_message_within(&self, idle: Duration) -> Result<Option<Inbound>> {
        loop {
            let Some(packet) = self.transport.try_recv_packet(idle).await? else {
                return Ok(None);
            };

            if let Some(message) = self.decode(&packet)? {
                return Ok(Some(message));
            }
        }
    }
}
