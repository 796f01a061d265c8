//! In-memory watch for protocol tests

use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream, duplex};

use pebrust_core::{Decoded, Endpoint, FrameCodec, Packet, QemuFrame};
use pebrust_transport::QemuTransport;

use crate::config::BridgeConfig;
use crate::emulator::Emulator;

/// Watch side of a duplex pipe
///
/// Speaks raw frames so tests spell out wire bytes themselves.
pub(crate) struct FakeWatch {
    io: DuplexStream,
    codec: FrameCodec,
    spp: BytesMut,
}

impl FakeWatch {
    pub(crate) fn pair() -> (QemuTransport, Self) {
        let (client, server) = duplex(256 * 1024);
        let watch = Self {
            io: server,
            codec: FrameCodec::new(),
            spp: BytesMut::new(),
        };
        (QemuTransport::from_stream(client), watch)
    }

    /// Emulator with short, test friendly timings
    pub(crate) fn emulator() -> (Emulator, Self) {
        let (transport, watch) = Self::pair();
        let config = BridgeConfig::default()
            .with_handshake(Duration::from_millis(10), Duration::from_millis(50))
            .with_app_logs(false);
        (Emulator::from_transport(transport, config), watch)
    }

    pub(crate) async fn send(&mut self, endpoint: Endpoint, payload: Vec<u8>) {
        let packet = Packet::new(endpoint, payload).encode().unwrap();
        self.send_raw(QemuFrame::spp(packet.freeze()).encode().unwrap().to_vec()).await;
    }

    pub(crate) async fn send_raw(&mut self, bytes: Vec<u8>) {
        self.io.write_all(&bytes).await.unwrap();
    }

    /// Next packet from the bridge, `None` once it hung up
    pub(crate) async fn next(&mut self) -> Option<Packet> {
        loop {
            if let Some(packet) = Packet::decode(&mut self.spp) {
                return Some(packet);
            }

            match self.codec.decode() {
                Some(Decoded::Frame(frame)) => self.spp.extend_from_slice(&frame.payload),
                Some(_) => {}
                None => {
                    let n = self.io.read_buf(self.codec.buffer_mut()).await.ok()?;
                    if n == 0 {
                        return None;
                    }
                }
            }
        }
    }

    pub(crate) async fn expect_next(&mut self) -> Packet {
        self.next().await.expect("bridge closed the connection")
    }

    /// Next packet for `endpoint`, skipping everything else
    pub(crate) async fn expect(&mut self, endpoint: Endpoint) -> Packet {
        loop {
            let packet = self.expect_next().await;
            if packet.kind() == Some(endpoint) {
                return packet;
            }
        }
    }

    /// Acknowledge a PutBytes message
    pub(crate) async fn ack(&mut self, cookie: u32) {
        let mut payload = vec![0x01];
        payload.extend_from_slice(&cookie.to_be_bytes());
        self.send(Endpoint::PutBytes, payload).await;
    }

    /// Reject a PutBytes message
    pub(crate) async fn nack(&mut self) {
        self.send(Endpoint::PutBytes, vec![0x02, 0, 0, 0, 0]).await;
    }
}
