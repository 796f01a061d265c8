//! QEMU emulator transport

use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, trace};

use pebrust_core::{Decoded, FrameCodec, Outbound, Packet, QemuFrame};

use crate::error::*;

/// Byte stream the transport runs over
pub trait Stream: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

impl<T> Stream for T where T: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

type BoxedStream = Box<dyn Stream>;

struct ReadState {
    io: ReadHalf<BoxedStream>,
    codec: FrameCodec,

    /// Reassembled SPP byte stream, packets are cut from here
    spp: BytesMut,
}

/// Connection to the emulator's Pebble protocol socket
///
/// Reads and writes are guarded by separate async mutexes, so one task can
/// wait for a response while another (or the same flow's dispatcher)
/// answers a ping. Partial frames and packets stay buffered inside the
/// transport, which makes every read safe to cancel with a timeout.
pub struct QemuTransport {
    peer: String,
    reader: Mutex<ReadState>,
    writer: Mutex<WriteHalf<BoxedStream>>,
}

impl QemuTransport {
    /// Connect to an emulator on localhost
    pub async fn connect(port: u16, connect_timeout: Duration) -> Result<Self> {
        Self::connect_to("127.0.0.1", port, connect_timeout).await
    }

    /// Connect to an emulator at `host:port`
    pub async fn connect_to(host: &str, port: u16, connect_timeout: Duration) -> Result<Self> {
        let addr_str = format!("{}:{}", host, port);

        let addr = tokio::net::lookup_host(&addr_str)
            .await
            .map_err(|e| Error::InvalidAddress(format!("{}: {}", addr_str, e)))?
            .next()
            .ok_or_else(|| Error::InvalidAddress(format!("No addresses found for {}", addr_str)))?;

        debug!("Connecting to {}...", addr);

        let stream = timeout(connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| Error::ConnectionTimeout)?
            .map_err(Error::Io)?;

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        debug!("Connected to {}", addr);

        Ok(Self::with_peer(stream, addr.to_string()))
    }

    /// Wrap an already connected stream
    pub fn from_stream(io: impl Stream) -> Self {
        Self::with_peer(io, "stream".to_string())
    }

    fn with_peer(io: impl Stream, peer: String) -> Self {
        let boxed: BoxedStream = Box::new(io);
        let (read, write) = tokio::io::split(boxed);

        Self {
            peer,
            reader: Mutex::new(ReadState {
                io: read,
                codec: FrameCodec::new(),
                spp: BytesMut::with_capacity(4096),
            }),
            writer: Mutex::new(write),
        }
    }

    /// Get remote address
    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Send a typed message
    pub async fn send(&self, message: &Outbound) -> Result<()> {
        self.send_packet(&message.to_packet()).await
    }

    /// Send a Pebble packet on the SPP channel
    ///
    /// Packets larger than one frame are split across several frames.
    pub async fn send_packet(&self, packet: &Packet) -> Result<()> {
        let bytes = packet.encode()?.freeze();

        let mut encoded = BytesMut::with_capacity(bytes.len() + 8);
        for chunk in bytes.chunks(QemuFrame::MAX_PAYLOAD_SIZE) {
            encoded.extend_from_slice(&QemuFrame::spp(Bytes::copy_from_slice(chunk)).encode()?);
        }

        trace!(packet = %packet, "Sending packet");
        self.write_all(&encoded).await
    }

    /// Send a raw frame on any channel
    pub async fn send_frame(&self, channel: u16, payload: impl Into<Bytes>) -> Result<()> {
        let encoded = QemuFrame::new(channel, payload).encode()?;
        self.write_all(&encoded).await
    }

    async fn write_all(&self, data: &[u8]) -> Result<()> {
        let mut writer = self.writer.lock().await;

        trace!("Sending {} bytes: {:02X?}", data.len(), &data[..data.len().min(16)]);

        writer.write_all(data).await?;
        writer.flush().await?;

        Ok(())
    }

    /// Wait for the next packet, at most `limit`
    ///
    /// # Errors
    ///
    /// [`Error::ReadTimeout`] when nothing arrives in time,
    /// [`Error::ConnectionClosed`] when the emulator hung up.
    pub async fn recv_packet(&self, limit: Duration) -> Result<Packet> {
        timeout(limit, self.next_packet())
            .await
            .map_err(|_| Error::ReadTimeout)?
    }

    /// Like [`recv_packet`](Self::recv_packet), but a timeout means
    /// "nothing more to read" and yields `None`
    pub async fn try_recv_packet(&self, limit: Duration) -> Result<Option<Packet>> {
        match self.recv_packet(limit).await {
            Ok(packet) => Ok(Some(packet)),
            Err(Error::ReadTimeout) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Wait for the next packet without a time limit
    pub async fn next_packet(&self) -> Result<Packet> {
        let mut guard = self.reader.lock().await;
        let state = &mut *guard;

        loop {
            if let Some(packet) = Packet::decode(&mut state.spp) {
                trace!(packet = %packet, "Received packet");
                return Ok(packet);
            }

            match state.codec.decode() {
                Some(Decoded::Frame(frame)) => state.spp.extend_from_slice(&frame.payload),
                Some(Decoded::Skipped { .. }) | Some(Decoded::Resync { .. }) => {}
                None => {
                    let n = state.io.read_buf(state.codec.buffer_mut()).await?;
                    if n == 0 {
                        return Err(Error::ConnectionClosed);
                    }
                    trace!("Received {} bytes", n);
                }
            }
        }
    }

    /// Close the write half; the emulator sees end of stream
    pub async fn shutdown(&self) -> Result<()> {
        debug!("Disconnecting from {}...", self.peer);
        self.writer.lock().await.shutdown().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pebrust_core::constants::channels;
    use pebrust_core::Endpoint;
    use pretty_assertions::assert_eq;
    use tokio::io::duplex;

    fn frame(channel: u16, payload: &[u8]) -> Vec<u8> {
        QemuFrame::new(channel, payload.to_vec()).encode().unwrap().to_vec()
    }

    fn packet_bytes(endpoint: Endpoint, payload: &[u8]) -> Vec<u8> {
        Packet::new(endpoint, payload.to_vec()).encode().unwrap().to_vec()
    }

    #[tokio::test]
    async fn test_send_packet_is_framed() {
        let (client, mut server) = duplex(1024);
        let transport = QemuTransport::from_stream(client);

        transport
            .send(&Outbound::Pong { cookie: 1 })
            .await
            .unwrap();

        let mut buf = vec![0u8; 17];
        server.read_exact(&mut buf).await.unwrap();
        assert_eq!(
            buf,
            vec![
                0xFE, 0xED, 0x00, 0x01, 0x00, 0x09,
                0x00, 0x05, 0x07, 0xD1, 0x01, 0x00, 0x00, 0x00, 0x01,
                0xBE, 0xEF,
            ]
        );
    }

    #[tokio::test]
    async fn test_packet_spanning_frames() {
        let (client, mut server) = duplex(1024);
        let transport = QemuTransport::from_stream(client);

        let bytes = packet_bytes(Endpoint::AppLogs, &[1, 2, 3, 4, 5, 6]);
        server.write_all(&frame(channels::SPP, &bytes[..3])).await.unwrap();
        server.write_all(&frame(channels::BATTERY, &[0x55, 100])).await.unwrap();
        server.write_all(&frame(channels::SPP, &bytes[3..])).await.unwrap();

        let packet = transport.recv_packet(Duration::from_secs(1)).await.unwrap();
        assert_eq!(packet, Packet::new(Endpoint::AppLogs, vec![1, 2, 3, 4, 5, 6]));
    }

    #[tokio::test]
    async fn test_two_packets_in_one_frame() {
        let (client, mut server) = duplex(1024);
        let transport = QemuTransport::from_stream(client);

        let mut bytes = packet_bytes(Endpoint::PingPong, &[0x01, 0, 0, 0, 1]);
        bytes.extend(packet_bytes(Endpoint::PingPong, &[0x01, 0, 0, 0, 2]));
        server.write_all(&frame(channels::SPP, &bytes)).await.unwrap();

        let first = transport.recv_packet(Duration::from_secs(1)).await.unwrap();
        let second = transport.recv_packet(Duration::from_secs(1)).await.unwrap();
        assert_eq!(first.payload[4], 1);
        assert_eq!(second.payload[4], 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_keeps_partial_frame() {
        let (client, mut server) = duplex(1024);
        let transport = QemuTransport::from_stream(client);

        let encoded = frame(channels::SPP, &packet_bytes(Endpoint::Screenshot, &[9, 9]));
        server.write_all(&encoded[..5]).await.unwrap();

        let result = transport.try_recv_packet(Duration::from_millis(100)).await.unwrap();
        assert_eq!(result, None);

        server.write_all(&encoded[5..]).await.unwrap();
        let packet = transport.recv_packet(Duration::from_secs(1)).await.unwrap();
        assert_eq!(packet, Packet::new(Endpoint::Screenshot, vec![9, 9]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_recv_timeout() {
        let (client, _server) = duplex(64);
        let transport = QemuTransport::from_stream(client);

        let result = transport.recv_packet(Duration::from_millis(50)).await;
        assert!(matches!(result, Err(Error::ReadTimeout)));
    }

    #[tokio::test]
    async fn test_connection_closed() {
        let (client, server) = duplex(64);
        let transport = QemuTransport::from_stream(client);
        drop(server);

        let result = transport.recv_packet(Duration::from_secs(1)).await;
        assert!(matches!(result, Err(Error::ConnectionClosed)));
        assert!(result.unwrap_err().is_fatal());
    }

    #[tokio::test]
    async fn test_garbage_before_frame() {
        let (client, mut server) = duplex(1024);
        let transport = QemuTransport::from_stream(client);

        server.write_all(&[0x00, 0x13, 0x37]).await.unwrap();
        let bytes = packet_bytes(Endpoint::BlobDb, &[1, 0, 1]);
        server.write_all(&frame(channels::SPP, &bytes)).await.unwrap();

        let packet = transport.recv_packet(Duration::from_secs(1)).await.unwrap();
        assert_eq!(packet.kind(), Some(Endpoint::BlobDb));
    }

    #[tokio::test]
    async fn test_invalid_address() {
        let result = QemuTransport::connect_to("invalid..address", 1, Duration::from_millis(100)).await;
        assert!(result.is_err());
    }
}
