//! PutBytes binary transfer
//!
//! A transfer is a strict sequence of request/ack pairs:
//!
//! ```text
//! Init(size, type, app_id)  -> ack(cookie)
//! Put(cookie, chunk)        -> ack        (repeated)
//! Commit(cookie, crc)       -> ack
//! Install(cookie)           -> ack
//! ```
//!
//! The CRC is the STM32 hardware CRC of the whole object, see
//! [`pebrust_core::checksum`].

use bytes::Bytes;
use tracing::{debug, info, warn};

use pebrust_core::checksum::Stm32Crc;
use pebrust_core::{Inbound, ObjectType, Outbound, PutBytesCommand, PutBytesResult};

use crate::emulator::Emulator;
use crate::error::{Error, Phase, Result};

/// An open transfer
///
/// Only obtainable from an acknowledged `Init`, so nothing can be sent
/// before the watch handed out a cookie.
#[derive(Debug)]
pub struct TransferSession {
    cookie: u32,
    object_type: ObjectType,
    total_size: u32,
    bytes_sent: u32,
}

impl TransferSession {
    pub fn cookie(&self) -> u32 {
        self.cookie
    }

    pub fn object_type(&self) -> ObjectType {
        self.object_type
    }

    pub fn total_size(&self) -> u32 {
        self.total_size
    }

    pub fn bytes_sent(&self) -> u32 {
        self.bytes_sent
    }
}

impl Emulator {
    /// Transfer one object and install it
    ///
    /// # Errors
    ///
    /// [`Error::Timeout`] when a step gets no response, [`Error::Rejected`]
    /// when the watch nacks it. Either way the transfer is abandoned.
    pub async fn put_bytes(&self, object_type: ObjectType, app_id: u32, data: &[u8]) -> Result<()> {
        let size = u32::try_from(data.len()).map_err(|_| {
            Error::rejected(
                Phase::PutBytesInit(object_type),
                format!("{} bytes do not fit a transfer", data.len()),
            )
        })?;

        info!(object = %object_type, size, app_id, "Starting transfer");

        let mut transfer = self.putbytes_init(object_type, size, app_id).await?;
        let mut crc = Stm32Crc::new();

        for chunk in data.chunks(self.config().chunk_size.max(1)) {
            crc.update(chunk);
            self.putbytes_put(&mut transfer, chunk).await?;
        }

        self.putbytes_commit(&transfer, crc.finalize()).await?;
        self.putbytes_install(&transfer).await?;

        info!(object = %object_type, cookie = transfer.cookie, "Transfer installed");
        Ok(())
    }

    async fn putbytes_init(&self, object_type: ObjectType, size: u32, app_id: u32) -> Result<TransferSession> {
        let phase = Phase::PutBytesInit(object_type);
        self.send(&Outbound::PutBytes(PutBytesCommand::Init {
            size,
            object_type,
            app_id,
        }))
        .await?;

        let cookie = self.await_ack(phase).await?;
        debug!(cookie, "Transfer opened");

        Ok(TransferSession {
            cookie,
            object_type,
            total_size: size,
            bytes_sent: 0,
        })
    }

    async fn putbytes_put(&self, transfer: &mut TransferSession, chunk: &[u8]) -> Result<()> {
        self.send(&Outbound::PutBytes(PutBytesCommand::Put {
            cookie: transfer.cookie,
            data: Bytes::copy_from_slice(chunk),
        }))
        .await?;

        self.await_session_ack(transfer, Phase::PutBytesPut(transfer.object_type))
            .await?;

        transfer.bytes_sent += chunk.len() as u32;
        debug!(
            sent = transfer.bytes_sent,
            total = transfer.total_size,
            "Chunk acknowledged"
        );
        Ok(())
    }

    async fn putbytes_commit(&self, transfer: &TransferSession, crc: u32) -> Result<()> {
        debug!(cookie = transfer.cookie, crc = format!("0x{:08X}", crc), "Committing");
        self.send(&Outbound::PutBytes(PutBytesCommand::Commit {
            cookie: transfer.cookie,
            crc,
        }))
        .await?;

        self.await_session_ack(transfer, Phase::PutBytesCommit(transfer.object_type))
            .await
    }

    async fn putbytes_install(&self, transfer: &TransferSession) -> Result<()> {
        self.send(&Outbound::PutBytes(PutBytesCommand::Install {
            cookie: transfer.cookie,
        }))
        .await?;

        self.await_session_ack(transfer, Phase::PutBytesInstall(transfer.object_type))
            .await
    }

    async fn await_session_ack(&self, transfer: &TransferSession, phase: Phase) -> Result<()> {
        let cookie = self.await_ack(phase).await?;
        if cookie != transfer.cookie {
            warn!(
                expected = transfer.cookie,
                got = cookie,
                %phase,
                "Ack for another cookie, accepting"
            );
        }
        Ok(())
    }

    /// Wait for an ack and return its cookie
    async fn await_ack(&self, phase: Phase) -> Result<u32> {
        let (result, cookie) = self
            .wait_for(phase, self.config().putbytes_timeout, |message| match message {
                Inbound::PutBytesResponse { result, cookie } => Ok((result, cookie)),
                other => Err(other),
            })
            .await?;

        match result {
            PutBytesResult::Ack => Ok(cookie),
            PutBytesResult::Nack => Err(Error::rejected(phase, "watch sent nack")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BridgeConfig;
    use crate::testing::FakeWatch;
    use pebrust_core::checksum;
    use pebrust_core::Endpoint;
    use pretty_assertions::assert_eq;

    const COOKIE: u32 = 0x0BAD_CAFE;

    fn be32(bytes: &[u8]) -> u32 {
        u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    #[tokio::test(start_paused = true)]
    async fn test_transfer_chunks_and_crc() {
        let (transport, mut watch) = FakeWatch::pair();
        let emulator = Emulator::from_transport(transport, BridgeConfig::default().with_chunk_size(10));
        let data: Vec<u8> = (0..25u8).collect();

        let script = tokio::spawn(async move {
            let init = watch.expect(Endpoint::PutBytes).await;
            assert_eq!(&init.payload[..], &[0x01, 0, 0, 0, 25, 0x85, 0, 0, 0, 3]);
            watch.ack(COOKIE).await;

            let mut puts = Vec::new();
            loop {
                let packet = watch.expect(Endpoint::PutBytes).await;
                match packet.payload[0] {
                    0x02 => {
                        assert_eq!(be32(&packet.payload[1..5]), COOKIE);
                        let len = be32(&packet.payload[5..9]) as usize;
                        assert_eq!(packet.payload.len(), 9 + len);
                        puts.push(packet.payload[9..].to_vec());
                        watch.ack(COOKIE).await;
                    }
                    0x03 => {
                        assert_eq!(be32(&packet.payload[1..5]), COOKIE);
                        let crc = be32(&packet.payload[5..9]);
                        watch.ack(COOKIE).await;
                        let install = watch.expect(Endpoint::PutBytes).await;
                        assert_eq!(&install.payload[..], &[0x05, 0x0B, 0xAD, 0xCA, 0xFE]);
                        watch.ack(COOKIE).await;
                        return (puts, crc, watch);
                    }
                    other => panic!("unexpected command {other}"),
                }
            }
        });

        emulator
            .put_bytes(ObjectType::AppExecutable, 3, &data)
            .await
            .unwrap();
        let (puts, crc, _watch) = script.await.unwrap();

        // ceil(25 / 10) chunks, none larger than the chunk size
        assert_eq!(puts.len(), 3);
        assert!(puts.iter().all(|chunk| chunk.len() <= 10));
        assert_eq!(puts.concat(), data);
        assert_eq!(crc, checksum::calculate(&data));
    }

    #[tokio::test(start_paused = true)]
    async fn test_init_nack_aborts() {
        let (emulator, mut watch) = FakeWatch::emulator();

        let script = tokio::spawn(async move {
            watch.expect(Endpoint::PutBytes).await;
            watch.nack().await;
            watch
        });

        let err = emulator
            .put_bytes(ObjectType::AppResources, 1, &[1, 2, 3])
            .await
            .unwrap_err();
        script.await.unwrap();

        assert!(err.is_rejection());
        assert_eq!(err.phase(), Some(Phase::PutBytesInit(ObjectType::AppResources)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_commit_timeout_aborts() {
        let (emulator, mut watch) = FakeWatch::emulator();

        let script = tokio::spawn(async move {
            watch.expect(Endpoint::PutBytes).await;
            watch.ack(COOKIE).await;
            watch.expect(Endpoint::PutBytes).await;
            watch.ack(COOKIE).await;
            // Commit is never answered
            watch.expect(Endpoint::PutBytes).await;
            watch
        });

        let err = emulator
            .put_bytes(ObjectType::Worker, 1, &[1, 2, 3])
            .await
            .unwrap_err();
        let _watch = script.await.unwrap();

        assert!(err.is_timeout());
        assert_eq!(err.phase(), Some(Phase::PutBytesCommit(ObjectType::Worker)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_foreign_cookie_is_accepted() {
        let (emulator, mut watch) = FakeWatch::emulator();

        let script = tokio::spawn(async move {
            watch.expect(Endpoint::PutBytes).await;
            watch.ack(COOKIE).await;
            for _ in 0..3 {
                watch.expect(Endpoint::PutBytes).await;
                watch.ack(COOKIE + 1).await;
            }
            watch
        });

        emulator
            .put_bytes(ObjectType::AppExecutable, 1, &[0xAA])
            .await
            .unwrap();
        script.await.unwrap();
    }
}
