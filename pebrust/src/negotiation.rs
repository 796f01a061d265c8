//! Version negotiation
//!
//! Right after connecting the watch sends a burst of messages (version
//! requests, pings, logs). We let it settle, answer everything until it goes
//! quiet, then introduce ourselves and ask for the firmware version.

use tracing::{debug, info, warn};

use pebrust_core::{AppVersionResponse, Inbound, Outbound};
use pebrust_types::FirmwareInfo;

use crate::emulator::Emulator;
use crate::error::{Phase, Result};

impl Emulator {
    /// Run the version handshake
    ///
    /// Returns the firmware information, or `None` when the watch never
    /// answered the version request. A silent watch is not an error.
    ///
    /// Any other failure puts the session back to `Idle`, so the handshake
    /// can be retried.
    pub async fn negotiate(&self) -> Result<Option<FirmwareInfo>> {
        self.session().begin_negotiation()?;

        match self.run_negotiation().await {
            Ok(firmware) => Ok(firmware),
            Err(e) => {
                warn!(state = %self.session().state(), error = %e, "Negotiation failed");
                self.session().abort_negotiation()?;
                Err(e)
            }
        }
    }

    async fn run_negotiation(&self) -> Result<Option<FirmwareInfo>> {
        let config = self.config();

        tokio::time::sleep(config.handshake_settle).await;

        let mut drained = 0usize;
        while let Some(message) = self.next_message_within(config.drain_idle).await? {
            drained += 1;
            self.dispatch(message).await?;
        }
        debug!(drained, "Connect burst drained");

        self.send(&Outbound::AppVersionResponse(AppVersionResponse::default()))
            .await?;
        self.send(&Outbound::WatchVersionRequest).await?;
        self.session().handshake_sent()?;

        let response = self
            .wait_for(Phase::Negotiation, config.version_timeout, |message| match message {
                Inbound::WatchVersion(info) => Ok(info),
                other => Err(other),
            })
            .await;

        match response {
            Ok(firmware) => {
                info!(%firmware, "Negotiation complete");
                self.session().complete(firmware.clone())?;
                Ok(Some(firmware))
            }
            Err(e) if e.is_timeout() => {
                warn!("Watch did not report its version, continuing anyway");
                self.session().time_out()?;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeWatch;
    use pebrust_core::{Endpoint, NegotiationState};
    use pretty_assertions::assert_eq;

    fn watch_version() -> Vec<u8> {
        let mut payload = vec![0x01];
        payload.extend_from_slice(&1_500_000_000u32.to_be_bytes());
        let mut tag = [0u8; 32];
        tag[..6].copy_from_slice(b"v4.4.0");
        payload.extend_from_slice(&tag);
        payload.extend_from_slice(b"abc1234\0");
        payload.extend_from_slice(&[0, 9, 1]);
        payload
    }

    #[tokio::test(start_paused = true)]
    async fn test_negotiation_complete() {
        let (emulator, mut watch) = FakeWatch::emulator();

        let script = tokio::spawn(async move {
            // Connect burst: version request and a ping
            watch.send(Endpoint::PhoneAppVersion, vec![0x00]).await;
            watch.send(Endpoint::PingPong, vec![0x00, 0, 0, 0, 5, 0]).await;

            let first = watch.expect_next().await;
            assert_eq!(first.kind(), Some(Endpoint::PhoneAppVersion));
            let pong = watch.expect_next().await;
            assert_eq!(&pong.payload[..], &[0x01, 0, 0, 0, 5]);

            // Proactive version response, then the version request
            let proactive = watch.expect_next().await;
            assert_eq!(proactive.kind(), Some(Endpoint::PhoneAppVersion));
            let request = watch.expect_next().await;
            assert_eq!(request.kind(), Some(Endpoint::WatchVersion));
            assert_eq!(&request.payload[..], &[0x00]);

            watch.send(Endpoint::WatchVersion, watch_version()).await;
            watch
        });

        let firmware = emulator.negotiate().await.unwrap().unwrap();
        script.await.unwrap();

        assert_eq!(firmware.version_tag, "v4.4.0");
        assert_eq!(firmware.git_hash, "abc1234");
        assert_eq!(emulator.session().state(), NegotiationState::Complete);
        assert_eq!(emulator.session().firmware(), Some(firmware));
    }

    #[tokio::test(start_paused = true)]
    async fn test_negotiation_timeout_is_not_fatal() {
        let (emulator, _watch) = FakeWatch::emulator();

        let firmware = emulator.negotiate().await.unwrap();

        assert_eq!(firmware, None);
        assert_eq!(emulator.session().state(), NegotiationState::TimedOut);
    }

    #[tokio::test(start_paused = true)]
    async fn test_negotiation_failure_resets_session() {
        let (emulator, watch) = FakeWatch::emulator();
        drop(watch);

        let err = emulator.negotiate().await.unwrap_err();

        assert!(err.is_connection_closed());
        assert_eq!(emulator.session().state(), NegotiationState::Idle);
        // Not stuck mid-negotiation
        assert!(!matches!(
            emulator.negotiate().await,
            Err(crate::Error::Core(pebrust_core::Error::InvalidSessionState(_)))
        ));
    }
}
