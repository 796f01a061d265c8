//! App installation
//!
//! ```text
//! Idle -> MetadataRegistered -> AwaitingFetchRequest -> TransferringExecutable
//!      -> [TransferringResources] -> [TransferringWorker] -> Installed
//! ```
//!
//! A failed install ends in [`Error::Install`], which names the state the
//! install was in.
//!
//! The watch decides when to pull the app: we register its metadata, ask
//! the watch to start it, and wait for the fetch request that carries the
//! app id every transfer must use.

use std::fmt;
use std::path::Path;

use tracing::{debug, info, warn};

use pebrust_core::{
    AppFetchStatus, BlobCommand, BlobDatabase, Inbound, NegotiationState, ObjectType, Outbound,
};
use pebrust_types::AppMetadata;

use crate::emulator::Emulator;
use crate::error::{Error, Phase, Result};
use crate::pbw::{AppBundle, Package};

/// Progress of an installation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallState {
    Idle,
    MetadataRegistered,
    AwaitingFetchRequest,
    TransferringExecutable,
    TransferringResources,
    TransferringWorker,
    Installed,
}

impl fmt::Display for InstallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::MetadataRegistered => "metadata registered",
            Self::AwaitingFetchRequest => "awaiting fetch request",
            Self::TransferringExecutable => "transferring executable",
            Self::TransferringResources => "transferring resources",
            Self::TransferringWorker => "transferring worker",
            Self::Installed => "installed",
        };
        f.write_str(name)
    }
}

/// What is known about the app being installed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppInstallContext {
    pub metadata: AppMetadata,

    /// Assigned by the watch in its fetch request
    pub app_id: Option<u32>,

    pub state: InstallState,
}

impl AppInstallContext {
    fn new(metadata: AppMetadata) -> Self {
        Self {
            metadata,
            app_id: None,
            state: InstallState::Idle,
        }
    }

    fn advance(&mut self, next: InstallState) {
        debug!(from = %self.state, to = %next, "Install state");
        self.state = next;
    }
}

impl Emulator {
    /// Install the app in a `.pbw` package for `platform`
    pub async fn install(&self, path: impl AsRef<Path>, platform: &str) -> Result<AppInstallContext> {
        let path = path.as_ref();
        info!(path = %path.display(), platform, "Installing package");

        let bundle = Package::open(path)?.bundle(platform)?;
        self.install_bundle(&bundle).await
    }

    /// Install already extracted artifacts
    ///
    /// Negotiates first if that has not happened on this connection.
    ///
    /// # Errors
    ///
    /// A bad executable header fails before anything is sent. A fetch or
    /// transfer step that times out or is refused fails with
    /// [`Error::Install`], wrapping the [`Error::Timeout`] or
    /// [`Error::Rejected`]. Metadata registration failures are only logged.
    pub async fn install_bundle(&self, bundle: &AppBundle) -> Result<AppInstallContext> {
        let metadata = AppMetadata::parse(&bundle.executable)?;
        info!(app = %metadata, "Parsed app header");

        if self.session().state() == NegotiationState::Idle {
            self.negotiate().await?;
        }

        let mut context = AppInstallContext::new(metadata);
        match self.run_install(&mut context, bundle).await {
            Ok(()) => {
                info!(app = %context.metadata, app_id = ?context.app_id, "App installed");
                Ok(context)
            }
            Err(e) => {
                warn!(state = %context.state, error = %e, "Install failed");
                Err(Error::Install {
                    state: context.state,
                    source: Box::new(e),
                })
            }
        }
    }

    async fn run_install(&self, context: &mut AppInstallContext, bundle: &AppBundle) -> Result<()> {
        let uuid = context.metadata.uuid;

        self.send(&Outbound::AppLogShipping { enable: true }).await?;

        if self.register_metadata(&context.metadata).await? {
            context.advance(InstallState::MetadataRegistered);
        }

        self.send(&Outbound::AppRunStateStart(uuid)).await?;
        context.advance(InstallState::AwaitingFetchRequest);

        let app_id = self
            .wait_for(Phase::AppFetch, self.config().fetch_timeout, |message| match message {
                Inbound::AppFetchRequest { uuid: requested, app_id } if requested == uuid => Ok(app_id),
                other => Err(other),
            })
            .await?;
        debug!(app_id, "Watch requested the app");
        context.app_id = Some(app_id);

        self.send(&Outbound::AppFetchResponse(AppFetchStatus::Start))
            .await?;

        context.advance(InstallState::TransferringExecutable);
        self.put_bytes(ObjectType::AppExecutable, app_id, &bundle.executable)
            .await?;

        if let Some(resources) = &bundle.resources {
            context.advance(InstallState::TransferringResources);
            self.put_bytes(ObjectType::AppResources, app_id, resources)
                .await?;
        }

        if let Some(worker) = &bundle.worker {
            context.advance(InstallState::TransferringWorker);
            self.put_bytes(ObjectType::Worker, app_id, worker).await?;
        }

        context.advance(InstallState::Installed);
        Ok(())
    }

    /// Insert the app record into the app database
    ///
    /// The first BlobDB response is taken as ours; its token is not
    /// compared. Returns whether the watch accepted the record.
    async fn register_metadata(&self, metadata: &AppMetadata) -> Result<bool> {
        let token = self.session().next_token();
        let command = BlobCommand::insert(
            token,
            BlobDatabase::App,
            metadata.uuid.as_bytes().to_vec(),
            metadata.to_blob_record(),
        );
        self.send(&Outbound::BlobInsert(command)).await?;

        let response = self
            .wait_for(Phase::MetadataInsert, self.config().blobdb_timeout, |message| match message {
                Inbound::BlobResponse { status, .. } => Ok(status),
                other => Err(other),
            })
            .await;

        match response {
            Ok(status) if status.is_success() => Ok(true),
            Ok(status) => {
                warn!(%status, "App metadata insert failed, continuing");
                Ok(false)
            }
            Err(e) if e.is_timeout() => {
                warn!("No response to app metadata insert, continuing");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeWatch;
    use pebrust_core::{Endpoint, Packet};
    use pebrust_types::AppFlags;
    use pretty_assertions::assert_eq;

    const UUID: [u8; 16] = [
        0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88,
        0x99, 0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF, 0x00,
    ];
    const APP_ID: u32 = 42;

    fn executable() -> Vec<u8> {
        let mut buf = vec![0u8; 200];
        buf[..8].copy_from_slice(AppMetadata::SENTINEL);
        buf[12] = 1;
        buf[24..29].copy_from_slice(b"Tests");
        buf[96..100].copy_from_slice(&AppFlags::WATCHFACE.bits().to_le_bytes());
        buf[104..120].copy_from_slice(&UUID);
        buf
    }

    fn bundle(resources: bool, worker: bool) -> AppBundle {
        AppBundle {
            executable: executable(),
            resources: resources.then(|| vec![0x52; 300]),
            worker: worker.then(|| vec![0x57; 50]),
        }
    }

    fn fetch_request(uuid: [u8; 16], app_id: u32) -> Vec<u8> {
        let mut payload = vec![0x01];
        payload.extend_from_slice(&uuid);
        payload.extend_from_slice(&(app_id as i32).to_le_bytes());
        payload
    }

    fn be32(bytes: &[u8]) -> u32 {
        u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    /// Ack a whole transfer, returning its Init packet
    async fn serve_transfer(watch: &mut FakeWatch, cookie: u32) -> Packet {
        let init = watch.expect(Endpoint::PutBytes).await;
        watch.ack(cookie).await;
        loop {
            let packet = watch.expect(Endpoint::PutBytes).await;
            watch.ack(cookie).await;
            if packet.payload[0] == 0x05 {
                return init;
            }
        }
    }

    /// Plays the watch side up to the fetch request
    async fn serve_until_fetch(watch: &mut FakeWatch, blob_status: Option<u8>) {
        let insert = watch.expect(Endpoint::BlobDb).await;
        assert_eq!(insert.payload[0], 0x01);
        assert_eq!(insert.payload[3], BlobDatabase::App as u8);
        assert_eq!(&insert.payload[5..21], &UUID);

        if let Some(status) = blob_status {
            let mut response = insert.payload[1..3].to_vec();
            response.push(status);
            watch.send(Endpoint::BlobDb, response).await;
        }

        let start = watch.expect(Endpoint::AppRunState).await;
        assert_eq!(start.payload[0], 0x01);
        assert_eq!(&start.payload[1..], &UUID);

        watch.send(Endpoint::AppFetch, fetch_request(UUID, APP_ID)).await;
        let response = watch.expect(Endpoint::AppFetch).await;
        assert_eq!(&response.payload[..], &[0x01, 0x01]);
    }

    fn negotiated(emulator: &Emulator) {
        let session = emulator.session();
        session.begin_negotiation().unwrap();
        session.handshake_sent().unwrap();
        session.time_out().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_install_executable_only() {
        let (emulator, mut watch) = FakeWatch::emulator();
        negotiated(&emulator);

        let script = tokio::spawn(async move {
            serve_until_fetch(&mut watch, Some(0x01)).await;
            let init = serve_transfer(&mut watch, 1).await;
            (vec![init], watch)
        });

        let context = emulator.install_bundle(&bundle(false, false)).await.unwrap();
        let (inits, _watch) = script.await.unwrap();

        assert_eq!(inits.len(), 1);
        assert_eq!(inits[0].payload[5], ObjectType::AppExecutable as u8 | 0x80);
        assert_eq!(be32(&inits[0].payload[6..10]), APP_ID);
        assert_eq!(context.app_id, Some(APP_ID));
        assert_eq!(context.state, InstallState::Installed);
        assert_eq!(context.metadata.name, "Tests");
    }

    #[tokio::test(start_paused = true)]
    async fn test_install_all_artifacts_share_app_id() {
        let (emulator, mut watch) = FakeWatch::emulator();
        negotiated(&emulator);

        let script = tokio::spawn(async move {
            serve_until_fetch(&mut watch, Some(0x01)).await;
            let mut inits = Vec::new();
            for cookie in 1..=3 {
                inits.push(serve_transfer(&mut watch, cookie).await);
            }
            (inits, watch)
        });

        emulator.install_bundle(&bundle(true, true)).await.unwrap();
        let (inits, _watch) = script.await.unwrap();

        let types: Vec<u8> = inits.iter().map(|init| init.payload[5] & 0x7F).collect();
        assert_eq!(
            types,
            vec![
                ObjectType::AppExecutable as u8,
                ObjectType::AppResources as u8,
                ObjectType::Worker as u8,
            ]
        );
        assert!(inits.iter().all(|init| be32(&init.payload[6..10]) == APP_ID));
        assert_eq!(be32(&inits[1].payload[1..5]), 300);
    }

    #[tokio::test(start_paused = true)]
    async fn test_registration_failure_is_tolerated() {
        let (emulator, mut watch) = FakeWatch::emulator();
        negotiated(&emulator);

        let script = tokio::spawn(async move {
            // DatabaseFull
            serve_until_fetch(&mut watch, Some(0x07)).await;
            serve_transfer(&mut watch, 1).await;
            watch
        });

        let context = emulator.install_bundle(&bundle(false, false)).await.unwrap();
        script.await.unwrap();
        assert_eq!(context.state, InstallState::Installed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_registration_timeout_is_tolerated() {
        let (emulator, mut watch) = FakeWatch::emulator();
        negotiated(&emulator);

        let script = tokio::spawn(async move {
            serve_until_fetch(&mut watch, None).await;
            serve_transfer(&mut watch, 1).await;
            watch
        });

        emulator.install_bundle(&bundle(false, false)).await.unwrap();
        script.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_timeout_aborts() {
        let (emulator, mut watch) = FakeWatch::emulator();
        negotiated(&emulator);

        let script = tokio::spawn(async move {
            let insert = watch.expect(Endpoint::BlobDb).await;
            watch.send(Endpoint::BlobDb, vec![insert.payload[1], insert.payload[2], 0x01]).await;
            // A fetch request for some other app is not ours
            let mut other = UUID;
            other[0] = 0xFF;
            watch.send(Endpoint::AppFetch, fetch_request(other, 7)).await;
            watch
        });

        let err = emulator.install_bundle(&bundle(false, false)).await.unwrap_err();
        let _watch = script.await.unwrap();

        assert!(err.is_timeout());
        assert_eq!(err.phase(), Some(Phase::AppFetch));
        assert_eq!(err.install_state(), Some(InstallState::AwaitingFetchRequest));
        assert!(err.to_string().contains("awaiting fetch request"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_putbytes_nack_aborts() {
        let (emulator, mut watch) = FakeWatch::emulator();
        negotiated(&emulator);

        let script = tokio::spawn(async move {
            serve_until_fetch(&mut watch, Some(0x01)).await;
            serve_transfer(&mut watch, 1).await;
            // Resources are refused at Init
            watch.expect(Endpoint::PutBytes).await;
            watch.nack().await;
            watch
        });

        let err = emulator.install_bundle(&bundle(true, false)).await.unwrap_err();
        script.await.unwrap();

        assert!(err.is_rejection());
        assert_eq!(err.phase(), Some(Phase::PutBytesInit(ObjectType::AppResources)));
        assert_eq!(err.install_state(), Some(InstallState::TransferringResources));
    }

    #[tokio::test(start_paused = true)]
    async fn test_bad_header_is_fatal() {
        let (emulator, _watch) = FakeWatch::emulator();
        let mut broken = bundle(false, false);
        broken.executable.truncate(64);

        let err = emulator.install_bundle(&broken).await.unwrap_err();
        assert!(matches!(err, Error::Types(_)));
        assert_eq!(err.install_state(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_install_from_package() {
        let package = crate::pbw::build_package(&[("basalt/pebble-app.bin", &executable()[..])]);
        let path = std::env::temp_dir().join(format!("pebrust-install-{}.pbw", std::process::id()));
        std::fs::write(&path, package.into_inner()).unwrap();

        let (emulator, mut watch) = FakeWatch::emulator();
        negotiated(&emulator);

        let script = tokio::spawn(async move {
            serve_until_fetch(&mut watch, Some(0x01)).await;
            serve_transfer(&mut watch, 1).await;
            watch
        });

        let result = emulator.install(&path, "basalt").await;
        script.await.unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(result.unwrap().app_id, Some(APP_ID));
    }
}
