//! Session bookkeeping for one emulator connection
//!
//! A session tracks:
//! - Version negotiation state
//! - Firmware information reported by the watch
//! - BlobDB token counter

use std::fmt;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use pebrust_types::FirmwareInfo;

use crate::error::{Error, Result};

/// Version negotiation state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationState {
    /// Nothing happened yet
    Idle,

    /// Reading and answering whatever the watch sends on connect
    Draining,

    /// Version request sent, waiting for the answer
    AwaitingHandshakeResponse,

    /// Watch answered the version request
    Complete,

    /// Watch never answered; the connection is still usable
    TimedOut,
}

impl NegotiationState {
    /// Check if negotiation ran to an end, successful or not
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Complete | Self::TimedOut)
    }
}

impl fmt::Display for NegotiationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Draining => "draining",
            Self::AwaitingHandshakeResponse => "awaiting handshake response",
            Self::Complete => "complete",
            Self::TimedOut => "timed out",
        };
        f.write_str(name)
    }
}

/// Session manager
///
/// Thread-safe and can be cloned cheaply (Arc internally).
#[derive(Debug, Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

#[derive(Debug)]
struct SessionInner {
    /// Next BlobDB token
    blob_token: AtomicU16,

    /// Negotiation state
    state: RwLock<NegotiationState>,

    /// Firmware reported during negotiation
    firmware: RwLock<Option<FirmwareInfo>>,
}

impl Session {
    /// First BlobDB token handed out
    pub const INITIAL_TOKEN: u16 = 1;

    /// Create a session that has not negotiated yet
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SessionInner {
                blob_token: AtomicU16::new(Self::INITIAL_TOKEN),
                state: RwLock::new(NegotiationState::Idle),
                firmware: RwLock::new(None),
            }),
        }
    }

    /// Get current negotiation state
    pub fn state(&self) -> NegotiationState {
        *self.inner.state.read()
    }

    /// Firmware reported by the watch, if negotiation completed
    pub fn firmware(&self) -> Option<FirmwareInfo> {
        self.inner.firmware.read().clone()
    }

    /// Start draining; allowed from any state that is not mid-negotiation
    pub fn begin_negotiation(&self) -> Result<()> {
        self.transition(
            |s| matches!(s, NegotiationState::Idle) || s.is_finished(),
            NegotiationState::Draining,
        )
    }

    /// Version request was sent
    pub fn handshake_sent(&self) -> Result<()> {
        self.transition(
            |s| s == NegotiationState::Draining,
            NegotiationState::AwaitingHandshakeResponse,
        )
    }

    /// Watch answered with its firmware version
    pub fn complete(&self, firmware: FirmwareInfo) -> Result<()> {
        self.transition(
            |s| s == NegotiationState::AwaitingHandshakeResponse,
            NegotiationState::Complete,
        )?;
        *self.inner.firmware.write() = Some(firmware);
        Ok(())
    }

    /// Watch did not answer in time
    pub fn time_out(&self) -> Result<()> {
        self.transition(
            |s| s == NegotiationState::AwaitingHandshakeResponse,
            NegotiationState::TimedOut,
        )
    }

    /// Negotiation broke off; back to `Idle` so it can be run again
    pub fn abort_negotiation(&self) -> Result<()> {
        self.transition(
            |s| {
                matches!(
                    s,
                    NegotiationState::Draining | NegotiationState::AwaitingHandshakeResponse
                )
            },
            NegotiationState::Idle,
        )
    }

    /// Get next BlobDB token
    ///
    /// Wraps around after 65535.
    pub fn next_token(&self) -> u16 {
        self.inner.blob_token.fetch_add(1, Ordering::AcqRel)
    }

    fn transition(
        &self,
        allowed: impl Fn(NegotiationState) -> bool,
        next: NegotiationState,
    ) -> Result<()> {
        let mut state = self.inner.state.write();

        if !allowed(*state) {
            return Err(Error::InvalidSessionState(format!(
                "Cannot move from {} to {}",
                *state, next
            )));
        }

        *state = next;
        Ok(())
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn firmware() -> FirmwareInfo {
        FirmwareInfo::new("v4.4.0".into(), "abc1234".into())
    }

    #[test]
    fn test_session_new() {
        let session = Session::new();
        assert_eq!(session.state(), NegotiationState::Idle);
        assert!(session.firmware().is_none());
    }

    #[test]
    fn test_negotiation_complete() {
        let session = Session::new();
        session.begin_negotiation().unwrap();
        session.handshake_sent().unwrap();
        session.complete(firmware()).unwrap();

        assert_eq!(session.state(), NegotiationState::Complete);
        assert_eq!(session.firmware().unwrap().version_tag, "v4.4.0");
    }

    #[test]
    fn test_negotiation_timeout_allows_retry() {
        let session = Session::new();
        session.begin_negotiation().unwrap();
        session.handshake_sent().unwrap();
        session.time_out().unwrap();
        assert!(session.state().is_finished());

        session.begin_negotiation().unwrap();
        assert_eq!(session.state(), NegotiationState::Draining);
    }

    #[test]
    fn test_abort_negotiation() {
        let session = Session::new();
        assert!(session.abort_negotiation().is_err());

        session.begin_negotiation().unwrap();
        session.abort_negotiation().unwrap();
        assert_eq!(session.state(), NegotiationState::Idle);

        session.begin_negotiation().unwrap();
        session.handshake_sent().unwrap();
        session.abort_negotiation().unwrap();
        assert_eq!(session.state(), NegotiationState::Idle);
        session.begin_negotiation().unwrap();
    }

    #[test]
    fn test_invalid_state_transitions() {
        let session = Session::new();

        // Cannot complete without asking first
        assert!(session.complete(firmware()).is_err());
        assert!(session.handshake_sent().is_err());

        // Cannot restart while draining
        session.begin_negotiation().unwrap();
        assert!(session.begin_negotiation().is_err());
    }

    #[test]
    fn test_token_generation_wraps() {
        let session = Session::new();

        assert_eq!(session.next_token(), 1);
        assert_eq!(session.next_token(), 2);

        for _ in 0..65533 {
            session.next_token();
        }
        assert_eq!(session.next_token(), 0);
    }

    #[test]
    fn test_session_clone() {
        let session1 = Session::new();
        let session2 = session1.clone();

        session1.begin_negotiation().unwrap();

        // Both share same state
        assert_eq!(session2.state(), NegotiationState::Draining);
    }
}
