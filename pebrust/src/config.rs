//! Bridge configuration

use std::time::Duration;

use pebrust_core::constants::{DEFAULT_TIMEOUT, PUTBYTES_CHUNK_SIZE};

/// Timeouts and knobs for talking to the emulator
///
/// Every wait in the protocol flows is bounded by one of these. The two idle
/// timeouts double as end-of-sequence markers: the watch has no "that was
/// everything" message for the connect burst or the data logging session
/// list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// TCP connect timeout
    pub connect_timeout: Duration,

    /// Pause after connecting before draining
    pub handshake_settle: Duration,

    /// Quiet period that ends the connect drain
    pub drain_idle: Duration,

    /// Wait for the `WatchVersion` response
    pub version_timeout: Duration,

    /// Wait for the BlobDB insert response
    pub blobdb_timeout: Duration,

    /// Wait for the watch to request the app
    pub fetch_timeout: Duration,

    /// Wait for each PutBytes response
    pub putbytes_timeout: Duration,

    /// Bytes per PutBytes `Put`
    pub chunk_size: usize,

    /// Wait for each screenshot packet
    pub screenshot_timeout: Duration,

    /// Quiet period that ends the data logging session list
    pub datalogging_idle: Duration,

    /// Wait for the send-enable response
    pub send_enable_timeout: Duration,

    /// Wait for a pong
    pub ping_timeout: Duration,

    /// Print app log lines as they arrive
    pub print_app_logs: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(DEFAULT_TIMEOUT),
            handshake_settle: Duration::from_secs(1),
            drain_idle: Duration::from_millis(500),
            version_timeout: Duration::from_secs(10),
            blobdb_timeout: Duration::from_secs(10),
            fetch_timeout: Duration::from_secs(15),
            putbytes_timeout: Duration::from_secs(10),
            chunk_size: PUTBYTES_CHUNK_SIZE,
            screenshot_timeout: Duration::from_secs(10),
            datalogging_idle: Duration::from_secs(2),
            send_enable_timeout: Duration::from_secs(5),
            ping_timeout: Duration::from_secs(DEFAULT_TIMEOUT),
            print_app_logs: true,
        }
    }
}

impl BridgeConfig {
    /// Set connection timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set settle delay and drain idle timeout
    pub fn with_handshake(mut self, settle: Duration, drain_idle: Duration) -> Self {
        self.handshake_settle = settle;
        self.drain_idle = drain_idle;
        self
    }

    pub fn with_version_timeout(mut self, timeout: Duration) -> Self {
        self.version_timeout = timeout;
        self
    }

    pub fn with_blobdb_timeout(mut self, timeout: Duration) -> Self {
        self.blobdb_timeout = timeout;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_putbytes_timeout(mut self, timeout: Duration) -> Self {
        self.putbytes_timeout = timeout;
        self
    }

    /// Set PutBytes chunk size (at least one byte)
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_screenshot_timeout(mut self, timeout: Duration) -> Self {
        self.screenshot_timeout = timeout;
        self
    }

    pub fn with_datalogging_idle(mut self, idle: Duration) -> Self {
        self.datalogging_idle = idle;
        self
    }

    pub fn with_send_enable_timeout(mut self, timeout: Duration) -> Self {
        self.send_enable_timeout = timeout;
        self
    }

    pub fn with_ping_timeout(mut self, timeout: Duration) -> Self {
        self.ping_timeout = timeout;
        self
    }

    pub fn with_app_logs(mut self, print: bool) -> Self {
        self.print_app_logs = print;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.chunk_size, 2000);
        assert_eq!(config.fetch_timeout, Duration::from_secs(15));
        assert_eq!(config.drain_idle, Duration::from_millis(500));
        assert!(config.print_app_logs);
    }

    #[test]
    fn test_builder() {
        let config = BridgeConfig::default()
            .with_chunk_size(0)
            .with_ping_timeout(Duration::from_secs(1))
            .with_app_logs(false);

        assert_eq!(config.chunk_size, 1);
        assert_eq!(config.ping_timeout, Duration::from_secs(1));
        assert!(!config.print_app_logs);
    }
}
