//! Screenshot capture

use std::path::Path;

use bytes::Buf;
use image::RgbImage;
use tracing::{debug, info, warn};

use pebrust_core::{Inbound, Outbound};
use pebrust_types::Screenshot;

use crate::emulator::Emulator;
use crate::error::{Error, Phase, Result};

/// Version, width and height after the status byte
const HEADER_SIZE: usize = 4 + 4 + 4;

/// Pixel bytes reserved up front; the rest grows as chunks arrive
const INITIAL_CAPACITY: usize = 64 * 1024;

fn status_reason(status: u8) -> String {
    match status {
        1 => "malformed command".to_string(),
        2 => "out of memory".to_string(),
        3 => "already in progress".to_string(),
        other => format!("unknown status {}", other),
    }
}

impl Emulator {
    /// Capture the current framebuffer
    ///
    /// The first screenshot packet carries a header, every following one is
    /// pixel data. Packets for other endpoints that arrive meanwhile go to
    /// the handler.
    pub async fn screenshot(&self) -> Result<Screenshot> {
        let limit = self.config().screenshot_timeout;
        self.send(&Outbound::ScreenshotRequest).await?;

        let mut first = self.next_screenshot_chunk(limit).await?;
        if !first.has_remaining() {
            return Err(Error::rejected(Phase::Screenshot, "empty response"));
        }

        let status = first.get_u8();
        if status != 0 {
            return Err(Error::rejected(Phase::Screenshot, status_reason(status)));
        }

        if first.remaining() < HEADER_SIZE {
            return Err(Error::rejected(
                Phase::Screenshot,
                format!("header is {} bytes", first.remaining() + 1),
            ));
        }

        let version = first.get_u32();
        let width = first.get_u32();
        let height = first.get_u32();
        let expected = Screenshot::expected_len(version, width, height)
            .map_err(|e| Error::rejected(Phase::Screenshot, e.to_string()))?;
        debug!(version, width, height, expected, "Screenshot header");

        let mut pixels = Vec::with_capacity(expected.min(INITIAL_CAPACITY));
        pixels.extend_from_slice(&first);

        while pixels.len() < expected {
            let chunk = self.next_screenshot_chunk(limit).await?;
            pixels.extend_from_slice(&chunk);
        }

        if pixels.len() > expected {
            warn!(
                extra = pixels.len() - expected,
                "Screenshot carried more data than its size, truncating"
            );
            pixels.truncate(expected);
        }

        info!(width, height, "Screenshot captured");
        Ok(Screenshot::new(version, width, height, pixels)?)
    }

    async fn next_screenshot_chunk(&self, limit: std::time::Duration) -> Result<bytes::Bytes> {
        self.wait_for(Phase::Screenshot, limit, |message| match message {
            Inbound::Screenshot(data) => Ok(data),
            other => Err(other),
        })
        .await
    }
}

/// Write a screenshot as PNG
pub fn save_png(screenshot: &Screenshot, path: impl AsRef<Path>) -> Result<()> {
    let image = RgbImage::from_raw(screenshot.width, screenshot.height, screenshot.to_rgb8())
        .ok_or_else(|| {
            Error::Types(pebrust_types::Error::Validation(
                "pixel buffer does not match the image size".into(),
            ))
        })?;
    image.save(path)?;
    Ok(())
}
