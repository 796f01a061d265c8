//! Framebuffer screenshots

use crate::error::{Error, Result};

/// A captured framebuffer image
///
/// Version 1 images are 1 bit per pixel, packed row after row with no
/// padding (8 pixels per byte, least significant bit first); every later
/// version is 8 bits per pixel in the ARGB2222 format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screenshot {
    /// Image format version
    pub version: u32,
    
    /// Width in pixels
    pub width: u32,
    
    /// Height in pixels
    pub height: u32,
    
    /// Raw pixel data
    pub pixels: Vec<u8>,
}

impl Screenshot {
    /// Largest pixel buffer accepted, well above any Pebble display
    pub const MAX_PIXEL_BYTES: usize = 4 * 1024 * 1024;

    /// Create a screenshot, checking the pixel buffer length
    pub fn new(version: u32, width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        let expected = Self::expected_len(version, width, height)?;
        if pixels.len() != expected {
            return Err(Error::Validation(format!(
                "screenshot pixel data is {} bytes, expected {}",
                pixels.len(),
                expected
            )));
        }
        
        Ok(Self {
            version,
            width,
            height,
            pixels,
        })
    }
    
    /// Bits per pixel for an image format version
    pub fn bits_per_pixel_for(version: u32) -> u32 {
        if version == 1 { 1 } else { 8 }
    }
    
    /// Number of pixel bytes an image of this shape carries
    ///
    /// A trailing partial byte counts as a whole one. Shapes whose buffer
    /// would exceed [`MAX_PIXEL_BYTES`](Self::MAX_PIXEL_BYTES) are refused.
    pub fn expected_len(version: u32, width: u32, height: u32) -> Result<usize> {
        let too_large = || {
            Error::Validation(format!(
                "screenshot of {}x{} (version {}) is too large",
                width, height, version
            ))
        };

        let bits = u64::from(width)
            .checked_mul(u64::from(height))
            .and_then(|pixels| pixels.checked_mul(u64::from(Self::bits_per_pixel_for(version))))
            .ok_or_else(too_large)?;
        let bytes = usize::try_from(bits.div_ceil(8)).map_err(|_| too_large())?;

        if bytes > Self::MAX_PIXEL_BYTES {
            return Err(too_large());
        }
        Ok(bytes)
    }
    
    /// Bits per pixel of this image
    pub fn bits_per_pixel(&self) -> u32 {
        Self::bits_per_pixel_for(self.version)
    }
    
    /// Decode the pixels to packed 8-bit RGB
    pub fn to_rgb8(&self) -> Vec<u8> {
        let (width, height) = (self.width as usize, self.height as usize);
        let mut out = Vec::with_capacity(width * height * 3);
        
        if self.bits_per_pixel() == 1 {
            for bit in 0..width * height {
                let byte = self.pixels.get(bit / 8).copied().unwrap_or(0);
                let value = ((byte >> (bit % 8)) & 1) * 255;
                out.extend_from_slice(&[value, value, value]);
            }
        } else {
            for &pixel in &self.pixels {
                let r = ((pixel >> 4) & 0b11) * 85;
                let g = ((pixel >> 2) & 0b11) * 85;
                let b = (pixel & 0b11) * 85;
                out.extend_from_slice(&[r, g, b]);
            }
        }
        
        out
    }
}
