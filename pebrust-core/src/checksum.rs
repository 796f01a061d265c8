//! STM32 hardware CRC-32
//!
//! PutBytes commits are verified by the watch with the STM32 CRC unit, which
//! is *not* the IEEE 802.3 CRC-32 used by zip and Ethernet:
//! 1. Register starts at `0xFFFFFFFF`
//! 2. Input is consumed as 32-bit little-endian words
//! 3. A trailing partial word is zero-padded in its high-order bytes
//! 4. Each word is XOR-ed into the register, then shifted out MSB first
//!    through polynomial `0x04C11DB7` (32 rounds)
//! 5. No reflection, no final XOR

use tracing::trace;

/// CRC polynomial
pub const POLYNOMIAL: u32 = 0x04C1_1DB7;

/// Register value before any input
pub const INITIAL: u32 = 0xFFFF_FFFF;

/// Calculate the STM32 CRC of a complete buffer
///
/// # Examples
///
/// ```
/// use pebrust_core::checksum;
///
/// let crc = checksum::calculate(&[0x01, 0x02, 0x03, 0x04]);
/// assert_eq!(crc, 0x1DAB_E74F);
/// ```
pub fn calculate(data: &[u8]) -> u32 {
    let mut crc = Stm32Crc::new();
    crc.update(data);
    let checksum = crc.finalize();

    trace!(
        len = data.len(),
        checksum = format!("0x{:08X}", checksum),
        "Calculated checksum"
    );

    checksum
}

/// Verify checksum
pub fn verify(data: &[u8], expected: u32) -> bool {
    calculate(data) == expected
}

/// Incremental STM32 CRC
///
/// Produces the same value as [`calculate`] no matter how the input is
/// split across [`update`](Self::update) calls.
#[derive(Debug, Clone)]
pub struct Stm32Crc {
    register: u32,
    pending: [u8; 4],
    pending_len: usize,
}

impl Stm32Crc {
    pub fn new() -> Self {
        Self {
            register: INITIAL,
            pending: [0; 4],
            pending_len: 0,
        }
    }

    /// Feed more input
    pub fn update(&mut self, mut data: &[u8]) {
        if self.pending_len > 0 {
            let take = (4 - self.pending_len).min(data.len());
            self.pending[self.pending_len..self.pending_len + take].copy_from_slice(&data[..take]);
            self.pending_len += take;
            data = &data[take..];

            if self.pending_len < 4 {
                return;
            }

            self.register = process_word(self.register, u32::from_le_bytes(self.pending));
            self.pending_len = 0;
        }

        let mut words = data.chunks_exact(4);
        for word in &mut words {
            let word = u32::from_le_bytes([word[0], word[1], word[2], word[3]]);
            self.register = process_word(self.register, word);
        }

        let rest = words.remainder();
        self.pending[..rest.len()].copy_from_slice(rest);
        self.pending_len = rest.len();
    }

    /// Finish and return the checksum
    pub fn finalize(self) -> u32 {
        if self.pending_len == 0 {
            return self.register;
        }

        let mut word = [0u8; 4];
        word[..self.pending_len].copy_from_slice(&self.pending[..self.pending_len]);
        process_word(self.register, u32::from_le_bytes(word))
    }
}

impl Default for Stm32Crc {
    fn default() -> Self {
        Self::new()
    }
}

fn process_word(mut crc: u32, word: u32) -> u32 {
    crc ^= word;
    for _ in 0..32 {
        if crc & 0x8000_0000 != 0 {
            crc = (crc << 1) ^ POLYNOMIAL;
        } else {
            crc <<= 1;
        }
    }
    crc
}
