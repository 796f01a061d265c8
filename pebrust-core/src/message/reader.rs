//! Bounds-checked payload reader

use bytes::Buf;

use crate::endpoint::Endpoint;
use crate::error::{Error, Result};

/// Cursor over an inbound payload
///
/// Every read checks the remaining length first and reports a
/// [`Error::Malformed`] naming the endpoint instead of panicking.
pub(crate) struct Reader<'a> {
    endpoint: Endpoint,
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    pub(crate) fn new(endpoint: Endpoint, buf: &'a [u8]) -> Self {
        Self { endpoint, buf }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    pub(crate) fn malformed(&self, reason: impl Into<String>) -> Error {
        Error::Malformed {
            endpoint: self.endpoint,
            reason: reason.into(),
        }
    }

    fn need(&self, n: usize, what: &str) -> Result<()> {
        if self.buf.remaining() < n {
            return Err(self.malformed(format!(
                "{} needs {} bytes, {} left",
                what,
                n,
                self.buf.remaining()
            )));
        }
        Ok(())
    }

    pub(crate) fn u8(&mut self, what: &str) -> Result<u8> {
        self.need(1, what)?;
        Ok(self.buf.get_u8())
    }

    pub(crate) fn u16_le(&mut self, what: &str) -> Result<u16> {
        self.need(2, what)?;
        Ok(self.buf.get_u16_le())
    }

    pub(crate) fn u32_be(&mut self, what: &str) -> Result<u32> {
        self.need(4, what)?;
        Ok(self.buf.get_u32())
    }

    pub(crate) fn u32_le(&mut self, what: &str) -> Result<u32> {
        self.need(4, what)?;
        Ok(self.buf.get_u32_le())
    }

    pub(crate) fn i32_le(&mut self, what: &str) -> Result<i32> {
        self.need(4, what)?;
        Ok(self.buf.get_i32_le())
    }

    pub(crate) fn bytes(&mut self, n: usize, what: &str) -> Result<&'a [u8]> {
        self.need(n, what)?;
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        Ok(head)
    }

    pub(crate) fn array<const N: usize>(&mut self, what: &str) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.bytes(N, what)?);
        Ok(out)
    }

    /// NUL-padded string of fixed width
    pub(crate) fn fixed_string(&mut self, width: usize, what: &str) -> Result<String> {
        let raw = self.bytes(width, what)?;
        let end = raw.iter().position(|&b| b == 0).unwrap_or(width);
        Ok(String::from_utf8_lossy(&raw[..end]).into_owned())
    }

    pub(crate) fn skip(&mut self, n: usize, what: &str) -> Result<()> {
        self.bytes(n, what).map(|_| ())
    }
}
