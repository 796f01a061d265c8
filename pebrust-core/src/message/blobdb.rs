//! BlobDB key/value store commands

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use super::reader::Reader;
use crate::error::Result;

/// Database ids on the watch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BlobDatabase {
    Pin = 1,
    App = 2,
    Reminder = 3,
    Notification = 4,
}

/// Outbound BlobDB insert
///
/// ```text
/// 0x01 token:u16 db:u8 key_len:u8 key value_len:u16 value
/// ```
///
/// Little-endian.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobCommand {
    pub token: u16,
    pub database: BlobDatabase,
    pub key: Bytes,
    pub value: Bytes,
}

impl BlobCommand {
    const INSERT: u8 = 0x01;

    pub fn insert(
        token: u16,
        database: BlobDatabase,
        key: impl Into<Bytes>,
        value: impl Into<Bytes>,
    ) -> Self {
        Self {
            token,
            database,
            key: key.into(),
            value: value.into(),
        }
    }

    pub(crate) fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(Self::INSERT);
        buf.put_u16_le(self.token);
        buf.put_u8(self.database as u8);
        buf.put_u8(self.key.len() as u8);
        buf.put_slice(&self.key);
        buf.put_u16_le(self.value.len() as u16);
        buf.put_slice(&self.value);
    }
}

/// Status of a BlobDB response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobStatus {
    Success,
    GeneralFailure,
    InvalidOperation,
    InvalidDatabaseId,
    InvalidData,
    KeyDoesNotExist,
    DatabaseFull,
    DataStale,
    Unknown(u8),
}

impl From<u8> for BlobStatus {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::Success,
            2 => Self::GeneralFailure,
            3 => Self::InvalidOperation,
            4 => Self::InvalidDatabaseId,
            5 => Self::InvalidData,
            6 => Self::KeyDoesNotExist,
            7 => Self::DatabaseFull,
            8 => Self::DataStale,
            other => Self::Unknown(other),
        }
    }
}

impl BlobStatus {
    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

impl fmt::Display for BlobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("success"),
            Self::GeneralFailure => f.write_str("general failure"),
            Self::InvalidOperation => f.write_str("invalid operation"),
            Self::InvalidDatabaseId => f.write_str("invalid database id"),
            Self::InvalidData => f.write_str("invalid data"),
            Self::KeyDoesNotExist => f.write_str("key does not exist"),
            Self::DatabaseFull => f.write_str("database full"),
            Self::DataStale => f.write_str("data stale"),
            Self::Unknown(code) => write!(f, "unknown status {}", code),
        }
    }
}

/// `token:u16 status:u8`
pub(crate) fn decode_response(r: &mut Reader<'_>) -> Result<(u16, BlobStatus)> {
    let token = r.u16_le("token")?;
    let status = BlobStatus::from(r.u8("status")?);
    Ok((token, status))
}
