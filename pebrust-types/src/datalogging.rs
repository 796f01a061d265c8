//! Data logging sessions

use std::fmt;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Type of the items stored in a data logging session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DataItemType {
    ByteArray = 0,
    UnsignedInt = 2,
    SignedInt = 3,
}

impl TryFrom<u8> for DataItemType {
    type Error = Error;
    
    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::ByteArray),
            2 => Ok(Self::UnsignedInt),
            3 => Ok(Self::SignedInt),
            _ => Err(Error::Parse(format!("unknown data item type: {}", value))),
        }
    }
}

impl fmt::Display for DataItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ByteArray => "bytes",
            Self::UnsignedInt => "uint",
            Self::SignedInt => "int",
        };
        f.write_str(name)
    }
}

/// An open data logging session announced by the watch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLoggingSession {
    /// Session id (small, watch assigned)
    pub id: u8,
    
    /// UUID of the app that owns the session
    pub app_uuid: Uuid,
    
    /// Session creation time
    pub timestamp: DateTime<Utc>,
    
    /// App-defined tag
    pub tag: u32,
    
    /// Item type
    pub item_type: DataItemType,
    
    /// Size of one item in bytes
    pub item_size: u16,
}

impl fmt::Display for DataLoggingSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "session {} app={} tag={} type={} size={} created={}",
            self.id,
            self.app_uuid,
            self.tag,
            self.item_type,
            self.item_size,
            self.timestamp.format("%Y-%m-%d %H:%M:%S")
        )
    }
}
