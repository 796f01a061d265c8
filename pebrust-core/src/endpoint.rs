//! Pebble protocol endpoint definitions

use std::fmt;

use crate::error::{Error, Result};

/// Protocol endpoints
///
/// The endpoint id in the packet header tells the receiver how to parse the
/// payload. Only endpoints this crate speaks are listed; everything else is
/// passed through as a raw [`Packet`](crate::Packet).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Endpoint {
    WatchVersion = 16,
    PhoneAppVersion = 17,
    AppMessage = 48,
    AppRunState = 52,
    PingPong = 2001,
    AppLogs = 2006,
    AppFetch = 6001,
    DataLogging = 6778,
    Screenshot = 8000,
    BlobDb = 45531,
    PutBytes = 48879,
}

impl Endpoint {
    /// Get endpoint name
    pub fn name(self) -> &'static str {
        match self {
            Self::WatchVersion => "WatchVersion",
            Self::PhoneAppVersion => "PhoneAppVersion",
            Self::AppMessage => "AppMessage",
            Self::AppRunState => "AppRunState",
            Self::PingPong => "PingPong",
            Self::AppLogs => "AppLogs",
            Self::AppFetch => "AppFetch",
            Self::DataLogging => "DataLogging",
            Self::Screenshot => "Screenshot",
            Self::BlobDb => "BlobDB",
            Self::PutBytes => "PutBytes",
        }
    }
}

impl From<Endpoint> for u16 {
    fn from(endpoint: Endpoint) -> u16 {
        endpoint as u16
    }
}

impl TryFrom<u16> for Endpoint {
    type Error = Error;
    
    fn try_from(value: u16) -> Result<Self> {
        match value {
            16 => Ok(Self::WatchVersion),
            17 => Ok(Self::PhoneAppVersion),
            48 => Ok(Self::AppMessage),
            52 => Ok(Self::AppRunState),
            2001 => Ok(Self::PingPong),
            2006 => Ok(Self::AppLogs),
            6001 => Ok(Self::AppFetch),
            6778 => Ok(Self::DataLogging),
            8000 => Ok(Self::Screenshot),
            45531 => Ok(Self::BlobDb),
            48879 => Ok(Self::PutBytes),
            _ => Err(Error::UnknownEndpoint(value)),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), *self as u16)
    }
}
