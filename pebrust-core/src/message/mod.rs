//! Typed Pebble protocol messages
//!
//! [`Outbound`] covers everything the bridge sends, [`Inbound`] everything it
//! understands from the watch. Packets for endpoints or commands that are not
//! modelled decode to [`Inbound::Unknown`] so a caller can still route them.

mod apps;
mod blobdb;
mod datalogging;
mod putbytes;
mod reader;
mod system;

use bytes::{Bytes, BytesMut};
use uuid::Uuid;

use pebrust_types::{DataLoggingSession, FirmwareInfo};

pub use apps::{AppFetchStatus, AppLogLine};
pub use blobdb::{BlobCommand, BlobDatabase, BlobStatus};
pub use datalogging::DataLoggingCommand;
pub use putbytes::{ObjectType, PutBytesCommand, PutBytesResult};
pub use system::AppVersionResponse;

use crate::endpoint::Endpoint;
use crate::error::Result;
use crate::packet::Packet;
use reader::Reader;

/// Message sent to the watch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    AppVersionResponse(AppVersionResponse),
    WatchVersionRequest,
    Ping { cookie: u32, idle: bool },
    Pong { cookie: u32 },
    AppRunStateStart(Uuid),
    AppLogShipping { enable: bool },
    AppFetchResponse(AppFetchStatus),
    PutBytes(PutBytesCommand),
    BlobInsert(BlobCommand),
    ScreenshotRequest,
    DataLogging(DataLoggingCommand),
}

impl Outbound {
    /// Endpoint this message is sent on
    pub fn endpoint(&self) -> Endpoint {
        match self {
            Self::AppVersionResponse(_) => Endpoint::PhoneAppVersion,
            Self::WatchVersionRequest => Endpoint::WatchVersion,
            Self::Ping { .. } | Self::Pong { .. } => Endpoint::PingPong,
            Self::AppRunStateStart(_) => Endpoint::AppRunState,
            Self::AppLogShipping { .. } => Endpoint::AppLogs,
            Self::AppFetchResponse(_) => Endpoint::AppFetch,
            Self::PutBytes(_) => Endpoint::PutBytes,
            Self::BlobInsert(_) => Endpoint::BlobDb,
            Self::ScreenshotRequest => Endpoint::Screenshot,
            Self::DataLogging(_) => Endpoint::DataLogging,
        }
    }

    /// Serialize into a packet
    ///
    /// # Examples
    ///
    /// ```
    /// use pebrust_core::{Endpoint, Outbound};
    ///
    /// let packet = Outbound::Pong { cookie: 7 }.to_packet();
    /// assert_eq!(packet.kind(), Some(Endpoint::PingPong));
    /// assert_eq!(&packet.payload[..], &[0x01, 0, 0, 0, 7]);
    /// ```
    pub fn to_packet(&self) -> Packet {
        use bytes::BufMut;

        let mut buf = BytesMut::with_capacity(16);
        match self {
            Self::AppVersionResponse(response) => response.encode(&mut buf),
            Self::WatchVersionRequest => buf.put_u8(0x00),
            Self::Ping { cookie, idle } => {
                buf.put_u8(0x00);
                buf.put_u32(*cookie);
                buf.put_u8(*idle as u8);
            }
            Self::Pong { cookie } => {
                buf.put_u8(0x01);
                buf.put_u32(*cookie);
            }
            Self::AppRunStateStart(uuid) => {
                buf.put_u8(apps::APP_RUN_STATE_START);
                buf.put_slice(uuid.as_bytes());
            }
            Self::AppLogShipping { enable } => buf.put_u8(*enable as u8),
            Self::AppFetchResponse(status) => {
                buf.put_u8(apps::APP_FETCH_COMMAND);
                buf.put_u8(*status as u8);
            }
            Self::PutBytes(command) => command.encode(&mut buf),
            Self::BlobInsert(command) => command.encode(&mut buf),
            Self::ScreenshotRequest => buf.put_u8(0x00),
            Self::DataLogging(command) => command.encode(&mut buf),
        }

        Packet::new(self.endpoint(), buf.freeze())
    }
}

/// Message received from the watch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// The watch asks for our version
    AppVersionRequest,
    WatchVersion(FirmwareInfo),
    Ping { cookie: u32, idle: bool },
    Pong { cookie: u32 },
    AppLog(AppLogLine),
    AppFetchRequest { uuid: Uuid, app_id: u32 },
    PutBytesResponse { result: PutBytesResult, cookie: u32 },
    BlobResponse { token: u16, status: BlobStatus },
    /// Raw screenshot payload; only the first packet carries a header
    Screenshot(Bytes),
    DataLoggingOpenSession(DataLoggingSession),
    DataLoggingSendEnable(bool),
    /// Anything not modelled above
    Unknown(Packet),
}

impl Inbound {
    /// Deserialize a packet
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`](crate::Error::Malformed) when the payload
    /// of a known message is truncated or carries an invalid field.
    pub fn decode(packet: &Packet) -> Result<Self> {
        let Some(endpoint) = packet.kind() else {
            return Ok(Self::Unknown(packet.clone()));
        };
        let mut r = Reader::new(endpoint, &packet.payload);

        let message = match endpoint {
            Endpoint::PhoneAppVersion => match r.u8("command")? {
                0x00 => Self::AppVersionRequest,
                _ => Self::Unknown(packet.clone()),
            },
            Endpoint::WatchVersion => match r.u8("command")? {
                0x01 => Self::WatchVersion(system::decode_watch_version(&mut r)?),
                _ => Self::Unknown(packet.clone()),
            },
            Endpoint::PingPong => {
                let command = r.u8("command")?;
                let cookie = r.u32_be("cookie")?;
                match command {
                    0x00 => {
                        let idle = r.remaining() > 0 && r.u8("idle")? != 0;
                        Self::Ping { cookie, idle }
                    }
                    0x01 => Self::Pong { cookie },
                    other => {
                        return Err(r.malformed(format!("unknown ping command 0x{:02X}", other)));
                    }
                }
            }
            Endpoint::AppLogs => Self::AppLog(apps::decode_app_log(&mut r)?),
            // Our own response is shorter; only requests come from the watch
            Endpoint::AppFetch if packet.payload.len() == apps::APP_FETCH_REQUEST_LEN => {
                let (uuid, app_id) = apps::decode_fetch_request(&mut r)?;
                Self::AppFetchRequest { uuid, app_id }
            }
            Endpoint::PutBytes => {
                let (result, cookie) = putbytes::decode_response(&mut r)?;
                Self::PutBytesResponse { result, cookie }
            }
            Endpoint::BlobDb => {
                let (token, status) = blobdb::decode_response(&mut r)?;
                Self::BlobResponse { token, status }
            }
            Endpoint::Screenshot => Self::Screenshot(packet.payload.clone()),
            Endpoint::DataLogging => match r.u8("command")? {
                datalogging::DESPOOL_OPEN_SESSION => {
                    Self::DataLoggingOpenSession(datalogging::decode_open_session(&mut r)?)
                }
                datalogging::GET_SEND_ENABLE_RESPONSE => {
                    Self::DataLoggingSendEnable(r.u8("enabled")? != 0)
                }
                _ => Self::Unknown(packet.clone()),
            },
            _ => Self::Unknown(packet.clone()),
        };

        Ok(message)
    }

    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            Self::AppVersionRequest => "AppVersionRequest",
            Self::WatchVersion(_) => "WatchVersion",
            Self::Ping { .. } => "Ping",
            Self::Pong { .. } => "Pong",
            Self::AppLog(_) => "AppLog",
            Self::AppFetchRequest { .. } => "AppFetchRequest",
            Self::PutBytesResponse { .. } => "PutBytesResponse",
            Self::BlobResponse { .. } => "BlobResponse",
            Self::Screenshot(_) => "Screenshot",
            Self::DataLoggingOpenSession(_) => "DataLoggingOpenSession",
            Self::DataLoggingSendEnable(_) => "DataLoggingSendEnable",
            Self::Unknown(_) => "Unknown",
        }
    }
}
