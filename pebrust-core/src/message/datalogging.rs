//! Data logging control messages

use bytes::{BufMut, BytesMut};
use chrono::DateTime;
use uuid::Uuid;

use pebrust_types::{DataItemType, DataLoggingSession};

use super::reader::Reader;
use crate::error::Result;

pub(crate) const DESPOOL_OPEN_SESSION: u8 = 0x01;
pub(crate) const GET_SEND_ENABLE_RESPONSE: u8 = 0x0A;

/// Outbound data logging command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataLoggingCommand {
    /// `0x84 session_id...`; an empty list asks the watch to re-announce
    /// every open session
    ReportOpenSessions(Vec<u8>),

    /// `0x89`
    GetSendEnable,

    /// `0x8B enabled:u8`
    SetSendEnable(bool),
}

impl DataLoggingCommand {
    pub(crate) fn encode(&self, buf: &mut BytesMut) {
        match self {
            Self::ReportOpenSessions(ids) => {
                buf.put_u8(0x84);
                buf.put_slice(ids);
            }
            Self::GetSendEnable => buf.put_u8(0x89),
            Self::SetSendEnable(enabled) => {
                buf.put_u8(0x8B);
                buf.put_u8(*enabled as u8);
            }
        }
    }
}

/// ```text
/// session_id:u8 uuid[16] timestamp:u32 tag:u32 item_type:u8 item_size:u16
/// ```
///
/// Little-endian, after the command byte.
pub(crate) fn decode_open_session(r: &mut Reader<'_>) -> Result<DataLoggingSession> {
    let id = r.u8("session id")?;
    let app_uuid = Uuid::from_bytes(r.array::<16>("uuid")?);
    let timestamp = r.u32_le("timestamp")?;
    let tag = r.u32_le("tag")?;
    let item_type = DataItemType::try_from(r.u8("item type")?)?;
    let item_size = r.u16_le("item size")?;

    Ok(DataLoggingSession {
        id,
        app_uuid,
        timestamp: DateTime::from_timestamp(timestamp as i64, 0).unwrap_or_default(),
        tag,
        item_type,
        item_size,
    })
}
