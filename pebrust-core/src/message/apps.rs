//! App lifecycle messages: run state, fetch and log shipping

use std::fmt;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::reader::Reader;
use crate::constants::log_levels;
use crate::error::Result;

/// Status sent back to the watch in an `AppFetch` response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AppFetchStatus {
    Start = 1,
    Busy = 2,
    InvalidUuid = 3,
    NoData = 4,
}

/// `AppFetch` command byte, shared by request and response
pub(crate) const APP_FETCH_COMMAND: u8 = 0x01;

/// `AppRunState` start command
pub(crate) const APP_RUN_STATE_START: u8 = 0x01;

/// Length of an `AppFetch` request payload: command, uuid, app id
pub(crate) const APP_FETCH_REQUEST_LEN: usize = 1 + 16 + 4;

/// One log line shipped by a running app
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppLogLine {
    pub uuid: Uuid,
    pub timestamp: DateTime<Utc>,
    pub level: u8,
    pub line: u16,
    pub filename: String,
    pub message: String,
}

impl AppLogLine {
    const FILENAME_SIZE: usize = 16;

    /// Short name of the log level
    pub fn level_name(&self) -> &'static str {
        match self.level {
            log_levels::ERROR => "E",
            log_levels::WARNING => "W",
            log_levels::INFO => "I",
            log_levels::DEBUG => "D",
            log_levels::VERBOSE => "V",
            _ => "?",
        }
    }
}

impl fmt::Display for AppLogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}:{}> {}",
            self.timestamp.format("%H:%M:%S"),
            self.filename,
            self.line,
            self.message
        )
    }
}

/// ```text
/// uuid[16] timestamp:u32 level:u8 length:u8 line:u16 filename[16] message[length]
/// ```
///
/// Little-endian.
pub(crate) fn decode_app_log(r: &mut Reader<'_>) -> Result<AppLogLine> {
    let uuid = Uuid::from_bytes(r.array::<16>("uuid")?);
    let timestamp = r.u32_le("timestamp")?;
    let level = r.u8("level")?;
    let length = r.u8("message length")? as usize;
    let line = r.u16_le("line number")?;
    let filename = r.fixed_string(AppLogLine::FILENAME_SIZE, "filename")?;
    let message = r.fixed_string(length, "message")?;

    Ok(AppLogLine {
        uuid,
        timestamp: DateTime::from_timestamp(timestamp as i64, 0).unwrap_or_default(),
        level,
        line,
        filename,
        message,
    })
}

/// ```text
/// command:u8 uuid[16] app_id:i32
/// ```
pub(crate) fn decode_fetch_request(r: &mut Reader<'_>) -> Result<(Uuid, u32)> {
    let command = r.u8("command")?;
    if command != APP_FETCH_COMMAND {
        return Err(r.malformed(format!("unexpected fetch command 0x{:02X}", command)));
    }

    let uuid = Uuid::from_bytes(r.array::<16>("uuid")?);
    // Ids are small positive numbers; the watch sends them signed
    let app_id = r.i32_le("app id")? as u32;
    Ok((uuid, app_id))
}
