//! PutBytes transfer commands

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use super::reader::Reader;
use crate::constants::PUTBYTES_APP_INSTALL_FLAG;
use crate::error::Result;

/// Kind of object carried by a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ObjectType {
    Firmware = 1,
    Recovery = 2,
    SystemResources = 3,
    AppResources = 4,
    AppExecutable = 5,
    File = 6,
    Worker = 7,
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Firmware => "firmware",
            Self::Recovery => "recovery",
            Self::SystemResources => "system resources",
            Self::AppResources => "app resources",
            Self::AppExecutable => "app executable",
            Self::File => "file",
            Self::Worker => "worker",
        };
        f.write_str(name)
    }
}

/// Outbound PutBytes command
///
/// Integers are big-endian.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PutBytesCommand {
    /// `0x01 size:u32 type|0x80:u8 app_id:u32`
    Init {
        size: u32,
        object_type: ObjectType,
        app_id: u32,
    },

    /// `0x02 cookie:u32 length:u32 data`
    Put { cookie: u32, data: Bytes },

    /// `0x03 cookie:u32 crc:u32`
    Commit { cookie: u32, crc: u32 },

    /// `0x05 cookie:u32`
    Install { cookie: u32 },
}

impl PutBytesCommand {
    pub(crate) fn encode(&self, buf: &mut BytesMut) {
        match self {
            Self::Init {
                size,
                object_type,
                app_id,
            } => {
                buf.put_u8(0x01);
                buf.put_u32(*size);
                buf.put_u8(*object_type as u8 | PUTBYTES_APP_INSTALL_FLAG);
                buf.put_u32(*app_id);
            }
            Self::Put { cookie, data } => {
                buf.put_u8(0x02);
                buf.put_u32(*cookie);
                buf.put_u32(data.len() as u32);
                buf.put_slice(data);
            }
            Self::Commit { cookie, crc } => {
                buf.put_u8(0x03);
                buf.put_u32(*cookie);
                buf.put_u32(*crc);
            }
            Self::Install { cookie } => {
                buf.put_u8(0x05);
                buf.put_u32(*cookie);
            }
        }
    }
}

/// Result byte of a PutBytes response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutBytesResult {
    Ack,
    Nack,
}

/// `result:u8 cookie:u32`
pub(crate) fn decode_response(r: &mut Reader<'_>) -> Result<(PutBytesResult, u32)> {
    let result = match r.u8("result")? {
        1 => PutBytesResult::Ack,
        2 => PutBytesResult::Nack,
        other => return Err(r.malformed(format!("unknown result 0x{:02X}", other))),
    };
    let cookie = r.u32_be("cookie")?;
    Ok((result, cookie))
}
