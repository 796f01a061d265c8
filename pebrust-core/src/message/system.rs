//! Version exchange and keep-alive messages

use bytes::{BufMut, BytesMut};

use pebrust_types::FirmwareInfo;

use super::reader::Reader;
use crate::constants::phone_version;
use crate::error::Result;

/// `PhoneAppVersion` response describing the phone side
///
/// The watch asks for this as soon as a link comes up. The default value is
/// the fixed capability set this bridge advertises.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppVersionResponse {
    pub protocol_version: u32,
    pub session_caps: u32,
    pub platform_flags: u32,
    pub response_version: u8,
    pub major: u8,
    pub minor: u8,
    pub bugfix: u8,
    pub protocol_caps: u64,
}

impl Default for AppVersionResponse {
    fn default() -> Self {
        Self {
            protocol_version: phone_version::PROTOCOL_VERSION,
            session_caps: phone_version::SESSION_CAPS,
            platform_flags: phone_version::PLATFORM_FLAGS,
            response_version: phone_version::RESPONSE_VERSION,
            major: phone_version::MAJOR,
            minor: phone_version::MINOR,
            bugfix: phone_version::BUGFIX,
            protocol_caps: phone_version::PROTOCOL_CAPS,
        }
    }
}

impl AppVersionResponse {
    pub(crate) const COMMAND: u8 = 0x01;

    pub(crate) fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(Self::COMMAND);
        buf.put_u32(self.protocol_version);
        buf.put_u32(self.session_caps);
        buf.put_u32(self.platform_flags);
        buf.put_u8(self.response_version);
        buf.put_u8(self.major);
        buf.put_u8(self.minor);
        buf.put_u8(self.bugfix);
        buf.put_u64(self.protocol_caps);
    }
}

/// Width of the version tag field
const VERSION_TAG_SIZE: usize = 32;

/// Width of the git hash field
const GIT_HASH_SIZE: usize = 8;

/// Running firmware block: timestamp, tag, hash, recovery, platform, metadata version
const FIRMWARE_BLOCK_SIZE: usize = 4 + VERSION_TAG_SIZE + GIT_HASH_SIZE + 3;

/// Decode a `WatchVersion` response body (after the command byte)
///
/// ```text
/// running firmware[47] recovery firmware[47] bootloader_ts:u32
/// board[9] serial[12] ...
/// ```
pub(crate) fn decode_watch_version(r: &mut Reader<'_>) -> Result<FirmwareInfo> {
    let timestamp = r.u32_be("firmware timestamp")?;
    let version_tag = r.fixed_string(VERSION_TAG_SIZE, "version tag")?;
    let git_hash = r.fixed_string(GIT_HASH_SIZE, "git hash")?;
    let is_recovery = r.u8("recovery flag")? != 0;
    let hardware_platform = r.u8("hardware platform")?;
    r.skip(1, "metadata version")?;

    let mut info = FirmwareInfo::new(version_tag, git_hash);
    info.timestamp = timestamp;
    info.is_recovery = is_recovery;
    info.hardware_platform = hardware_platform;

    // Older firmware stops after the running block
    if r.remaining() >= FIRMWARE_BLOCK_SIZE + 4 + 9 + 12 {
        r.skip(FIRMWARE_BLOCK_SIZE + 4, "recovery firmware")?;
        info.board = Some(r.fixed_string(9, "board")?);
        info.serial = Some(r.fixed_string(12, "serial")?);
    }

    Ok(info)
}

#[cfg(test)]
pub(crate) fn encode_watch_version(info: &FirmwareInfo, extended: bool) -> Vec<u8> {
    fn fixed(buf: &mut BytesMut, value: &str, width: usize) {
        let mut raw = vec![0u8; width];
        raw[..value.len()].copy_from_slice(value.as_bytes());
        buf.put_slice(&raw);
    }

    let mut buf = BytesMut::new();
    buf.put_u8(0x01);
    buf.put_u32(info.timestamp);
    fixed(&mut buf, &info.version_tag, VERSION_TAG_SIZE);
    fixed(&mut buf, &info.git_hash, GIT_HASH_SIZE);
    buf.put_u8(info.is_recovery as u8);
    buf.put_u8(info.hardware_platform);
    buf.put_u8(1);

    if extended {
        buf.put_slice(&[0u8; FIRMWARE_BLOCK_SIZE + 4]);
        fixed(&mut buf, info.board.as_deref().unwrap_or(""), 9);
        fixed(&mut buf, info.serial.as_deref().unwrap_or(""), 12);
        buf.put_slice(&[0u8; 6 + 4 + 4 + 6 + 2 + 8]);
    }

    buf.to_vec()
}
