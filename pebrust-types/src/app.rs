//! Application metadata parsed from the executable header
//!
//! Every `pebble-app.bin` starts with a fixed little-endian header:
//!
//! ```text
//! offset  size  field
//!      0     8  sentinel "PBLAPP\0\0"
//!      8     2  struct version (major, minor)
//!     10     2  SDK version (major, minor)
//!     12     2  app version (major, minor)
//!     14     2  app size
//!     16     4  entry point offset
//!     20     4  CRC
//!     24    32  app name (NUL padded)
//!     56    32  company name (NUL padded)
//!     88     4  icon resource id
//!     92     4  symbol table address
//!     96     4  flags
//!    100     4  relocation entry count
//!    104    16  UUID (big-endian byte order)
//!    120     4  resource CRC
//!    124     4  resource timestamp
//!    128     2  virtual size
//! ```

use std::fmt;
use std::io::{Cursor, Read};

use bitflags::bitflags;
use byteorder::{LittleEndian, ReadBytesExt};
use uuid::Uuid;

use crate::error::{Error, Result};

bitflags! {
    /// Process flags from the app header
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AppFlags: u32 {
        const WATCHFACE = 1 << 0;
        const VISIBILITY_HIDDEN = 1 << 1;
        const VISIBILITY_SHOWN_ON_COMMUNICATION = 1 << 2;
        const ALLOW_JS = 1 << 3;
        const HAS_WORKER = 1 << 4;
        const ROCKY = 1 << 5;
    }
}

/// Two-part `major.minor` version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
}

impl Version {
    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Metadata of an installable application
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppMetadata {
    /// App UUID
    pub uuid: Uuid,

    /// App name (at most 32 bytes on the wire)
    pub name: String,

    /// Company name
    pub company: String,

    /// Process flags
    pub flags: AppFlags,

    /// Resource id of the menu icon
    pub icon_resource_id: u32,

    /// App version
    pub app_version: Version,

    /// SDK version the app was built against
    pub sdk_version: Version,

    /// Header struct version
    pub struct_version: Version,
}

impl AppMetadata {
    /// Header sentinel
    pub const SENTINEL: &'static [u8; 8] = b"PBLAPP\0\0";

    /// Minimum header length in bytes
    pub const HEADER_SIZE: usize = 130;

    /// Width of the name fields in the header
    pub const NAME_SIZE: usize = 32;

    /// Width of the name field in the BlobDB app record
    pub const RECORD_NAME_SIZE: usize = 96;

    /// Size of the BlobDB app record
    pub const RECORD_SIZE: usize = 16 + 4 + 4 + 4 + 2 + Self::RECORD_NAME_SIZE;

    const STRUCT_VERSION_OFFSET: u64 = 8;
    const NAME_OFFSET: u64 = 24;
    const ICON_OFFSET: u64 = 88;
    const FLAGS_OFFSET: u64 = 96;
    const UUID_OFFSET: u64 = 104;

    /// Parse the header at the start of an app executable
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if the buffer is shorter than the header or
    /// does not start with the `PBLAPP` sentinel.
    ///
    /// # Examples
    ///
    /// ```
    /// use pebrust_types::AppMetadata;
    ///
    /// let result = AppMetadata::parse(&[0u8; 16]);
    /// assert!(result.is_err());
    /// ```
    pub fn parse(binary: &[u8]) -> Result<Self> {
        if binary.len() < Self::HEADER_SIZE {
            return Err(Error::Parse(format!(
                "app header too short: expected at least {} bytes, got {}",
                Self::HEADER_SIZE,
                binary.len()
            )));
        }

        if &binary[..8] != Self::SENTINEL {
            return Err(Error::Parse(format!(
                "bad app header sentinel: {:02X?}",
                &binary[..8]
            )));
        }

        let mut cur = Cursor::new(binary);

        cur.set_position(Self::STRUCT_VERSION_OFFSET);
        let struct_version = read_version(&mut cur)?;
        let sdk_version = read_version(&mut cur)?;
        let app_version = read_version(&mut cur)?;

        cur.set_position(Self::NAME_OFFSET);
        let name = read_fixed_string(&mut cur, Self::NAME_SIZE)?;
        let company = read_fixed_string(&mut cur, Self::NAME_SIZE)?;

        cur.set_position(Self::ICON_OFFSET);
        let icon_resource_id = cur.read_u32::<LittleEndian>().map_err(parse_err)?;

        cur.set_position(Self::FLAGS_OFFSET);
        let flags = AppFlags::from_bits_retain(cur.read_u32::<LittleEndian>().map_err(parse_err)?);

        cur.set_position(Self::UUID_OFFSET);
        let mut uuid = [0u8; 16];
        cur.read_exact(&mut uuid).map_err(parse_err)?;

        Ok(Self {
            uuid: Uuid::from_bytes(uuid),
            name,
            company,
            flags,
            icon_resource_id,
            app_version,
            sdk_version,
            struct_version,
        })
    }

    /// Check if this app is a watchface
    pub fn is_watchface(&self) -> bool {
        self.flags.contains(AppFlags::WATCHFACE)
    }

    /// Encode the BlobDB record for the app database
    ///
    /// ```text
    /// uuid[16] flags:u32 icon:u32 app_version[2] sdk_version[2]
    /// bg_color:u8 template_id:u8 name[96]
    /// ```
    ///
    /// Integers are little-endian; the name is NUL padded and truncated to fit.
    pub fn to_blob_record(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::RECORD_SIZE);

        buf.extend_from_slice(self.uuid.as_bytes());
        buf.extend_from_slice(&self.flags.bits().to_le_bytes());
        buf.extend_from_slice(&self.icon_resource_id.to_le_bytes());
        buf.extend_from_slice(&[
            self.app_version.major,
            self.app_version.minor,
            self.sdk_version.major,
            self.sdk_version.minor,
            0, // app face background colour
            0, // app face template id
        ]);

        let mut name = [0u8; Self::RECORD_NAME_SIZE];
        let bytes = self.name.as_bytes();
        let len = bytes.len().min(Self::RECORD_NAME_SIZE - 1);
        name[..len].copy_from_slice(&bytes[..len]);
        buf.extend_from_slice(&name);

        buf
    }
}

impl fmt::Display for AppMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} v{} ({})", self.name, self.app_version, self.uuid)
    }
}

fn read_version(cur: &mut Cursor<&[u8]>) -> Result<Version> {
    let major = cur.read_u8().map_err(parse_err)?;
    let minor = cur.read_u8().map_err(parse_err)?;
    Ok(Version::new(major, minor))
}

fn read_fixed_string(cur: &mut Cursor<&[u8]>, width: usize) -> Result<String> {
    let mut raw = vec![0u8; width];
    cur.read_exact(&mut raw).map_err(parse_err)?;
    let end = raw.iter().position(|&b| b == 0).unwrap_or(width);
    Ok(String::from_utf8_lossy(&raw[..end]).into_owned())
}

fn parse_err(e: std::io::Error) -> Error {
    Error::Parse(e.to_string())
}
