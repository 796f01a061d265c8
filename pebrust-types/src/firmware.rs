//! Firmware information reported by the watch

use std::fmt;

/// Firmware information
///
/// Decoded from the `WatchVersion` response. Only the running firmware
/// block is mandatory; board and serial are filled in when the response
/// carries the extended fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwareInfo {
    /// Firmware version tag (e.g. `v4.4.0`)
    pub version_tag: String,
    
    /// Short git hash of the firmware build
    pub git_hash: String,
    
    /// Build timestamp (seconds since the epoch)
    pub timestamp: u32,
    
    /// Whether the running firmware is the recovery image
    pub is_recovery: bool,
    
    /// Hardware platform code
    pub hardware_platform: u8,
    
    /// Board name
    pub board: Option<String>,
    
    /// Serial number
    pub serial: Option<String>,
}

impl FirmwareInfo {
    pub fn new(version_tag: String, git_hash: String) -> Self {
        Self {
            version_tag,
            git_hash,
            timestamp: 0,
            is_recovery: false,
            hardware_platform: 0,
            board: None,
            serial: None,
        }
    }
}

impl fmt::Display for FirmwareInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Firmware[{} ({})", self.version_tag, self.git_hash)?;
        if let Some(board) = &self.board {
            write!(f, ", board: {}", board)?;
        }
        if self.is_recovery {
            write!(f, ", recovery")?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_minimal() {
        let info = FirmwareInfo::new("v4.4.0".into(), "abc1234".into());
        assert_eq!(info.to_string(), "Firmware[v4.4.0 (abc1234)]");
    }

    #[test]
    fn test_display_with_board() {
        let mut info = FirmwareInfo::new("v4.4.0".into(), "abc1234".into());
        info.board = Some("snowy_bb2".into());
        info.is_recovery = true;
        assert_eq!(info.to_string(), "Firmware[v4.4.0 (abc1234), board: snowy_bb2, recovery]");
    }
}
