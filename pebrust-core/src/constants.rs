//! Protocol constants

/// QEMU frame header signature
pub const QEMU_HEADER_SIGNATURE: u16 = 0xFEED;

/// QEMU frame footer signature
pub const QEMU_FOOTER_SIGNATURE: u16 = 0xBEEF;

/// Default connection timeout (seconds)
pub const DEFAULT_TIMEOUT: u64 = 5;

/// Maximum payload carried by one PutBytes `Put` message
pub const PUTBYTES_CHUNK_SIZE: usize = 2000;

/// Flag OR-ed into the PutBytes object type when an app id follows
pub const PUTBYTES_APP_INSTALL_FLAG: u8 = 1 << 7;

/// QEMU channel ids
pub mod channels {
    /// Serial port profile: carries the Pebble protocol byte stream
    pub const SPP: u16 = 1;
    
    /// Accelerometer tap
    pub const TAP: u16 = 2;
    
    /// Bluetooth connection state
    pub const BLUETOOTH_CONNECTION: u16 = 3;
    
    /// Compass heading
    pub const COMPASS: u16 = 4;
    
    /// Battery state
    pub const BATTERY: u16 = 5;
    
    /// Accelerometer samples
    pub const ACCEL: u16 = 6;
    
    /// Vibration motor notifications
    pub const VIBRATION: u16 = 7;
    
    /// Button presses
    pub const BUTTON: u16 = 8;
    
    /// 12h/24h time format
    pub const TIME_FORMAT: u16 = 9;
    
    /// Timeline peek
    pub const TIMELINE_PEEK: u16 = 10;
    
    /// Content size preference
    pub const CONTENT_SIZE: u16 = 11;
    
    /// Human readable channel name for logging
    pub fn name(channel: u16) -> &'static str {
        match channel {
            SPP => "spp",
            TAP => "tap",
            BLUETOOTH_CONNECTION => "bluetooth_connection",
            COMPASS => "compass",
            BATTERY => "battery",
            ACCEL => "accel",
            VIBRATION => "vibration",
            BUTTON => "button",
            TIME_FORMAT => "time_format",
            TIMELINE_PEEK => "timeline_peek",
            CONTENT_SIZE => "content_size",
            _ => "unknown",
        }
    }
}

/// Hard-coded phone capabilities sent in the version exchange
pub mod phone_version {
    pub const PROTOCOL_VERSION: u32 = 0xFFFF_FFFF;
    pub const SESSION_CAPS: u32 = 0x8000_0000;
    pub const PLATFORM_FLAGS: u32 = 50;
    pub const RESPONSE_VERSION: u8 = 2;
    pub const MAJOR: u8 = 4;
    pub const MINOR: u8 = 0;
    pub const BUGFIX: u8 = 0;
    pub const PROTOCOL_CAPS: u64 = u64::MAX;
}

/// App log levels
pub mod log_levels {
    pub const ERROR: u8 = 1;
    pub const WARNING: u8 = 50;
    pub const INFO: u8 = 100;
    pub const DEBUG: u8 = 200;
    pub const VERBOSE: u8 = 255;
}
