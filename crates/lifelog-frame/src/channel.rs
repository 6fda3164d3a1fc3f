//! Notification channels, commands and categories.
//!
//! Only the lifelog category is acted on; every other category seen on the
//! control channel belongs to some other exchange and is ignored.

use std::fmt;

/// Control command: start of transfer. From the device it carries the total
/// payload length.
pub const CMD_START: u8 = 0x00;

/// Control command: end of transfer.
pub const CMD_END: u8 = 0x04;

/// Category of the lifelog exchange.
pub const CATEGORY_LIFELOG: u8 = 0x11;

/// The two notification channels a transfer arrives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Control channel: start/end announcements and total length.
    DataRequestSp,
    /// Bulk channel: raw payload chunks.
    Convoy,
}

impl Channel {
    /// Human-readable channel name.
    pub fn name(self) -> &'static str {
        match self {
            Channel::DataRequestSp => "DATA_REQUEST_SP",
            Channel::Convoy => "CONVOY",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returns a human-readable name for a control command.
pub fn command_name(command: u8) -> &'static str {
    match command {
        CMD_START => "START",
        CMD_END => "END",
        _ => "UNKNOWN",
    }
}

/// Returns a human-readable name for a category.
pub fn category_name(category: u8) -> &'static str {
    match category {
        CATEGORY_LIFELOG => "LIFELOG",
        _ => "OTHER",
    }
}
