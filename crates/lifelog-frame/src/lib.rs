//! Compact control-frame codec for lifelog transfers.
//!
//! The control channel ("Data Request SP") carries 5-byte frames:
//! - 1 byte command
//! - 1 byte category
//! - 3 byte little-endian length
//!
//! The bulk channel ("Convoy") carries raw payload chunks; this crate also
//! knows where the fields of interest sit inside a completed payload.

pub mod channel;
pub mod codec;
pub mod error;
pub mod payload;
pub mod text;

pub use channel::{Channel, CATEGORY_LIFELOG, CMD_END, CMD_START};
pub use codec::{decode_control, encode_control, ControlFrame, FRAME_SIZE, MAX_LENGTH};
pub use error::{FrameError, Result};
pub use payload::{read_u32_le_at, LIFELOG_PAYLOAD_LEN, STEPS_OFFSET, STEPS_WIDTH};
pub use text::{from_hex_text, to_compact_string, to_hex_string};
