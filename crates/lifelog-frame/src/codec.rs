use bytes::{BufMut, Bytes, BytesMut};

use crate::channel::{CMD_END, CMD_START};
use crate::error::{FrameError, Result};
use crate::text::{to_compact_string, to_hex_string};

/// Control frame: command (1) + category (1) + length (3) = 5 bytes.
pub const FRAME_SIZE: usize = 5;

/// Largest value the 24-bit length field can carry.
pub const MAX_LENGTH: u32 = 0x00FF_FFFF;

/// A control-channel frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlFrame {
    /// Command byte (start, end, ...).
    pub command: u8,
    /// Category the command applies to.
    pub category: u8,
    /// Total payload length announced by a start frame; zero otherwise.
    pub length: u32,
}

impl ControlFrame {
    /// Create a frame with a zero length.
    pub fn new(command: u8, category: u8) -> Self {
        Self {
            command,
            category,
            length: 0,
        }
    }

    /// Start-of-transfer request for `category`.
    pub fn start(category: u8) -> Self {
        Self::new(CMD_START, category)
    }

    /// End-of-transfer signal for `category`.
    pub fn end(category: u8) -> Self {
        Self::new(CMD_END, category)
    }

    /// Set the announced length.
    pub fn with_length(mut self, length: u32) -> Self {
        self.length = length;
        self
    }

    /// Strict parse that reports why a buffer is not a frame.
    pub fn parse(src: &[u8]) -> Result<Self> {
        decode_control(src).ok_or(FrameError::Truncated { len: src.len() })
    }

    /// Encode into a fresh buffer.
    pub fn encode(&self) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(FRAME_SIZE);
        encode_control(self, &mut buf)?;
        Ok(buf.freeze())
    }

    /// Encode as the compact hex text the transport write expects.
    pub fn to_hex_text(&self) -> Result<String> {
        let bytes = self.encode()?;
        Ok(to_compact_string(&to_hex_string(&bytes)))
    }
}

/// Encode a control frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────────┬──────────┬──────────────────┐
/// │ Command  │ Category │ Length           │
/// │ (1B)     │ (1B)     │ (3B LE, 24-bit)  │
/// └──────────┴──────────┴──────────────────┘
/// ```
pub fn encode_control(frame: &ControlFrame, dst: &mut BytesMut) -> Result<()> {
    if frame.length > MAX_LENGTH {
        return Err(FrameError::LengthOverflow(frame.length));
    }
    dst.reserve(FRAME_SIZE);
    dst.put_u8(frame.command);
    dst.put_u8(frame.category);
    dst.put_uint_le(u64::from(frame.length), 3);
    Ok(())
}

/// Decode a control frame from a notification.
///
/// Returns `None` when fewer than [`FRAME_SIZE`] bytes are present; short
/// notifications are expected noise on the link, not errors. Bytes past the
/// frame are ignored.
pub fn decode_control(src: &[u8]) -> Option<ControlFrame> {
    if src.len() < FRAME_SIZE {
        return None;
    }

    let length = u32::from(src[2]) | (u32::from(src[3]) << 8) | (u32::from(src[4]) << 16);

    Some(ControlFrame {
        command: src[0],
        category: src[1],
        length,
    })
}
