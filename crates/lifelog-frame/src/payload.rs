//! Field layout of a completed lifelog payload.

use bytes::Buf;

/// Size of the lifelog payload in the known device family.
pub const LIFELOG_PAYLOAD_LEN: usize = 400;

/// Byte offset of the step count within the payload.
pub const STEPS_OFFSET: usize = 374;

/// Width of the step count field in bytes.
pub const STEPS_WIDTH: usize = 4;

/// Read a little-endian `u32` at `offset`.
///
/// Returns `None` when the buffer does not cover the whole field.
pub fn read_u32_le_at(buf: &[u8], offset: usize) -> Option<u32> {
    let end = offset.checked_add(STEPS_WIDTH)?;
    let mut field = buf.get(offset..end)?;
    Some(field.get_u32_le())
}
