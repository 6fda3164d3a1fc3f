//! Hex text forms of encoded frames.
//!
//! The transport write primitive takes frames as text rather than bytes. The
//! canonical form is the compact one: lowercase byte pairs, no separators.

use crate::error::{FrameError, Result};

/// Space-separated lowercase hex, e.g. `"00 11 00 00 00"`.
pub fn to_hex_string(bytes: &[u8]) -> String {
    let compact = hex::encode(bytes);
    let mut spaced = String::with_capacity(compact.len() + compact.len() / 2);
    for (i, c) in compact.chars().enumerate() {
        if i > 0 && i % 2 == 0 {
            spaced.push(' ');
        }
        spaced.push(c);
    }
    spaced
}

/// Strip all whitespace from hex text.
pub fn to_compact_string(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Decode hex text in either spaced or compact form.
///
/// A leading `0x` is accepted.
pub fn from_hex_text(text: &str) -> Result<Vec<u8>> {
    let compact = to_compact_string(text);
    let digits = compact
        .strip_prefix("0x")
        .or_else(|| compact.strip_prefix("0X"))
        .unwrap_or(&compact);
    hex::decode(digits).map_err(|err| FrameError::InvalidHex(err.to_string()))
}
