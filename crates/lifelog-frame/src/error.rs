/// Errors that can occur during control-frame encoding/decoding.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FrameError {
    /// Fewer bytes than a full control frame.
    #[error("control frame truncated ({len} bytes, need 5)")]
    Truncated { len: usize },

    /// The length does not fit the 24-bit length field.
    #[error("length {0} does not fit in 24 bits")]
    LengthOverflow(u32),

    /// Hex text could not be decoded.
    #[error("invalid hex text: {0}")]
    InvalidHex(String),
}

pub type Result<T> = std::result::Result<T, FrameError>;
