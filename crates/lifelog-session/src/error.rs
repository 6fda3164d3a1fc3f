use std::time::Duration;

use lifelog_transport::ConnectionId;

/// Errors that can occur in session operations.
///
/// Per-notification problems (short frames, foreign categories, failed
/// acknowledgements) are absorbed inside the session and never show up here.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Transport-level error while sending the start request.
    #[error("transport error: {0}")]
    Transport(#[from] lifelog_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] lifelog_frame::FrameError),

    /// No result was delivered within the configured window.
    #[error("transfer timed out after {0:?}")]
    Timeout(Duration),

    /// The payload completed but is too short to contain the target field.
    #[error("payload too short ({len} bytes, field needs {required})")]
    ShortPayload { len: usize, required: usize },

    /// A transfer is already in flight on this connection.
    #[error("transfer already in progress on {0}")]
    Busy(ConnectionId),

    /// The session was torn down before delivering a result.
    #[error("session cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, SessionError>;
