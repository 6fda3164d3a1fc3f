/// Errors that can occur when writing to a transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The link rejected or failed the write.
    #[error("write failed: {0}")]
    Write(String),

    /// The link has been closed.
    #[error("transport closed")]
    Closed,

    /// An I/O error occurred on the underlying link.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;
