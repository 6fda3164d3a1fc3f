use std::fmt;
use std::future::Future;
use std::pin::Pin;

use crate::error::Result;

/// Boxed future returned by transport writes.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Identity of one connected link (e.g. a device address).
///
/// At most one transfer session may be active per connection.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Create a connection id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConnectionId({})", self.0)
    }
}

impl From<&str> for ConnectionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Outbound side of a connected link.
///
/// `write` sends one command on the control channel. The payload is the
/// encoded frame as compact hex text, and `category` selects the command
/// category the link routes it under.
pub trait Transport: Send + Sync {
    /// Identity of this link.
    fn id(&self) -> &ConnectionId;

    /// Send a control-channel command.
    fn write(&self, category: u8, payload: String) -> BoxFuture<'_, Result<()>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_id_display_and_debug() {
        let id = ConnectionId::new("AA:BB:CC:DD:EE:FF");
        assert_eq!(id.to_string(), "AA:BB:CC:DD:EE:FF");
        assert_eq!(format!("{id:?}"), "ConnectionId(AA:BB:CC:DD:EE:FF)");
        assert_eq!(id.as_str(), "AA:BB:CC:DD:EE:FF");
    }

    #[test]
    fn connection_id_equality_is_by_value() {
        let a = ConnectionId::from("watch-1");
        let b = ConnectionId::new(String::from("watch-1"));
        assert_eq!(a, b);
        assert_ne!(a, ConnectionId::from("watch-2"));
    }
}
