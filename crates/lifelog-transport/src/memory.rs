use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{Result, TransportError};
use crate::traits::{BoxFuture, ConnectionId, Transport};

/// A control-channel write captured by [`MemoryTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundWrite {
    /// Category the write was routed under.
    pub category: u8,
    /// Compact hex text of the encoded frame.
    pub payload: String,
}

/// In-process transport that hands every write to a channel.
///
/// Used by the simulator and by tests to observe what a session sends and to
/// play the device side of a transfer. Writes can be switched to fail so the
/// error paths of callers can be exercised.
pub struct MemoryTransport {
    id: ConnectionId,
    tx: mpsc::UnboundedSender<OutboundWrite>,
    fail_writes: AtomicBool,
}

impl MemoryTransport {
    /// Create a transport and the receiver that observes its writes.
    pub fn new(id: impl Into<ConnectionId>) -> (Self, mpsc::UnboundedReceiver<OutboundWrite>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let transport = Self {
            id: id.into(),
            tx,
            fail_writes: AtomicBool::new(false),
        };
        (transport, rx)
    }

    /// Make subsequent writes fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn deliver(&self, category: u8, payload: String) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(TransportError::Write(format!(
                "injected failure on {}",
                self.id
            )));
        }
        debug!(connection = %self.id, category, %payload, "memory transport write");
        self.tx
            .send(OutboundWrite { category, payload })
            .map_err(|_| TransportError::Closed)
    }
}

impl Transport for MemoryTransport {
    fn id(&self) -> &ConnectionId {
        &self.id
    }

    fn write(&self, category: u8, payload: String) -> BoxFuture<'_, Result<()>> {
        let outcome = self.deliver(category, payload);
        Box::pin(async move { outcome })
    }
}

impl std::fmt::Debug for MemoryTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTransport")
            .field("id", &self.id)
            .field("fail_writes", &self.fail_writes.load(Ordering::SeqCst))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_are_observed_in_order() {
        let (transport, mut rx) = MemoryTransport::new("watch");

        transport.write(0x11, "0011000000".to_string()).await.unwrap();
        transport.write(0x11, "0411000000".to_string()).await.unwrap();

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.category, 0x11);
        assert_eq!(first.payload, "0011000000");
        assert_eq!(second.payload, "0411000000");
    }

    #[tokio::test]
    async fn injected_failure_is_reported() {
        let (transport, mut rx) = MemoryTransport::new("watch");
        transport.set_fail_writes(true);

        let err = transport
            .write(0x11, "0011000000".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Write(_)));
        assert!(rx.try_recv().is_err());

        transport.set_fail_writes(false);
        transport.write(0x11, "0011000000".to_string()).await.unwrap();
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn write_after_receiver_dropped_is_closed() {
        let (transport, rx) = MemoryTransport::new("watch");
        drop(rx);

        let err = transport.write(0x11, String::new()).await.unwrap_err();
        assert!(matches!(err, TransportError::Closed));
    }

    #[test]
    fn exposes_connection_id() {
        let (transport, _rx) = MemoryTransport::new("watch-7");
        assert_eq!(transport.id(), &ConnectionId::from("watch-7"));
    }
}
