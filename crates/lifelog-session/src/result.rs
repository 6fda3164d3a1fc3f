//! One-shot, timeout-bounded result handoff.
//!
//! The producing half ([`ResultSlot`]) is shared with notification handlers
//! and may be resolved from several triggers; only the first resolution is
//! delivered. The consuming half ([`ResultReceiver`]) is awaited once by the
//! caller and fails with [`SessionError::Timeout`] when the window elapses.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::oneshot;

use crate::error::{Result, SessionError};

type Outcome<T> = Result<T>;

/// Create a connected slot/receiver pair with the given timeout.
pub fn result_channel<T>(timeout: Duration) -> (ResultSlot<T>, ResultReceiver<T>) {
    let (tx, rx) = oneshot::channel();
    (
        ResultSlot {
            tx: Mutex::new(Some(tx)),
        },
        ResultReceiver { rx, timeout },
    )
}

/// Producing half. First resolution wins; later ones are no-ops.
#[derive(Debug)]
pub struct ResultSlot<T> {
    tx: Mutex<Option<oneshot::Sender<Outcome<T>>>>,
}

impl<T> ResultSlot<T> {
    /// Deliver a value.
    ///
    /// Returns `true` only if this call resolved the slot and the caller was
    /// still waiting.
    pub fn set_result(&self, value: T) -> bool {
        self.resolve(Ok(value))
    }

    /// Deliver a failure instead of a value.
    pub fn set_error(&self, err: SessionError) -> bool {
        self.resolve(Err(err))
    }

    /// Whether the slot has already been resolved.
    pub fn is_resolved(&self) -> bool {
        self.lock().is_none()
    }

    fn resolve(&self, outcome: Outcome<T>) -> bool {
        let Some(tx) = self.lock().take() else {
            return false;
        };
        tx.send(outcome).is_ok()
    }

    fn lock(&self) -> MutexGuard<'_, Option<oneshot::Sender<Outcome<T>>>> {
        self.tx.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Consuming half, awaited once by the caller.
#[derive(Debug)]
pub struct ResultReceiver<T> {
    rx: oneshot::Receiver<Outcome<T>>,
    timeout: Duration,
}

impl<T> ResultReceiver<T> {
    /// Time allowed before [`get_result`](Self::get_result) gives up.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Wait for the slot to be resolved or the timeout to elapse.
    ///
    /// Fails with [`SessionError::Cancelled`] if the slot is dropped
    /// unresolved.
    pub async fn get_result(self) -> Result<T> {
        match tokio::time::timeout(self.timeout, self.rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(SessionError::Cancelled),
            Err(_) => Err(SessionError::Timeout(self.timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Instant;

    use super::*;

    #[tokio::test]
    async fn delivers_value() {
        let (slot, rx) = result_channel::<u32>(Duration::from_secs(1));
        assert!(!slot.is_resolved());
        assert!(slot.set_result(7));
        assert!(slot.is_resolved());
        assert_eq!(rx.get_result().await.unwrap(), 7);
    }

    #[tokio::test]
    async fn first_resolution_wins() {
        let (slot, rx) = result_channel::<u32>(Duration::from_secs(1));
        assert!(slot.set_result(1));
        assert!(!slot.set_result(2));
        assert!(!slot.set_error(SessionError::Cancelled));
        assert_eq!(rx.get_result().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn delivers_error() {
        let (slot, rx) = result_channel::<u32>(Duration::from_secs(1));
        slot.set_error(SessionError::ShortPayload {
            len: 10,
            required: 378,
        });
        let err = rx.get_result().await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::ShortPayload {
                len: 10,
                required: 378
            }
        ));
    }

    #[tokio::test]
    async fn times_out_when_unresolved() {
        let (slot, rx) = result_channel::<u32>(Duration::from_millis(10));
        let started = Instant::now();
        let err = rx.get_result().await.unwrap_err();

        assert!(matches!(err, SessionError::Timeout(d) if d == Duration::from_millis(10)));
        assert!(started.elapsed() >= Duration::from_millis(10));
        assert!(started.elapsed() < Duration::from_secs(1));
        drop(slot);
    }

    #[tokio::test]
    async fn dropped_slot_cancels() {
        let (slot, rx) = result_channel::<u32>(Duration::from_secs(5));
        drop(slot);
        assert!(matches!(
            rx.get_result().await,
            Err(SessionError::Cancelled)
        ));
    }

    #[tokio::test]
    async fn resolve_after_receiver_dropped_reports_false() {
        let (slot, rx) = result_channel::<u32>(Duration::from_secs(1));
        drop(rx);
        assert!(!slot.set_result(3));
        assert!(slot.is_resolved());
    }

    #[tokio::test]
    async fn resolved_from_another_thread() {
        let (slot, rx) = result_channel::<u32>(Duration::from_secs(2));
        let slot = Arc::new(slot);

        let handles: Vec<_> = (0..8u32)
            .map(|i| {
                let slot = Arc::clone(&slot);
                std::thread::spawn(move || slot.set_result(i))
            })
            .collect();
        let delivered = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(delivered, 1);
        assert!(rx.get_result().await.unwrap() < 8);
    }
}
