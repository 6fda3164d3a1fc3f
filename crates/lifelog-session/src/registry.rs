use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use lifelog_frame::Channel;
use lifelog_transport::ConnectionId;
use tracing::{debug, trace};

use crate::error::{Result, SessionError};
use crate::session::TransferSession;

/// Active sessions keyed by connection.
///
/// This is where the host delivers notifications: each entry point looks up
/// the session for the connection and hands the bytes over. Notifications for
/// connections with no transfer in flight are dropped.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<ConnectionId, Arc<TransferSession>>>,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `session` as the active transfer on its connection.
    ///
    /// Fails with [`SessionError::Busy`] if the connection already has one.
    /// The session is removed again when the returned guard is dropped.
    pub fn register(&self, session: Arc<TransferSession>) -> Result<SessionGuard<'_>> {
        let id = session.connection().clone();
        let mut sessions = self.lock();
        if sessions.contains_key(&id) {
            return Err(SessionError::Busy(id));
        }
        sessions.insert(id.clone(), Arc::clone(&session));
        debug!(connection = %id, active = sessions.len(), "session registered");

        Ok(SessionGuard {
            registry: self,
            id,
            session,
        })
    }

    /// Active session for `id`, if any.
    pub fn get(&self, id: &ConnectionId) -> Option<Arc<TransferSession>> {
        self.lock().get(id).cloned()
    }

    /// Whether a transfer is in flight on `id`.
    pub fn is_active(&self, id: &ConnectionId) -> bool {
        self.lock().contains_key(id)
    }

    /// Number of transfers in flight.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no transfer is in flight.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Deliver a control-channel ("Data Request SP") notification.
    pub fn on_drsp_received(&self, id: &ConnectionId, data: &[u8]) {
        self.on_notification(id, Channel::DataRequestSp, data);
    }

    /// Deliver a bulk-channel ("Convoy") notification.
    pub fn on_convoy_received(&self, id: &ConnectionId, data: &[u8]) {
        self.on_notification(id, Channel::Convoy, data);
    }

    /// Deliver a notification from either channel.
    pub fn on_notification(&self, id: &ConnectionId, channel: Channel, data: &[u8]) {
        // Registry lock is released before the session runs.
        let Some(session) = self.get(id) else {
            trace!(connection = %id, %channel, len = data.len(), "no active session; dropping notification");
            return;
        };
        session.on_notification(channel, data);
    }

    fn remove(&self, id: &ConnectionId, session: &Arc<TransferSession>) {
        let mut sessions = self.lock();
        if sessions
            .get(id)
            .is_some_and(|current| Arc::ptr_eq(current, session))
        {
            sessions.remove(id);
            debug!(connection = %id, active = sessions.len(), "session retired");
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ConnectionId, Arc<TransferSession>>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Keeps a session registered for as long as it lives.
///
/// Dropping the guard retires the session, whether the transfer finished,
/// timed out, or the waiting caller was cancelled.
#[derive(Debug)]
pub struct SessionGuard<'a> {
    registry: &'a SessionRegistry,
    id: ConnectionId,
    session: Arc<TransferSession>,
}

impl SessionGuard<'_> {
    /// The guarded session.
    pub fn session(&self) -> &Arc<TransferSession> {
        &self.session
    }
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        self.registry.remove(&self.id, &self.session);
    }
}
