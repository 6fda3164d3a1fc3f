use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::BytesMut;
use lifelog_frame::{
    decode_control, read_u32_le_at, Channel, ControlFrame, CMD_END, CMD_START, STEPS_WIDTH,
};
use lifelog_transport::{ConnectionId, Transport};
use tokio::runtime::Handle;
use tracing::{debug, info, trace, warn};

use crate::config::{SessionConfig, ShortPayloadPolicy};
use crate::error::SessionError;
use crate::result::ResultSlot;

const INITIAL_BUFFER_CAPACITY: usize = 512;

/// Observable progress of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Start requested; the device has not announced a length yet.
    Armed,
    /// Length announced, no payload bytes yet.
    Announced,
    /// Length announced and payload bytes arriving.
    Accumulating,
    /// Result delivered (or rejected); further notifications are ignored.
    Finalized,
}

#[derive(Debug)]
struct Reassembly {
    buffer: BytesMut,
    expected_len: Option<usize>,
    end_sent: bool,
    finalized: bool,
}

/// State of one in-flight transfer.
///
/// Notification handlers take `&self` and return without waiting on the
/// link; all mutation happens under one lock so handlers may be driven from
/// any thread.
pub struct TransferSession {
    transport: Arc<dyn Transport>,
    slot: ResultSlot<u32>,
    config: SessionConfig,
    runtime: Handle,
    state: Mutex<Reassembly>,
}

impl TransferSession {
    /// Create a session bound to `transport` that resolves `slot`.
    ///
    /// The outbound end-of-transfer frame is spawned onto `runtime`.
    pub fn new(
        transport: Arc<dyn Transport>,
        slot: ResultSlot<u32>,
        config: SessionConfig,
        runtime: Handle,
    ) -> Self {
        Self {
            transport,
            slot,
            config,
            runtime,
            state: Mutex::new(Reassembly {
                buffer: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
                expected_len: None,
                end_sent: false,
                finalized: false,
            }),
        }
    }

    /// Connection this session belongs to.
    pub fn connection(&self) -> &ConnectionId {
        self.transport.id()
    }

    /// Session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Current progress.
    pub fn state(&self) -> SessionState {
        let state = self.lock();
        if state.finalized {
            SessionState::Finalized
        } else if state.expected_len.is_none() {
            SessionState::Armed
        } else if state.buffer.is_empty() {
            SessionState::Announced
        } else {
            SessionState::Accumulating
        }
    }

    /// Bytes accumulated so far.
    pub fn buffered(&self) -> usize {
        self.lock().buffer.len()
    }

    /// Length announced by the device, if any.
    pub fn expected_len(&self) -> Option<usize> {
        self.lock().expected_len
    }

    /// Route a notification by channel.
    pub fn on_notification(&self, channel: Channel, data: &[u8]) {
        match channel {
            Channel::DataRequestSp => self.on_control(data),
            Channel::Convoy => self.on_data(data),
        }
    }

    /// Handle a control-channel notification.
    ///
    /// Short frames and frames for other categories are dropped.
    pub fn on_control(&self, data: &[u8]) {
        let Some(frame) = decode_control(data) else {
            trace!(connection = %self.connection(), len = data.len(), "dropping short control notification");
            return;
        };
        if frame.category != self.config.category {
            trace!(
                connection = %self.connection(),
                category = frame.category,
                "ignoring control frame for another category"
            );
            return;
        }

        match frame.command {
            CMD_START => self.on_announce(frame.length as usize),
            CMD_END => {
                debug!(connection = %self.connection(), "device signalled end of transfer");
                self.finalize_if_ready();
            }
            other => trace!(connection = %self.connection(), command = other, "ignoring control command"),
        }
    }

    /// Handle a bulk-channel notification.
    ///
    /// Chunks are appended in arrival order. The first time the buffer
    /// reaches the announced length the end frame is sent to the device.
    pub fn on_data(&self, data: &[u8]) {
        if data.is_empty() {
            return;
        }

        let send_end = {
            let mut state = self.lock();
            if state.finalized {
                trace!(connection = %self.connection(), len = data.len(), "ignoring chunk after finalization");
                return;
            }
            state.buffer.extend_from_slice(data);
            trace!(
                connection = %self.connection(),
                chunk = data.len(),
                buffered = state.buffer.len(),
                "convoy chunk appended"
            );

            let complete = state
                .expected_len
                .is_some_and(|expected| state.buffer.len() >= expected);
            if !complete {
                return;
            }
            !std::mem::replace(&mut state.end_sent, true)
        };

        if send_end {
            self.send_end_frame();
        }
        self.finalize_if_ready();
    }

    /// Deliver the target field if the transfer is complete.
    ///
    /// A no-op until a length has been announced and that many bytes have
    /// arrived. Safe to call any number of times; at most one value is ever
    /// delivered.
    pub fn finalize_if_ready(&self) {
        let outcome = {
            let mut state = self.lock();
            if state.finalized {
                return;
            }
            let Some(expected) = state.expected_len else {
                return;
            };
            if state.buffer.len() < expected {
                return;
            }

            let offset = self.config.steps_offset;
            match read_u32_le_at(&state.buffer, offset) {
                Some(steps) => {
                    state.finalized = true;
                    Ok(steps)
                }
                None => {
                    let len = state.buffer.len();
                    let required = offset.saturating_add(STEPS_WIDTH);
                    match self.config.short_payload {
                        ShortPayloadPolicy::Wait => {
                            debug!(
                                connection = %self.connection(),
                                len,
                                required,
                                "payload complete but too short for target field"
                            );
                            return;
                        }
                        ShortPayloadPolicy::Reject => {
                            state.finalized = true;
                            Err(SessionError::ShortPayload { len, required })
                        }
                    }
                }
            }
        };

        match outcome {
            Ok(steps) => {
                info!(connection = %self.connection(), steps, "lifelog transfer complete");
                self.slot.set_result(steps);
            }
            Err(err) => {
                warn!(connection = %self.connection(), %err, "lifelog transfer rejected");
                self.slot.set_error(err);
            }
        }
    }

    fn on_announce(&self, length: usize) {
        let mut state = self.lock();
        if state.finalized {
            return;
        }
        match state.expected_len {
            None => {
                state.expected_len = Some(length);
                debug!(
                    connection = %self.connection(),
                    length,
                    buffered = state.buffer.len(),
                    "device announced transfer"
                );
            }
            Some(existing) => debug!(
                connection = %self.connection(),
                existing,
                length,
                "ignoring repeated start announcement"
            ),
        }
    }

    // Fire-and-forget: the receive path never waits on the link, and a
    // failed acknowledgement only gets logged.
    fn send_end_frame(&self) {
        let category = self.config.category;
        let text = match ControlFrame::end(category).to_hex_text() {
            Ok(text) => text,
            Err(err) => {
                warn!(connection = %self.connection(), %err, "failed to encode end frame");
                return;
            }
        };

        debug!(connection = %self.connection(), "acknowledging end of transfer");
        let transport = Arc::clone(&self.transport);
        self.runtime.spawn(async move {
            if let Err(err) = transport.write(category, text).await {
                warn!(connection = %transport.id(), %err, "end-of-transfer acknowledgement failed");
            }
        });
    }

    fn lock(&self) -> MutexGuard<'_, Reassembly> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for TransferSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("TransferSession")
            .field("connection", self.connection())
            .field("buffered", &state.buffer.len())
            .field("expected_len", &state.expected_len)
            .field("end_sent", &state.end_sent)
            .field("finalized", &state.finalized)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use lifelog_frame::{CATEGORY_LIFELOG, LIFELOG_PAYLOAD_LEN, STEPS_OFFSET};
    use lifelog_transport::{MemoryTransport, OutboundWrite};
    use tokio::sync::mpsc::UnboundedReceiver;

    use super::*;
    use crate::result::{result_channel, ResultReceiver};

    struct Harness {
        transport: Arc<MemoryTransport>,
        writes: UnboundedReceiver<OutboundWrite>,
        session: TransferSession,
        result: ResultReceiver<u32>,
    }

    fn harness(config: SessionConfig) -> Harness {
        let (transport, writes) = MemoryTransport::new("watch");
        let transport = Arc::new(transport);
        let (slot, result) = result_channel(config.timeout);
        let session = TransferSession::new(
            transport.clone() as Arc<dyn Transport>,
            slot,
            config,
            Handle::current(),
        );
        Harness {
            transport,
            writes,
            session,
            result,
        }
    }

    fn quick_config() -> SessionConfig {
        SessionConfig {
            timeout: Duration::from_millis(200),
            ..SessionConfig::default()
        }
    }

    fn start(length: u32) -> Vec<u8> {
        ControlFrame::start(CATEGORY_LIFELOG)
            .with_length(length)
            .encode()
            .unwrap()
            .to_vec()
    }

    fn end() -> Vec<u8> {
        ControlFrame::end(CATEGORY_LIFELOG).encode().unwrap().to_vec()
    }

    fn payload(len: usize, steps: u32) -> Vec<u8> {
        let mut buf: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
        if len >= STEPS_OFFSET + STEPS_WIDTH {
            buf[STEPS_OFFSET..STEPS_OFFSET + STEPS_WIDTH].copy_from_slice(&steps.to_le_bytes());
        }
        buf
    }

    #[tokio::test]
    async fn announced_transfer_resolves_steps() {
        let mut h = harness(quick_config());
        h.session.on_control(&start(LIFELOG_PAYLOAD_LEN as u32));
        assert_eq!(h.session.state(), SessionState::Announced);

        for chunk in payload(LIFELOG_PAYLOAD_LEN, 100).chunks(100) {
            h.session.on_data(chunk);
        }

        assert_eq!(h.session.state(), SessionState::Finalized);
        assert_eq!(h.result.get_result().await.unwrap(), 100);

        let ack = h.writes.recv().await.unwrap();
        assert_eq!(ack.category, CATEGORY_LIFELOG);
        assert_eq!(ack.payload, "0411000000");
    }

    #[tokio::test]
    async fn accumulating_state_before_watermark() {
        let h = harness(quick_config());
        assert_eq!(h.session.state(), SessionState::Armed);

        h.session.on_control(&start(400));
        h.session.on_data(&[0u8; 10]);

        assert_eq!(h.session.state(), SessionState::Accumulating);
        assert_eq!(h.session.buffered(), 10);
        assert_eq!(h.session.expected_len(), Some(400));
    }

    #[tokio::test]
    async fn short_control_frame_is_ignored() {
        let h = harness(quick_config());
        h.session.on_control(&[0x00, 0x11, 0x90, 0x01]);
        h.session.on_control(&[]);

        assert_eq!(h.session.expected_len(), None);
        assert_eq!(h.session.state(), SessionState::Armed);
    }

    #[tokio::test]
    async fn foreign_category_is_ignored() {
        let h = harness(quick_config());
        h.session.on_control(&[0x00, 0x12, 0x90, 0x01, 0x00]);
        h.session.on_data(&payload(400, 5));
        h.session.on_control(&[0x04, 0x12, 0x00, 0x00, 0x00]);

        assert_eq!(h.session.expected_len(), None);
        assert_ne!(h.session.state(), SessionState::Finalized);
    }

    #[tokio::test]
    async fn repeated_start_does_not_overwrite_length() {
        let h = harness(quick_config());
        h.session.on_control(&start(400));
        h.session.on_control(&start(10));

        assert_eq!(h.session.expected_len(), Some(400));
    }

    #[tokio::test]
    async fn data_before_announcement_finalizes_on_device_end() {
        let mut h = harness(quick_config());
        h.session.on_data(&payload(400, 4242));
        assert_eq!(h.session.state(), SessionState::Armed);

        h.session.on_control(&start(400));
        assert_eq!(h.session.state(), SessionState::Accumulating);

        h.session.on_control(&end());
        assert_eq!(h.result.get_result().await.unwrap(), 4242);
        // The watermark was never crossed on the data path, so no ack went out.
        assert!(h.writes.try_recv().is_err());
    }

    #[tokio::test]
    async fn device_end_before_complete_is_noop() {
        let h = harness(quick_config());
        h.session.on_control(&start(400));
        h.session.on_data(&[0u8; 399]);
        h.session.on_control(&end());

        assert_eq!(h.session.state(), SessionState::Accumulating);
    }

    #[tokio::test]
    async fn finalize_is_idempotent() {
        let mut h = harness(quick_config());
        h.session.on_control(&start(400));
        h.session.on_data(&payload(400, 9));

        h.session.finalize_if_ready();
        h.session.finalize_if_ready();
        h.session.on_control(&end());

        assert_eq!(h.result.get_result().await.unwrap(), 9);
        assert!(h.writes.recv().await.is_some());
        assert!(h.writes.try_recv().is_err());
    }

    #[tokio::test]
    async fn end_frame_sent_once_while_waiting_on_short_payload() {
        let mut h = harness(quick_config());
        h.session.on_control(&start(10));
        h.session.on_data(&[0u8; 10]);
        h.session.on_data(&[0u8; 5]);

        assert!(h.writes.recv().await.is_some());
        tokio::task::yield_now().await;
        assert!(h.writes.try_recv().is_err());
    }

    #[tokio::test]
    async fn short_payload_waits_for_timeout() {
        let h = harness(SessionConfig {
            timeout: Duration::from_millis(20),
            ..SessionConfig::default()
        });
        h.session.on_control(&start(10));
        h.session.on_data(&[0xFFu8; 10]);
        h.session.on_control(&end());

        assert_ne!(h.session.state(), SessionState::Finalized);
        assert!(matches!(
            h.result.get_result().await,
            Err(SessionError::Timeout(_))
        ));
    }

    #[tokio::test]
    async fn short_payload_rejected_when_configured() {
        let h = harness(SessionConfig {
            short_payload: ShortPayloadPolicy::Reject,
            ..quick_config()
        });
        h.session.on_control(&start(10));
        h.session.on_data(&[0xFFu8; 10]);

        assert_eq!(h.session.state(), SessionState::Finalized);
        assert!(matches!(
            h.result.get_result().await,
            Err(SessionError::ShortPayload {
                len: 10,
                required: 378
            })
        ));
    }

    #[tokio::test]
    async fn failed_ack_does_not_affect_result() {
        let mut h = harness(quick_config());
        h.transport.set_fail_writes(true);

        h.session.on_control(&start(400));
        h.session.on_data(&payload(400, 77));

        assert_eq!(h.result.get_result().await.unwrap(), 77);
        tokio::task::yield_now().await;
        assert!(h.writes.try_recv().is_err());
    }

    #[tokio::test]
    async fn chunks_after_finalization_are_ignored() {
        let h = harness(quick_config());
        h.session.on_control(&start(400));
        h.session.on_data(&payload(400, 1));
        h.session.on_data(&[0u8; 50]);

        assert_eq!(h.session.buffered(), 400);
    }

    #[tokio::test]
    async fn overlong_payload_still_reads_fixed_offset() {
        let h = harness(quick_config());
        h.session.on_control(&start(400));
        let mut chunk = payload(400, 31337);
        chunk.extend_from_slice(&[0xEE; 20]);
        h.session.on_data(&chunk);

        assert_eq!(h.result.get_result().await.unwrap(), 31337);
    }

    #[tokio::test]
    async fn notification_routing_by_channel() {
        let h = harness(quick_config());
        h.session
            .on_notification(Channel::DataRequestSp, &start(400));
        h.session
            .on_notification(Channel::Convoy, &payload(400, 12));

        assert_eq!(h.result.get_result().await.unwrap(), 12);
    }

    #[tokio::test]
    async fn data_before_announcement_waits_without_device_end() {
        let h = harness(SessionConfig {
            timeout: Duration::from_millis(20),
            ..SessionConfig::default()
        });
        h.session.on_data(&payload(400, 8));
        h.session.on_control(&start(400));

        assert_eq!(h.session.state(), SessionState::Accumulating);
        assert!(matches!(
            h.result.get_result().await,
            Err(SessionError::Timeout(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn chunks_from_many_threads_are_all_kept() {
        const THREADS: usize = 8;
        const CHUNKS: usize = 50;
        const CHUNK_LEN: usize = 10;
        let total = THREADS * CHUNKS * CHUNK_LEN;

        let (transport, mut writes) = MemoryTransport::new("watch");
        let (slot, result) = result_channel(Duration::from_secs(2));
        let session = Arc::new(TransferSession::new(
            Arc::new(transport) as Arc<dyn Transport>,
            slot,
            SessionConfig::default(),
            Handle::current(),
        ));
        session.on_control(&start(total as u32));

        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let session = Arc::clone(&session);
                std::thread::spawn(move || {
                    for _ in 0..CHUNKS {
                        session.on_data(&[t as u8; CHUNK_LEN]);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(session.buffered(), total);
        assert_eq!(session.state(), SessionState::Finalized);
        assert!(result.get_result().await.is_ok());

        let ack = tokio::time::timeout(Duration::from_secs(1), writes.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ack.category, CATEGORY_LIFELOG);
        assert_eq!(ack.payload, "0411000000");
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(writes.try_recv().is_err());
    }
}
