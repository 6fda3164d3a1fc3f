use std::time::Duration;

use lifelog_frame::{CATEGORY_LIFELOG, STEPS_OFFSET};

/// Default time a caller waits for a transfer to complete.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// What to do when a completed payload does not cover the target field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShortPayloadPolicy {
    /// Leave the session pending; the caller sees a timeout.
    #[default]
    Wait,
    /// Fail the session immediately with `SessionError::ShortPayload`.
    Reject,
}

/// Configuration for one transfer session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Overall time allowed for the transfer.
    pub timeout: Duration,
    /// Category used for outbound frames and accepted on inbound ones.
    pub category: u8,
    /// Byte offset of the 4-byte little-endian target field.
    pub steps_offset: usize,
    /// Handling of payloads too short for the target field.
    pub short_payload: ShortPayloadPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            category: CATEGORY_LIFELOG,
            steps_offset: STEPS_OFFSET,
            short_payload: ShortPayloadPolicy::Wait,
        }
    }
}
