//! Reassembly of lifelog transfers.
//!
//! A transfer is announced on the control channel and delivered as raw
//! chunks on the bulk channel; the two streams arrive independently. A
//! [`TransferSession`] correlates them, decides when the payload is complete,
//! acknowledges completion to the device, and hands the decoded value to the
//! caller waiting in [`request`].

pub mod config;
pub mod driver;
pub mod error;
pub mod registry;
pub mod result;
pub mod session;

pub use config::{SessionConfig, ShortPayloadPolicy, DEFAULT_TIMEOUT};
pub use driver::{request, request_with_config};
pub use error::{Result, SessionError};
pub use registry::{SessionGuard, SessionRegistry};
pub use result::{result_channel, ResultReceiver, ResultSlot};
pub use session::{SessionState, TransferSession};
