//! Lifelog transfer reassembly over two notification channels.
//!
//! A watch announces a transfer on its control channel and streams the payload
//! over a bulk channel in arbitrary-sized chunks. lifelog stitches the two
//! streams back together, acknowledges completion, and decodes the step count.
//!
//! # Crate Structure
//!
//! - [`transport`] — Outbound write abstraction and connection identity
//! - [`frame`] — Compact control-frame codec and payload field layout
//! - [`session`] — Reassembly sessions and the request driver (behind `session` feature)

/// Re-export transport types.
pub mod transport {
    pub use lifelog_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use lifelog_frame::*;
}

/// Re-export session types (requires `session` feature).
#[cfg(feature = "session")]
pub mod session {
    pub use lifelog_session::*;
}
