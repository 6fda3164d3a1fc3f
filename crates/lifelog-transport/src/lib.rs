//! Notification-channel transport abstraction.
//!
//! A lifelog transfer rides on two notification channels of a wireless link
//! plus one outbound write primitive. This crate defines the write side as the
//! [`Transport`] trait and identifies links by [`ConnectionId`]; the host feeds
//! inbound notifications into the session layer directly.
//!
//! This is the lowest layer of lifelog. Everything else builds on top of
//! the types provided here.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{Result, TransportError};
pub use memory::{MemoryTransport, OutboundWrite};
pub use traits::{BoxFuture, ConnectionId, Transport};
