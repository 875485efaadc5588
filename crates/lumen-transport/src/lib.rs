//! Byte-stream transports for the display controller.
//!
//! The controller core consumes a narrow seam: send one framed command,
//! receive an event stream of inbound frames and connectivity changes.
//! This crate provides that seam as the [`Transport`] trait plus two
//! implementations: a TCP transport for real devices (including
//! serial-to-TCP bridges) and a mock transport for tests.

pub mod mock;
pub mod tcp;
pub mod traits;

pub use mock::{MockTransport, MockTransportHandle, SentFrame};
pub use tcp::{TcpTransport, TcpTransportConfig};
pub use traits::{AnyTransport, Transport, TransportError, TransportEvent};
