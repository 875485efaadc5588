//! Transport trait and event model.
//!
//! Traits use native `async fn` methods (Edition 2024 RPITIT), so they
//! are not object-safe; for dynamic dispatch use the [`AnyTransport`]
//! enum wrapper.

#![allow(async_fn_in_trait)]

use bytes::Bytes;
use thiserror::Error;

/// Errors that can occur during transport operations.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Transport is not connected.
    #[error("Not connected")]
    NotConnected,

    /// Connection attempt timed out.
    #[error("Connection timeout after {0}ms")]
    ConnectionTimeout(u64),

    /// Write operation timed out.
    #[error("Write timeout after {0}ms")]
    WriteTimeout(u64),

    /// Connection was lost during an operation.
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// A send was refused by the link (device unplugged, bridge reset).
    /// Non-fatal for the dispatcher; connection state is surfaced
    /// separately through [`TransportEvent::Disconnected`].
    #[error("Send refused: {0}")]
    SendRefused(String),

    /// Codec-level error while writing a frame.
    #[error("Codec error: {0}")]
    Codec(#[from] lumen_core::Error),

    /// Low-level I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Inbound event from a transport.
///
/// Delivered over the mpsc receiver handed out at transport
/// construction. Frames arrive with the dialect delimiter already
/// stripped by the frame codec.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// Socket established (handshake, if any, has not run yet).
    Connected,

    /// Socket lost or closed; no frame after this is trustworthy.
    Disconnected,

    /// One complete inbound frame.
    Frame(Bytes),
}

/// A byte-stream link to a device.
///
/// Implementations deliver inbound traffic through the event channel
/// returned by their constructor; the trait only covers the outbound
/// and lifecycle surface.
pub trait Transport: Send {
    /// Establish the connection.
    async fn connect(&mut self) -> Result<(), TransportError>;

    /// Send one fully framed command.
    async fn send(&mut self, frame: Bytes) -> Result<(), TransportError>;

    /// Close the connection. Idempotent.
    async fn close(&mut self) -> Result<(), TransportError>;

    /// Raw socket connectivity. Distinct from device readiness, which
    /// the controller tracks separately.
    fn is_connected(&self) -> bool;
}

/// Enum dispatch over the available transports.
///
/// `async fn` trait methods are not object-safe, so the controller holds
/// this enum instead of a `Box<dyn Transport>`.
#[derive(Debug)]
pub enum AnyTransport {
    Tcp(crate::tcp::TcpTransport),
    Mock(crate::mock::MockTransport),
}

impl Transport for AnyTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        match self {
            Self::Tcp(t) => t.connect().await,
            Self::Mock(t) => t.connect().await,
        }
    }

    async fn send(&mut self, frame: Bytes) -> Result<(), TransportError> {
        match self {
            Self::Tcp(t) => t.send(frame).await,
            Self::Mock(t) => t.send(frame).await,
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        match self {
            Self::Tcp(t) => t.close().await,
            Self::Mock(t) => t.close().await,
        }
    }

    fn is_connected(&self) -> bool {
        match self {
            Self::Tcp(t) => t.is_connected(),
            Self::Mock(t) => t.is_connected(),
        }
    }
}
