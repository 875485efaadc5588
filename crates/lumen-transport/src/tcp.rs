//! TCP transport for device control links.
//!
//! Covers both native TCP control ports and serial-to-TCP bridge boxes.
//! The stream is split: the write half stays with the transport for
//! `send()`, the read half moves into a reader task that pumps decoded
//! frames and connectivity changes into the event channel.
//!
//! ```text
//! DisplayController
//!     │ send(frame) ────────────► FramedWrite ──(TCP)──► device
//!     │
//!     ◄── mpsc TransportEvent ◄── reader task ◄── FramedRead
//! ```
//!
//! # Design
//!
//! The transport is a dumb pipe by intent:
//! - **No automatic reconnect**: the controller owns recovery policy.
//! - **No handshake knowledge**: login exchanges are commands like any
//!   other, driven by the controller's protocol strategy.
//! - **No retry**: a failed send is reported and the caller moves on.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, error, info, trace, warn};

use lumen_protocol::FrameCodec;

use crate::traits::{Transport, TransportError, TransportEvent};

/// Default capacity of the inbound event channel.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Configuration for the TCP transport.
#[derive(Debug, Clone)]
pub struct TcpTransportConfig {
    /// Device control port address.
    pub device_addr: SocketAddr,

    /// Timeout for connect and send operations.
    pub timeout: Duration,

    /// Frame delimiter byte of the active dialect.
    pub delimiter: u8,
}

impl TcpTransportConfig {
    pub fn new(device_addr: SocketAddr, delimiter: u8) -> Self {
        Self {
            device_addr,
            timeout: Duration::from_millis(3000),
            delimiter,
        }
    }
}

/// TCP transport with a background reader task.
#[derive(Debug)]
pub struct TcpTransport {
    config: TcpTransportConfig,

    /// Write half with frame codec (None if not connected).
    writer: Option<FramedWrite<OwnedWriteHalf, FrameCodec>>,

    /// Reader task pumping inbound frames into the event channel.
    reader: Option<JoinHandle<()>>,

    /// Shared connectivity flag, cleared by the reader task on EOF.
    connected: Arc<AtomicBool>,

    events_tx: mpsc::Sender<TransportEvent>,
}

impl TcpTransport {
    /// Create a transport and the receiver for its inbound events.
    ///
    /// The transport is not connected after creation; call
    /// [`connect`](Transport::connect).
    pub fn new(config: TcpTransportConfig) -> (Self, mpsc::Receiver<TransportEvent>) {
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        debug!(addr = %config.device_addr, "Creating TCP transport");

        let transport = Self {
            config,
            writer: None,
            reader: None,
            connected: Arc::new(AtomicBool::new(false)),
            events_tx,
        };
        (transport, events_rx)
    }

    async fn spawn_reader(&mut self, stream: TcpStream) {
        let (read_half, write_half) = stream.into_split();

        self.writer = Some(FramedWrite::new(
            write_half,
            FrameCodec::new(self.config.delimiter),
        ));

        let mut framed = FramedRead::new(read_half, FrameCodec::new(self.config.delimiter));
        let events_tx = self.events_tx.clone();
        let connected = Arc::clone(&self.connected);
        let addr = self.config.device_addr;

        self.reader = Some(tokio::spawn(async move {
            while let Some(result) = framed.next().await {
                match result {
                    Ok(frame) => {
                        trace!(len = frame.len(), "Inbound frame");
                        if events_tx.send(TransportEvent::Frame(frame)).await.is_err() {
                            debug!("Event receiver dropped, stopping reader");
                            return;
                        }
                    }
                    Err(e) => {
                        // Oversize garbage run; the codec already
                        // resynchronized, keep reading.
                        warn!(%addr, "Discarded inbound data: {}", e);
                    }
                }
            }

            info!(%addr, "Connection closed by peer");
            connected.store(false, Ordering::SeqCst);
            let _ = events_tx.send(TransportEvent::Disconnected).await;
        }));
    }
}

impl Transport for TcpTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        info!(addr = %self.config.device_addr, "Connecting to device");

        let stream = match tokio::time::timeout(
            self.config.timeout,
            TcpStream::connect(self.config.device_addr),
        )
        .await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                error!("Connection failed: {}", e);
                return Err(e.into());
            }
            Err(_) => {
                warn!(
                    "Connection timeout after {}ms",
                    self.config.timeout.as_millis()
                );
                return Err(TransportError::ConnectionTimeout(
                    self.config.timeout.as_millis() as u64,
                ));
            }
        };

        // Disable Nagle's algorithm: command/ack exchanges are tiny and
        // the dispatcher's ack wait would otherwise absorb 40-200 ms of
        // coalescing delay per command.
        if let Err(e) = stream.set_nodelay(true) {
            warn!("Failed to set TCP_NODELAY: {} - pacing may be impacted", e);
        }

        self.spawn_reader(stream).await;
        self.connected.store(true, Ordering::SeqCst);

        if self.events_tx.send(TransportEvent::Connected).await.is_err() {
            debug!("Event receiver dropped before Connected event");
        }

        debug!("Transport connected and ready");
        Ok(())
    }

    async fn send(&mut self, frame: Bytes) -> Result<(), TransportError> {
        let writer = self.writer.as_mut().ok_or(TransportError::NotConnected)?;

        match tokio::time::timeout(self.config.timeout, writer.send(frame)).await {
            Ok(Ok(())) => {
                trace!("Frame sent");
                Ok(())
            }
            Ok(Err(e)) => {
                error!("Send failed: {}", e);
                Err(TransportError::Codec(e))
            }
            Err(_) => {
                warn!("Send timeout after {}ms", self.config.timeout.as_millis());
                Err(TransportError::WriteTimeout(
                    self.config.timeout.as_millis() as u64,
                ))
            }
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }

        if let Some(mut writer) = self.writer.take() {
            info!(addr = %self.config.device_addr, "Closing connection");

            let flush_timeout = Duration::from_millis(500);
            match tokio::time::timeout(flush_timeout, writer.flush()).await {
                Ok(Ok(())) => debug!("Flush completed"),
                Ok(Err(e)) => warn!("Error flushing during close: {}", e),
                Err(_) => warn!("Flush timeout during close"),
            }

            self.connected.store(false, Ordering::SeqCst);
            let _ = self.events_tx.send(TransportEvent::Disconnected).await;
        }

        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}
