//! Mock transport for testing without hardware.
//!
//! [`MockTransport`] records every frame the controller sends with a
//! timestamp, and [`MockTransportHandle`] lets a test inject device
//! replies and connectivity flaps. Timestamps use `tokio::time::Instant`
//! so tests under `tokio::time::pause()` can assert command pacing.
//!
//! ```no_run
//! # async fn example() {
//! use lumen_transport::{MockTransport, Transport};
//!
//! let (mut transport, handle, _events) = MockTransport::new();
//! transport.connect().await.unwrap();
//!
//! transport.send(bytes::Bytes::from_static(b"POWR ?\r")).await.unwrap();
//! handle.push_frame(bytes::Bytes::from_static(b"OK ON"));
//!
//! assert_eq!(handle.sent_frames()[0].bytes.as_ref(), b"POWR ?\r");
//! # }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::traits::{Transport, TransportError, TransportEvent};

/// Capacity of the injected-event channel.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// One frame captured by the mock, with its send time.
#[derive(Debug, Clone)]
pub struct SentFrame {
    /// When `send` was called.
    pub at: Instant,

    /// The frame exactly as the dispatcher framed it.
    pub bytes: Bytes,
}

#[derive(Debug, Default)]
struct Shared {
    sent: std::sync::Mutex<Vec<SentFrame>>,
    connected: AtomicBool,
    fail_sends: AtomicBool,
}

/// In-memory transport that records sends and plays back injected
/// frames.
#[derive(Debug)]
pub struct MockTransport {
    shared: Arc<Shared>,
    events_tx: mpsc::Sender<TransportEvent>,
}

impl MockTransport {
    /// Create a mock transport, its control handle, and the receiver for
    /// inbound events.
    pub fn new() -> (Self, MockTransportHandle, mpsc::Receiver<TransportEvent>) {
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let shared = Arc::new(Shared::default());

        let transport = Self {
            shared: Arc::clone(&shared),
            events_tx: events_tx.clone(),
        };
        let handle = MockTransportHandle { shared, events_tx };
        (transport, handle, events_rx)
    }
}

impl Transport for MockTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        debug!("Mock transport connecting");
        self.shared.connected.store(true, Ordering::SeqCst);
        let _ = self.events_tx.send(TransportEvent::Connected).await;
        Ok(())
    }

    async fn send(&mut self, frame: Bytes) -> Result<(), TransportError> {
        if !self.shared.connected.load(Ordering::SeqCst) {
            return Err(TransportError::NotConnected);
        }
        if self.shared.fail_sends.load(Ordering::SeqCst) {
            return Err(TransportError::SendRefused("injected failure".into()));
        }

        trace!(len = frame.len(), "Mock transport recording frame");
        self.shared.sent.lock().unwrap().push(SentFrame {
            at: Instant::now(),
            bytes: frame,
        });
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if self.shared.connected.swap(false, Ordering::SeqCst) {
            debug!("Mock transport closing");
            let _ = self.events_tx.send(TransportEvent::Disconnected).await;
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }
}

/// Test-side control handle for a [`MockTransport`].
///
/// Cloneable; all clones observe the same transport.
#[derive(Debug, Clone)]
pub struct MockTransportHandle {
    shared: Arc<Shared>,
    events_tx: mpsc::Sender<TransportEvent>,
}

impl MockTransportHandle {
    /// Inject one inbound frame, as if decoded from the wire.
    ///
    /// The frame should not include the dialect delimiter; the real
    /// codec strips it before delivery.
    pub fn push_frame(&self, frame: Bytes) {
        let tx = self.events_tx.clone();
        // try_send keeps this callable from sync test code; the channel
        // is large enough for any realistic reply burst.
        tx.try_send(TransportEvent::Frame(frame))
            .expect("event channel full or closed");
    }

    /// Simulate the peer dropping the connection.
    pub fn drop_connection(&self) {
        self.shared.connected.store(false, Ordering::SeqCst);
        self.events_tx
            .try_send(TransportEvent::Disconnected)
            .expect("event channel full or closed");
    }

    /// Simulate the link coming back up.
    pub fn reconnect(&self) {
        self.shared.connected.store(true, Ordering::SeqCst);
        self.events_tx
            .try_send(TransportEvent::Connected)
            .expect("event channel full or closed");
    }

    /// Make subsequent sends fail with [`TransportError::SendRefused`]
    /// while still reporting the transport as connected.
    pub fn set_fail_sends(&self, fail: bool) {
        self.shared.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// All frames sent so far, oldest first.
    pub fn sent_frames(&self) -> Vec<SentFrame> {
        self.shared.sent.lock().unwrap().clone()
    }

    /// Number of frames sent so far.
    pub fn sent_count(&self) -> usize {
        self.shared.sent.lock().unwrap().len()
    }

    /// Forget recorded frames.
    pub fn clear_sent(&self) {
        self.shared.sent.lock().unwrap().clear();
    }

    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_requires_connect() {
        let (mut transport, _handle, _events) = MockTransport::new();

        let result = transport.send(Bytes::from_static(b"POWR ?\r")).await;
        assert!(matches!(result, Err(TransportError::NotConnected)));
    }

    #[tokio::test]
    async fn test_records_sent_frames_in_order() {
        let (mut transport, handle, _events) = MockTransport::new();
        transport.connect().await.unwrap();

        transport.send(Bytes::from_static(b"POWR ON\r")).await.unwrap();
        transport.send(Bytes::from_static(b"AVOL 10\r")).await.unwrap();

        let sent = handle.sent_frames();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].bytes.as_ref(), b"POWR ON\r");
        assert_eq!(sent[1].bytes.as_ref(), b"AVOL 10\r");
    }

    #[tokio::test]
    async fn test_injected_frames_arrive_as_events() {
        let (mut transport, handle, mut events) = MockTransport::new();
        transport.connect().await.unwrap();

        assert!(matches!(events.recv().await, Some(TransportEvent::Connected)));

        handle.push_frame(Bytes::from_static(b"OK ON"));
        match events.recv().await {
            Some(TransportEvent::Frame(frame)) => assert_eq!(frame.as_ref(), b"OK ON"),
            other => panic!("expected frame event, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_connection_flap() {
        let (mut transport, handle, mut events) = MockTransport::new();
        transport.connect().await.unwrap();
        assert!(matches!(events.recv().await, Some(TransportEvent::Connected)));

        handle.drop_connection();
        assert!(!transport.is_connected());
        assert!(matches!(
            events.recv().await,
            Some(TransportEvent::Disconnected)
        ));

        let result = transport.send(Bytes::from_static(b"POWR ?\r")).await;
        assert!(matches!(result, Err(TransportError::NotConnected)));

        handle.reconnect();
        assert!(transport.is_connected());
        assert!(matches!(events.recv().await, Some(TransportEvent::Connected)));
    }

    #[tokio::test]
    async fn test_injected_send_failure_is_nonfatal() {
        let (mut transport, handle, _events) = MockTransport::new();
        transport.connect().await.unwrap();

        handle.set_fail_sends(true);
        let result = transport.send(Bytes::from_static(b"POWR ?\r")).await;
        assert!(matches!(result, Err(TransportError::SendRefused(_))));
        assert!(transport.is_connected());

        handle.set_fail_sends(false);
        transport.send(Bytes::from_static(b"POWR ?\r")).await.unwrap();
        assert_eq!(handle.sent_count(), 1);
    }
}
