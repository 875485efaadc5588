//! Single-in-flight queue drain.
//!
//! All outbound traffic funnels through one drain task at a time; the
//! `drain_active` flag is the try-acquire lock that guarantees it. A
//! kick while a drain is running is a no-op because the running drain
//! re-checks the queue before exiting, so no enqueue can fall into the
//! gap between "queue empty" and "flag released".
//!
//! Per command: apply wire framing, send, optionally wait out the ack
//! window, then sleep the pacing delay for the command's class. Send
//! failures are logged and skipped; a dead link is surfaced through the
//! transport's own disconnect event, not through the drain.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use tracing::{trace, warn};

use lumen_protocol::{Command, ProtocolStrategy};
use lumen_transport::Transport;

use crate::controller::Inner;

impl<S: ProtocolStrategy> Inner<S> {
    /// Trigger a drain if none is running. Called after every enqueue.
    pub(crate) fn kick_drain(self: &Arc<Self>) {
        if self.drain_active.swap(true, Ordering::AcqRel) {
            return; // running drain will observe the new item
        }
        let inner = Arc::clone(self);
        self.runtime.spawn(async move {
            inner.drain().await;
        });
    }

    async fn drain(self: Arc<Self>) {
        loop {
            let next = self.queue().dequeue_next();
            match next {
                Some(command) => self.transmit(command).await,
                None => {
                    self.drain_active.store(false, Ordering::Release);
                    // An enqueue may have raced the release; re-acquire
                    // and keep going if so, otherwise we are done.
                    if self.queue().is_empty() || self.drain_active.swap(true, Ordering::AcqRel) {
                        return;
                    }
                }
            }
        }
    }

    async fn transmit(&self, command: Command) {
        let frame = self.strategy.frame(&command);
        let wants_ack = self.strategy.requires_ack(command.category());
        if wants_ack {
            self.ack_pending.store(true, Ordering::Release);
        }

        trace!(%command, len = frame.len(), "Transmitting");
        let sent = {
            let mut transport = self.transport.lock().await;
            transport.send(frame).await
        };

        match sent {
            Ok(()) => {
                if wants_ack {
                    self.await_ack(&command).await;
                }
            }
            Err(e) => {
                // Non-fatal: the device may be unplugged. The queue
                // moves on; connectivity is tracked elsewhere.
                warn!(%command, "Send failed: {}", e);
                self.ack_pending.store(false, Ordering::Release);
            }
        }

        tokio::time::sleep(self.pacing_for(command.category())).await;
    }

    /// Bounded ack wait: a fixed number of short poll intervals. On
    /// timeout the drain proceeds rather than deadlocking the queue; the
    /// command is not retried, since it may not be idempotent.
    async fn await_ack(&self, command: &Command) {
        for _ in 0..self.config.ack_poll_count {
            if !self.ack_pending.load(Ordering::Acquire) {
                trace!(%command, "Acknowledged");
                return;
            }
            tokio::time::sleep(self.config.ack_poll_interval).await;
        }

        if self.ack_pending.swap(false, Ordering::AcqRel) {
            warn!(%command, "No acknowledgment within ack window, continuing");
        }
    }
}
