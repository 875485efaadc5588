//! Inbound feedback interpretation.
//!
//! The receive loop consumes the transport's event stream. Connectivity
//! changes drive the link state (and the queue flush on disconnect);
//! frames are decoded by the protocol strategy and applied to the
//! feedback cache and the intent ledger. Malformed frames are protocol
//! noise on a serial bridge, logged and dropped; nothing in this path
//! is allowed to fail loudly or block.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use lumen_core::{LinkState, PowerState};
use lumen_protocol::{Feedback, ProtocolStrategy};
use lumen_transport::TransportEvent;

use crate::cache::INPUT_UNKNOWN;
use crate::controller::Inner;

/// What a power report means for the transition in flight. Decided
/// under the power lock, acted on after it is released.
enum PowerAction {
    None,
    /// Confirmation of the running transition; settle it off the
    /// receive path.
    Settle(u64),
    /// The device contradicts our stable state; adopt its view.
    Adopt(PowerState),
}

impl<S: ProtocolStrategy> Inner<S> {
    pub(crate) async fn run_receive_loop(self: Arc<Self>, mut events: mpsc::Receiver<TransportEvent>) {
        while let Some(event) = events.recv().await {
            match event {
                TransportEvent::Connected => self.on_connected(),
                TransportEvent::Disconnected => self.on_disconnected(),
                TransportEvent::Frame(frame) => self.on_frame(&frame),
            }
        }
        debug!("Transport event stream ended, receive loop stopping");
    }

    fn on_connected(self: &Arc<Self>) {
        match self.strategy.handshake() {
            Some(command) => {
                info!(dialect = self.strategy.name(), "Connected, handshaking");
                *self.link() = LinkState::Handshaking;
                self.enqueue_and_kick(command);
            }
            None => {
                info!(dialect = self.strategy.name(), "Connected");
                self.mark_ready();
            }
        }
    }

    /// Nothing queued or cached survives a disconnect: the device's true
    /// state afterwards is unknowable until it talks to us again.
    fn on_disconnected(self: &Arc<Self>) {
        warn!("Transport disconnected");
        *self.link() = LinkState::Disconnected;
        self.queue().clear_all();
        self.ack_pending.store(false, Ordering::Release);
        self.cache.set_online(false);
        self.cache.set_input(INPUT_UNKNOWN);
    }

    /// Ready edge: the device will now accept commands. Idempotent so
    /// repeated ready evidence does not re-trigger resync.
    fn mark_ready(self: &Arc<Self>) {
        let was_ready = {
            let mut link = self.link();
            let was = link.is_ready();
            *link = LinkState::Ready;
            was
        };
        self.cache.set_online(true);
        if !was_ready {
            info!("Device ready for commands");
            self.resync();
        }
    }

    fn on_frame(self: &Arc<Self>, frame: &Bytes) {
        let feedback = match self.strategy.decode(frame) {
            Ok(feedback) => feedback,
            Err(e) => {
                debug!("Discarding unparseable frame: {}", e);
                return;
            }
        };
        trace!(%feedback, "Feedback received");

        // Any decoded reply releases a dispatcher waiting on an ack.
        self.ack_pending.store(false, Ordering::Release);

        // Any decoded reply while unready completes the handshake phase:
        // even a rejection or fault report proves the device is parsing
        // our traffic.
        if !self.link().is_ready() {
            self.mark_ready();
        }

        match feedback {
            Feedback::Ready => {}
            Feedback::Ack => {}
            Feedback::Nack(code) => warn!(%code, "Device rejected command"),
            Feedback::Power(on) => self.on_power_report(on),
            Feedback::Input(index) => {
                self.cache.set_input(index);
                if self.requested_mut().confirm_input(index) {
                    debug!(index, "Input intent confirmed");
                }
            }
            Feedback::Mute(mute) => {
                self.cache.set_mute(mute);
                if self.requested_mut().confirm_mute(mute) {
                    debug!(mute, "Mute intent confirmed");
                }
            }
            Feedback::Volume(native) => {
                let external = self.config.volume_range.to_external(native);
                self.cache.set_volume(external);
                if self.requested_mut().confirm_volume(external, self.volume_step_slack()) {
                    debug!(external, "Volume intent confirmed");
                }
            }
            Feedback::LampHours(hours) => self.cache.set_lamp_hours(hours),
            Feedback::DeviceError(text) => {
                warn!(error = %text, "Device reported error");
                self.cache.set_error_text(text);
            }
            other => debug!(%other, "Feedback with no controller action"),
        }
    }

    fn on_power_report(self: &Arc<Self>, on: bool) {
        self.cache.set_power(on);

        let reported = if on { PowerState::On } else { PowerState::Off };
        if self.requested_mut().confirm_power(reported) {
            debug!(%reported, "Power intent confirmed");
        }

        let action = {
            let power = self.power();
            match (power.state(), on) {
                // Confirmation of the transition in flight.
                (PowerState::WarmingUp, true) | (PowerState::CoolingDown, false) => {
                    PowerAction::Settle(power.generation())
                }
                // Still transitioning, report shows the old state; the
                // periodic poll will catch the flip.
                (PowerState::WarmingUp, false) | (PowerState::CoolingDown, true) => {
                    PowerAction::None
                }
                // Stable state contradicted by the device (front-panel
                // button, another controller): trust the device.
                (PowerState::Off, true) => PowerAction::Adopt(PowerState::On),
                (PowerState::On, false) => PowerAction::Adopt(PowerState::Off),
                _ => PowerAction::None,
            }
        };

        match action {
            PowerAction::None => {}
            PowerAction::Settle(generation) => {
                // Settle asynchronously: resync may enqueue several
                // commands and must not hold up the receive path.
                let inner = Arc::clone(self);
                self.runtime.spawn(async move {
                    inner.finish_transition(generation);
                });
            }
            PowerAction::Adopt(state) => {
                self.power().force_set(state);
                self.cache.set_transitioning(false, false);
            }
        }
    }

    /// External-scale slack of one native volume step, for confirming
    /// volume intents after the scaling round trip.
    fn volume_step_slack(&self) -> u16 {
        let span = u32::from(self.config.volume_range.span());
        (u32::from(u16::MAX) / span) as u16
    }
}
