//! The display controller: public setters, power transitions, resync.
//!
//! One [`DisplayController`] owns one device. Callers submit intents
//! (power on/off, select input, set volume, mute) from any thread; the
//! controller records each intent, decides whether it can be actioned
//! now or must wait for readiness or warm-up, and turns actionable
//! intents into queued commands. The dispatcher (`dispatcher` module)
//! drains the queue; the interpreter (`interpreter` module) consumes
//! device feedback and confirms or resyncs the recorded intents.
//!
//! # Power-off during warm-up
//!
//! A power-off request arriving while the device is warming up is
//! recorded and actioned when warm-up settles, not aborted mid-flight.
//! Vendors disagree on whether a display tolerates power-off while
//! striking the lamp; deferring is safe on all of them.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use lumen_core::{DisplayConfig, Error, InputSource, LinkState, PowerIntent, PowerState, Result};
use lumen_protocol::{Command, CommandCategory, ProtocolStrategy};
use lumen_transport::{AnyTransport, Transport, TransportError, TransportEvent};

use crate::cache::FeedbackCache;
use crate::power::PowerTracker;
use crate::queue::CommandQueue;
use crate::requested::RequestedState;

/// Controller for one display device.
///
/// Setters are synchronous and never block on the device: they record
/// intent, enqueue at most one command, and return. All device traffic
/// happens on the dispatcher and receive-loop tasks spawned at
/// construction.
///
/// Must be constructed inside a tokio runtime; the runtime handle is
/// captured so setters can then be called from any thread.
pub struct DisplayController<S: ProtocolStrategy> {
    inner: Arc<Inner<S>>,
    receive_task: JoinHandle<()>,
}

/// Shared state behind the controller's task handles.
pub(crate) struct Inner<S> {
    pub(crate) config: DisplayConfig,
    pub(crate) strategy: S,

    pub(crate) queue: Mutex<CommandQueue>,

    /// Try-acquire drain lock: set while a drain task is running. A
    /// failed acquire means the running drain will pick the new item up.
    pub(crate) drain_active: AtomicBool,

    /// Set before a send that requires acknowledgment; cleared by the
    /// interpreter on any decoded reply.
    pub(crate) ack_pending: AtomicBool,

    pub(crate) requested: Mutex<RequestedState>,
    pub(crate) power: Mutex<PowerTracker>,
    pub(crate) link: Mutex<LinkState>,
    pub(crate) cache: FeedbackCache,

    /// Applied once, at the first settled power-on without a caller
    /// volume intent.
    default_volume_applied: AtomicBool,

    pub(crate) transport: tokio::sync::Mutex<AnyTransport>,

    /// Runtime handle captured at construction. Setters are called from
    /// bridge threads that are not tokio workers; every task spawn goes
    /// through this handle so those calls never need a runtime context.
    pub(crate) runtime: tokio::runtime::Handle,
}

impl<S: ProtocolStrategy> DisplayController<S> {
    /// Create a controller over a transport and start its receive loop.
    ///
    /// `events` must be the receiver handed out by the transport's
    /// constructor; the controller consumes connectivity changes and
    /// inbound frames from it.
    pub fn new(
        config: DisplayConfig,
        strategy: S,
        transport: AnyTransport,
        events: mpsc::Receiver<TransportEvent>,
    ) -> Self {
        let inner = Arc::new(Inner {
            queue: Mutex::new(CommandQueue::new(config.flood_cap)),
            config,
            strategy,
            drain_active: AtomicBool::new(false),
            ack_pending: AtomicBool::new(false),
            requested: Mutex::new(RequestedState::new()),
            power: Mutex::new(PowerTracker::new()),
            link: Mutex::new(LinkState::Disconnected),
            cache: FeedbackCache::new(),
            default_volume_applied: AtomicBool::new(false),
            transport: tokio::sync::Mutex::new(transport),
            runtime: tokio::runtime::Handle::current(),
        });

        let receive_task = inner.runtime.spawn(Arc::clone(&inner).run_receive_loop(events));

        Self {
            inner,
            receive_task,
        }
    }

    /// Connect the underlying transport.
    pub async fn connect(&self) -> std::result::Result<(), TransportError> {
        self.inner.transport.lock().await.connect().await
    }

    /// Close the underlying transport.
    pub async fn close(&self) -> std::result::Result<(), TransportError> {
        self.inner.transport.lock().await.close().await
    }

    // ------------------------------------------------------------------
    // Power
    // ------------------------------------------------------------------

    pub fn power_on(&self) {
        self.request_power(PowerIntent::On);
    }

    pub fn power_off(&self) {
        self.request_power(PowerIntent::Off);
    }

    fn request_power(&self, intent: PowerIntent) {
        info!(%intent, "Power requested");
        self.inner.requested_mut().propose_power(intent);
        self.inner.try_start_power_transition(intent);
    }

    // ------------------------------------------------------------------
    // Dependent setters
    // ------------------------------------------------------------------

    /// Select an input by 1-based index.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if the index is 0 or above the
    /// configured input count.
    pub fn select_input(&self, index: u8) -> Result<()> {
        let input = InputSource::new(index)?;
        if index > self.inner.config.input_count {
            return Err(Error::InvalidInput(format!(
                "Device has {} inputs, got {index}",
                self.inner.config.input_count
            )));
        }

        self.inner.requested_mut().propose_input(input);
        self.inner.submit(self.inner.strategy.select_input(input));
        Ok(())
    }

    pub fn set_mute(&self, mute: bool) {
        self.inner.requested_mut().propose_mute(mute);
        self.inner.submit(self.inner.strategy.set_mute(mute));
    }

    pub fn toggle_mute(&self) {
        self.set_mute(!self.inner.cache.mute());
    }

    /// Set absolute volume on the external 0-65535 scale.
    pub fn set_volume(&self, external: u16) {
        self.inner.requested_mut().propose_volume(external);
        let native = self.inner.config.volume_range.to_device(external);
        self.inner.submit(self.inner.strategy.set_volume(native));
    }

    pub fn volume_up(&self) {
        self.inner.submit_volume_step(true);
    }

    pub fn volume_down(&self) {
        self.inner.submit_volume_step(false);
    }

    // ------------------------------------------------------------------
    // Polls
    // ------------------------------------------------------------------

    pub fn poll_power(&self) {
        self.inner.submit(self.inner.strategy.power_poll());
    }

    pub fn poll_status(&self) {
        self.inner.submit(self.inner.strategy.status_poll());
    }

    pub fn poll_lamp_hours(&self) {
        self.inner.submit(self.inner.strategy.lamp_poll());
    }

    // ------------------------------------------------------------------
    // Observation
    // ------------------------------------------------------------------

    /// Observable last-known device state, one watch channel per value.
    pub fn feedback(&self) -> &FeedbackCache {
        &self.inner.cache
    }

    pub fn power_state(&self) -> PowerState {
        self.inner.power().state()
    }

    pub fn link_state(&self) -> LinkState {
        *self.inner.link()
    }

    /// Commands currently queued, all lanes.
    pub fn pending_commands(&self) -> usize {
        self.inner.queue().len()
    }
}

impl<S: ProtocolStrategy> Drop for DisplayController<S> {
    fn drop(&mut self) {
        self.receive_task.abort();
    }
}

impl<S: ProtocolStrategy> Inner<S> {
    // Lock accessors. Poisoning means a panic inside one of these short
    // critical sections; nothing is recoverable at that point.

    pub(crate) fn queue(&self) -> MutexGuard<'_, CommandQueue> {
        self.queue.lock().expect("queue lock poisoned")
    }

    pub(crate) fn requested_mut(&self) -> MutexGuard<'_, RequestedState> {
        self.requested.lock().expect("requested lock poisoned")
    }

    pub(crate) fn power(&self) -> MutexGuard<'_, PowerTracker> {
        self.power.lock().expect("power lock poisoned")
    }

    pub(crate) fn link(&self) -> MutexGuard<'_, LinkState> {
        self.link.lock().expect("link lock poisoned")
    }

    /// Enqueue a command and trigger a drain.
    pub(crate) fn enqueue_and_kick(self: &Arc<Self>, command: Command) {
        self.queue().enqueue(command);
        self.kick_drain();
    }

    /// Enqueue a command if the link and power state currently allow it;
    /// otherwise drop it, leaving the recorded intent to be resynced.
    pub(crate) fn submit(self: &Arc<Self>, command: Command) {
        if !self.link().is_ready() {
            debug!(%command, "Link not ready, holding as requested intent");
            return;
        }

        let state = self.power().state();
        let category = command.category();
        let allowed = if category.allowed_while_transitioning() {
            true
        } else if category.is_poll() {
            !state.is_transitioning()
        } else {
            state.accepts_dependent_commands()
        };

        if allowed {
            self.enqueue_and_kick(command);
        } else {
            debug!(%command, %state, "Device not accepting command, holding as requested intent");
        }
    }

    /// Enqueue one volume ramp step plus its paired volume poll, so the
    /// cache converges on the real level once the burst drains.
    fn submit_volume_step(self: &Arc<Self>, up: bool) {
        if !self.link().is_ready() || !self.power().state().accepts_dependent_commands() {
            debug!("Dropping volume step, device not accepting commands");
            return;
        }
        {
            let mut queue = self.queue();
            queue.enqueue(self.strategy.volume_step(up));
            queue.enqueue(self.strategy.volume_poll());
        }
        self.kick_drain();
    }

    // ------------------------------------------------------------------
    // Power transitions
    // ------------------------------------------------------------------

    /// Start the transition for a recorded power intent, if the link is
    /// ready and the state machine allows it. Safe to call redundantly:
    /// a transition already moving toward the intent is left alone, and
    /// an intent the cycle cannot act on yet stays recorded for later.
    pub(crate) fn try_start_power_transition(self: &Arc<Self>, intent: PowerIntent) {
        if !self.link().is_ready() {
            debug!(%intent, "Link not ready, power intent held for resync");
            return;
        }

        let generation = {
            let mut power = self.power();
            if power.moving_toward(intent) {
                debug!(%intent, state = %power.state(), "Already moving toward requested power");
                return;
            }
            match power.begin_transition(intent) {
                Ok(generation) => generation,
                Err(_) => {
                    debug!(%intent, state = %power.state(), "Power intent deferred until current transition settles");
                    return;
                }
            }
        };

        self.cache
            .set_transitioning(intent == PowerIntent::On, intent == PowerIntent::Off);

        let command = match intent {
            PowerIntent::On => self.strategy.power_on(),
            PowerIntent::Off => self.strategy.power_off(),
        };
        self.enqueue_and_kick(command);

        self.spawn_transition_watchdog(intent, generation);
        self.spawn_transition_poll(generation);
    }

    /// Watchdog for one transition attempt. Re-issues the power command
    /// on each unconfirmed timeout up to the configured retry limit,
    /// then force-completes locally: a device that never confirms must
    /// not wedge the controller. Abandons instead if the link is down.
    fn spawn_transition_watchdog(self: &Arc<Self>, intent: PowerIntent, generation: u64) {
        let inner = Arc::clone(self);
        let wait = match intent {
            PowerIntent::On => self.config.warm_up,
            PowerIntent::Off => self.config.cool_down,
        };

        self.runtime.spawn(async move {
            loop {
                tokio::time::sleep(wait).await;

                {
                    let power = inner.power();
                    if power.generation() != generation || !power.state().is_transitioning() {
                        return; // confirmed or superseded while we slept
                    }
                }

                if !inner.link().is_ready() {
                    if let Some(reverted) = inner.power().abandon(generation) {
                        inner.requested_mut().clear_power();
                        inner.cache.set_transitioning(false, false);
                        warn!(%intent, state = %reverted, "Link lost during power transition, abandoning");
                    }
                    return;
                }

                let retries = inner.power().note_timeout();
                if retries > inner.config.transition_retry_limit {
                    warn!(%intent, retries, "Power transition never confirmed, forcing completion");
                    inner.finish_transition(generation);
                    return;
                }

                warn!(%intent, attempt = retries, "Power transition unconfirmed, re-issuing command");
                let command = match intent {
                    PowerIntent::On => inner.strategy.power_on(),
                    PowerIntent::Off => inner.strategy.power_off(),
                };
                inner.enqueue_and_kick(command);
            }
        });
    }

    /// Periodic power-status poll while the transition is in flight,
    /// cancelled by the generation check the moment it settles.
    fn spawn_transition_poll(self: &Arc<Self>, generation: u64) {
        let inner = Arc::clone(self);
        self.runtime.spawn(async move {
            loop {
                tokio::time::sleep(inner.config.transition_poll_interval).await;
                if inner.power().generation() != generation {
                    return;
                }
                inner.enqueue_and_kick(inner.strategy.power_poll());
            }
        });
    }

    /// Settle the transition the generation belongs to: publish the
    /// stable state, reconcile held intents, and action a deferred
    /// opposite power intent. No-op for stale generations.
    pub(crate) fn finish_transition(self: &Arc<Self>, generation: u64) {
        let Some(settled) = self.power().complete(generation) else {
            return;
        };

        self.cache.set_transitioning(false, false);
        self.cache.set_power(settled == PowerState::On);
        self.requested_mut().confirm_power(settled);
        info!(state = %settled, "Power transition settled");

        if settled == PowerState::On {
            self.apply_default_volume_once();
            self.resync_dependents();
        }

        let deferred = self.requested_mut().power();
        if let Some(intent) = deferred {
            if intent.target_state() != settled {
                info!(%intent, "Actioning deferred power intent");
                self.try_start_power_transition(intent);
            }
        }
    }

    /// Seed the configured default volume at the first power-on, unless
    /// a caller already asked for a level.
    fn apply_default_volume_once(self: &Arc<Self>) {
        if self.default_volume_applied.swap(true, Ordering::AcqRel) {
            return;
        }
        let mut requested = self.requested_mut();
        if requested.volume().is_none() {
            requested.propose_volume(self.config.default_volume);
        }
    }

    /// Re-issue held input/mute/volume intents as fresh commands.
    pub(crate) fn resync_dependents(self: &Arc<Self>) {
        let snapshot = self.requested_mut().clone();
        let mut any = false;
        {
            let mut queue = self.queue();
            if let Some(input) = snapshot.input() {
                debug!(%input, "Resyncing input intent");
                queue.enqueue(self.strategy.select_input(input));
                any = true;
            }
            if let Some(mute) = snapshot.mute() {
                debug!(mute, "Resyncing mute intent");
                queue.enqueue(self.strategy.set_mute(mute));
                any = true;
            }
            if let Some(volume) = snapshot.volume() {
                debug!(volume, "Resyncing volume intent");
                let native = self.config.volume_range.to_device(volume);
                queue.enqueue(self.strategy.set_volume(native));
                any = true;
            }
        }
        if any {
            self.kick_drain();
        }
    }

    /// Full resync on the not-ready to ready edge: learn the device's
    /// actual power state, restart any held power intent, and re-issue
    /// dependent intents if the device is already usable.
    pub(crate) fn resync(self: &Arc<Self>) {
        self.enqueue_and_kick(self.strategy.power_poll());

        let intent = self.requested_mut().power();
        if let Some(intent) = intent {
            self.try_start_power_transition(intent);
        }

        if self.power().state().accepts_dependent_commands() {
            self.resync_dependents();
        }
    }

    /// External pacing delay for a category.
    pub(crate) fn pacing_for(&self, category: CommandCategory) -> std::time::Duration {
        match category.pacing_class() {
            lumen_protocol::PacingClass::Power => self.config.power_pacing,
            lumen_protocol::PacingClass::Standard => self.config.command_pacing,
        }
    }
}
