//! Power transition tracking.
//!
//! [`PowerTracker`] owns the controller's view of the device power
//! state and the bookkeeping around warm-up/cool-down: a generation
//! counter that cancels stale watchdog and poll tasks, and a retry
//! counter for transitions that time out without confirmation.
//!
//! The tracker is synchronous and lock-free by itself; the controller
//! guards it with one short-held mutex because caller threads and the
//! feedback interpreter both mutate it.
//!
//! # Generations
//!
//! Every transition start and every transition end bumps `generation`.
//! Watchdog and poll tasks capture the generation at spawn and check it
//! before acting, so a transition confirmed by feedback instantly
//! invalidates the timers that were racing it. No task handle juggling,
//! no explicit cancellation tokens.

use tracing::{debug, warn};

use lumen_core::{Error, PowerIntent, PowerState, Result};

/// Controller-side power state machine.
#[derive(Debug)]
pub struct PowerTracker {
    state: PowerState,

    /// Bumped on every transition start and end; stale-task guard.
    generation: u64,

    /// Unconfirmed transition timeouts since the last confirmation.
    retries: u8,
}

impl PowerTracker {
    pub fn new() -> Self {
        Self {
            state: PowerState::Off,
            generation: 0,
            retries: 0,
        }
    }

    pub fn state(&self) -> PowerState {
        self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn retries(&self) -> u8 {
        self.retries
    }

    /// True if the current state already is, or is heading toward, the
    /// intent's target. A second identical request while this holds must
    /// not emit another power command.
    pub fn moving_toward(&self, intent: PowerIntent) -> bool {
        self.state.settles_to() == intent.target_state()
    }

    /// Enter the transient state for the given intent.
    ///
    /// Returns the generation token the caller hands to watchdog and
    /// poll tasks.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidStateTransition` if the cycle does not
    /// permit the move (e.g. power-on while cooling down).
    pub fn begin_transition(&mut self, intent: PowerIntent) -> Result<u64> {
        let target = match intent {
            PowerIntent::On => PowerState::WarmingUp,
            PowerIntent::Off => PowerState::CoolingDown,
        };

        if !self.state.can_transition_to(&target) {
            return Err(Error::InvalidStateTransition {
                from: self.state.to_string(),
                to: target.to_string(),
            });
        }

        debug!(from = %self.state, to = %target, "Power transition started");
        self.state = target;
        self.generation += 1;
        Ok(self.generation)
    }

    /// Settle the transition the given generation belongs to.
    ///
    /// Returns the new stable state, or `None` if the generation is
    /// stale (the transition already ended some other way).
    pub fn complete(&mut self, generation: u64) -> Option<PowerState> {
        if generation != self.generation || !self.state.is_transitioning() {
            return None;
        }

        let settled = self.state.settles_to();
        debug!(from = %self.state, to = %settled, "Power transition completed");
        self.state = settled;
        self.generation += 1;
        self.retries = 0;
        Some(settled)
    }

    /// Abandon the transition the given generation belongs to, reverting
    /// to the stable state it started from.
    ///
    /// Returns the reverted state, or `None` if the generation is stale.
    pub fn abandon(&mut self, generation: u64) -> Option<PowerState> {
        if generation != self.generation || !self.state.is_transitioning() {
            return None;
        }

        let reverted = match self.state {
            PowerState::WarmingUp => PowerState::Off,
            PowerState::CoolingDown => PowerState::On,
            other => other,
        };
        warn!(from = %self.state, to = %reverted, "Power transition abandoned");
        self.state = reverted;
        self.generation += 1;
        self.retries = 0;
        Some(reverted)
    }

    /// Record an unconfirmed transition timeout; returns the new count.
    pub fn note_timeout(&mut self) -> u8 {
        self.retries = self.retries.saturating_add(1);
        self.retries
    }

    /// Overwrite the state from trusted device feedback that contradicts
    /// the controller's view (e.g. the device reports on while we
    /// believed it off). Ends any transition in flight.
    pub fn force_set(&mut self, state: PowerState) {
        if self.state != state {
            warn!(from = %self.state, to = %state, "Power state forced from feedback");
            self.state = state;
            self.generation += 1;
            self.retries = 0;
        }
    }
}

impl Default for PowerTracker {
    fn default() -> Self {
        Self::new()
    }
}
