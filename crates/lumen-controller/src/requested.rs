//! Outstanding user intent ("requested state") ledger.
//!
//! Every caller-facing setter records what the caller wants before any
//! command hits the wire. Each entry is cleared only when device
//! feedback confirms it, so after a disconnect, a warm-up, or a
//! handshake the ledger still holds everything that needs to be
//! re-issued ("resync").
//!
//! The ledger is a single owner for all four intents with explicit
//! propose/confirm/clear operations; the controller wraps it in one
//! short-held mutex because caller threads and the feedback interpreter
//! both mutate it.

use lumen_core::{InputSource, PowerIntent, PowerState};

/// Pending user intent awaiting device confirmation.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RequestedState {
    power: Option<PowerIntent>,
    input: Option<InputSource>,
    mute: Option<bool>,

    /// External 0-65535 scale; converted to the native range at
    /// command-construction time.
    volume: Option<u16>,
}

impl RequestedState {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Propose
    // ------------------------------------------------------------------

    /// Record a power intent. A power-off intent invalidates the
    /// dependent intents: there is no point selecting an input on a
    /// display that is being shut down.
    pub fn propose_power(&mut self, intent: PowerIntent) {
        self.power = Some(intent);
        if intent == PowerIntent::Off {
            self.clear_dependents();
        }
    }

    pub fn propose_input(&mut self, input: InputSource) {
        self.input = Some(input);
    }

    pub fn propose_mute(&mut self, mute: bool) {
        self.mute = Some(mute);
    }

    pub fn propose_volume(&mut self, external: u16) {
        self.volume = Some(external);
    }

    // ------------------------------------------------------------------
    // Confirm (feedback-driven)
    // ------------------------------------------------------------------

    /// Clear the power intent if the observed state satisfies it.
    /// Returns true if an intent was confirmed.
    pub fn confirm_power(&mut self, observed: PowerState) -> bool {
        match self.power {
            Some(intent) if intent.target_state() == observed => {
                self.power = None;
                true
            }
            _ => false,
        }
    }

    pub fn confirm_input(&mut self, observed: u8) -> bool {
        match self.input {
            Some(input) if input.index() == observed => {
                self.input = None;
                true
            }
            _ => false,
        }
    }

    pub fn confirm_mute(&mut self, observed: bool) -> bool {
        match self.mute {
            Some(mute) if mute == observed => {
                self.mute = None;
                true
            }
            _ => false,
        }
    }

    /// Clear the volume intent if the observed external level is within
    /// one native step of it. Exact equality is unattainable after the
    /// 0-65535 to native-range round trip.
    pub fn confirm_volume(&mut self, observed: u16, step_slack: u16) -> bool {
        match self.volume {
            Some(wanted) if wanted.abs_diff(observed) <= step_slack => {
                self.volume = None;
                true
            }
            _ => false,
        }
    }

    // ------------------------------------------------------------------
    // Clear / inspect
    // ------------------------------------------------------------------

    /// Drop input/mute/volume intents, keeping any power intent.
    pub fn clear_dependents(&mut self) {
        self.input = None;
        self.mute = None;
        self.volume = None;
    }

    /// Drop the power intent (transition abandoned).
    pub fn clear_power(&mut self) {
        self.power = None;
    }

    pub fn power(&self) -> Option<PowerIntent> {
        self.power
    }

    pub fn input(&self) -> Option<InputSource> {
        self.input
    }

    pub fn mute(&self) -> Option<bool> {
        self.mute
    }

    pub fn volume(&self) -> Option<u16> {
        self.volume
    }

    pub fn has_pending(&self) -> bool {
        self.power.is_some() || self.input.is_some() || self.mute.is_some() || self.volume.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_off_clears_dependents() {
        let mut requested = RequestedState::new();
        requested.propose_input(InputSource::new(2).unwrap());
        requested.propose_mute(true);
        requested.propose_volume(30000);

        requested.propose_power(PowerIntent::Off);

        assert_eq!(requested.power(), Some(PowerIntent::Off));
        assert!(requested.input().is_none());
        assert!(requested.mute().is_none());
        assert!(requested.volume().is_none());
    }

    #[test]
    fn test_power_on_keeps_dependents() {
        let mut requested = RequestedState::new();
        requested.propose_input(InputSource::new(2).unwrap());
        requested.propose_power(PowerIntent::On);

        assert!(requested.input().is_some());
    }

    #[test]
    fn test_confirm_power_requires_matching_state() {
        let mut requested = RequestedState::new();
        requested.propose_power(PowerIntent::On);

        assert!(!requested.confirm_power(PowerState::Off));
        assert_eq!(requested.power(), Some(PowerIntent::On));

        assert!(requested.confirm_power(PowerState::On));
        assert!(requested.power().is_none());

        // Second confirmation is a no-op.
        assert!(!requested.confirm_power(PowerState::On));
    }

    #[test]
    fn test_confirm_input_exact_match() {
        let mut requested = RequestedState::new();
        requested.propose_input(InputSource::new(3).unwrap());

        assert!(!requested.confirm_input(2));
        assert!(requested.confirm_input(3));
        assert!(requested.input().is_none());
    }

    #[test]
    fn test_confirm_volume_within_slack() {
        let mut requested = RequestedState::new();
        requested.propose_volume(32768);

        assert!(!requested.confirm_volume(20000, 2114));
        assert!(requested.confirm_volume(32000, 2114));
        assert!(requested.volume().is_none());
    }

    #[test]
    fn test_has_pending() {
        let mut requested = RequestedState::new();
        assert!(!requested.has_pending());

        requested.propose_mute(false);
        assert!(requested.has_pending());

        assert!(requested.confirm_mute(false));
        assert!(!requested.has_pending());
    }
}
