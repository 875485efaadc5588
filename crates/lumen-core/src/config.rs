//! Per-device configuration.
//!
//! Every controller instance receives one immutable [`DisplayConfig`] at
//! construction. There is no process-wide registry and no hot reload;
//! reconfiguration means constructing a new controller.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    Result,
    constants::{
        ACK_POLL_COUNT, ACK_POLL_INTERVAL, DEFAULT_COMMAND_PACING, DEFAULT_COOL_DOWN,
        DEFAULT_WARM_UP, FLOOD_LANE_CAP, MAX_INPUT_SOURCES, POWER_COMMAND_PACING,
        TRANSITION_POLL_INTERVAL, TRANSITION_RETRY_LIMIT,
    },
    error::Error,
    types::VolumeRange,
};

/// Immutable configuration for a single display controller.
///
/// Construct with [`DisplayConfig::builder`]; `Default` yields values
/// safe for a generic projector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Volume applied at first power-on when no caller intent exists
    /// (external 0-65535 scale).
    pub default_volume: u16,

    /// External volume change per volume-step command.
    pub volume_step: u16,

    /// Native volume range of the device.
    pub volume_range: VolumeRange,

    /// Number of selectable inputs on this device.
    pub input_count: u8,

    /// Warm-up interval after power-on.
    pub warm_up: Duration,

    /// Cool-down interval after power-off.
    pub cool_down: Duration,

    /// Inter-command pacing for ordinary commands.
    pub command_pacing: Duration,

    /// Inter-command pacing after power commands.
    pub power_pacing: Duration,

    /// Power-status poll cadence during warm-up/cool-down.
    pub transition_poll_interval: Duration,

    /// Unconfirmed transition timeouts tolerated (each re-issuing the
    /// power command) before the transition is completed locally.
    pub transition_retry_limit: u8,

    /// Acknowledgment wait, expressed as poll count and interval.
    pub ack_poll_count: u32,
    pub ack_poll_interval: Duration,

    /// Flood-limited lane capacity.
    pub flood_cap: usize,

    /// Key of a linked device that handles video mute on this display's
    /// behalf, when the vendor protocol has no native video mute.
    pub video_mute_link: Option<String>,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            default_volume: u16::MAX / 2,
            volume_step: 2048,
            volume_range: VolumeRange::default(),
            input_count: 4,
            warm_up: DEFAULT_WARM_UP,
            cool_down: DEFAULT_COOL_DOWN,
            command_pacing: DEFAULT_COMMAND_PACING,
            power_pacing: POWER_COMMAND_PACING,
            transition_poll_interval: TRANSITION_POLL_INTERVAL,
            transition_retry_limit: TRANSITION_RETRY_LIMIT,
            ack_poll_count: ACK_POLL_COUNT,
            ack_poll_interval: ACK_POLL_INTERVAL,
            flood_cap: FLOOD_LANE_CAP,
            video_mute_link: None,
        }
    }
}

impl DisplayConfig {
    /// Create a builder seeded with defaults.
    pub fn builder() -> DisplayConfigBuilder {
        DisplayConfigBuilder::default()
    }
}

/// Builder for [`DisplayConfig`] with validation at `build()`.
///
/// # Examples
///
/// ```
/// use lumen_core::{DisplayConfig, VolumeRange};
/// use std::time::Duration;
///
/// let config = DisplayConfig::builder()
///     .input_count(6)
///     .volume_range(VolumeRange::new(0, 31).unwrap())
///     .warm_up(Duration::from_secs(20))
///     .build()
///     .unwrap();
/// assert_eq!(config.input_count, 6);
/// ```
#[derive(Debug, Default)]
pub struct DisplayConfigBuilder {
    config: DisplayConfig,
}

impl DisplayConfigBuilder {
    pub fn default_volume(mut self, volume: u16) -> Self {
        self.config.default_volume = volume;
        self
    }

    pub fn volume_step(mut self, step: u16) -> Self {
        self.config.volume_step = step;
        self
    }

    pub fn volume_range(mut self, range: VolumeRange) -> Self {
        self.config.volume_range = range;
        self
    }

    pub fn input_count(mut self, count: u8) -> Self {
        self.config.input_count = count;
        self
    }

    pub fn warm_up(mut self, interval: Duration) -> Self {
        self.config.warm_up = interval;
        self
    }

    pub fn cool_down(mut self, interval: Duration) -> Self {
        self.config.cool_down = interval;
        self
    }

    pub fn command_pacing(mut self, pacing: Duration) -> Self {
        self.config.command_pacing = pacing;
        self
    }

    pub fn power_pacing(mut self, pacing: Duration) -> Self {
        self.config.power_pacing = pacing;
        self
    }

    pub fn transition_poll_interval(mut self, interval: Duration) -> Self {
        self.config.transition_poll_interval = interval;
        self
    }

    pub fn transition_retry_limit(mut self, limit: u8) -> Self {
        self.config.transition_retry_limit = limit;
        self
    }

    pub fn ack_polls(mut self, count: u32, interval: Duration) -> Self {
        self.config.ack_poll_count = count;
        self.config.ack_poll_interval = interval;
        self
    }

    pub fn flood_cap(mut self, cap: usize) -> Self {
        self.config.flood_cap = cap;
        self
    }

    pub fn video_mute_link(mut self, key: impl Into<String>) -> Self {
        self.config.video_mute_link = Some(key.into());
        self
    }

    /// Build the configuration with validation.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if:
    /// - `input_count` is 0 or above [`MAX_INPUT_SOURCES`]
    /// - `volume_step` is 0
    /// - `flood_cap` is 0
    /// - any timer duration is zero
    pub fn build(self) -> Result<DisplayConfig> {
        let c = &self.config;

        if c.input_count == 0 || c.input_count > MAX_INPUT_SOURCES {
            return Err(Error::Config(format!(
                "input_count must be 1-{MAX_INPUT_SOURCES}, got {}",
                c.input_count
            )));
        }
        if c.volume_step == 0 {
            return Err(Error::Config("volume_step must be non-zero".to_string()));
        }
        if c.flood_cap == 0 {
            return Err(Error::Config("flood_cap must be non-zero".to_string()));
        }
        for (name, d) in [
            ("warm_up", c.warm_up),
            ("cool_down", c.cool_down),
            ("command_pacing", c.command_pacing),
            ("power_pacing", c.power_pacing),
            ("transition_poll_interval", c.transition_poll_interval),
            ("ack_poll_interval", c.ack_poll_interval),
        ] {
            if d.is_zero() {
                return Err(Error::Config(format!("{name} must be non-zero")));
            }
        }

        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_builds() {
        let config = DisplayConfig::builder().build().unwrap();
        assert_eq!(config.flood_cap, FLOOD_LANE_CAP);
        assert_eq!(config.transition_retry_limit, TRANSITION_RETRY_LIMIT);
        assert!(config.video_mute_link.is_none());
    }

    #[test]
    fn test_builder_overrides() {
        let config = DisplayConfig::builder()
            .input_count(8)
            .volume_step(1000)
            .warm_up(Duration::from_secs(15))
            .video_mute_link("relay-3")
            .build()
            .unwrap();

        assert_eq!(config.input_count, 8);
        assert_eq!(config.volume_step, 1000);
        assert_eq!(config.warm_up, Duration::from_secs(15));
        assert_eq!(config.video_mute_link.as_deref(), Some("relay-3"));
    }

    #[test]
    fn test_builder_rejects_zero_input_count() {
        assert!(DisplayConfig::builder().input_count(0).build().is_err());
    }

    #[test]
    fn test_builder_rejects_excess_input_count() {
        assert!(
            DisplayConfig::builder()
                .input_count(MAX_INPUT_SOURCES + 1)
                .build()
                .is_err()
        );
    }

    #[test]
    fn test_builder_rejects_zero_timers() {
        assert!(
            DisplayConfig::builder()
                .warm_up(Duration::ZERO)
                .build()
                .is_err()
        );
        assert!(
            DisplayConfig::builder()
                .command_pacing(Duration::ZERO)
                .build()
                .is_err()
        );
    }

    #[test]
    fn test_builder_rejects_zero_flood_cap() {
        assert!(DisplayConfig::builder().flood_cap(0).build().is_err());
    }
}
