//! Core constants for the display controller.
//!
//! This module centralizes the timing and sizing parameters shared by the
//! command queue, dispatcher, and power state machine. Values are derived
//! from observed behavior of serial/TCP-controlled projectors and flat
//! panels: such devices process one command at a time, need inter-command
//! spacing, and take tens of seconds to power up or down.
//!
//! Per-device overrides belong in [`DisplayConfig`](crate::DisplayConfig);
//! the constants here are the defaults and hard bounds.

use std::time::Duration;

// ============================================================================
// Command Pacing
// ============================================================================

/// Default inter-command delay for ordinary commands.
///
/// Sent after every transmitted command before the next one may go out.
/// Displays ignore or corrupt commands that arrive back-to-back on the
/// control port; 100 ms is the smallest spacing that is reliable across
/// the supported dialects.
pub const DEFAULT_COMMAND_PACING: Duration = Duration::from_millis(100);

/// Inter-command delay for power transition commands.
///
/// Power on/off puts the device firmware into a busy window noticeably
/// longer than ordinary command processing.
pub const POWER_COMMAND_PACING: Duration = Duration::from_millis(500);

/// Interval between acknowledgment poll checks while the dispatcher waits
/// for a reply-required command to be confirmed.
pub const ACK_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Number of [`ACK_POLL_INTERVAL`] periods the dispatcher waits for an
/// acknowledgment before logging a diagnostic and moving on.
///
/// 20 polls at 100 ms bounds the wait at 2 seconds. The timed-out command
/// is not retried; automatic retry would risk duplicate side effects for
/// non-idempotent commands.
pub const ACK_POLL_COUNT: u32 = 20;

// ============================================================================
// Power Transitions
// ============================================================================

/// Default warm-up interval after a power-on command.
///
/// The device accepts a power command immediately but will not reliably
/// act on input/mute/volume commands until this interval elapses.
/// Vendor manuals quote 15-60 s; 30 s is a safe middle default.
pub const DEFAULT_WARM_UP: Duration = Duration::from_secs(30);

/// Default cool-down interval after a power-off command.
pub const DEFAULT_COOL_DOWN: Duration = Duration::from_secs(30);

/// Interval between power-status polls while warming up or cooling down.
///
/// Polling detects early confirmation (device reports the target state
/// before the timer elapses) and regression (device still reports "off"
/// while expected to be warming).
pub const TRANSITION_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Number of unconfirmed timer expiries tolerated for one power
/// transition, each re-issuing the power command.
///
/// Past the limit the transition is completed locally with a warning. A
/// mute device must not wedge the controller forever; the next power
/// poll corrects the state if the guess was wrong.
pub const TRANSITION_RETRY_LIMIT: u8 = 2;

// ============================================================================
// Queue Sizing
// ============================================================================

/// Maximum number of entries in the flood-limited lane.
///
/// The flood lane carries continuous-repeat commands such as volume
/// ramping, where only the newest entries matter. Exceeding the cap
/// clears the lane before appending.
pub const FLOOD_LANE_CAP: usize = 5;

// ============================================================================
// Volume Scaling
// ============================================================================

/// Upper bound of the external (bridge-facing) volume scale.
///
/// Public setters accept 0-65535 regardless of the device's native
/// range; [`VolumeRange`](crate::VolumeRange) maps between the two.
pub const EXTERNAL_VOLUME_MAX: u16 = u16::MAX;

// ============================================================================
// Input Sources
// ============================================================================

/// Highest selectable input index supported by any dialect.
pub const MAX_INPUT_SOURCES: u8 = 16;
