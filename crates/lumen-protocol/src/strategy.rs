//! Vendor protocol strategy seam.
//!
//! The controller core never knows a vendor wire format. Everything
//! dialect-specific lives behind [`ProtocolStrategy`]: building command
//! payloads, applying wire framing (delimiters, checksums), and decoding
//! inbound frames into [`Feedback`].
//!
//! A strategy is pure and synchronous: byte transformation only, no I/O
//! and no state. That keeps each vendor dialect trivially unit-testable
//! and lets the dispatcher and interpreter share one instance.

use bytes::Bytes;
use lumen_core::{InputSource, Result};

use crate::{Command, CommandCategory, Feedback};

/// A pluggable vendor protocol dialect.
pub trait ProtocolStrategy: Send + Sync + 'static {
    /// Human-readable dialect name, used in logs.
    fn name(&self) -> &'static str;

    // ------------------------------------------------------------------
    // Command construction
    // ------------------------------------------------------------------

    fn power_on(&self) -> Command;
    fn power_off(&self) -> Command;
    fn power_poll(&self) -> Command;
    fn select_input(&self, input: InputSource) -> Command;
    fn set_mute(&self, mute: bool) -> Command;

    /// Set absolute volume on the device's native scale.
    fn set_volume(&self, native: u16) -> Command;

    /// Single volume ramp step (flood lane).
    fn volume_step(&self, up: bool) -> Command;

    fn volume_poll(&self) -> Command;
    fn status_poll(&self) -> Command;
    fn lamp_poll(&self) -> Command;

    /// Login/identification command required before the device accepts
    /// traffic, for dialects that need one.
    fn handshake(&self) -> Option<Command> {
        None
    }

    // ------------------------------------------------------------------
    // Wire format
    // ------------------------------------------------------------------

    /// Apply wire framing to a command payload (delimiters, checksum).
    fn frame(&self, command: &Command) -> Bytes;

    /// Decode one inbound frame (delimiter already stripped) into
    /// feedback.
    ///
    /// # Errors
    ///
    /// Returns a protocol error for malformed frames. Callers treat this
    /// as transient noise, not a fatal condition.
    fn decode(&self, frame: &[u8]) -> Result<Feedback>;

    /// Frame delimiter byte this dialect terminates messages with.
    fn delimiter(&self) -> u8;

    /// True if the dialect acknowledges this command category and the
    /// dispatcher must wait for the ack before sending the next command.
    fn requires_ack(&self, _category: CommandCategory) -> bool {
        false
    }
}
