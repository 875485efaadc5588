//! Inbound feedback model.
//!
//! Every frame the device sends maps to exactly one [`Feedback`] value.
//! The interpreter in the controller crate consumes these to update the
//! cached device state and to confirm or resync pending intents.

use std::fmt;

/// A decoded inbound message from the device.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Feedback {
    /// Device reports its power state (true = on).
    Power(bool),

    /// Device reports the active input index (1-based).
    Input(u8),

    /// Device reports audio mute state.
    Mute(bool),

    /// Device reports volume on its native scale.
    Volume(u16),

    /// Device reports cumulative lamp hours.
    LampHours(u32),

    /// Device reports an error condition as free text.
    DeviceError(String),

    /// Generic acknowledgment: command accepted.
    Ack,

    /// Explicit rejection with a vendor error code.
    Nack(String),

    /// Device signals it is ready to accept command traffic
    /// (post-handshake identification or equivalent).
    Ready,
}

impl fmt::Display for Feedback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Feedback::Power(on) => write!(f, "Power({})", if *on { "on" } else { "off" }),
            Feedback::Input(i) => write!(f, "Input({i})"),
            Feedback::Mute(m) => write!(f, "Mute({m})"),
            Feedback::Volume(v) => write!(f, "Volume({v})"),
            Feedback::LampHours(h) => write!(f, "LampHours({h})"),
            Feedback::DeviceError(text) => write!(f, "DeviceError({text})"),
            Feedback::Ack => write!(f, "Ack"),
            Feedback::Nack(code) => write!(f, "Nack({code})"),
            Feedback::Ready => write!(f, "Ready"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_formatting() {
        assert_eq!(Feedback::Power(true).to_string(), "Power(on)");
        assert_eq!(Feedback::Input(3).to_string(), "Input(3)");
        assert_eq!(Feedback::Nack("02".into()).to_string(), "Nack(02)");
    }
}
