//! Outbound command model.
//!
//! A [`Command`] is an atomic instruction: a category plus the literal
//! payload a vendor strategy produced for it. Commands are immutable once
//! created; the queue owns them until dequeue, the dispatcher until
//! send/ack completes, then they are discarded.
//!
//! The category determines queue placement and semantics:
//!
//! | Category | Lane | Behavior on duplicate |
//! |----------|------|-----------------------|
//! | PowerOn / PowerOff / Handshake | priority | append (order-significant) |
//! | SetInput / SetMute / SetVolume | normal | replace in place |
//! | PowerPoll / VolumePoll / StatusPoll / LampPoll | normal | move to end |
//! | VolumeStep | flood | capped lane, oldest dropped |

use bytes::Bytes;
use std::fmt;

/// Queue lane a command is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lane {
    /// Power commands; drained before the normal lane.
    Priority,

    /// Ordinary commands; FIFO with supersede rules.
    Normal,

    /// Continuous-repeat commands (volume ramping); capped length,
    /// drained as a burst before anything else.
    Flood,
}

/// What enqueue does when the normal lane already holds a command of the
/// same category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueBehavior {
    /// Always append at the tail.
    Append,

    /// Overwrite the existing entry in place, preserving its position.
    /// Used for idempotent setters where only the latest value matters.
    Replace,

    /// Remove any existing instance and append at the tail. Used for
    /// status polls, which are only useful as the freshest request.
    MoveToEnd,
}

/// Pacing class applied after a command is transmitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacingClass {
    /// Ordinary inter-command delay.
    Standard,

    /// Longer delay; the device firmware is busy after power commands.
    Power,
}

/// Category of an outbound command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandCategory {
    PowerOn,
    PowerOff,
    PowerPoll,
    SetInput,
    SetMute,
    SetVolume,
    VolumeStep,
    VolumePoll,
    StatusPoll,
    LampPoll,
    Handshake,
}

impl CommandCategory {
    /// Queue lane for this category.
    pub fn lane(&self) -> Lane {
        match self {
            Self::PowerOn | Self::PowerOff | Self::Handshake => Lane::Priority,
            Self::VolumeStep => Lane::Flood,
            _ => Lane::Normal,
        }
    }

    /// Duplicate handling within the normal lane.
    pub fn queue_behavior(&self) -> QueueBehavior {
        match self {
            Self::SetInput | Self::SetMute | Self::SetVolume => QueueBehavior::Replace,
            Self::PowerPoll | Self::VolumePoll | Self::StatusPoll | Self::LampPoll => {
                QueueBehavior::MoveToEnd
            }
            _ => QueueBehavior::Append,
        }
    }

    /// Pacing applied after transmission.
    pub fn pacing_class(&self) -> PacingClass {
        match self {
            Self::PowerOn | Self::PowerOff => PacingClass::Power,
            _ => PacingClass::Standard,
        }
    }

    /// True for read-only status requests.
    pub fn is_poll(&self) -> bool {
        matches!(
            self,
            Self::PowerPoll | Self::VolumePoll | Self::StatusPoll | Self::LampPoll
        )
    }

    /// True for commands that may be sent while the device is warming up
    /// or cooling down. Everything else is held as requested intent.
    pub fn allowed_while_transitioning(&self) -> bool {
        matches!(
            self,
            Self::PowerOn | Self::PowerOff | Self::PowerPoll | Self::Handshake
        )
    }
}

impl fmt::Display for CommandCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::PowerOn => "PowerOn",
            Self::PowerOff => "PowerOff",
            Self::PowerPoll => "PowerPoll",
            Self::SetInput => "SetInput",
            Self::SetMute => "SetMute",
            Self::SetVolume => "SetVolume",
            Self::VolumeStep => "VolumeStep",
            Self::VolumePoll => "VolumePoll",
            Self::StatusPoll => "StatusPoll",
            Self::LampPoll => "LampPoll",
            Self::Handshake => "Handshake",
        };
        write!(f, "{}", s)
    }
}

/// An atomic outbound instruction.
///
/// The payload is the dialect's literal command body; wire framing
/// (delimiters, checksum) is applied by the strategy at transmit time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    category: CommandCategory,
    payload: Bytes,
}

impl Command {
    /// Create a new command.
    pub fn new(category: CommandCategory, payload: impl Into<Bytes>) -> Self {
        Self {
            category,
            payload: payload.into(),
        }
    }

    pub fn category(&self) -> CommandCategory {
        self.category
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Lane this command is routed to.
    pub fn lane(&self) -> Lane {
        self.category.lane()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({} bytes)", self.category, self.payload.len())
    }
}
