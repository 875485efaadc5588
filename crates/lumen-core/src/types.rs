use crate::{
    Result,
    constants::{EXTERNAL_VOLUME_MAX, MAX_INPUT_SOURCES},
    error::Error,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Selectable input source (1-based index).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InputSource(u8);

impl InputSource {
    /// Create a new input source with validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidInput` if the index is 0 or above
    /// [`MAX_INPUT_SOURCES`].
    pub fn new(index: u8) -> Result<Self> {
        if index == 0 || index > MAX_INPUT_SOURCES {
            return Err(Error::InvalidInput(format!(
                "Input index must be 1-{MAX_INPUT_SOURCES}, got {index}"
            )));
        }
        Ok(InputSource(index))
    }

    /// Get the raw 1-based index.
    #[must_use]
    pub fn index(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "input{}", self.0)
    }
}

impl std::str::FromStr for InputSource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let index: u8 = s
            .trim()
            .parse()
            .map_err(|_| Error::InvalidInput(format!("Invalid input index: {s}")))?;
        InputSource::new(index)
    }
}

/// Native volume range of a device (inclusive bounds).
///
/// Bridge-facing volume is always 0-65535; each device exposes its own
/// much smaller native range (commonly 0-31 or 0-100). This type owns
/// the scaling in both directions so the conversion is done in exactly
/// one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeRange {
    min: u16,
    max: u16,
}

impl VolumeRange {
    /// Create a new range with validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidVolume` if `min >= max`.
    pub fn new(min: u16, max: u16) -> Result<Self> {
        if min >= max {
            return Err(Error::InvalidVolume(format!(
                "Volume range must satisfy min < max, got {min}..={max}"
            )));
        }
        Ok(VolumeRange { min, max })
    }

    #[must_use]
    pub fn min(&self) -> u16 {
        self.min
    }

    #[must_use]
    pub fn max(&self) -> u16 {
        self.max
    }

    /// Number of native steps in the range.
    #[must_use]
    pub fn span(&self) -> u16 {
        self.max - self.min
    }

    /// Scale an external 0-65535 level to the native range, rounding to
    /// the nearest native step.
    #[must_use]
    pub fn to_device(&self, external: u16) -> u16 {
        let span = u32::from(self.span());
        let scaled = (u32::from(external) * span + u32::from(EXTERNAL_VOLUME_MAX) / 2)
            / u32::from(EXTERNAL_VOLUME_MAX);
        self.min + scaled as u16
    }

    /// Scale a native level back to the external 0-65535 range.
    ///
    /// Values outside the range are clamped; devices occasionally report
    /// transient out-of-range values during power transitions.
    #[must_use]
    pub fn to_external(&self, native: u16) -> u16 {
        let native = native.clamp(self.min, self.max);
        let span = u32::from(self.span());
        let scaled =
            (u32::from(native - self.min) * u32::from(EXTERNAL_VOLUME_MAX) + span / 2) / span;
        scaled as u16
    }
}

impl Default for VolumeRange {
    fn default() -> Self {
        VolumeRange { min: 0, max: 100 }
    }
}

/// Power state of the controlled display.
///
/// Transitions are timer-driven and feedback-driven; callers never set
/// the state directly. The cycle is
/// `Off -> WarmingUp -> On -> CoolingDown -> Off`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerState {
    /// Device is powered down and will only accept power-on.
    Off,

    /// Power-on issued; device not yet usable. Input/mute/volume intents
    /// are held until warm-up completes.
    WarmingUp,

    /// Device is up and accepting all commands.
    On,

    /// Power-off issued; device draining. Only power commands are
    /// meaningful until cool-down completes.
    CoolingDown,
}

impl PowerState {
    /// Check if transition to the target state is valid from this state.
    pub fn can_transition_to(&self, target: &PowerState) -> bool {
        matches!(
            (self, target),
            (PowerState::Off, PowerState::WarmingUp)
                | (PowerState::WarmingUp, PowerState::On)
                | (PowerState::On, PowerState::CoolingDown)
                | (PowerState::CoolingDown, PowerState::Off)
        )
    }

    /// True while the device is between stable power states.
    ///
    /// At most one of warming/cooling can hold at a time because both are
    /// variants of the same enum.
    #[must_use]
    pub fn is_transitioning(&self) -> bool {
        matches!(self, PowerState::WarmingUp | PowerState::CoolingDown)
    }

    /// True when dependent commands (input/mute/volume) may be sent.
    #[must_use]
    pub fn accepts_dependent_commands(&self) -> bool {
        matches!(self, PowerState::On)
    }

    /// The stable state this transition is heading toward.
    ///
    /// Identity for the stable states.
    #[must_use]
    pub fn settles_to(&self) -> PowerState {
        match self {
            PowerState::WarmingUp => PowerState::On,
            PowerState::CoolingDown => PowerState::Off,
            other => *other,
        }
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PowerState::Off => "Off",
            PowerState::WarmingUp => "WarmingUp",
            PowerState::On => "On",
            PowerState::CoolingDown => "CoolingDown",
        };
        write!(f, "{}", s)
    }
}

/// Requested power direction recorded as pending user intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerIntent {
    On,
    Off,
}

impl PowerIntent {
    /// The power state that confirms this intent.
    #[must_use]
    pub fn target_state(&self) -> PowerState {
        match self {
            PowerIntent::On => PowerState::On,
            PowerIntent::Off => PowerState::Off,
        }
    }
}

impl fmt::Display for PowerIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PowerIntent::On => write!(f, "On"),
            PowerIntent::Off => write!(f, "Off"),
        }
    }
}

/// Readiness of the control link, distinct from raw socket connectivity.
///
/// Some dialects require a login/identification exchange after the socket
/// opens before command traffic is accepted; until that completes the
/// link is `Handshaking`, not `Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkState {
    /// Transport is down. Queued commands are flushed on entry.
    Disconnected,

    /// Socket open, login/identification exchange in progress.
    Handshaking,

    /// Device is accepting commands.
    Ready,
}

impl LinkState {
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, LinkState::Ready)
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LinkState::Disconnected => "Disconnected",
            LinkState::Handshaking => "Handshaking",
            LinkState::Ready => "Ready",
        };
        write!(f, "{}", s)
    }
}
