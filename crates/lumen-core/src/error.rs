use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Protocol errors
    #[error("Malformed reply: {0}")]
    MalformedReply(String),

    #[error("Unknown reply category: {0}")]
    UnknownReply(String),

    #[error("Checksum mismatch: expected {expected:#04x}, got {actual:#04x}")]
    ChecksumMismatch { expected: u8, actual: u8 },

    #[error("Frame too large: {size} bytes (max {max_size})")]
    FrameTooLarge { size: usize, max_size: usize },

    // Device errors
    #[error("Device not ready for commands")]
    NotReady,

    #[error("Device reported error: {0}")]
    DeviceFault(String),

    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    // Input validation errors
    #[error("Invalid input source: {0}")]
    InvalidInput(String),

    #[error("Invalid volume value: {0}")]
    InvalidVolume(String),

    // Transport errors
    #[error("Transport not connected")]
    TransportClosed,

    #[error("Send failed: {0}")]
    SendFailed(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
