pub mod codec;
pub mod command;
pub mod feedback;
pub mod strategy;
pub mod vendors;

pub use codec::FrameCodec;
pub use command::{Command, CommandCategory, Lane, PacingClass, QueueBehavior};
pub use feedback::Feedback;
pub use strategy::ProtocolStrategy;
pub use vendors::{CrLineProtocol, EtxFrameProtocol};
