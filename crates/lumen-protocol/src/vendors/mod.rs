//! Vendor protocol dialects.
//!
//! Two wire families cover the supported displays: a CR-terminated ASCII
//! command/response dialect and a checksummed binary-framed dialect.

mod cr_line;
mod etx_frame;

pub use cr_line::CrLineProtocol;
pub use etx_frame::EtxFrameProtocol;
