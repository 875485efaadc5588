//! Protocol-driven display controller core.
//!
//! Ties the other crates together: commands from a vendor
//! [`ProtocolStrategy`](lumen_protocol::ProtocolStrategy) flow through
//! a three-lane queue and a paced single-in-flight dispatcher onto a
//! [`Transport`](lumen_transport::Transport); device replies flow back
//! through the feedback interpreter into an observable cache and the
//! outstanding-intent ledger.
//!
//! The controller solves four problems every display protocol shares:
//!
//! 1. Devices process one command at a time and need inter-command
//!    pacing, so commands are queued and drained, never fired directly.
//! 2. Power transitions take tens of seconds; a warm-up/cool-down state
//!    machine gates dependent commands until the device is usable.
//! 3. Repeated polls and idempotent setters must supersede their queued
//!    predecessors instead of piling up.
//! 4. After a disconnect or handshake, unconfirmed user intent is
//!    replayed once the device is ready again ("resync").
//!
//! # Example
//!
//! ```no_run
//! use lumen_controller::DisplayController;
//! use lumen_core::DisplayConfig;
//! use lumen_protocol::vendors::CrLineProtocol;
//! use lumen_transport::{AnyTransport, TcpTransport, TcpTransportConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DisplayConfig::builder().input_count(6).build()?;
//! let (transport, events) =
//!     TcpTransport::new(TcpTransportConfig::new("10.0.0.20:4352".parse()?, b'\r'));
//!
//! let controller = DisplayController::new(
//!     config,
//!     CrLineProtocol::new(),
//!     AnyTransport::Tcp(transport),
//!     events,
//! );
//! controller.connect().await?;
//!
//! controller.power_on();
//! controller.select_input(2)?;
//!
//! let mut power = controller.feedback().subscribe_power();
//! power.changed().await?;
//! assert!(*power.borrow());
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod controller;
mod dispatcher;
mod interpreter;
pub mod power;
pub mod queue;
pub mod requested;

pub use cache::{FeedbackCache, INPUT_UNKNOWN};
pub use controller::DisplayController;
pub use power::PowerTracker;
pub use queue::CommandQueue;
pub use requested::RequestedState;
