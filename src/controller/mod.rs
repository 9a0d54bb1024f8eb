//! Acquisition control.
//!
//! The controller is the only part of the system with real state: it owns
//! the capture session, decides when to bind and when to let go, and keeps
//! frames flowing while a device is healthy. The runtime wraps it in the
//! two periodic timers that make up the service.

mod acquisition;
mod runtime;

pub use acquisition::{AcquisitionController, ControllerState, ControllerStats};
pub use runtime::{run, RuntimeError};
