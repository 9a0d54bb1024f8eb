//! Capture primitive and frame handling.
//!
//! This module provides the abstraction over the external capture
//! primitive: a backend opens sessions on device paths, and a session is
//! the owned, live binding to a single device from which frames are read.
//! Whether a path is actually a working camera is determined only by the
//! bind attempt, never up front.

mod device;
mod frame;
#[cfg(feature = "camera")]
mod hardware;

pub use device::{CaptureBackend, CaptureError, CaptureSession, MockBackend, MockSession};
pub use frame::Frame;
#[cfg(feature = "camera")]
pub use hardware::{HardwareBackend, HardwareSession};
