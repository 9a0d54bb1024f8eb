//! Autocam Library
//!
//! Discovers, selects, and continuously maintains a working video capture
//! device on a host with possibly multiple, intermittently available
//! cameras, and republishes captured frames on a named output channel.
//!
//! # Architecture
//!
//! ```text
//! discovery ──► controller ──► publish
//!                   │
//!                capture
//! ```
//!
//! The controller is the core: on every rescan tick it re-enumerates
//! candidate devices and tries to bind them in order; while a session is
//! bound, frame ticks read and republish frames until a read fails, after
//! which recovery waits for the next scheduled rescan. Everything around it
//! (enumeration, the capture primitive, the output transport) is an injected
//! collaborator behind a trait seam.
//!
//! # Design Principles
//!
//! - **Runs through churn**: no runtime failure is fatal; unplug/replug and
//!   transient device busy are ordinary events
//! - **At most one session**: a prior binding is always released before a
//!   new device is opened
//! - **Passive recovery**: a failed read never triggers an immediate
//!   rescan; the fixed rescan schedule is the only discovery driver
//! - **Silence over errors**: downstream consumers observe only the absence
//!   of frames, never a structured failure
//!
//! # Example
//!
//! ```no_run
//! use autocam::{
//!     AcquisitionController, BroadcastSink, FileConfig, MockBackend, V4l2Enumerator,
//! };
//!
//! let config = FileConfig::default();
//! let sink = BroadcastSink::new();
//!
//! let mut controller = AcquisitionController::new(
//!     config,
//!     Box::new(V4l2Enumerator::new()),
//!     Box::new(MockBackend::new()),
//!     Box::new(sink.clone()),
//! );
//!
//! // One discovery cycle, then one frame tick
//! controller.rescan();
//! controller.poll_frame();
//!
//! if let Some(mut frames) = sink.subscribe("image_raw") {
//!     if let Ok(published) = frames.try_recv() {
//!         println!("{}x{}", published.frame.width(), published.frame.height());
//!     }
//! }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod capture;
pub mod config;
pub mod controller;
pub mod discovery;
#[cfg(feature = "metrics")]
pub mod metrics;
pub mod publish;

// Re-export commonly used types at crate root
pub use capture::{CaptureBackend, CaptureError, CaptureSession, Frame, MockBackend};
#[cfg(feature = "camera")]
pub use capture::HardwareBackend;
pub use config::{ConfigError, FileConfig};
pub use controller::{AcquisitionController, ControllerState, ControllerStats};
pub use discovery::{DeviceEnumerator, EnumerationError, V4l2Enumerator};
pub use publish::{BroadcastSink, FramePublisher, FrameSink, PublishError, PublishedFrame};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
