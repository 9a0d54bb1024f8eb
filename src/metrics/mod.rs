//! Prometheus metrics exporter for acquisition monitoring.
//!
//! Only compiled with the `metrics` feature. Exposes the controller's
//! lifetime counters in Prometheus format via an HTTP endpoint.
//!
//! # Metrics Exposed
//!
//! - `autocam_active` - Whether a capture session is currently bound (1/0)
//! - `autocam_scan_cycles_total` - Rescan cycles started
//! - `autocam_bind_attempts_total` - Bind attempts across all cycles
//! - `autocam_bind_failures_total` - Bind attempts that failed
//! - `autocam_binds_total` - Successful binds
//! - `autocam_frames_published_total` - Frames pushed to the output channel
//! - `autocam_read_failures_total` - Frame reads that tore a session down

mod collector;
mod server;

pub use collector::{MetricsError, MetricsRegistry, MetricsSnapshot};
pub use server::{MetricsServer, MetricsServerConfig, MetricsState, ServerError};
