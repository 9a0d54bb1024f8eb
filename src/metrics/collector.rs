//! Metrics collection and registry.

use crate::controller::{ControllerState, ControllerStats};
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// A snapshot of controller state for metrics update.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSnapshot {
    /// Whether a capture session is currently bound.
    pub active: bool,
    /// Rescan cycles started.
    pub scan_cycles: u64,
    /// Bind attempts across all cycles.
    pub bind_attempts: u64,
    /// Bind attempts that failed.
    pub bind_failures: u64,
    /// Successful binds.
    pub binds: u64,
    /// Frames pushed to the output channel.
    pub frames_published: u64,
    /// Frame reads that tore a session down.
    pub read_failures: u64,
}

impl MetricsSnapshot {
    /// Builds a snapshot from the controller's counters and state.
    pub fn from_controller(stats: &ControllerStats, state: ControllerState) -> Self {
        Self {
            active: state == ControllerState::Active,
            scan_cycles: stats.scan_cycles,
            bind_attempts: stats.bind_attempts,
            bind_failures: stats.bind_failures,
            binds: stats.binds,
            frames_published: stats.frames_published,
            read_failures: stats.read_failures,
        }
    }
}

/// Prometheus registry for acquisition metrics.
pub struct MetricsRegistry {
    registry: Registry,

    active: IntGauge,
    scan_cycles: IntCounter,
    bind_attempts: IntCounter,
    bind_failures: IntCounter,
    binds: IntCounter,
    frames_published: IntCounter,
    read_failures: IntCounter,
}

impl MetricsRegistry {
    /// Creates a new registry with all acquisition metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let active = IntGauge::new(
            "autocam_active",
            "Whether a capture session is currently bound (1=active, 0=idle)",
        )?;
        let scan_cycles = IntCounter::new(
            "autocam_scan_cycles_total",
            "Total rescan cycles started",
        )?;
        let bind_attempts = IntCounter::new(
            "autocam_bind_attempts_total",
            "Total bind attempts across all cycles",
        )?;
        let bind_failures = IntCounter::new(
            "autocam_bind_failures_total",
            "Total bind attempts that failed",
        )?;
        let binds = IntCounter::new("autocam_binds_total", "Total successful binds")?;
        let frames_published = IntCounter::new(
            "autocam_frames_published_total",
            "Total frames pushed to the output channel",
        )?;
        let read_failures = IntCounter::new(
            "autocam_read_failures_total",
            "Total frame reads that tore a session down",
        )?;

        registry.register(Box::new(active.clone()))?;
        registry.register(Box::new(scan_cycles.clone()))?;
        registry.register(Box::new(bind_attempts.clone()))?;
        registry.register(Box::new(bind_failures.clone()))?;
        registry.register(Box::new(binds.clone()))?;
        registry.register(Box::new(frames_published.clone()))?;
        registry.register(Box::new(read_failures.clone()))?;

        Ok(Self {
            registry,
            active,
            scan_cycles,
            bind_attempts,
            bind_failures,
            binds,
            frames_published,
            read_failures,
        })
    }

    /// Updates all metrics from a snapshot of controller state.
    pub fn update(&self, snapshot: &MetricsSnapshot) {
        self.active.set(if snapshot.active { 1 } else { 0 });

        // Counters only move forward; increment by the delta
        Self::advance(&self.scan_cycles, snapshot.scan_cycles);
        Self::advance(&self.bind_attempts, snapshot.bind_attempts);
        Self::advance(&self.bind_failures, snapshot.bind_failures);
        Self::advance(&self.binds, snapshot.binds);
        Self::advance(&self.frames_published, snapshot.frames_published);
        Self::advance(&self.read_failures, snapshot.read_failures);
    }

    fn advance(counter: &IntCounter, target: u64) {
        let current = counter.get();
        if target > current {
            counter.inc_by(target - current);
        }
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
