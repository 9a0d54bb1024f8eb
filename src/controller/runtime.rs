//! Single-threaded service loop.
//!
//! Two independent periodic timers (the rescan interval and the frame
//! interval) are the only sources of work. Both are polled from one
//! `select!` loop on a current-thread runtime, so no two tick bodies ever
//! run concurrently or re-enter. A tick that is overdue while the loop is
//! busy is skipped rather than queued.

use super::AcquisitionController;
use crate::config::FileConfig;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

/// Errors that can abort the service loop at startup.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The metrics registry could not be constructed.
    #[cfg(feature = "metrics")]
    #[error("metrics: {0}")]
    Metrics(#[from] crate::metrics::MetricsError),
}

/// Drives the controller until the shutdown signal fires.
///
/// The first rescan tick fires immediately, so initial discovery happens at
/// startup rather than one interval later. On shutdown any pending timer is
/// dropped and the active session, if any, is released; an in-flight bind or
/// read is never cancelled mid-call.
pub async fn run(
    controller: &mut AcquisitionController,
    config: &FileConfig,
    mut shutdown: mpsc::UnboundedReceiver<()>,
) -> Result<(), RuntimeError> {
    #[cfg(feature = "metrics")]
    let metrics = spawn_metrics(config)?;

    let mut rescan = tokio::time::interval(Duration::from_secs_f64(
        config.discovery.search_interval_secs,
    ));
    rescan.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut frame =
        tokio::time::interval(Duration::from_secs_f64(1.0 / f64::from(config.capture.fps)));
    frame.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = rescan.tick() => controller.rescan(),
            _ = frame.tick() => controller.poll_frame(),
            _ = shutdown.recv() => {
                tracing::info!("Shutdown requested");
                break;
            }
        }

        #[cfg(feature = "metrics")]
        if let Some(state) = &metrics {
            state
                .write()
                .await
                .update(&crate::metrics::MetricsSnapshot::from_controller(
                    &controller.stats(),
                    controller.state(),
                ));
        }
    }

    controller.shutdown();
    Ok(())
}

#[cfg(feature = "metrics")]
fn spawn_metrics(
    config: &FileConfig,
) -> Result<
    Option<std::sync::Arc<tokio::sync::RwLock<crate::metrics::MetricsState>>>,
    RuntimeError,
> {
    use crate::metrics::{MetricsRegistry, MetricsServer, MetricsServerConfig};

    if config.output.metrics_port == 0 {
        return Ok(None);
    }

    let registry = MetricsRegistry::new()?;
    let server = MetricsServer::new(
        MetricsServerConfig::with_port(config.output.metrics_port),
        registry,
    );
    let state = server.state();

    tokio::spawn(async move {
        if let Err(e) = server.run().await {
            tracing::error!(error = %e, "Metrics server failed");
        }
    });

    Ok(Some(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::MockBackend;
    use crate::controller::ControllerState;
    use crate::discovery::V4l2Enumerator;
    use crate::publish::BroadcastSink;

    #[tokio::test(start_paused = true)]
    async fn test_service_loop_binds_publishes_and_shuts_down() {
        let config = FileConfig::default();
        let enumerator = V4l2Enumerator::with_command("sh", ["-c", "printf '/dev/video0\\n'"]);
        let sink = BroadcastSink::new();
        let mut controller = AcquisitionController::new(
            config.clone(),
            Box::new(enumerator),
            Box::new(MockBackend::new()),
            Box::new(sink.clone()),
        );

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            let _ = tx.send(());
        });

        run(&mut controller, &config, rx).await.unwrap();

        let stats = controller.stats();
        assert_eq!(stats.binds, 1);
        assert!(stats.frames_published >= 1);
        assert!(sink.subscribe("image_raw").is_some());
        // Shutdown released the session
        assert_eq!(controller.state(), ControllerState::Idle);
    }
}
