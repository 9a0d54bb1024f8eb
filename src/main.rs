//! Autocam service binary.
//!
//! Long-lived process that discovers a working camera, keeps it bound
//! through device churn, and republishes its frames on a named channel.

use autocam::{
    AcquisitionController, BroadcastSink, CaptureBackend, ConfigError, DeviceEnumerator,
    FileConfig, V4l2Enumerator,
};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "autocam", version, about = "Camera discovery and failover daemon")]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Initial device path hint (overrides the config file).
    #[arg(long)]
    device: Option<String>,

    /// Requested frame width in pixels (overrides the config file).
    #[arg(long)]
    width: Option<u32>,

    /// Requested frame height in pixels (overrides the config file).
    #[arg(long)]
    height: Option<u32>,

    /// Seconds between device rescans (overrides the config file).
    #[arg(long)]
    interval: Option<f64>,

    /// List detected capture devices and exit.
    #[arg(long)]
    list_devices: bool,
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    if cli.list_devices {
        list_devices();
        return;
    }

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    info!("Autocam v{}", autocam::VERSION);
    info!(
        device = %config.capture.device,
        width = config.capture.width,
        height = config.capture.height,
        interval_secs = config.discovery.search_interval_secs,
        "Starting camera discovery"
    );

    let (shutdown_tx, shutdown_rx) = tokio::sync::mpsc::unbounded_channel();
    if let Err(e) = ctrlc::set_handler(move || {
        let _ = shutdown_tx.send(());
    }) {
        eprintln!("Failed to install signal handler: {}", e);
        std::process::exit(1);
    }

    let mut controller = AcquisitionController::new(
        config.clone(),
        Box::new(V4l2Enumerator::new()),
        build_backend(),
        Box::new(BroadcastSink::new()),
    );

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to start runtime: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(autocam::controller::run(
        &mut controller,
        &config,
        shutdown_rx,
    )) {
        eprintln!("Service failed: {}", e);
        std::process::exit(1);
    }

    let stats = controller.stats();
    info!(
        scan_cycles = stats.scan_cycles,
        binds = stats.binds,
        frames_published = stats.frames_published,
        read_failures = stats.read_failures,
        "Done"
    );
}

/// Loads the configuration file, then applies CLI overrides.
fn load_config(cli: &Cli) -> Result<FileConfig, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => FileConfig::from_file(path)?,
        None => FileConfig::default(),
    };

    if let Some(device) = &cli.device {
        config.capture.device = device.clone();
    }
    if let Some(width) = cli.width {
        config.capture.width = width;
    }
    if let Some(height) = cli.height {
        config.capture.height = height;
    }
    if let Some(interval) = cli.interval {
        config.discovery.search_interval_secs = interval;
    }

    config.validate()?;
    Ok(config)
}

/// One-shot enumeration for `--list-devices`.
fn list_devices() {
    let mut enumerator = V4l2Enumerator::new();
    match enumerator.list_candidates() {
        Ok(devices) if devices.is_empty() => println!("No capture devices found."),
        Ok(devices) => {
            for device in devices {
                println!("{}", device);
            }
        }
        Err(e) => {
            eprintln!("Failed to list devices: {}", e);
            std::process::exit(1);
        }
    }
}

#[cfg(feature = "camera")]
fn build_backend() -> Box<dyn CaptureBackend> {
    Box::new(autocam::HardwareBackend::new())
}

#[cfg(not(feature = "camera"))]
fn build_backend() -> Box<dyn CaptureBackend> {
    tracing::warn!("Built without the camera feature; publishing synthetic mock frames");
    Box::new(autocam::MockBackend::new())
}
