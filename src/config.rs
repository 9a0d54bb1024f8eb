//! Service configuration.
//!
//! All parameters are read once at startup and never re-read; the running
//! controller works from an immutable snapshot. There is no live
//! reconfiguration path.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Device discovery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Seconds between rescans of the device list. The rescan timer fires at
    /// this fixed period whether or not a camera is currently bound.
    pub search_interval_secs: f64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            search_interval_secs: 5.0,
        }
    }
}

/// Capture settings for the bound device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Initial device path hint. Overwritten internally once a bind succeeds,
    /// so it always reflects the currently bound device.
    pub device: String,
    /// Requested frame width in pixels.
    pub width: u32,
    /// Requested frame height in pixels.
    pub height: u32,
    /// Frame-read rate in frames per second. Sets the frame timer period,
    /// which is independent of the rescan interval.
    pub fps: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device: "/dev/video0".to_string(),
            width: 640,
            height: 480,
            fps: 30,
        }
    }
}

/// Output channel settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Name of the channel frames are published on.
    pub channel: String,
    /// Frame identity tag attached to every published frame.
    pub frame_id: String,
    /// Bounded queue depth of the output channel.
    pub queue_depth: usize,
    /// Metrics server port (0 to disable). Only used with the `metrics`
    /// feature.
    pub metrics_port: u16,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            channel: "image_raw".to_string(),
            frame_id: "camera_frame".to_string(),
            queue_depth: 1,
            metrics_port: 9090,
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("search interval must be positive")]
    InvalidInterval,
    #[error("invalid frame dimensions")]
    InvalidDimensions,
    #[error("invalid frame rate (must be 1-120 fps)")]
    InvalidFrameRate,
    #[error("output channel name must not be empty")]
    EmptyChannel,
    #[error("frame id must not be empty")]
    EmptyFrameId,
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        let config: FileConfig =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let interval = self.discovery.search_interval_secs;
        if !interval.is_finite() || interval <= 0.0 {
            return Err(ConfigError::InvalidInterval);
        }
        if self.capture.width == 0 || self.capture.height == 0 {
            return Err(ConfigError::InvalidDimensions);
        }
        if self.capture.fps == 0 || self.capture.fps > 120 {
            return Err(ConfigError::InvalidFrameRate);
        }
        if self.output.channel.is_empty() {
            return Err(ConfigError::EmptyChannel);
        }
        if self.output.frame_id.is_empty() {
            return Err(ConfigError::EmptyFrameId);
        }
        Ok(())
    }
}
