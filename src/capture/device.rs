//! Capture device abstraction.
//!
//! This module provides trait-based abstractions over the capture primitive,
//! allowing for both real camera hardware and mock implementations for
//! testing. A backend opens sessions; a session is the live binding to one
//! device and is released by dropping it.

use super::Frame;
use thiserror::Error;

/// Errors that can occur during capture operations.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to open device {0}: {1}")]
    OpenFailed(String, String),
    #[error("failed to configure device: {0}")]
    ConfigureFailed(String),
    #[error("device did not report open after configuration")]
    NotOpen,
    #[error("failed to read frame: {0}")]
    ReadFailed(String),
}

/// A live capture binding to exactly one device.
///
/// Dropping the session releases the device. The controller owns at most one
/// session at any time.
pub trait CaptureSession {
    /// Requests the given frame resolution from the device.
    fn configure(&mut self, width: u32, height: u32) -> Result<(), CaptureError>;

    /// Reports whether the underlying device is open and deliverable.
    fn is_open(&self) -> bool;

    /// Reads one frame. A failure here means the device has become
    /// unavailable and the session should be released.
    fn read(&mut self) -> Result<Frame, CaptureError>;
}

/// Opens capture sessions on device paths.
///
/// This abstraction allows swapping between real camera hardware and mock
/// implementations for testing.
pub trait CaptureBackend {
    /// Attempts to open a capture session on the given device path.
    fn open(&mut self, path: &str) -> Result<Box<dyn CaptureSession>, CaptureError>;
}

/// Mock backend that opens a synthetic session on any path.
#[derive(Debug, Default)]
pub struct MockBackend;

impl MockBackend {
    /// Creates a new mock backend.
    pub fn new() -> Self {
        Self
    }
}

impl CaptureBackend for MockBackend {
    fn open(&mut self, path: &str) -> Result<Box<dyn CaptureSession>, CaptureError> {
        tracing::debug!(device = %path, "MockBackend opened synthetic session");
        Ok(Box::new(MockSession {
            path: path.to_string(),
            width: 640,
            height: 480,
            sequence: 0,
        }))
    }
}

/// Mock session that generates synthetic frames.
#[derive(Debug)]
pub struct MockSession {
    path: String,
    width: u32,
    height: u32,
    sequence: u64,
}

impl MockSession {
    /// Returns the device path this session was opened on.
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl CaptureSession for MockSession {
    fn configure(&mut self, width: u32, height: u32) -> Result<(), CaptureError> {
        if width == 0 || height == 0 {
            return Err(CaptureError::ConfigureFailed(format!(
                "rejected resolution {}x{}",
                width, height
            )));
        }
        self.width = width;
        self.height = height;
        Ok(())
    }

    fn is_open(&self) -> bool {
        true
    }

    fn read(&mut self) -> Result<Frame, CaptureError> {
        // Deterministic moving pattern, only for exercising the frame path
        let byte_count = (self.width as usize) * (self.height as usize) * 3;
        let pixels: Vec<u8> = (0..byte_count)
            .map(|i| ((i as u64 ^ self.sequence) % 256) as u8)
            .collect();

        self.sequence += 1;
        Ok(Frame::new(pixels, self.width, self.height, self.sequence))
    }
}
