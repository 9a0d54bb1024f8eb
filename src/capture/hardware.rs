//! Camera hardware backend built on `nokhwa`.
//!
//! Only compiled with the `camera` feature. Device paths are mapped to
//! nokhwa camera indices; `/dev/videoN` paths use the numeric index, any
//! other path is passed through as a string identifier for the platform
//! backend to resolve.

use super::{CaptureBackend, CaptureError, CaptureSession, Frame};
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType, Resolution};
use nokhwa::Camera;

/// Capture backend that opens real devices through nokhwa.
#[derive(Debug, Default)]
pub struct HardwareBackend;

impl HardwareBackend {
    /// Creates a new hardware backend.
    pub fn new() -> Self {
        Self
    }
}

/// Maps a device path to a nokhwa camera index.
fn device_index(path: &str) -> CameraIndex {
    match path.strip_prefix("/dev/video").and_then(|n| n.parse().ok()) {
        Some(index) => CameraIndex::Index(index),
        None => CameraIndex::String(path.to_string()),
    }
}

impl CaptureBackend for HardwareBackend {
    fn open(&mut self, path: &str) -> Result<Box<dyn CaptureSession>, CaptureError> {
        let requested =
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestResolution);

        let mut camera = Camera::new(device_index(path), requested)
            .map_err(|e| CaptureError::OpenFailed(path.to_string(), e.to_string()))?;

        camera
            .open_stream()
            .map_err(|e| CaptureError::OpenFailed(path.to_string(), e.to_string()))?;

        Ok(Box::new(HardwareSession {
            camera,
            sequence: 0,
        }))
    }
}

/// A live nokhwa capture stream.
pub struct HardwareSession {
    camera: Camera,
    sequence: u64,
}

impl CaptureSession for HardwareSession {
    fn configure(&mut self, width: u32, height: u32) -> Result<(), CaptureError> {
        self.camera
            .set_resolution(Resolution::new(width, height))
            .map_err(|e| CaptureError::ConfigureFailed(e.to_string()))
    }

    fn is_open(&self) -> bool {
        self.camera.is_stream_open()
    }

    fn read(&mut self) -> Result<Frame, CaptureError> {
        let buffer = self
            .camera
            .frame()
            .map_err(|e| CaptureError::ReadFailed(e.to_string()))?;

        // Decodes whatever the camera produced (MJPEG, YUYV, NV12, ...) to RGB
        let decoded = buffer
            .decode_image::<RgbFormat>()
            .map_err(|e| CaptureError::ReadFailed(e.to_string()))?;

        let resolution = buffer.resolution();
        self.sequence += 1;
        Ok(Frame::new(
            decoded.into_raw(),
            resolution.width(),
            resolution.height(),
            self.sequence,
        ))
    }
}

impl Drop for HardwareSession {
    fn drop(&mut self) {
        let _ = self.camera.stop_stream();
    }
}
