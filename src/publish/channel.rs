//! Named broadcast channels for frame fan-out.

use crate::capture::Frame;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::broadcast;

/// Errors that can occur while advertising or publishing.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("queue depth must be at least 1")]
    InvalidQueueDepth,
    #[error("channel error: {0}")]
    Channel(String),
}

/// A frame as it appears on an output channel.
#[derive(Debug, Clone)]
pub struct PublishedFrame {
    /// The captured frame. Shared so fan-out does not copy pixel data.
    pub frame: Arc<Frame>,
    /// Frame identity tag from the service configuration.
    pub frame_id: String,
    /// Wall-clock publish timestamp.
    pub stamp: DateTime<Utc>,
}

/// Publish handle for one advertised channel.
pub trait FramePublisher {
    /// Pushes one frame, tagged and timestamped, to the channel.
    fn publish(
        &mut self,
        frame: Frame,
        frame_id: &str,
        stamp: DateTime<Utc>,
    ) -> Result<(), PublishError>;
}

/// Creates publish handles for named channels.
pub trait FrameSink {
    /// Advertises a named channel with a bounded queue and returns its
    /// publish handle. Advertising an existing name reuses the channel.
    fn advertise(
        &mut self,
        channel: &str,
        queue_depth: usize,
    ) -> Result<Box<dyn FramePublisher>, PublishError>;
}

/// In-process frame sink over named tokio broadcast channels.
///
/// Slow or absent subscribers never block the publisher; a subscriber that
/// falls more than `queue_depth` frames behind observes a lag marker and
/// resumes at the newest available frame.
#[derive(Debug, Clone, Default)]
pub struct BroadcastSink {
    channels: Arc<Mutex<HashMap<String, broadcast::Sender<PublishedFrame>>>>,
}

impl BroadcastSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to a channel, if it has been advertised.
    pub fn subscribe(&self, channel: &str) -> Option<broadcast::Receiver<PublishedFrame>> {
        self.lock_channels().get(channel).map(|s| s.subscribe())
    }

    fn lock_channels(
        &self,
    ) -> std::sync::MutexGuard<'_, HashMap<String, broadcast::Sender<PublishedFrame>>> {
        match self.channels.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl FrameSink for BroadcastSink {
    fn advertise(
        &mut self,
        channel: &str,
        queue_depth: usize,
    ) -> Result<Box<dyn FramePublisher>, PublishError> {
        if queue_depth == 0 {
            return Err(PublishError::InvalidQueueDepth);
        }

        let sender = self
            .lock_channels()
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(queue_depth).0)
            .clone();

        tracing::info!(channel = %channel, queue_depth, "Advertised output channel");
        Ok(Box::new(BroadcastPublisher { sender }))
    }
}

struct BroadcastPublisher {
    sender: broadcast::Sender<PublishedFrame>,
}

impl FramePublisher for BroadcastPublisher {
    fn publish(
        &mut self,
        frame: Frame,
        frame_id: &str,
        stamp: DateTime<Utc>,
    ) -> Result<(), PublishError> {
        // No receivers is not an error; downstream silence is expected
        let _ = self.sender.send(PublishedFrame {
            frame: Arc::new(frame),
            frame_id: frame_id.to_string(),
            stamp,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::TryRecvError;

    fn test_frame(sequence: u64) -> Frame {
        Frame::new(vec![0u8; 4 * 4 * 3], 4, 4, sequence)
    }

    #[test]
    fn test_advertise_and_publish_delivers() {
        let mut sink = BroadcastSink::new();
        let mut publisher = sink.advertise("image_raw", 4).unwrap();
        let mut receiver = sink.subscribe("image_raw").unwrap();

        publisher
            .publish(test_frame(1), "camera_frame", Utc::now())
            .unwrap();

        let published = receiver.try_recv().unwrap();
        assert_eq!(published.frame_id, "camera_frame");
        assert_eq!(published.frame.sequence(), 1);
    }

    #[test]
    fn test_publish_without_subscriber_is_ok() {
        let mut sink = BroadcastSink::new();
        let mut publisher = sink.advertise("image_raw", 1).unwrap();
        assert!(publisher
            .publish(test_frame(1), "camera_frame", Utc::now())
            .is_ok());
    }

    #[test]
    fn test_queue_depth_bounds_backlog() {
        let mut sink = BroadcastSink::new();
        let mut publisher = sink.advertise("image_raw", 1).unwrap();
        let mut receiver = sink.subscribe("image_raw").unwrap();

        publisher
            .publish(test_frame(1), "camera_frame", Utc::now())
            .unwrap();
        publisher
            .publish(test_frame(2), "camera_frame", Utc::now())
            .unwrap();

        // Depth 1: the first frame was dropped, only the newest survives
        assert!(matches!(receiver.try_recv(), Err(TryRecvError::Lagged(1))));
        assert_eq!(receiver.try_recv().unwrap().frame.sequence(), 2);
    }

    #[test]
    fn test_zero_queue_depth_rejected() {
        let mut sink = BroadcastSink::new();
        assert!(matches!(
            sink.advertise("image_raw", 0),
            Err(PublishError::InvalidQueueDepth)
        ));
    }

    #[test]
    fn test_subscribe_unknown_channel() {
        let sink = BroadcastSink::new();
        assert!(sink.subscribe("nope").is_none());
    }
}
