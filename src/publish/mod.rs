//! Frame output transport.
//!
//! Successfully read frames are pushed to a named output channel. The
//! transport is an external collaborator behind the [`FrameSink`] /
//! [`FramePublisher`] seam: the controller advertises a channel once and
//! then publishes into it, and downstream consumers observe only the frames
//! that arrive. There is no structured error surface past the channel,
//! just silence when no camera is bound.

mod channel;

pub use channel::{
    BroadcastSink, FramePublisher, FrameSink, PublishError, PublishedFrame,
};
