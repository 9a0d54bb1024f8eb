//! The acquisition state machine.
//!
//! Owns the active capture session (or lack thereof), drives rescans across
//! the candidate list, and republishes frames while the session is healthy.
//! The controller is deterministic: the timer ticks arrive through
//! [`AcquisitionController::rescan`] and [`AcquisitionController::poll_frame`],
//! so the whole state machine runs without timers in tests.
//!
//! Failure handling is strictly local. Nothing here is fatal to the process;
//! the controller is designed to run indefinitely through camera churn
//! (unplug/replug, transient device busy).

use crate::capture::{CaptureBackend, CaptureSession};
use crate::config::FileConfig;
use crate::discovery::DeviceEnumerator;
use crate::publish::{FramePublisher, FrameSink};
use chrono::Utc;

/// Coarse controller state, as observable between ticks.
///
/// The scanning pass is transient inside one `rescan()` call and is never
/// observable from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    /// No session is bound; waiting for the next rescan tick.
    Idle,
    /// A session is bound and the frame loop is running.
    Active,
}

/// Counters maintained across the controller's lifetime.
#[derive(Debug, Clone, Copy, Default)]
pub struct ControllerStats {
    /// Rescan cycles started (timer ticks received).
    pub scan_cycles: u64,
    /// Bind attempts made across all cycles.
    pub bind_attempts: u64,
    /// Bind attempts that failed.
    pub bind_failures: u64,
    /// Successful binds.
    pub binds: u64,
    /// Frames successfully pushed to the output channel.
    pub frames_published: u64,
    /// Frame reads that failed and tore the session down.
    pub read_failures: u64,
}

/// Discovers, binds, and maintains a single capture session, republishing
/// its frames on the configured output channel.
pub struct AcquisitionController {
    config: FileConfig,
    enumerator: Box<dyn DeviceEnumerator>,
    backend: Box<dyn CaptureBackend>,
    sink: Box<dyn FrameSink>,
    publisher: Option<Box<dyn FramePublisher>>,
    session: Option<Box<dyn CaptureSession>>,
    current_device: String,
    stats: ControllerStats,
}

impl AcquisitionController {
    /// Creates a controller from its injected collaborators and an immutable
    /// configuration snapshot.
    pub fn new(
        config: FileConfig,
        enumerator: Box<dyn DeviceEnumerator>,
        backend: Box<dyn CaptureBackend>,
        sink: Box<dyn FrameSink>,
    ) -> Self {
        let current_device = config.capture.device.clone();
        Self {
            config,
            enumerator,
            backend,
            sink,
            publisher: None,
            session: None,
            current_device,
            stats: ControllerStats::default(),
        }
    }

    /// Returns the coarse controller state.
    pub fn state(&self) -> ControllerState {
        if self.session.is_some() {
            ControllerState::Active
        } else {
            ControllerState::Idle
        }
    }

    /// Returns the device path of the current session, or the configured
    /// hint when nothing has been bound yet.
    pub fn bound_device(&self) -> &str {
        &self.current_device
    }

    /// Returns the lifetime counters.
    pub fn stats(&self) -> ControllerStats {
        self.stats
    }

    /// One rescan tick: enumerate candidates and try to bind in order.
    ///
    /// Runs on every tick regardless of whether a session is active. An
    /// enumeration failure or an empty candidate list ends the cycle without
    /// touching an existing session; a non-empty list enters the ordered
    /// bind pass (which releases the existing session before the first open
    /// attempt), unless the bound device is still the first candidate.
    pub fn rescan(&mut self) {
        self.stats.scan_cycles += 1;

        let candidates = match self.enumerator.list_candidates() {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::error!(error = %e, "Error listing video devices");
                return;
            }
        };

        if candidates.is_empty() {
            tracing::info!("No cameras found");
            return;
        }

        // Churn avoidance: a healthy session bound to the device that is
        // still first in enumeration order stays as it is.
        if self.session.is_some()
            && candidates.first().map(String::as_str) == Some(self.current_device.as_str())
        {
            tracing::debug!(
                device = %self.current_device,
                "Bound device still preferred; keeping session"
            );
            return;
        }

        for path in &candidates {
            if self.start_camera(path) {
                return; // First success wins; remaining candidates abandoned
            }
        }

        tracing::warn!("Could not open any of the detected cameras");
    }

    /// One frame tick: read a frame from the active session and publish it.
    ///
    /// A read failure releases the session; recovery then waits passively
    /// for the next rescan tick. Without a session this is a no-op.
    pub fn poll_frame(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        let frame = match session.read() {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(
                    device = %self.current_device,
                    error = %e,
                    "Frame read failed; releasing camera"
                );
                self.stats.read_failures += 1;
                self.session = None;
                return;
            }
        };

        if let Some(publisher) = self.publisher.as_mut() {
            match publisher.publish(frame, &self.config.output.frame_id, Utc::now()) {
                Ok(()) => self.stats.frames_published += 1,
                // The device is still healthy; transport trouble surfaces
                // downstream as channel silence only
                Err(e) => tracing::warn!(error = %e, "Failed to publish frame"),
            }
        }
    }

    /// Releases the active session, if any. Called once on process shutdown.
    pub fn shutdown(&mut self) {
        if self.session.take().is_some() {
            tracing::info!(device = %self.current_device, "Released camera on shutdown");
        }
    }

    /// One bind attempt. Open failure, configuration rejection, and
    /// not-open-after-configure all count uniformly as bind failure.
    fn start_camera(&mut self, path: &str) -> bool {
        self.stats.bind_attempts += 1;

        // At-most-one-session invariant: release before opening
        self.session = None;

        let mut session = match self.backend.open(path) {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(device = %path, error = %e, "Failed to open camera");
                self.stats.bind_failures += 1;
                return false;
            }
        };

        let (width, height) = (self.config.capture.width, self.config.capture.height);
        if let Err(e) = session.configure(width, height) {
            tracing::warn!(device = %path, error = %e, "Camera rejected requested resolution");
            self.stats.bind_failures += 1;
            return false;
        }

        if !session.is_open() {
            tracing::warn!(device = %path, "Camera not open after configuration");
            self.stats.bind_failures += 1;
            return false;
        }

        // The output channel is advertised once, on the first successful
        // bind, and reused across rebinds
        if self.publisher.is_none() {
            let output = &self.config.output;
            match self.sink.advertise(&output.channel, output.queue_depth) {
                Ok(publisher) => self.publisher = Some(publisher),
                Err(e) => {
                    tracing::error!(channel = %output.channel, error = %e,
                        "Failed to advertise output channel");
                    self.stats.bind_failures += 1;
                    return false;
                }
            }
        }

        self.current_device = path.to_string();
        self.session = Some(session);
        self.stats.binds += 1;
        tracing::info!(device = %path, width, height, "Started camera");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{CaptureError, Frame};
    use crate::discovery::EnumerationError;
    use crate::publish::PublishError;
    use chrono::{DateTime, Utc};
    use std::cell::RefCell;
    use std::collections::{HashSet, VecDeque};
    use std::rc::Rc;

    // -- scripted fakes ---------------------------------------------------

    struct ScriptedEnumerator {
        script: VecDeque<Result<Vec<String>, EnumerationError>>,
    }

    impl ScriptedEnumerator {
        fn new(
            script: impl IntoIterator<Item = Result<Vec<String>, EnumerationError>>,
        ) -> Box<Self> {
            Box::new(Self {
                script: script.into_iter().collect(),
            })
        }
    }

    impl DeviceEnumerator for ScriptedEnumerator {
        fn list_candidates(&mut self) -> Result<Vec<String>, EnumerationError> {
            self.script.pop_front().unwrap_or(Ok(Vec::new()))
        }
    }

    fn invocation_error() -> EnumerationError {
        EnumerationError::Invocation {
            command: "v4l2-ctl".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        }
    }

    #[derive(Default)]
    struct BackendState {
        fail_open: HashSet<String>,
        fail_reads: bool,
        opens: Vec<String>,
        open_sessions: usize,
        max_open_sessions: usize,
    }

    #[derive(Clone, Default)]
    struct FakeBackend {
        state: Rc<RefCell<BackendState>>,
    }

    impl FakeBackend {
        fn failing_on(paths: &[&str]) -> Self {
            let backend = Self::default();
            backend.state.borrow_mut().fail_open =
                paths.iter().map(|p| p.to_string()).collect();
            backend
        }

        fn opens(&self) -> Vec<String> {
            self.state.borrow().opens.clone()
        }

        fn open_sessions(&self) -> usize {
            self.state.borrow().open_sessions
        }

        fn max_open_sessions(&self) -> usize {
            self.state.borrow().max_open_sessions
        }

        fn fail_reads(&self, fail: bool) {
            self.state.borrow_mut().fail_reads = fail;
        }
    }

    impl CaptureBackend for FakeBackend {
        fn open(&mut self, path: &str) -> Result<Box<dyn CaptureSession>, CaptureError> {
            let mut state = self.state.borrow_mut();
            state.opens.push(path.to_string());
            if state.fail_open.contains(path) {
                return Err(CaptureError::OpenFailed(
                    path.to_string(),
                    "scripted".to_string(),
                ));
            }
            state.open_sessions += 1;
            state.max_open_sessions = state.max_open_sessions.max(state.open_sessions);
            drop(state);
            Ok(Box::new(FakeSession {
                state: Rc::clone(&self.state),
                sequence: 0,
            }))
        }
    }

    struct FakeSession {
        state: Rc<RefCell<BackendState>>,
        sequence: u64,
    }

    impl CaptureSession for FakeSession {
        fn configure(&mut self, _width: u32, _height: u32) -> Result<(), CaptureError> {
            Ok(())
        }

        fn is_open(&self) -> bool {
            true
        }

        fn read(&mut self) -> Result<Frame, CaptureError> {
            if self.state.borrow().fail_reads {
                return Err(CaptureError::ReadFailed("scripted".to_string()));
            }
            self.sequence += 1;
            Ok(Frame::new(vec![0u8; 2 * 2 * 3], 2, 2, self.sequence))
        }
    }

    impl Drop for FakeSession {
        fn drop(&mut self) {
            self.state.borrow_mut().open_sessions -= 1;
        }
    }

    #[derive(Default)]
    struct SinkState {
        advertised: Vec<(String, usize)>,
        published: Vec<(u64, String)>,
        fail_advertise: bool,
    }

    #[derive(Clone, Default)]
    struct RecordingSink {
        state: Rc<RefCell<SinkState>>,
    }

    impl RecordingSink {
        fn advertised(&self) -> Vec<(String, usize)> {
            self.state.borrow().advertised.clone()
        }

        fn published(&self) -> Vec<(u64, String)> {
            self.state.borrow().published.clone()
        }
    }

    impl FrameSink for RecordingSink {
        fn advertise(
            &mut self,
            channel: &str,
            queue_depth: usize,
        ) -> Result<Box<dyn FramePublisher>, PublishError> {
            let mut state = self.state.borrow_mut();
            if state.fail_advertise {
                return Err(PublishError::Channel("scripted".to_string()));
            }
            state.advertised.push((channel.to_string(), queue_depth));
            drop(state);
            Ok(Box::new(RecordingPublisher {
                state: Rc::clone(&self.state),
            }))
        }
    }

    struct RecordingPublisher {
        state: Rc<RefCell<SinkState>>,
    }

    impl FramePublisher for RecordingPublisher {
        fn publish(
            &mut self,
            frame: Frame,
            frame_id: &str,
            _stamp: DateTime<Utc>,
        ) -> Result<(), PublishError> {
            self.state
                .borrow_mut()
                .published
                .push((frame.sequence(), frame_id.to_string()));
            Ok(())
        }
    }

    fn controller_with(
        script: impl IntoIterator<Item = Result<Vec<String>, EnumerationError>>,
        backend: FakeBackend,
        sink: RecordingSink,
    ) -> AcquisitionController {
        AcquisitionController::new(
            FileConfig::default(),
            ScriptedEnumerator::new(script),
            Box::new(backend),
            Box::new(sink),
        )
    }

    fn paths(list: &[&str]) -> Vec<String> {
        list.iter().map(|p| p.to_string()).collect()
    }

    // -- properties -------------------------------------------------------

    #[test]
    fn test_first_success_short_circuits() {
        let backend = FakeBackend::failing_on(&["/dev/video0"]);
        let sink = RecordingSink::default();
        let mut controller = controller_with(
            [Ok(paths(&["/dev/video0", "/dev/video1", "/dev/video2"]))],
            backend.clone(),
            sink,
        );

        controller.rescan();

        // video2 is never attempted once video1 binds
        assert_eq!(backend.opens(), paths(&["/dev/video0", "/dev/video1"]));
        assert_eq!(controller.state(), ControllerState::Active);
        assert_eq!(controller.bound_device(), "/dev/video1");
        assert_eq!(controller.stats().bind_failures, 1);
        assert_eq!(controller.stats().binds, 1);
    }

    #[test]
    fn test_empty_candidates_keep_existing_session() {
        let backend = FakeBackend::default();
        let sink = RecordingSink::default();
        let mut controller = controller_with(
            [Ok(paths(&["/dev/video0"])), Ok(Vec::new())],
            backend.clone(),
            sink,
        );

        controller.rescan();
        assert_eq!(controller.state(), ControllerState::Active);

        controller.rescan();
        assert_eq!(controller.state(), ControllerState::Active);
        assert_eq!(backend.open_sessions(), 1);
        assert_eq!(backend.opens().len(), 1);
    }

    #[test]
    fn test_enumeration_error_keeps_existing_session() {
        let backend = FakeBackend::default();
        let sink = RecordingSink::default();
        let mut controller = controller_with(
            [Ok(paths(&["/dev/video0"])), Err(invocation_error())],
            backend.clone(),
            sink,
        );

        controller.rescan();
        controller.rescan();

        assert_eq!(controller.state(), ControllerState::Active);
        assert_eq!(backend.open_sessions(), 1);
    }

    #[test]
    fn test_read_failure_tears_down_once_without_rescan() {
        let backend = FakeBackend::default();
        let sink = RecordingSink::default();
        let mut controller =
            controller_with([Ok(paths(&["/dev/video0"]))], backend.clone(), sink);

        controller.rescan();
        backend.fail_reads(true);

        controller.poll_frame();
        assert_eq!(controller.state(), ControllerState::Idle);
        assert_eq!(backend.open_sessions(), 0);
        assert_eq!(controller.stats().read_failures, 1);

        // Further frame ticks are no-ops; no rescan is triggered
        controller.poll_frame();
        assert_eq!(controller.stats().read_failures, 1);
        assert_eq!(backend.opens().len(), 1);
    }

    #[test]
    fn test_at_most_one_session_across_rescans() {
        let backend = FakeBackend::default();
        let sink = RecordingSink::default();
        let mut controller = controller_with(
            [
                Ok(paths(&["/dev/video0"])),
                Ok(paths(&["/dev/video1", "/dev/video0"])),
                Ok(paths(&["/dev/video2", "/dev/video1"])),
            ],
            backend.clone(),
            sink,
        );

        controller.rescan();
        controller.rescan();
        controller.rescan();

        assert_eq!(backend.max_open_sessions(), 1);
        assert_eq!(backend.open_sessions(), 1);
        assert_eq!(controller.bound_device(), "/dev/video2");
    }

    #[test]
    fn test_rescan_skips_rebind_while_first_candidate_is_bound() {
        let backend = FakeBackend::default();
        let sink = RecordingSink::default();
        let mut controller = controller_with(
            [
                Ok(paths(&["/dev/video0"])),
                Ok(paths(&["/dev/video0", "/dev/video1"])),
            ],
            backend.clone(),
            sink,
        );

        controller.rescan();
        controller.rescan();

        // No churn: the second cycle never touched the backend
        assert_eq!(backend.opens(), paths(&["/dev/video0"]));
        assert_eq!(controller.state(), ControllerState::Active);
        assert_eq!(controller.stats().binds, 1);
    }

    #[test]
    fn test_rescan_switches_when_new_first_candidate_appears() {
        let backend = FakeBackend::default();
        let sink = RecordingSink::default();
        let mut controller = controller_with(
            [
                Ok(paths(&["/dev/video1"])),
                Ok(paths(&["/dev/video0", "/dev/video1"])),
            ],
            backend.clone(),
            sink,
        );

        controller.rescan();
        assert_eq!(controller.bound_device(), "/dev/video1");

        controller.rescan();
        assert_eq!(controller.bound_device(), "/dev/video0");
        assert_eq!(backend.open_sessions(), 1);
        assert_eq!(backend.max_open_sessions(), 1);
    }

    #[test]
    fn test_exhausted_candidates_end_idle() {
        let backend = FakeBackend::failing_on(&["/dev/video9"]);
        let sink = RecordingSink::default();
        let mut controller = controller_with(
            [Ok(paths(&["/dev/video0"])), Ok(paths(&["/dev/video9"]))],
            backend.clone(),
            sink,
        );

        controller.rescan();
        assert_eq!(controller.state(), ControllerState::Active);

        // The bound device vanished; the only candidate fails to open. The
        // prior session was released by the first bind attempt.
        controller.rescan();
        assert_eq!(controller.state(), ControllerState::Idle);
        assert_eq!(backend.open_sessions(), 0);
    }

    #[test]
    fn test_advertise_failure_counts_as_bind_failure() {
        let backend = FakeBackend::default();
        let sink = RecordingSink::default();
        sink.state.borrow_mut().fail_advertise = true;
        let mut controller =
            controller_with([Ok(paths(&["/dev/video0"]))], backend.clone(), sink.clone());

        controller.rescan();

        assert_eq!(controller.state(), ControllerState::Idle);
        assert_eq!(controller.stats().bind_failures, 1);
        assert!(sink.advertised().is_empty());
    }

    #[test]
    fn test_shutdown_releases_session() {
        let backend = FakeBackend::default();
        let sink = RecordingSink::default();
        let mut controller =
            controller_with([Ok(paths(&["/dev/video0"]))], backend.clone(), sink);

        controller.rescan();
        controller.shutdown();

        assert_eq!(controller.state(), ControllerState::Idle);
        assert_eq!(backend.open_sessions(), 0);
    }

    #[test]
    fn test_discovery_failover_end_to_end() {
        let backend = FakeBackend::default();
        let sink = RecordingSink::default();
        let mut controller = controller_with(
            [
                Ok(Vec::new()),
                Ok(Vec::new()),
                Ok(Vec::new()),
                Ok(paths(&["/dev/video5"])),
                Ok(paths(&["/dev/video5"])),
            ],
            backend.clone(),
            sink.clone(),
        );

        // Three empty cycles: no bind attempts, no channel advertised
        for _ in 0..3 {
            controller.rescan();
        }
        assert!(backend.opens().is_empty());
        assert!(sink.advertised().is_empty());
        assert_eq!(controller.stats().scan_cycles, 3);

        // A camera appears and binds; the channel is advertised exactly once
        controller.rescan();
        assert_eq!(controller.state(), ControllerState::Active);
        assert_eq!(sink.advertised(), vec![("image_raw".to_string(), 1)]);

        // Frames flow at the frame-tick rate
        for _ in 0..3 {
            controller.poll_frame();
        }
        assert_eq!(controller.stats().frames_published, 3);
        assert_eq!(sink.published().len(), 3);
        assert!(sink
            .published()
            .iter()
            .all(|(_, frame_id)| frame_id == "camera_frame"));

        // Forced read failure releases the session
        backend.fail_reads(true);
        controller.poll_frame();
        assert_eq!(controller.state(), ControllerState::Idle);
        assert_eq!(backend.open_sessions(), 0);

        // The next scheduled rescan re-attempts the same device
        backend.fail_reads(false);
        controller.rescan();
        assert_eq!(controller.state(), ControllerState::Active);
        assert_eq!(controller.bound_device(), "/dev/video5");
        assert_eq!(
            backend.opens(),
            paths(&["/dev/video5", "/dev/video5"])
        );
        // Still advertised exactly once
        assert_eq!(sink.advertised().len(), 1);
    }
}
