use crate::alarm::{AlarmMachine, AlarmState, Command, Severity, SeverityLadder};
use crate::closure::ClosureTracker;
use crate::config::DetectionConfig;
use crate::ear;
use crate::link::{ActuatorLink, LinkError, LinkState, Transport};
use crate::smoothing::MovingAverage;
use crate::types::FrameInput;
use log::{info, warn};
use serde::Serialize;

// =========================================================================
// Frame Orchestrator
// =========================================================================

/// Everything observers need to know about one processed frame. Consumers
/// (HUD, logging, statistics) read this; they never reach into the
/// pipeline's state.
#[derive(Debug, Clone, Serialize)]
pub struct FrameReport {
    pub frame_index: u64,
    pub face_detected: bool,
    pub combined_ratio: Option<f32>,
    pub smoothed_ratio: Option<f32>,
    pub closed_frames: u32,
    pub alarm: AlarmState,
    pub severity: Severity,
    pub link: LinkState,
    /// Command attempted on this frame's alarm edge, if any.
    pub command: Option<Command>,
    /// Why the attempt failed, when it did. The alarm state above is
    /// already updated either way.
    #[serde(skip)]
    pub command_error: Option<LinkError>,
}

/// Runs estimator -> smoother -> closure tracker -> alarm machine per
/// frame, strictly in arrival order, and forwards alarm edges to the
/// actuator link.
pub struct Orchestrator<T: Transport> {
    config: DetectionConfig,
    smoother: MovingAverage,
    tracker: ClosureTracker,
    alarm: AlarmMachine,
    severity: SeverityLadder,
    link: ActuatorLink<T>,
    actuation: bool,
    frame_index: u64,
    no_face_streak: u32,
}

impl<T: Transport> Orchestrator<T> {
    pub fn new(config: DetectionConfig, link: ActuatorLink<T>) -> Self {
        let smoother = MovingAverage::new(config.smoothing_window);
        let alarm = AlarmMachine::new(config.eyes_closed_frames_threshold);
        let severity = SeverityLadder::new(
            config.severity_warning_frames,
            config.severity_serious_frames,
            config.severity_critical_frames,
        );
        Self {
            config,
            smoother,
            tracker: ClosureTracker::new(),
            alarm,
            severity,
            link,
            actuation: true,
            frame_index: 0,
            no_face_streak: 0,
        }
    }

    /// Detection-only mode: alarm edges are still tracked and reported,
    /// but nothing is delivered and no connection is ever attempted.
    pub fn set_actuation_enabled(&mut self, enabled: bool) {
        self.actuation = enabled;
    }

    pub fn alarm_state(&self) -> AlarmState {
        self.alarm.state()
    }

    pub fn link_state(&self) -> LinkState {
        self.link.state()
    }

    pub fn process(&mut self, input: FrameInput) -> FrameReport {
        self.frame_index += 1;

        let (left_eye, right_eye) = match input {
            FrameInput::NoFace => return self.no_decision_frame(),
            FrameInput::Face { left_eye, right_eye } => (left_eye, right_eye),
        };
        self.no_face_streak = 0;

        let combined = ear::combined_ratio(&left_eye, &right_eye);
        self.smoother.push(combined);
        // Just pushed, so the window cannot be empty
        let smoothed = self.smoother.current().unwrap_or(combined);

        let closed_frames = self
            .tracker
            .update(smoothed, self.config.eye_closed_threshold);

        if let Some(severity) = self.severity.update(closed_frames) {
            info!("severity changed to {:?} at {} closed frames", severity, closed_frames);
        }

        let command = self.alarm.update(closed_frames);
        let command_error = if self.actuation {
            command.and_then(|cmd| self.deliver(cmd).err())
        } else {
            None
        };

        FrameReport {
            frame_index: self.frame_index,
            face_detected: true,
            combined_ratio: Some(combined),
            smoothed_ratio: Some(smoothed),
            closed_frames,
            alarm: self.alarm.state(),
            severity: self.severity.current(),
            link: self.link.state(),
            command,
            command_error,
        }
    }

    /// No face this frame: counters and alarm state freeze. Only the
    /// smoothing buffer is dropped, and only once the loss is sustained,
    /// so a single missed frame keeps its history.
    fn no_decision_frame(&mut self) -> FrameReport {
        self.no_face_streak += 1;
        if self.no_face_streak == self.config.face_lost_reset_frames {
            info!(
                "face lost for {} frames, resetting smoothing window",
                self.no_face_streak
            );
            self.smoother.reset();
        }

        FrameReport {
            frame_index: self.frame_index,
            face_detected: false,
            combined_ratio: None,
            smoothed_ratio: self.smoother.current(),
            closed_frames: self.tracker.closed_frames(),
            alarm: self.alarm.state(),
            severity: self.severity.current(),
            link: self.link.state(),
            command: None,
            command_error: None,
        }
    }

    /// One attempt per alarm edge. If the link is down this is the
    /// natural moment to try one reconnect; there is no retry loop that
    /// could starve frame processing.
    fn deliver(&mut self, command: Command) -> Result<(), LinkError> {
        if !self.link.is_connected() {
            if let Err(e) = self.link.connect() {
                warn!("reconnect before {:?} failed: {}", command, e);
                return Err(e);
            }
        }
        match self.link.send(command) {
            Ok(_) => Ok(()),
            Err(e) => {
                warn!("failed to deliver {:?}: {}", command, e);
                Err(e)
            }
        }
    }

    /// Stops actuating: best-effort final deactivate, then release the
    /// channel. Detection state is left as-is for inspection.
    pub fn shutdown(&mut self) {
        self.link.shutdown();
    }
}
