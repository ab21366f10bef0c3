use serde::{Deserialize, Serialize};

// =========================================================================
// Alarm State Machine (hysteresis over the closed-frame count)
// =========================================================================

/// Commands understood by the actuator firmware. The detection path only
/// ever sends Activate/Deactivate; Status and SelfTest exist for the
/// manual console and port-probe tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    Activate,
    Deactivate,
    Status,
    SelfTest,
}

impl Command {
    /// Wire token, newline-terminated by the link. Case-sensitive.
    pub fn token(&self) -> &'static str {
        match self {
            Command::Activate => "ON",
            Command::Deactivate => "OFF",
            Command::Status => "STATUS",
            Command::SelfTest => "TEST",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AlarmState {
    #[default]
    Normal,
    Alarm,
}

/// Edge-triggered two-state machine over the closed-frame count.
///
/// Together with the moving average this is the noise-rejection core:
/// the smoother absorbs single-frame jitter, the frame threshold absorbs
/// normal blinks (typically 2-4 frames). A command is emitted only on a
/// transition, never while a state merely holds.
pub struct AlarmMachine {
    state: AlarmState,
    frames_threshold: u32,
}

impl AlarmMachine {
    /// `frames_threshold` must be >= 1; config validation rejects zero.
    pub fn new(frames_threshold: u32) -> Self {
        assert!(frames_threshold >= 1, "frames threshold must be >= 1");
        Self {
            state: AlarmState::Normal,
            frames_threshold,
        }
    }

    pub fn state(&self) -> AlarmState {
        self.state
    }

    /// Re-evaluates against the latest closed-frame count. Returns the
    /// command for the transition taken this frame, if any.
    pub fn update(&mut self, closed_frames: u32) -> Option<Command> {
        let should_alarm = closed_frames >= self.frames_threshold;
        match (self.state, should_alarm) {
            (AlarmState::Normal, true) => {
                self.state = AlarmState::Alarm;
                Some(Command::Activate)
            }
            (AlarmState::Alarm, false) => {
                self.state = AlarmState::Normal;
                Some(Command::Deactivate)
            }
            _ => None,
        }
    }
}

// =========================================================================
// Progressive severity ladder
// =========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum Severity {
    #[default]
    None,
    Warning,
    Serious,
    Critical,
}

/// Ordered severity bands over the same closed-frame count the alarm
/// machine consumes. Purely observational: band changes surface in frame
/// reports and logs, while the wire still only carries ON/OFF.
pub struct SeverityLadder {
    warning_frames: u32,
    serious_frames: u32,
    critical_frames: u32,
    current: Severity,
}

impl SeverityLadder {
    pub fn new(warning_frames: u32, serious_frames: u32, critical_frames: u32) -> Self {
        assert!(
            warning_frames < serious_frames && serious_frames < critical_frames,
            "severity bands must be strictly increasing"
        );
        Self {
            warning_frames,
            serious_frames,
            critical_frames,
            current: Severity::None,
        }
    }

    pub fn current(&self) -> Severity {
        self.current
    }

    fn classify(&self, closed_frames: u32) -> Severity {
        if closed_frames >= self.critical_frames {
            Severity::Critical
        } else if closed_frames >= self.serious_frames {
            Severity::Serious
        } else if closed_frames >= self.warning_frames {
            Severity::Warning
        } else {
            Severity::None
        }
    }

    /// Returns the new severity when the band changed, in either
    /// direction; `None` while the band holds.
    pub fn update(&mut self, closed_frames: u32) -> Option<Severity> {
        let next = self.classify(closed_frames);
        if next != self.current {
            self.current = next;
            Some(next)
        } else {
            None
        }
    }
}

impl Default for SeverityLadder {
    fn default() -> Self {
        // Warn at 5 closed frames, serious at 15, critical at 30
        Self::new(5, 15, 30)
    }
}
