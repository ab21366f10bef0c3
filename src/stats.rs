use crate::alarm::AlarmState;
use crate::pipeline::FrameReport;

/// Session-level detection statistics, folded from frame reports.
/// Printed once at shutdown.
#[derive(Debug, Default, Clone)]
pub struct SessionStats {
    pub total_frames: u64,
    pub face_frames: u64,
    pub closed_frames: u64,
    pub max_consecutive_closed: u32,
    pub alarm_episodes: u32,
    pub commands_attempted: u32,
    pub commands_failed: u32,
    last_alarm: AlarmState,
}

impl SessionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, report: &FrameReport) {
        self.total_frames += 1;
        if report.face_detected {
            self.face_frames += 1;
        }
        if report.closed_frames > 0 {
            self.closed_frames += 1;
            self.max_consecutive_closed = self.max_consecutive_closed.max(report.closed_frames);
        }
        if self.last_alarm == AlarmState::Normal && report.alarm == AlarmState::Alarm {
            self.alarm_episodes += 1;
        }
        self.last_alarm = report.alarm;
        if report.command.is_some() {
            self.commands_attempted += 1;
            if report.command_error.is_some() {
                self.commands_failed += 1;
            }
        }
    }

    pub fn closed_percentage(&self) -> f32 {
        if self.total_frames == 0 {
            return 0.0;
        }
        self.closed_frames as f32 / self.total_frames as f32 * 100.0
    }

    pub fn summary(&self) -> String {
        format!(
            "frames: {} (face: {}), closed: {} ({:.1}%), longest closed run: {}, \
             alarm episodes: {}, commands: {} ({} failed)",
            self.total_frames,
            self.face_frames,
            self.closed_frames,
            self.closed_percentage(),
            self.max_consecutive_closed,
            self.alarm_episodes,
            self.commands_attempted,
            self.commands_failed,
        )
    }
}
