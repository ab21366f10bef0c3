// =========================================================================
// Closure Tracker (consecutive-frame counters)
// =========================================================================

/// Tracks consecutive frames below / at-or-above the closed-eye threshold.
///
/// Exactly one counter is nonzero at any time; the other resets the
/// instant its condition stops holding. No hysteresis here: the raw
/// closed-frame duration stays independently testable (and feeds session
/// statistics), while hysteresis lives in the alarm machine one level up.
#[derive(Debug, Default)]
pub struct ClosureTracker {
    closed_frames: u32,
    open_frames: u32,
}

impl ClosureTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one smoothed ratio; returns the current closed-frame count
    /// (0 when the eyes read open).
    pub fn update(&mut self, smoothed_ratio: f32, threshold: f32) -> u32 {
        if smoothed_ratio < threshold {
            self.closed_frames += 1;
            self.open_frames = 0;
        } else {
            self.open_frames += 1;
            self.closed_frames = 0;
        }
        self.closed_frames
    }

    pub fn closed_frames(&self) -> u32 {
        self.closed_frames
    }

    pub fn open_frames(&self) -> u32 {
        self.open_frames
    }
}
