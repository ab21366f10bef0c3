use std::collections::VecDeque;

// =========================================================================
// Temporal Smoother (fixed-window moving average)
// =========================================================================

/// Moving average over the last `capacity` combined ratios.
///
/// FIFO semantics: `push` evicts the oldest sample once full. `current`
/// is `None` until the first sample arrives; the pipeline treats that as
/// a "no decision" frame.
pub struct MovingAverage {
    buffer: VecDeque<f32>,
    capacity: usize,
}

impl MovingAverage {
    /// `capacity` must be >= 1; config validation rejects zero before
    /// anything is constructed, so this only guards direct misuse.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity >= 1, "smoothing window must be >= 1");
        Self {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, sample: f32) {
        if self.buffer.len() == self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(sample);
    }

    pub fn current(&self) -> Option<f32> {
        if self.buffer.is_empty() {
            return None;
        }
        Some(self.buffer.iter().sum::<f32>() / self.buffer.len() as f32)
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Drops all buffered history. Used on sustained face loss so stale
    /// samples never smooth across a detector restart.
    pub fn reset(&mut self) {
        self.buffer.clear();
    }
}
