use crate::types::{EyeContour, FrameInput, Point2D};
use anyhow::Result;

/// Where landmarks come from. One production implementation (the ONNX
/// face mesh behind the `vision` feature), one synthetic implementation
/// for running without models, and a canned replay for tests. The
/// pipeline never sees a concrete vision library.
pub trait LandmarkSource {
    fn name(&self) -> String;

    /// Blocks until the next frame's landmarks are available (or the
    /// detector decided there is no face in it).
    fn next_frame(&mut self) -> Result<FrameInput>;
}

/// Builds a plausible eye contour for a given openness. Used by the
/// synthetic source and by tests.
pub fn synthetic_eye(center_x: f32, center_y: f32, openness: f32) -> EyeContour {
    let half_width = 20.0;
    let half_height = half_width * openness;
    EyeContour::new([
        Point2D::new(center_x - half_width, center_y),
        Point2D::new(center_x - 10.0, center_y - half_height),
        Point2D::new(center_x + 10.0, center_y - half_height),
        Point2D::new(center_x + half_width, center_y),
        Point2D::new(center_x + 10.0, center_y + half_height),
        Point2D::new(center_x - 10.0, center_y + half_height),
    ])
}

/// Simulated subject when no camera/models are available: eyes open,
/// with a long eye-closure episode on a fixed cycle. Good enough to
/// exercise the whole pipeline including alarm edges.
pub struct SyntheticLandmarkSource {
    frame: u64,
    frame_period: std::time::Duration,
}

impl SyntheticLandmarkSource {
    pub fn new(fps: u32) -> Self {
        Self {
            frame: 0,
            frame_period: std::time::Duration::from_millis(1000 / fps.max(1) as u64),
        }
    }
}

impl LandmarkSource for SyntheticLandmarkSource {
    fn name(&self) -> String {
        "Synthetic (simulated closure cycle)".to_string()
    }

    fn next_frame(&mut self) -> Result<FrameInput> {
        // Pace like a real camera would
        std::thread::sleep(self.frame_period);
        self.frame += 1;
        let phase = self.frame % 120;

        // Frames 0..90 open, 90..120 closed; a blink at frame 45
        let openness = if phase >= 90 || phase == 45 {
            0.1
        } else {
            0.3
        };

        Ok(FrameInput::Face {
            left_eye: synthetic_eye(200.0, 240.0, openness),
            right_eye: synthetic_eye(440.0, 240.0, openness),
        })
    }
}

/// Test double replaying a fixed sequence; `NoFace` frames included.
/// Returns `NoFace` once the script runs out.
pub struct CannedLandmarkSource {
    frames: Vec<FrameInput>,
    cursor: usize,
}

impl CannedLandmarkSource {
    pub fn new(frames: Vec<FrameInput>) -> Self {
        Self { frames, cursor: 0 }
    }

    /// Convenience: a face frame whose both eyes have the given openness.
    pub fn face_with_openness(openness: f32) -> FrameInput {
        FrameInput::Face {
            left_eye: synthetic_eye(200.0, 240.0, openness),
            right_eye: synthetic_eye(440.0, 240.0, openness),
        }
    }

    pub fn remaining(&self) -> usize {
        self.frames.len().saturating_sub(self.cursor)
    }
}

impl LandmarkSource for CannedLandmarkSource {
    fn name(&self) -> String {
        format!("Canned ({} frames)", self.frames.len())
    }

    fn next_frame(&mut self) -> Result<FrameInput> {
        let input = self.frames.get(self.cursor).copied().unwrap_or(FrameInput::NoFace);
        self.cursor += 1;
        Ok(input)
    }
}
