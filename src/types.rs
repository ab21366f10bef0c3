use serde::{Deserialize, Serialize};

/// Represents a single 2D landmark in frame pixel space
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f32,
    pub y: f32,
}

impl Point2D {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point2D) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Six eye-contour landmarks in fixed order.
///
/// Convention: p1/p4 are the horizontal corners, (p2, p6) and (p3, p5)
/// are the vertical pairs. Indices are fixed by the detector contract.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EyeContour {
    points: [Point2D; 6],
}

impl EyeContour {
    pub fn new(points: [Point2D; 6]) -> Self {
        Self { points }
    }

    pub fn p1(&self) -> &Point2D {
        &self.points[0]
    }

    pub fn p2(&self) -> &Point2D {
        &self.points[1]
    }

    pub fn p3(&self) -> &Point2D {
        &self.points[2]
    }

    pub fn p4(&self) -> &Point2D {
        &self.points[3]
    }

    pub fn p5(&self) -> &Point2D {
        &self.points[4]
    }

    pub fn p6(&self) -> &Point2D {
        &self.points[5]
    }

    pub fn points(&self) -> &[Point2D; 6] {
        &self.points
    }

    pub fn translated(&self, dx: f32, dy: f32) -> Self {
        let mut points = self.points;
        for p in &mut points {
            p.x += dx;
            p.y += dy;
        }
        Self { points }
    }
}

/// What the landmark detector produced for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameInput {
    /// No face this frame. Not an error; the pipeline freezes its state.
    NoFace,
    Face {
        left_eye: EyeContour,
        right_eye: EyeContour,
    },
}

impl FrameInput {
    pub fn is_face(&self) -> bool {
        matches!(self, FrameInput::Face { .. })
    }
}
