use crate::types::EyeContour;

// =========================================================================
// Openness Estimator (Eye Aspect Ratio)
// EAR = (||p2-p6|| + ||p3-p5||) / (2 * ||p1-p4||)
// =========================================================================

/// Computes the Eye Aspect Ratio for one eye at one frame.
///
/// Low values mean the eye is closed, high values open. A degenerate
/// contour (zero horizontal width) yields 0.0 rather than dividing by
/// zero: the frame reads as fully closed, which biases toward raising
/// the alarm instead of dropping the frame.
pub fn eye_aspect_ratio(eye: &EyeContour) -> f32 {
    let vertical1 = eye.p2().distance(eye.p6());
    let vertical2 = eye.p3().distance(eye.p5());
    let horizontal = eye.p1().distance(eye.p4());

    if horizontal == 0.0 {
        return 0.0;
    }

    (vertical1 + vertical2) / (2.0 * horizontal)
}

/// Mean of the left and right ratios; the unit the rest of the
/// pipeline operates on.
pub fn combined_ratio(left: &EyeContour, right: &EyeContour) -> f32 {
    (eye_aspect_ratio(left) + eye_aspect_ratio(right)) / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Point2D;

    fn open_eye() -> EyeContour {
        // Roughly a wide-open eye: 40px wide, 12px tall lids
        EyeContour::new([
            Point2D::new(0.0, 0.0),   // p1 left corner
            Point2D::new(10.0, -6.0), // p2 upper
            Point2D::new(30.0, -6.0), // p3 upper
            Point2D::new(40.0, 0.0),  // p4 right corner
            Point2D::new(30.0, 6.0),  // p5 lower
            Point2D::new(10.0, 6.0),  // p6 lower
        ])
    }

    #[test]
    fn open_eye_ratio_is_positive() {
        let ear = eye_aspect_ratio(&open_eye());
        assert!(ear > 0.0, "open eye produced EAR {}", ear);
        // (12 + 12) / (2 * 40) = 0.3
        assert!((ear - 0.3).abs() < 1e-5);
    }

    #[test]
    fn ratio_is_translation_invariant() {
        let eye = open_eye();
        let moved = eye.translated(123.0, -57.5);
        let a = eye_aspect_ratio(&eye);
        let b = eye_aspect_ratio(&moved);
        assert!((a - b).abs() < 1e-5, "EAR changed under translation: {} vs {}", a, b);
    }

    #[test]
    fn degenerate_width_yields_zero() {
        // p1 == p4: horizontal distance is exactly zero
        let p = Point2D::new(5.0, 5.0);
        let eye = EyeContour::new([
            p,
            Point2D::new(5.0, 0.0),
            Point2D::new(5.0, 0.0),
            p,
            Point2D::new(5.0, 10.0),
            Point2D::new(5.0, 10.0),
        ]);
        assert_eq!(eye_aspect_ratio(&eye), 0.0);
    }

    #[test]
    fn combined_is_mean_of_both_eyes() {
        let left = open_eye();
        // Half-closed right eye: vertical distances halved
        let right = EyeContour::new([
            Point2D::new(0.0, 0.0),
            Point2D::new(10.0, -3.0),
            Point2D::new(30.0, -3.0),
            Point2D::new(40.0, 0.0),
            Point2D::new(30.0, 3.0),
            Point2D::new(10.0, 3.0),
        ]);
        let combined = combined_ratio(&left, &right);
        assert!((combined - (0.3 + 0.15) / 2.0).abs() < 1e-5);
    }
}
