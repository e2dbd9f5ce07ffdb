//! Pose sample extraction
//!
//! Yaw comes from the eye line alone: `atan2(dz, dx)` of the outer eye
//! corners. It is not a full PnP solve, but it is stable enough for
//! "facing away" detection and costs a handful of flops per frame.
//!
//! Pitch maps the nose's relative position in the eye-chin span onto
//! degrees with a fixed linear model. In a neutral pose the nose sits
//! roughly 3/8 of the way down, which the bias cancels out.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::landmarks::{FaceKeyPoints, LandmarkFrame};
use crate::GeometryError;

/// Degrees per unit of pitch index
pub const PITCH_SCALE_DEG: f64 = 48.0;

/// Fixed pitch bias (degrees)
pub const PITCH_BIAS_DEG: f64 = -18.0;

/// Raw per-frame measurements, before calibration
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PoseSample {
    /// Yaw (left-right rotation) in degrees
    pub raw_yaw_deg: f64,
    /// Pitch (up-down tilt) in degrees
    pub raw_pitch_deg: f64,
    /// Nose tip to chin
    pub nose_chin_dist: f64,
    /// Eye span times nose-chin, stands in for apparent face area
    pub face_area_proxy: f64,
    /// Width of the left eye (inner to outer corner)
    pub eye_openness_dist: f64,
}

impl PoseSample {
    /// Extract a sample from a full landmark frame
    pub fn from_frame(frame: &LandmarkFrame) -> Result<Self, GeometryError> {
        FaceKeyPoints::from_frame(frame).map(|keys| Self::from_key_points(&keys))
    }

    /// Extract a sample from the five key points
    pub fn from_key_points(keys: &FaceKeyPoints) -> Self {
        let left = keys.left_eye_outer;
        let right = keys.right_eye_outer;

        let raw_yaw_deg = (right.z - left.z).atan2(right.x - left.x).to_degrees();

        let eye_center_y = (left.y + right.y) / 2.0;
        let span = keys.chin.y - eye_center_y;
        let pitch_index = if span.abs() > f64::EPSILON {
            (keys.nose.y - eye_center_y) / span
        } else {
            0.0
        };
        let raw_pitch_deg = pitch_index * PITCH_SCALE_DEG + PITCH_BIAS_DEG;

        let nose_chin_dist = keys.nose.planar_distance(&keys.chin);
        let face_area_proxy = left.planar_distance(&right) * nose_chin_dist;
        let eye_openness_dist = keys.left_eye_inner.planar_distance(&keys.left_eye_outer);

        trace!(
            "Pose sample: yaw={:.2} pitch={:.2} nose_chin={:.4}",
            raw_yaw_deg,
            raw_pitch_deg,
            nose_chin_dist
        );

        Self {
            raw_yaw_deg,
            raw_pitch_deg,
            nose_chin_dist,
            face_area_proxy,
            eye_openness_dist,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::Landmark;
    use proptest::prelude::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_frontal_face_is_neutral() {
        let sample = PoseSample::from_key_points(&FaceKeyPoints::frontal());
        assert!(sample.raw_yaw_deg.abs() < EPS);
        assert!(sample.raw_pitch_deg.abs() < EPS);
    }

    #[test]
    fn test_shape_measurements() {
        let sample = PoseSample::from_key_points(&FaceKeyPoints::frontal());
        // nose (0.50, 0.5125) to chin (0.50, 0.70)
        assert!((sample.nose_chin_dist - 0.1875).abs() < EPS);
        // eye span 0.20
        assert!((sample.face_area_proxy - 0.20 * 0.1875).abs() < EPS);
        assert!((sample.eye_openness_dist - 0.06).abs() < EPS);
    }

    #[test]
    fn test_eye_line_depth_gives_yaw() {
        let mut keys = FaceKeyPoints::frontal();
        keys.right_eye_outer.z = 0.2;
        keys.right_eye_outer.x = keys.left_eye_outer.x + 0.2;
        let sample = PoseSample::from_key_points(&keys);
        assert!((sample.raw_yaw_deg - 45.0).abs() < 1e-6);
    }

    #[test]
    fn test_nose_at_eye_line_reads_bias() {
        let mut keys = FaceKeyPoints::frontal();
        keys.nose.y = 0.40;
        let sample = PoseSample::from_key_points(&keys);
        assert!((sample.raw_pitch_deg - PITCH_BIAS_DEG).abs() < EPS);
    }

    #[test]
    fn test_degenerate_span_has_finite_pitch() {
        let mut keys = FaceKeyPoints::frontal();
        keys.chin = Landmark::new(0.5, 0.40, 0.0);
        let sample = PoseSample::from_key_points(&keys);
        assert!(sample.raw_pitch_deg.is_finite());
        assert!((sample.raw_pitch_deg - PITCH_BIAS_DEG).abs() < EPS);
    }

    #[test]
    fn test_from_frame_matches_key_points() {
        let keys = FaceKeyPoints::frontal().turned(-25.0).tilted(10.0);
        let from_frame = PoseSample::from_frame(&keys.into_frame()).unwrap();
        assert_eq!(from_frame, PoseSample::from_key_points(&keys));
    }

    #[test]
    fn test_short_frame_is_rejected() {
        let frame = LandmarkFrame::new(vec![Landmark::default(); 10]);
        assert!(PoseSample::from_frame(&frame).is_err());
    }

    proptest! {
        #[test]
        fn builders_produce_requested_angles(yaw in -89.0f64..89.0, pitch in -60.0f64..60.0) {
            let keys = FaceKeyPoints::frontal().turned(yaw).tilted(pitch);
            let sample = PoseSample::from_key_points(&keys);
            prop_assert!((sample.raw_yaw_deg - yaw).abs() < 1e-6);
            prop_assert!((sample.raw_pitch_deg - pitch).abs() < 1e-6);
        }

        #[test]
        fn scaling_shrinks_ratios_geometrically(factor in 0.1f64..2.0) {
            let base = PoseSample::from_key_points(&FaceKeyPoints::frontal());
            let scaled = PoseSample::from_key_points(&FaceKeyPoints::frontal().scaled(factor));
            prop_assert!((scaled.nose_chin_dist / base.nose_chin_dist - factor).abs() < 1e-9);
            let area_ratio = scaled.face_area_proxy / base.face_area_proxy;
            prop_assert!((area_ratio - factor * factor).abs() < 1e-9);
            prop_assert!((scaled.eye_openness_dist / base.eye_openness_dist - factor).abs() < 1e-9);
        }
    }
}
