//! Landmark frame types

use serde::{Deserialize, Serialize};

use crate::GeometryError;

/// Number of points in a full face mesh
pub const MESH_LANDMARK_COUNT: usize = 468;

/// Mesh indices of the points the pose model reads
pub mod index {
    pub const NOSE_TIP: usize = 1;
    pub const LEFT_EYE_OUTER: usize = 33;
    pub const LEFT_EYE_INNER: usize = 133;
    pub const CHIN: usize = 152;
    pub const RIGHT_EYE_OUTER: usize = 263;
}

/// A single landmark in normalized image space
///
/// Serialized as `[x, y, z]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 3]", into = "[f64; 3]")]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Landmark {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance in the image plane (z ignored)
    pub fn planar_distance(&self, other: &Landmark) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl From<[f64; 3]> for Landmark {
    fn from([x, y, z]: [f64; 3]) -> Self {
        Self { x, y, z }
    }
}

impl From<Landmark> for [f64; 3] {
    fn from(l: Landmark) -> Self {
        [l.x, l.y, l.z]
    }
}

/// One detector result: the ordered landmark set for a single face
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LandmarkFrame {
    points: Vec<Landmark>,
}

impl LandmarkFrame {
    /// Create a frame from detector output
    pub fn new(points: Vec<Landmark>) -> Self {
        Self { points }
    }

    /// Get landmark at mesh index
    pub fn point(&self, index: usize) -> Result<Landmark, GeometryError> {
        self.points
            .get(index)
            .copied()
            .ok_or(GeometryError::LandmarkMissing {
                index,
                len: self.points.len(),
            })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[Landmark] {
        &self.points
    }
}

/// The five landmarks the pose model needs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceKeyPoints {
    pub nose: Landmark,
    pub chin: Landmark,
    pub left_eye_outer: Landmark,
    pub left_eye_inner: Landmark,
    pub right_eye_outer: Landmark,
}

impl FaceKeyPoints {
    /// Pick the key points out of a full frame
    pub fn from_frame(frame: &LandmarkFrame) -> Result<Self, GeometryError> {
        Ok(Self {
            nose: frame.point(index::NOSE_TIP)?,
            chin: frame.point(index::CHIN)?,
            left_eye_outer: frame.point(index::LEFT_EYE_OUTER)?,
            left_eye_inner: frame.point(index::LEFT_EYE_INNER)?,
            right_eye_outer: frame.point(index::RIGHT_EYE_OUTER)?,
        })
    }

    /// Expand into a full mesh-sized frame (unused points at origin)
    pub fn into_frame(self) -> LandmarkFrame {
        let mut points = vec![Landmark::default(); MESH_LANDMARK_COUNT];
        points[index::NOSE_TIP] = self.nose;
        points[index::CHIN] = self.chin;
        points[index::LEFT_EYE_OUTER] = self.left_eye_outer;
        points[index::LEFT_EYE_INNER] = self.left_eye_inner;
        points[index::RIGHT_EYE_OUTER] = self.right_eye_outer;
        LandmarkFrame::new(points)
    }
}

/// Synthetic faces for tests and recorded demo sessions
///
/// Enabled by the `test-util` feature.
#[cfg(any(test, feature = "test-util"))]
impl FaceKeyPoints {
    /// Synthetic camera-facing face with zero raw yaw and pitch
    pub fn frontal() -> Self {
        Self {
            nose: Landmark::new(0.50, 0.5125, -0.05),
            chin: Landmark::new(0.50, 0.70, 0.0),
            left_eye_outer: Landmark::new(0.40, 0.40, 0.0),
            left_eye_inner: Landmark::new(0.46, 0.40, 0.0),
            right_eye_outer: Landmark::new(0.60, 0.40, 0.0),
        }
    }

    /// Swing the right eye around the left one in the x/z plane so raw yaw
    /// reads `yaw_deg`
    ///
    /// At 90° the right eye sits directly behind the left one.
    pub fn turned(mut self, yaw_deg: f64) -> Self {
        let span = (self.right_eye_outer.x - self.left_eye_outer.x).abs().max(1e-3);
        let yaw = yaw_deg.to_radians();
        self.right_eye_outer.x = self.left_eye_outer.x + span * yaw.cos();
        self.right_eye_outer.z = self.left_eye_outer.z + span * yaw.sin();
        self
    }

    /// Move the nose along the eye-chin span so raw pitch reads `pitch_deg`
    pub fn tilted(mut self, pitch_deg: f64) -> Self {
        let eye_center_y = (self.left_eye_outer.y + self.right_eye_outer.y) / 2.0;
        let span = self.chin.y - eye_center_y;
        let pitch_index = (pitch_deg - crate::pose::PITCH_BIAS_DEG) / crate::pose::PITCH_SCALE_DEG;
        self.nose.y = eye_center_y + pitch_index * span;
        self
    }

    /// Scale every planar distance about the nose (depth untouched)
    pub fn scaled(mut self, factor: f64) -> Self {
        let origin = self.nose;
        for p in [
            &mut self.chin,
            &mut self.left_eye_outer,
            &mut self.left_eye_inner,
            &mut self.right_eye_outer,
        ] {
            p.x = origin.x + (p.x - origin.x) * factor;
            p.y = origin.y + (p.y - origin.y) * factor;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_landmark() {
        let frame = LandmarkFrame::new(vec![Landmark::default(); 100]);
        assert_eq!(
            FaceKeyPoints::from_frame(&frame),
            Err(GeometryError::LandmarkMissing { index: 152, len: 100 })
        );
    }

    #[test]
    fn test_key_points_survive_frame_expansion() {
        let keys = FaceKeyPoints::frontal().turned(20.0);
        let frame = keys.into_frame();
        assert_eq!(frame.len(), MESH_LANDMARK_COUNT);
        assert_eq!(FaceKeyPoints::from_frame(&frame).unwrap(), keys);
    }

    #[test]
    fn test_planar_distance_ignores_depth() {
        let a = Landmark::new(0.0, 0.0, 5.0);
        let b = Landmark::new(3.0, 4.0, -5.0);
        assert!((a.planar_distance(&b) - 5.0).abs() < 1e-12);
    }
}
