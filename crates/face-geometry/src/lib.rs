//! Face Geometry
//!
//! Landmark frames delivered by the face-landmark detector and the cheap
//! geometric pose model built on top of them:
//! - Yaw from the eye line's depth/horizontal ratio
//! - Pitch from the nose position within the eye-chin span
//! - Shape measurements (nose-chin, face area proxy, eye width)

pub mod landmarks;
pub mod pose;

pub use landmarks::{FaceKeyPoints, Landmark, LandmarkFrame, MESH_LANDMARK_COUNT};
pub use pose::PoseSample;

use thiserror::Error;

/// Geometry error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("Landmark {index} missing from frame of {len} points")]
    LandmarkMissing { index: usize, len: usize },
}
