//! Calibration baseline

use face_geometry::PoseSample;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Shape measurements captured as "normal" for this subject
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatioBaseline {
    pub nose_chin: f64,
    pub face_area: f64,
    pub eye_dist: f64,
}

impl RatioBaseline {
    fn from_sample(sample: &PoseSample) -> Self {
        Self {
            nose_chin: sample.nose_chin_dist,
            face_area: sample.face_area_proxy,
            eye_dist: sample.eye_openness_dist,
        }
    }
}

/// Pose after calibration offsets and baseline normalization
///
/// Ratios are `None` until a baseline exists.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AdjustedPose {
    pub yaw: f64,
    pub pitch: f64,
    pub nose_ratio: Option<f64>,
    pub area_ratio: Option<f64>,
    pub eye_ratio: Option<f64>,
}

/// Zero offsets and ratio baseline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    pub yaw_zero_offset: f64,
    pub pitch_zero_offset: f64,
    baseline: Option<RatioBaseline>,
}

impl Calibration {
    /// Zero the angles on `sample`'s raw values and drop the baseline
    ///
    /// The baseline is re-taken from the next adjusted frame, so the new
    /// zero and the new ratios always come from the same head position.
    pub fn zero_to(&mut self, sample: &PoseSample) {
        info!(
            "Calibrated: yaw offset {:.1}, pitch offset {:.1}",
            sample.raw_yaw_deg, sample.raw_pitch_deg
        );
        self.yaw_zero_offset = sample.raw_yaw_deg;
        self.pitch_zero_offset = sample.raw_pitch_deg;
        self.baseline = None;
    }

    /// Drop the baseline, keep the angle offsets
    pub fn clear_baseline(&mut self) {
        self.baseline = None;
    }

    pub fn baseline(&self) -> Option<&RatioBaseline> {
        self.baseline.as_ref()
    }

    /// Apply offsets and baseline, taking the baseline from `sample` if unset
    pub fn adjust(&mut self, sample: &PoseSample) -> AdjustedPose {
        let baseline = *self.baseline.get_or_insert_with(|| {
            debug!("Ratio baseline established");
            RatioBaseline::from_sample(sample)
        });

        AdjustedPose {
            yaw: sample.raw_yaw_deg - self.yaw_zero_offset,
            pitch: sample.raw_pitch_deg - self.pitch_zero_offset,
            nose_ratio: ratio(sample.nose_chin_dist, baseline.nose_chin),
            area_ratio: ratio(sample.face_area_proxy, baseline.face_area),
            eye_ratio: ratio(sample.eye_openness_dist, baseline.eye_dist),
        }
    }
}

/// Undefined for a zero, negative, or NaN baseline
fn ratio(current: f64, baseline: f64) -> Option<f64> {
    (baseline > 0.0).then(|| current / baseline)
}
