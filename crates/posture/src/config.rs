//! Threshold configuration

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

use crate::PostureError;

/// Detection thresholds
///
/// Every field may be changed while monitoring; the next evaluated frame
/// uses the new value. Values are not validated: a zero or negative delay
/// asserts immediately and NaN never violates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Maximum yaw away from calibrated center (degrees)
    pub max_yaw_deg: f64,

    /// Maximum pitch away from calibrated center (degrees)
    pub max_pitch_deg: f64,

    /// How long each signal must hold before it counts (seconds)
    pub violation_delay_s: f64,

    /// How long the face may be missing before DANGER (seconds)
    pub face_missing_delay_s: f64,

    /// Nose-chin ratio floor
    pub nose_ratio_min: f64,

    /// Face area ratio floor
    pub area_ratio_min: f64,

    /// Eye width ratio floor
    pub eye_ratio_min: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            max_yaw_deg: 30.0,
            max_pitch_deg: 20.0,
            violation_delay_s: 1.0,
            face_missing_delay_s: 3.0,
            nose_ratio_min: 0.85,
            area_ratio_min: 0.75,
            eye_ratio_min: 0.70,
        }
    }
}

impl Thresholds {
    /// Create strict config (tighter angles, faster alarms)
    pub fn strict() -> Self {
        Self {
            max_yaw_deg: 20.0,
            max_pitch_deg: 15.0,
            violation_delay_s: 0.5,
            face_missing_delay_s: 2.0,
            ..Default::default()
        }
    }

    /// Create lenient config (wider angles, slower alarms)
    pub fn lenient() -> Self {
        Self {
            max_yaw_deg: 45.0,
            max_pitch_deg: 30.0,
            violation_delay_s: 2.0,
            face_missing_delay_s: 5.0,
            ..Default::default()
        }
    }

    /// Set a single threshold by key
    pub fn set(&mut self, key: ThresholdKey, value: f64) {
        match key {
            ThresholdKey::MaxYawDeg => self.max_yaw_deg = value,
            ThresholdKey::MaxPitchDeg => self.max_pitch_deg = value,
            ThresholdKey::ViolationDelayS => self.violation_delay_s = value,
            ThresholdKey::FaceMissingDelayS => self.face_missing_delay_s = value,
            ThresholdKey::NoseRatioMin => self.nose_ratio_min = value,
            ThresholdKey::AreaRatioMin => self.area_ratio_min = value,
            ThresholdKey::EyeRatioMin => self.eye_ratio_min = value,
        }
    }

    pub fn get(&self, key: ThresholdKey) -> f64 {
        match key {
            ThresholdKey::MaxYawDeg => self.max_yaw_deg,
            ThresholdKey::MaxPitchDeg => self.max_pitch_deg,
            ThresholdKey::ViolationDelayS => self.violation_delay_s,
            ThresholdKey::FaceMissingDelayS => self.face_missing_delay_s,
            ThresholdKey::NoseRatioMin => self.nose_ratio_min,
            ThresholdKey::AreaRatioMin => self.area_ratio_min,
            ThresholdKey::EyeRatioMin => self.eye_ratio_min,
        }
    }

    pub fn violation_delay(&self) -> Duration {
        seconds(self.violation_delay_s)
    }

    pub fn face_missing_delay(&self) -> Duration {
        seconds(self.face_missing_delay_s)
    }
}

/// Negative and NaN clamp to zero, overflow saturates
fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value.max(0.0)).unwrap_or(Duration::MAX)
}

/// Names of the settable thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdKey {
    MaxYawDeg,
    MaxPitchDeg,
    ViolationDelayS,
    FaceMissingDelayS,
    NoseRatioMin,
    AreaRatioMin,
    EyeRatioMin,
}

impl ThresholdKey {
    pub const ALL: [ThresholdKey; 7] = [
        ThresholdKey::MaxYawDeg,
        ThresholdKey::MaxPitchDeg,
        ThresholdKey::ViolationDelayS,
        ThresholdKey::FaceMissingDelayS,
        ThresholdKey::NoseRatioMin,
        ThresholdKey::AreaRatioMin,
        ThresholdKey::EyeRatioMin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ThresholdKey::MaxYawDeg => "max_yaw_deg",
            ThresholdKey::MaxPitchDeg => "max_pitch_deg",
            ThresholdKey::ViolationDelayS => "violation_delay_s",
            ThresholdKey::FaceMissingDelayS => "face_missing_delay_s",
            ThresholdKey::NoseRatioMin => "nose_ratio_min",
            ThresholdKey::AreaRatioMin => "area_ratio_min",
            ThresholdKey::EyeRatioMin => "eye_ratio_min",
        }
    }
}

impl FromStr for ThresholdKey {
    type Err = PostureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| PostureError::UnknownThreshold(s.to_string()))
    }
}
