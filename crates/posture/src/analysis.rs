//! Per-frame status for the UI

use alerting::AlarmState;
use serde::Serialize;
use std::fmt;

use crate::calibration::AdjustedPose;
use crate::presence::Presence;
use crate::signals::ViolationSet;

/// Everything the UI shows for one evaluated frame
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    /// Whether monitoring is active
    pub running: bool,

    /// Alarm state after this frame; doubles as the style tag
    pub severity: AlarmState,

    /// Face presence
    pub presence: Presence,

    /// Calibrated pose (None when no face was seen this frame)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pose: Option<AdjustedPose>,

    /// Debounced violations asserting this frame
    pub violations: ViolationSet,

    /// Human-readable status line
    pub message: String,
}

impl StatusReport {
    /// Report for a frame seen while monitoring is stopped
    pub fn idle() -> Self {
        Self {
            running: false,
            severity: AlarmState::Safe,
            presence: Presence::Present,
            pose: None,
            violations: ViolationSet::default(),
            message: "Monitoring stopped".to_string(),
        }
    }

    pub(crate) fn build(
        severity: AlarmState,
        presence: Presence,
        pose: Option<AdjustedPose>,
        violations: ViolationSet,
    ) -> Self {
        let message = describe(severity, presence, &violations);
        Self {
            running: true,
            severity,
            presence,
            pose,
            violations,
            message,
        }
    }

    /// Yaw with one decimal, `--` without a face
    pub fn yaw_text(&self) -> String {
        angle_text(self.pose.map(|p| p.yaw))
    }

    /// Pitch with one decimal, `--` without a face
    pub fn pitch_text(&self) -> String {
        angle_text(self.pose.map(|p| p.pitch))
    }

    /// Nose, area and eye ratios with two decimals, `--` when not evaluable
    pub fn ratio_texts(&self) -> [String; 3] {
        let pose = self.pose.unwrap_or_default();
        [pose.nose_ratio, pose.area_ratio, pose.eye_ratio].map(ratio_text)
    }
}

fn describe(severity: AlarmState, presence: Presence, violations: &ViolationSet) -> String {
    match (severity, presence) {
        (_, Presence::MissingConfirmed { .. }) => "Face not detected".to_string(),
        (AlarmState::Danger, _) => "Danger latched: stop or recalibrate to reset".to_string(),
        (_, Presence::MissingPending { elapsed }) => {
            format!("Face lost, waiting ({:.1}s)", elapsed.as_secs_f64())
        }
        (AlarmState::Warning, _) => {
            let names: Vec<_> = violations.iter().map(|s| s.as_str()).collect();
            format!("Warning: {}", names.join(", "))
        }
        (AlarmState::Safe, _) => "Posture OK".to_string(),
    }
}

fn angle_text(value: Option<f64>) -> String {
    value.map_or_else(|| "--".to_string(), |v| format!("{:.1}", v))
}

fn ratio_text(value: Option<f64>) -> String {
    value.map_or_else(|| "--".to_string(), |v| format!("{:.2}", v))
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [nose, area, eye] = self.ratio_texts();
        write!(
            f,
            "[{}] yaw {} pitch {} nose {} area {} eye {} | {}",
            self.severity,
            self.yaw_text(),
            self.pitch_text(),
            nose,
            area,
            eye,
            self.message
        )
    }
}
