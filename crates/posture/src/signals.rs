//! Debounced violation signals
//!
//! Each signal has its own timer. A timer exists only while its signal is
//! continuously violating; one clean frame deletes it outright.

use alerting::Timestamp;
use serde::ser::SerializeSeq;
use serde::{Deserialize, Serialize, Serializer};
use std::ops::{Index, IndexMut};
use tracing::debug;

use crate::calibration::AdjustedPose;
use crate::config::Thresholds;

/// Independent violation signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    /// Head turned left/right
    Yaw,
    /// Head tilted up/down
    Pitch,
    /// Nose-chin span shrunk
    Nose,
    /// Apparent face area shrunk
    Area,
    /// Eye width shrunk
    Eye,
}

impl Signal {
    pub const ALL: [Signal; 5] = [
        Signal::Yaw,
        Signal::Pitch,
        Signal::Nose,
        Signal::Area,
        Signal::Eye,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Yaw => "yaw",
            Signal::Pitch => "pitch",
            Signal::Nose => "nose",
            Signal::Area => "area",
            Signal::Eye => "eye",
        }
    }

    /// Undebounced test for this frame
    pub fn is_violating(&self, pose: &AdjustedPose, thresholds: &Thresholds) -> bool {
        let below = |ratio: Option<f64>, floor: f64| ratio.is_some_and(|r| r < floor);
        match self {
            Signal::Yaw => pose.yaw.abs() > thresholds.max_yaw_deg,
            Signal::Pitch => pose.pitch.abs() > thresholds.max_pitch_deg,
            Signal::Nose => below(pose.nose_ratio, thresholds.nose_ratio_min),
            Signal::Area => below(pose.area_ratio, thresholds.area_ratio_min),
            Signal::Eye => below(pose.eye_ratio, thresholds.eye_ratio_min),
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

/// Fixed-size map keyed by [`Signal`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SignalMap<T>([T; 5]);

impl<T> Index<Signal> for SignalMap<T> {
    type Output = T;

    fn index(&self, signal: Signal) -> &T {
        &self.0[signal.index()]
    }
}

impl<T> IndexMut<Signal> for SignalMap<T> {
    fn index_mut(&mut self, signal: Signal) -> &mut T {
        &mut self.0[signal.index()]
    }
}

/// Signals asserting this frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ViolationSet(SignalMap<bool>);

impl ViolationSet {
    pub fn insert(&mut self, signal: Signal) {
        self.0[signal] = true;
    }

    pub fn contains(&self, signal: Signal) -> bool {
        self.0[signal]
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn iter(&self) -> impl Iterator<Item = Signal> + '_ {
        Signal::ALL.into_iter().filter(move |&s| self.contains(s))
    }
}

impl FromIterator<Signal> for ViolationSet {
    fn from_iter<I: IntoIterator<Item = Signal>>(iter: I) -> Self {
        let mut set = Self::default();
        for signal in iter {
            set.insert(signal);
        }
        set
    }
}

impl Serialize for ViolationSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        for signal in self.iter() {
            seq.serialize_element(&signal)?;
        }
        seq.end()
    }
}

/// Violation start time per signal
#[derive(Debug, Clone, Default)]
pub struct DebounceTimers(SignalMap<Option<Timestamp>>);

impl DebounceTimers {
    /// When `signal` started violating, if it currently is
    pub fn started(&self, signal: Signal) -> Option<Timestamp> {
        self.0[signal]
    }

    pub fn is_idle(&self) -> bool {
        Signal::ALL.iter().all(|&s| self.0[s].is_none())
    }

    pub fn clear(&mut self) {
        self.0 = SignalMap::default();
    }
}

/// Run all signals for one frame
///
/// Starts a timer for every newly violating signal, deletes the timer of
/// every clean one, and asserts those whose timer is at least `delay` old.
pub fn evaluate(
    pose: &AdjustedPose,
    thresholds: &Thresholds,
    timers: &mut DebounceTimers,
    now: Timestamp,
) -> ViolationSet {
    let delay = thresholds.violation_delay();
    let mut violations = ViolationSet::default();

    for signal in Signal::ALL {
        if !signal.is_violating(pose, thresholds) {
            if timers.0[signal].take().is_some() {
                debug!("Signal {} cleared", signal.as_str());
            }
            continue;
        }

        let started = *timers.0[signal].get_or_insert(now);
        if now.saturating_sub(started) >= delay {
            violations.insert(signal);
        }
    }

    violations
}
