//! Posture Monitoring Engine
//!
//! Real-time attentiveness monitoring from face landmarks:
//! - Yaw/pitch and face shape measurements per frame
//! - User-triggered calibration of zero angles and shape baseline
//! - Independently debounced violation signals
//! - Face presence watchdog
//! - SAFE/WARNING/DANGER alarm with pulsed sound commands
//!
//! The engine performs no I/O. Each call returns the sound commands it
//! wants executed; the driving loop hands them to an
//! [`alerting::AlarmOutput`].

pub mod analysis;
pub mod calibration;
pub mod config;
pub mod presence;
pub mod signals;

pub use analysis::StatusReport;
pub use calibration::{AdjustedPose, Calibration, RatioBaseline};
pub use config::{ThresholdKey, Thresholds};
pub use presence::{Presence, PresenceWatchdog};
pub use signals::{DebounceTimers, Signal, ViolationSet};

use alerting::{AlarmLog, AlarmState, AlarmStateMachine, AlarmVerdict, SoundCommand, Timestamp};
use face_geometry::{GeometryError, LandmarkFrame, PoseSample};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Posture engine error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PostureError {
    #[error("Landmark frame unusable: {0}")]
    Geometry(#[from] GeometryError),

    #[error("Unknown threshold: {0}")]
    UnknownThreshold(String),
}

/// Result of one evaluation pass
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub report: StatusReport,
    pub commands: Vec<SoundCommand>,
}

impl Evaluation {
    fn idle() -> Self {
        Self {
            report: StatusReport::idle(),
            commands: Vec::new(),
        }
    }
}

/// Posture monitoring engine
///
/// Owns the thresholds, calibration, debounce timers, presence watchdog and
/// alarm. All methods run on the caller's thread and return immediately.
pub struct PostureEngine {
    thresholds: Thresholds,
    calibration: Calibration,
    timers: DebounceTimers,
    watchdog: PresenceWatchdog,
    alarm: AlarmStateMachine,
    last_sample: Option<PoseSample>,
    running: bool,
}

impl PostureEngine {
    /// Create a stopped engine
    pub fn new(thresholds: Thresholds, now: Timestamp) -> Self {
        info!("Creating posture engine with thresholds: {:?}", thresholds);
        Self {
            thresholds,
            calibration: Calibration::default(),
            timers: DebounceTimers::default(),
            watchdog: PresenceWatchdog::new(),
            alarm: AlarmStateMachine::new(now),
            last_sample: None,
            running: false,
        }
    }

    /// Evaluate one detector result (`None` when no face was found)
    ///
    /// A no-op while stopped. Due pulses are included in the returned
    /// commands, so a purely frame-driven loop still sounds the alarm.
    pub fn evaluate(
        &mut self,
        frame: Option<&LandmarkFrame>,
        now: Timestamp,
    ) -> Result<Evaluation, PostureError> {
        if !self.running {
            return Ok(Evaluation::idle());
        }

        let (presence, pose, violations) = match frame {
            Some(frame) => {
                let sample = PoseSample::from_frame(frame)?;
                let presence = self.watchdog.face_seen();
                self.last_sample = Some(sample);
                let pose = self.calibration.adjust(&sample);
                let violations = signals::evaluate(&pose, &self.thresholds, &mut self.timers, now);
                (presence, Some(pose), violations)
            }
            None => {
                let presence = self
                    .watchdog
                    .face_absent(now, self.thresholds.face_missing_delay());
                (presence, None, ViolationSet::default())
            }
        };

        // A face that is only briefly gone holds the current alarm
        let mut commands = if matches!(presence, Presence::MissingPending { .. }) {
            Vec::new()
        } else {
            let verdict = AlarmVerdict {
                face_missing: presence.is_confirmed_missing(),
                violating: !violations.is_empty(),
            };
            self.alarm.update(verdict, now)
        };
        commands.extend(self.alarm.poll(now));

        let report = StatusReport::build(self.alarm.state(), presence, pose, violations);
        debug!("{}", report);

        Ok(Evaluation { report, commands })
    }

    /// Fire any pulse that is due
    pub fn poll(&mut self, now: Timestamp) -> Vec<SoundCommand> {
        if !self.running {
            return Vec::new();
        }
        self.alarm.poll(now)
    }

    /// When the next pulse is due
    pub fn next_deadline(&self) -> Option<Timestamp> {
        if self.running {
            self.alarm.next_deadline()
        } else {
            None
        }
    }

    /// Re-zero on the last seen pose and re-take the shape baseline
    ///
    /// Also clears every debounce timer, the presence watchdog, and a
    /// latched DANGER.
    pub fn calibrate(&mut self, now: Timestamp) -> Vec<SoundCommand> {
        match self.last_sample {
            Some(sample) => self.calibration.zero_to(&sample),
            None => {
                warn!("Calibration requested before any face was seen; keeping angle offsets");
                self.calibration.clear_baseline();
            }
        }
        self.timers.clear();
        self.watchdog.reset();
        self.alarm.force_safe(now)
    }

    /// Begin monitoring
    pub fn start(&mut self, now: Timestamp) -> Vec<SoundCommand> {
        if self.running {
            return Vec::new();
        }
        info!("Monitoring started");
        self.running = true;
        self.timers.clear();
        self.watchdog.reset();
        self.alarm.force_safe(now)
    }

    /// Stop monitoring, silence both channels and reset to SAFE
    pub fn stop(&mut self, now: Timestamp) -> Vec<SoundCommand> {
        if self.running {
            info!("Monitoring stopped");
        }
        self.running = false;
        self.timers.clear();
        self.watchdog.reset();
        let commands = self.alarm.force_safe(now);
        if commands.is_empty() {
            SoundCommand::silence()
        } else {
            commands
        }
    }

    /// Start if stopped, stop if running
    pub fn toggle(&mut self, now: Timestamp) -> Vec<SoundCommand> {
        if self.running {
            self.stop(now)
        } else {
            self.start(now)
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn alarm_state(&self) -> AlarmState {
        self.alarm.state()
    }

    pub fn alarm_log(&self) -> &AlarmLog {
        self.alarm.log()
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Thresholds for live adjustment; changes apply from the next frame
    pub fn thresholds_mut(&mut self) -> &mut Thresholds {
        &mut self.thresholds
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    pub fn timers(&self) -> &DebounceTimers {
        &self.timers
    }

    pub fn watchdog(&self) -> &PresenceWatchdog {
        &self.watchdog
    }
}
