//! Alarm State Machine

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::log::AlarmLog;
use crate::pulse::{Channel, PulseLoop, PulsePattern, SoundCommand};
use crate::Timestamp;

/// Alarm level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlarmState {
    #[default]
    Safe,
    Warning,
    Danger,
}

impl AlarmState {
    pub const ALL: [AlarmState; 3] = [AlarmState::Safe, AlarmState::Warning, AlarmState::Danger];

    /// Severity tag for the UI
    pub fn as_str(&self) -> &'static str {
        match self {
            AlarmState::Safe => "safe",
            AlarmState::Warning => "warning",
            AlarmState::Danger => "danger",
        }
    }

    /// Channel and rhythm sounded while in this state
    pub fn pulse(&self) -> Option<(Channel, PulsePattern)> {
        match self {
            AlarmState::Safe => None,
            AlarmState::Warning => Some((Channel::Soft, PulsePattern::from_millis(500, 1000))),
            AlarmState::Danger => Some((Channel::Hard, PulsePattern::from_millis(1000, 1000))),
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            AlarmState::Safe => 0,
            AlarmState::Warning => 1,
            AlarmState::Danger => 2,
        }
    }
}

impl std::fmt::Display for AlarmState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-tick input to the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AlarmVerdict {
    /// Face absent for longer than the configured delay
    pub face_missing: bool,
    /// At least one debounced violation is asserting
    pub violating: bool,
}

impl AlarmVerdict {
    /// State this verdict asks for, in priority order
    pub fn target(&self) -> AlarmState {
        if self.face_missing {
            AlarmState::Danger
        } else if self.violating {
            AlarmState::Warning
        } else {
            AlarmState::Safe
        }
    }
}

/// Three-level alarm with a latching DANGER state
///
/// Once DANGER is entered only [`AlarmStateMachine::force_safe`] leaves it.
/// Every accepted change silences both channels before the new state's
/// pulse loop starts.
#[derive(Debug, Clone)]
pub struct AlarmStateMachine {
    state: AlarmState,
    pulse: PulseLoop<AlarmState>,
    log: AlarmLog,
}

impl AlarmStateMachine {
    /// Create a machine in SAFE
    pub fn new(now: Timestamp) -> Self {
        Self {
            state: AlarmState::Safe,
            pulse: PulseLoop::idle(),
            log: AlarmLog::new(now),
        }
    }

    /// Current state
    pub fn state(&self) -> AlarmState {
        self.state
    }

    /// Transition history
    pub fn log(&self) -> &AlarmLog {
        &self.log
    }

    /// Apply one tick's verdict
    pub fn update(&mut self, verdict: AlarmVerdict, now: Timestamp) -> Vec<SoundCommand> {
        let target = verdict.target();
        if target == self.state {
            return Vec::new();
        }
        if self.state == AlarmState::Danger {
            debug!("Transition to {} refused: danger is latched", target);
            return Vec::new();
        }
        self.enter(target, now)
    }

    /// Return to SAFE regardless of the latch
    pub fn force_safe(&mut self, now: Timestamp) -> Vec<SoundCommand> {
        if self.state == AlarmState::Safe {
            self.pulse.cancel();
            return Vec::new();
        }
        info!("Alarm reset from {}", self.state);
        self.enter(AlarmState::Safe, now)
    }

    /// Next time `poll` has work to do
    pub fn next_deadline(&self) -> Option<Timestamp> {
        self.pulse.deadline()
    }

    /// Fire the pulse loop if it is due
    pub fn poll(&mut self, now: Timestamp) -> Vec<SoundCommand> {
        if self.pulse.is_idle() {
            return Vec::new();
        }
        if self.pulse.owner() != Some(self.state) {
            debug!("Discarding stale pulse loop");
            self.pulse.cancel();
            return Vec::new();
        }
        self.pulse
            .fire(now)
            .map(|cmds| cmds.to_vec())
            .unwrap_or_default()
    }

    fn enter(&mut self, target: AlarmState, now: Timestamp) -> Vec<SoundCommand> {
        info!("Alarm {} -> {}", self.state, target);
        self.log.record(self.state, target, now);
        self.state = target;
        self.pulse.cancel();

        let mut commands = SoundCommand::silence();
        if let Some((channel, pattern)) = target.pulse() {
            let (pulse, first) = PulseLoop::begin(target, channel, pattern, now);
            self.pulse = pulse;
            commands.extend(first);
        }
        commands
    }
}
