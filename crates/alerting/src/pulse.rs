//! Pulsed sound scheduling
//!
//! Each alarm state owns one `PulseLoop`. The loop is a tiny state machine:
//!
//! ```text
//! Idle --begin--> Lead (on window) --fire--> Repeat (off window) --fire--> Repeat ...
//! ```
//!
//! A pulse is emitted on `begin`, when the lead window closes, and at the
//! end of every off window after that. The loop holds exactly one deadline,
//! so cancelling it drops every future pulse at once.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::trace;

use crate::Timestamp;

/// Shortest repeat window, keeps a zero pattern from spinning
const MIN_WINDOW: Duration = Duration::from_millis(1);

/// Sound channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Gentle chime for warnings
    Soft,
    /// Harsh buzzer for danger
    Hard,
}

impl Channel {
    pub const ALL: [Channel; 2] = [Channel::Soft, Channel::Hard];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Soft => "soft",
            Channel::Hard => "hard",
        }
    }
}

/// Operation on a sound channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SoundAction {
    Start { looped: bool },
    Stop,
    SeekToStart,
}

/// A command for the audio collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoundCommand {
    pub channel: Channel,
    pub action: SoundAction,
}

impl SoundCommand {
    pub fn stop(channel: Channel) -> Self {
        Self {
            channel,
            action: SoundAction::Stop,
        }
    }

    /// Stop commands for every channel
    pub fn silence() -> Vec<SoundCommand> {
        Channel::ALL.iter().map(|&c| Self::stop(c)).collect()
    }

    /// Rewind and play once
    pub fn pulse(channel: Channel) -> [SoundCommand; 2] {
        [
            Self {
                channel,
                action: SoundAction::SeekToStart,
            },
            Self {
                channel,
                action: SoundAction::Start { looped: false },
            },
        ]
    }

    pub fn is_start(&self) -> bool {
        matches!(self.action, SoundAction::Start { .. })
    }
}

/// On/off rhythm of a pulse loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PulsePattern {
    pub on: Duration,
    pub off: Duration,
}

impl PulsePattern {
    pub const fn from_millis(on_ms: u64, off_ms: u64) -> Self {
        Self {
            on: Duration::from_millis(on_ms),
            off: Duration::from_millis(off_ms),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Lead { until: Timestamp },
    Repeat { until: Timestamp },
}

/// Self-rescheduling pulse schedule for a single channel
#[derive(Debug, Clone)]
pub struct PulseLoop<O = ()> {
    owner: Option<O>,
    channel: Channel,
    pattern: PulsePattern,
    phase: Phase,
}

impl<O: Copy + PartialEq> PulseLoop<O> {
    /// A loop that never fires
    pub fn idle() -> Self {
        Self {
            owner: None,
            channel: Channel::Soft,
            pattern: PulsePattern::from_millis(0, 0),
            phase: Phase::Idle,
        }
    }

    /// Start a loop for `owner`, returning the first pulse
    pub fn begin(
        owner: O,
        channel: Channel,
        pattern: PulsePattern,
        now: Timestamp,
    ) -> (Self, [SoundCommand; 2]) {
        let lp = Self {
            owner: Some(owner),
            channel,
            pattern,
            phase: Phase::Lead {
                until: now + pattern.on,
            },
        };
        (lp, SoundCommand::pulse(channel))
    }

    /// State the loop was started for (None when idle)
    pub fn owner(&self) -> Option<O> {
        self.owner
    }

    pub fn is_idle(&self) -> bool {
        self.phase == Phase::Idle
    }

    /// Time of the next pulse
    pub fn deadline(&self) -> Option<Timestamp> {
        match self.phase {
            Phase::Idle => None,
            Phase::Lead { until } | Phase::Repeat { until } => Some(until),
        }
    }

    /// Drop the pending pulse and every one after it
    pub fn cancel(&mut self) {
        self.owner = None;
        self.phase = Phase::Idle;
    }

    /// Emit a pulse if the deadline has passed
    ///
    /// Deadlines advance from the previous deadline, not from `now`; a late
    /// call emits one pulse and skips every window that is already over.
    pub fn fire(&mut self, now: Timestamp) -> Option<[SoundCommand; 2]> {
        let due = self.deadline()?;
        if now < due {
            return None;
        }

        let window = self.pattern.off.max(MIN_WINDOW);
        let mut next = due + window;
        if next <= now {
            let missed = (now - next).as_nanos() / window.as_nanos() + 1;
            next += window * u32::try_from(missed).unwrap_or(u32::MAX);
        }
        trace!(
            "Pulse on {} at {:?}, next at {:?}",
            self.channel.as_str(),
            now,
            next
        );
        self.phase = Phase::Repeat { until: next };
        Some(SoundCommand::pulse(self.channel))
    }
}

impl<O: Copy + PartialEq> Default for PulseLoop<O> {
    fn default() -> Self {
        Self::idle()
    }
}
