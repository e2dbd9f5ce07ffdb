//! Alerting System
//!
//! Provides the SAFE/WARNING/DANGER alarm state machine, the per-state
//! pulse schedule for the two sound channels, and the output stage that
//! drives those channels.

mod log;
mod machine;
mod output;
mod pulse;

pub use log::{AlarmLog, Transition};
pub use machine::{AlarmState, AlarmStateMachine, AlarmVerdict};
pub use output::{AlarmOutput, ChannelCall, RecordingChannel, SoundChannel};
pub use pulse::{Channel, PulseLoop, PulsePattern, SoundAction, SoundCommand};

use std::time::Duration;
use thiserror::Error;

/// Monotonic time since session start
pub type Timestamp = Duration;

/// Sound channel errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AudioError {
    #[error("Playback rejected: {0}")]
    PlaybackRejected(String),
}
