//! Sound channel output stage

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::pulse::{Channel, SoundAction, SoundCommand};
use crate::AudioError;

/// A playable alarm sound
///
/// `start` may be refused by the host (autoplay policy, missing device);
/// callers treat that as non-fatal.
pub trait SoundChannel {
    fn start(&mut self, looped: bool) -> Result<(), AudioError>;
    fn stop(&mut self);
    fn seek_to_start(&mut self);
}

/// Owns the soft and hard channels and applies commands to them
#[derive(Debug)]
pub struct AlarmOutput<S> {
    soft: S,
    hard: S,
    rejected: u64,
}

impl<S: SoundChannel> AlarmOutput<S> {
    pub fn new(soft: S, hard: S) -> Self {
        Self {
            soft,
            hard,
            rejected: 0,
        }
    }

    /// Apply commands in order; playback failures are swallowed
    pub fn apply(&mut self, commands: &[SoundCommand]) {
        for cmd in commands {
            let channel = match cmd.channel {
                Channel::Soft => &mut self.soft,
                Channel::Hard => &mut self.hard,
            };
            match cmd.action {
                SoundAction::Start { looped } => {
                    if let Err(e) = channel.start(looped) {
                        self.rejected += 1;
                        debug!("Ignoring {} channel start failure: {}", cmd.channel.as_str(), e);
                    }
                }
                SoundAction::Stop => channel.stop(),
                SoundAction::SeekToStart => channel.seek_to_start(),
            }
        }
    }

    pub fn channel(&self, channel: Channel) -> &S {
        match channel {
            Channel::Soft => &self.soft,
            Channel::Hard => &self.hard,
        }
    }

    /// Number of starts the channels refused
    pub fn rejected_starts(&self) -> u64 {
        self.rejected
    }
}

/// A call made on a [`RecordingChannel`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelCall {
    Start { looped: bool },
    Stop,
    SeekToStart,
}

/// In-memory channel that records every call
///
/// Used for headless runs and tests. With `reject_playback` set every
/// `start` fails after being recorded.
#[derive(Debug, Clone, Default)]
pub struct RecordingChannel {
    calls: Vec<ChannelCall>,
    reject_playback: bool,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Channel whose playback is always refused
    pub fn rejecting() -> Self {
        Self {
            calls: Vec::new(),
            reject_playback: true,
        }
    }

    pub fn calls(&self) -> &[ChannelCall] {
        &self.calls
    }

    pub fn starts(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, ChannelCall::Start { .. }))
            .count()
    }
}

impl SoundChannel for RecordingChannel {
    fn start(&mut self, looped: bool) -> Result<(), AudioError> {
        self.calls.push(ChannelCall::Start { looped });
        if self.reject_playback {
            return Err(AudioError::PlaybackRejected("not allowed".into()));
        }
        Ok(())
    }

    fn stop(&mut self) {
        self.calls.push(ChannelCall::Stop);
    }

    fn seek_to_start(&mut self) {
        self.calls.push(ChannelCall::SeekToStart);
    }
}
