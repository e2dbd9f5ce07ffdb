//! Sound channel that writes to the log

use alerting::{AudioError, SoundChannel};
use tracing::{debug, info};

/// Log-backed stand-in for a speaker
///
/// Every start is logged at info level so a replayed session shows the
/// alarm rhythm in the log. With `reject_playback` set each start is
/// refused, like a browser blocking autoplay.
#[derive(Debug, Clone)]
pub struct LogChannel {
    name: &'static str,
    playing: bool,
    reject_playback: bool,
    starts: u64,
}

impl LogChannel {
    pub fn new(name: &'static str, reject_playback: bool) -> Self {
        Self {
            name,
            playing: false,
            reject_playback,
            starts: 0,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Accepted starts so far
    pub fn starts(&self) -> u64 {
        self.starts
    }
}

impl SoundChannel for LogChannel {
    fn start(&mut self, looped: bool) -> Result<(), AudioError> {
        if self.reject_playback {
            return Err(AudioError::PlaybackRejected(format!(
                "{} channel muted",
                self.name
            )));
        }
        self.playing = true;
        self.starts += 1;
        info!("[{}] beep{}", self.name, if looped { " (looped)" } else { "" });
        Ok(())
    }

    fn stop(&mut self) {
        if self.playing {
            debug!("[{}] stop", self.name);
        }
        self.playing = false;
    }

    fn seek_to_start(&mut self) {
        debug!("[{}] rewind", self.name);
    }
}
