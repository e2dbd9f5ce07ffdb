//! Face presence watchdog

use alerting::Timestamp;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Whether the detector currently sees a face
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Presence {
    #[default]
    Present,
    /// Missing, but not yet for long enough to alarm
    MissingPending { elapsed: Duration },
    /// Missing for at least the configured delay
    MissingConfirmed { elapsed: Duration },
}

impl Presence {
    pub fn is_confirmed_missing(&self) -> bool {
        matches!(self, Presence::MissingConfirmed { .. })
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Presence::Present)
    }
}

/// Tracks how long the face has been gone
#[derive(Debug, Clone, Default)]
pub struct PresenceWatchdog {
    missing_since: Option<Timestamp>,
    confirmed: bool,
}

impl PresenceWatchdog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A frame with landmarks arrived
    pub fn face_seen(&mut self) -> Presence {
        if self.missing_since.take().is_some() {
            debug!("Face reacquired");
        }
        self.confirmed = false;
        Presence::Present
    }

    /// A frame arrived without landmarks
    pub fn face_absent(&mut self, now: Timestamp, delay: Duration) -> Presence {
        let since = *self.missing_since.get_or_insert(now);
        let elapsed = now.saturating_sub(since);
        if elapsed >= delay {
            if !self.confirmed {
                warn!("Face missing for {:.1}s", elapsed.as_secs_f64());
                self.confirmed = true;
            }
            Presence::MissingConfirmed { elapsed }
        } else {
            Presence::MissingPending { elapsed }
        }
    }

    pub fn missing_since(&self) -> Option<Timestamp> {
        self.missing_since
    }

    pub fn reset(&mut self) {
        self.missing_since = None;
        self.confirmed = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Timestamp {
        Duration::from_millis(v)
    }

    #[test]
    fn test_pending_then_confirmed() {
        let mut dog = PresenceWatchdog::new();
        let delay = ms(3000);
        assert_eq!(
            dog.face_absent(ms(100), delay),
            Presence::MissingPending { elapsed: ms(0) }
        );
        assert_eq!(
            dog.face_absent(ms(3099), delay),
            Presence::MissingPending { elapsed: ms(2999) }
        );
        assert!(dog.face_absent(ms(3100), delay).is_confirmed_missing());
        assert!(dog.face_absent(ms(9000), delay).is_confirmed_missing());
    }

    #[test]
    fn test_single_face_frame_resets() {
        let mut dog = PresenceWatchdog::new();
        dog.face_absent(ms(0), ms(3000));
        dog.face_absent(ms(2900), ms(3000));
        assert_eq!(dog.face_seen(), Presence::Present);
        assert_eq!(dog.missing_since(), None);
        assert!(!dog.face_absent(ms(3100), ms(3000)).is_confirmed_missing());
    }

    #[test]
    fn test_zero_delay_confirms_first_frame() {
        let mut dog = PresenceWatchdog::new();
        assert!(dog.face_absent(ms(42), Duration::ZERO).is_confirmed_missing());
    }
}
