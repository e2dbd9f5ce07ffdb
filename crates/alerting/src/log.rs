//! In-session alarm history

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::machine::AlarmState;
use crate::Timestamp;

/// One accepted state change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub from: AlarmState,
    pub to: AlarmState,
    pub at: Timestamp,
}

/// Accepted transitions and time spent per state
#[derive(Debug, Clone)]
pub struct AlarmLog {
    transitions: Vec<Transition>,
    dwell: [Duration; 3],
    entered_at: Timestamp,
}

impl AlarmLog {
    pub fn new(now: Timestamp) -> Self {
        Self {
            transitions: Vec::new(),
            dwell: [Duration::ZERO; 3],
            entered_at: now,
        }
    }

    pub(crate) fn record(&mut self, from: AlarmState, to: AlarmState, at: Timestamp) {
        self.dwell[from.index()] += at.saturating_sub(self.entered_at);
        self.entered_at = at;
        self.transitions.push(Transition { from, to, at });
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// Number of times `state` was entered
    pub fn entries(&self, state: AlarmState) -> usize {
        self.transitions.iter().filter(|t| t.to == state).count()
    }

    /// Total time in `state` up to `now`, counting the current stay
    pub fn time_in(&self, state: AlarmState, current: AlarmState, now: Timestamp) -> Duration {
        let mut total = self.dwell[state.index()];
        if state == current {
            total += now.saturating_sub(self.entered_at);
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Timestamp {
        Duration::from_millis(v)
    }

    #[test]
    fn test_dwell_accounting() {
        let mut log = AlarmLog::new(ms(0));
        log.record(AlarmState::Safe, AlarmState::Warning, ms(1000));
        log.record(AlarmState::Warning, AlarmState::Danger, ms(1500));

        assert_eq!(log.time_in(AlarmState::Safe, AlarmState::Danger, ms(4000)), ms(1000));
        assert_eq!(log.time_in(AlarmState::Warning, AlarmState::Danger, ms(4000)), ms(500));
        assert_eq!(log.time_in(AlarmState::Danger, AlarmState::Danger, ms(4000)), ms(2500));
        assert_eq!(log.entries(AlarmState::Danger), 1);
        assert_eq!(log.entries(AlarmState::Safe), 0);
    }

    #[test]
    fn test_backwards_clock_saturates() {
        let mut log = AlarmLog::new(ms(500));
        log.record(AlarmState::Safe, AlarmState::Warning, ms(100));
        assert_eq!(log.time_in(AlarmState::Safe, AlarmState::Warning, ms(50)), Duration::ZERO);
    }
}
