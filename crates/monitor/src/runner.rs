//! Session replay loop
//!
//! Feeds recorded events to the engine, fires alarm pulses between them
//! and applies every sound command to the output stage. Two clocks are
//! supported: simulated (pulses are polled at their deadlines, no
//! sleeping) and realtime (tokio timers pace the replay).

use alerting::{AlarmOutput, AlarmState, SoundChannel, SoundCommand, Timestamp};
use face_geometry::LandmarkFrame;
use posture::{PostureEngine, ThresholdKey};
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::channel::LogChannel;
use crate::session::SessionEvent;
use crate::settings::{MonitorSettings, ReportOutput};
use crate::MonitorError;

/// Per-state totals for a finished session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateSummary {
    pub state: AlarmState,
    pub entries: usize,
    pub time_ms: u64,
}

/// What happened during a replay
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub events: u64,
    pub frames: u64,
    pub missing_frames: u64,
    /// Events the engine refused (malformed frames, unknown thresholds)
    pub skipped_events: u64,
    pub calibrations: u64,
    /// Alarm state when the last event was handled
    pub final_state: AlarmState,
    pub states: Vec<StateSummary>,
    pub rejected_starts: u64,
    pub duration_ms: u64,
}

impl SessionSummary {
    pub fn state(&self, state: AlarmState) -> Option<&StateSummary> {
        self.states.iter().find(|s| s.state == state)
    }
}

/// Engine plus output stage, driven by session events
pub struct Monitor<S> {
    engine: PostureEngine,
    output: AlarmOutput<S>,
    reports: ReportOutput,
    /// Time of the last handled event
    clock: Timestamp,
    events: u64,
    frames: u64,
    missing_frames: u64,
    skipped_events: u64,
    calibrations: u64,
}

impl Monitor<LogChannel> {
    /// Monitor with log-backed channels, configured from settings
    pub fn from_settings(settings: &MonitorSettings) -> Self {
        let engine = PostureEngine::new(settings.thresholds.clone(), Duration::ZERO);
        let output = AlarmOutput::new(
            LogChannel::new("soft", settings.reject_playback),
            LogChannel::new("hard", settings.reject_playback),
        );
        let mut monitor = Self::new(engine, output, settings.reports);
        if settings.start_running {
            let commands = monitor.engine.start(Duration::ZERO);
            monitor.output.apply(&commands);
        }
        monitor
    }
}

impl<S: SoundChannel> Monitor<S> {
    pub fn new(engine: PostureEngine, output: AlarmOutput<S>, reports: ReportOutput) -> Self {
        Self {
            engine,
            output,
            reports,
            clock: Duration::ZERO,
            events: 0,
            frames: 0,
            missing_frames: 0,
            skipped_events: 0,
            calibrations: 0,
        }
    }

    /// Replay on a simulated clock
    ///
    /// Pulses due before an event are fired at their own deadlines, so the
    /// alarm rhythm matches a realtime run exactly.
    pub fn replay(&mut self, events: &[SessionEvent]) -> SessionSummary {
        info!("Replaying {} events (simulated clock)", events.len());
        for event in events {
            let at = self.event_time(event);
            while let Some(deadline) = self.engine.next_deadline().filter(|d| *d <= at) {
                self.poll(deadline);
            }
            self.process(event, at);
        }
        self.finish()
    }

    /// Replay paced by tokio timers
    ///
    /// Sleeps until each pulse deadline and each event time. Resolving
    /// `shutdown` ends the replay early; the summary covers what was
    /// handled up to then.
    pub async fn replay_realtime<F>(
        &mut self,
        events: &[SessionEvent],
        shutdown: F,
    ) -> SessionSummary
    where
        F: Future<Output = ()>,
    {
        info!("Replaying {} events (realtime)", events.len());
        tokio::pin!(shutdown);
        let origin = Instant::now();

        'events: for event in events {
            let at = self.event_time(event);
            loop {
                let pulse = self.engine.next_deadline().filter(|d| *d <= at);
                let wake = pulse.unwrap_or(at);
                tokio::select! {
                    _ = tokio::time::sleep_until(origin + wake) => {}
                    _ = &mut shutdown => {
                        self.clock = self.clock.max(origin.elapsed());
                        info!("Replay interrupted at {:.3}s", self.clock.as_secs_f64());
                        break 'events;
                    }
                }
                match pulse {
                    Some(deadline) => self.poll(deadline),
                    None => break,
                }
            }
            self.process(event, at);
        }
        self.finish()
    }

    /// Handle a single event at `at`
    pub fn handle(&mut self, event: &SessionEvent, at: Timestamp) -> Result<(), MonitorError> {
        let commands = match event {
            SessionEvent::Frame { landmarks, .. } => {
                let commands = self.evaluate(Some(landmarks), at)?;
                self.frames += 1;
                commands
            }
            SessionEvent::KeyPoints { points, .. } => {
                let frame = points.into_frame();
                let commands = self.evaluate(Some(&frame), at)?;
                self.frames += 1;
                commands
            }
            SessionEvent::NoFace { .. } => {
                let commands = self.evaluate(None, at)?;
                self.missing_frames += 1;
                commands
            }
            SessionEvent::Calibrate { .. } => {
                self.calibrations += 1;
                self.engine.calibrate(at)
            }
            SessionEvent::Start { .. } => self.engine.start(at),
            SessionEvent::Stop { .. } => self.engine.stop(at),
            SessionEvent::Toggle { .. } => self.engine.toggle(at),
            SessionEvent::Set { key, value, .. } => {
                let key: ThresholdKey = key.parse()?;
                let previous = self.engine.thresholds().get(key);
                self.engine.thresholds_mut().set(key, *value);
                info!("Threshold {} changed {} -> {}", key.as_str(), previous, value);
                Vec::new()
            }
        };
        self.output.apply(&commands);
        Ok(())
    }

    /// Fire pulses due at `now`
    pub fn poll(&mut self, now: Timestamp) {
        let commands = self.engine.poll(now);
        if !commands.is_empty() {
            debug!("Pulse at {:.3}s", now.as_secs_f64());
        }
        self.output.apply(&commands);
    }

    /// Totals so far
    pub fn summary(&self) -> SessionSummary {
        let current = self.engine.alarm_state();
        let log = self.engine.alarm_log();
        let states = AlarmState::ALL
            .iter()
            .map(|&state| StateSummary {
                state,
                entries: log.entries(state),
                time_ms: millis(log.time_in(state, current, self.clock)),
            })
            .collect();

        SessionSummary {
            events: self.events,
            frames: self.frames,
            missing_frames: self.missing_frames,
            skipped_events: self.skipped_events,
            calibrations: self.calibrations,
            final_state: current,
            states,
            rejected_starts: self.output.rejected_starts(),
            duration_ms: millis(self.clock),
        }
    }

    pub fn engine(&self) -> &PostureEngine {
        &self.engine
    }

    pub fn output(&self) -> &AlarmOutput<S> {
        &self.output
    }

    fn evaluate(
        &mut self,
        frame: Option<&LandmarkFrame>,
        at: Timestamp,
    ) -> Result<Vec<SoundCommand>, MonitorError> {
        let evaluation = self.engine.evaluate(frame, at)?;
        match self.reports {
            ReportOutput::Off => {}
            ReportOutput::Text => println!("{:>8.3}s {}", at.as_secs_f64(), evaluation.report),
            ReportOutput::Json => match serde_json::to_string(&evaluation.report) {
                Ok(line) => println!("{}", line),
                Err(e) => warn!("Cannot serialize report: {}", e),
            },
        }
        Ok(evaluation.commands)
    }

    /// Event time, clamped so the clock never runs backwards
    fn event_time(&self, event: &SessionEvent) -> Timestamp {
        let at = event.at();
        if at < self.clock {
            warn!(
                "Event at {:.3}s precedes {:.3}s, handling it late",
                at.as_secs_f64(),
                self.clock.as_secs_f64()
            );
        }
        self.clock.max(at)
    }

    fn process(&mut self, event: &SessionEvent, at: Timestamp) {
        self.clock = at;
        self.events += 1;
        if let Err(e) = self.handle(event, at) {
            self.skipped_events += 1;
            warn!("Skipping event at {:.3}s: {}", at.as_secs_f64(), e);
        }
    }

    /// Summarize, then stop the engine and silence the channels
    fn finish(&mut self) -> SessionSummary {
        let summary = self.summary();
        let commands = self.engine.stop(self.clock);
        self.output.apply(&commands);
        info!(
            "Session finished: {} events, {} frames, final state {}",
            summary.events, summary.frames, summary.final_state
        );
        summary
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alerting::{Channel, RecordingChannel};
    use face_geometry::{FaceKeyPoints, Landmark};
    use posture::Thresholds;

    fn monitor(output: AlarmOutput<RecordingChannel>) -> Monitor<RecordingChannel> {
        let engine = PostureEngine::new(Thresholds::default(), Duration::ZERO);
        Monitor::new(engine, output, ReportOutput::Off)
    }

    fn recording() -> AlarmOutput<RecordingChannel> {
        AlarmOutput::new(RecordingChannel::new(), RecordingChannel::new())
    }

    fn key_points(t_ms: u64, points: FaceKeyPoints) -> SessionEvent {
        SessionEvent::KeyPoints { t_ms, points }
    }

    /// Looking away from 0 ms to 2000 ms, back at 2600 ms
    fn glance_away() -> Vec<SessionEvent> {
        vec![
            SessionEvent::Start { t_ms: 0 },
            SessionEvent::Set {
                t_ms: 0,
                key: "violation_delay_s".to_string(),
                value: 0.0,
            },
            key_points(0, FaceKeyPoints::frontal().turned(60.0)),
            key_points(2000, FaceKeyPoints::frontal().turned(60.0)),
            key_points(2600, FaceKeyPoints::frontal()),
        ]
    }

    #[test]
    fn test_simulated_replay_pulses_between_events() {
        let mut monitor = monitor(recording());
        let summary = monitor.replay(&glance_away());

        assert_eq!(monitor.output().channel(Channel::Soft).starts(), 4);
        assert_eq!(monitor.output().channel(Channel::Hard).starts(), 0);
        assert_eq!(summary.frames, 3);
        assert_eq!(summary.final_state, AlarmState::Safe);
        let warning = summary.state(AlarmState::Warning).unwrap();
        assert_eq!(warning.entries, 1);
        assert_eq!(warning.time_ms, 2600);
        assert_eq!(summary.duration_ms, 2600);
        assert_eq!(monitor.engine().thresholds().violation_delay_s, 0.0);
        assert!(!monitor.engine().is_running());
    }

    #[test]
    fn test_missing_face_escalates_to_danger() {
        let mut events = vec![SessionEvent::Start { t_ms: 0 }];
        events.extend((0..=7).map(|i| SessionEvent::NoFace { t_ms: i * 500 }));
        events.push(key_points(4200, FaceKeyPoints::frontal()));

        let mut monitor = monitor(recording());
        let summary = monitor.replay(&events);

        assert_eq!(summary.missing_frames, 8);
        assert_eq!(summary.final_state, AlarmState::Danger);
        assert_eq!(summary.state(AlarmState::Danger).unwrap().entries, 1);
        assert_eq!(summary.state(AlarmState::Danger).unwrap().time_ms, 1200);
        // entry at 3000 ms plus the pulse at 4000 ms
        assert_eq!(monitor.output().channel(Channel::Hard).starts(), 2);
        assert_eq!(monitor.engine().alarm_state(), AlarmState::Safe);
    }

    #[test]
    fn test_rejected_playback_is_counted_not_fatal() {
        let mut muted = monitor(AlarmOutput::new(
            RecordingChannel::rejecting(),
            RecordingChannel::rejecting(),
        ));
        let mut normal = monitor(recording());

        let muted_summary = muted.replay(&glance_away());
        let normal_summary = normal.replay(&glance_away());

        assert_eq!(muted_summary.rejected_starts, 4);
        assert_eq!(normal_summary.rejected_starts, 0);
        assert_eq!(muted_summary.states, normal_summary.states);
    }

    #[test]
    fn test_bad_events_are_skipped() {
        let events = vec![
            SessionEvent::Start { t_ms: 0 },
            SessionEvent::Set {
                t_ms: 10,
                key: "max_roll_deg".to_string(),
                value: 5.0,
            },
            SessionEvent::Frame {
                t_ms: 20,
                landmarks: LandmarkFrame::new(vec![Landmark::default(); 3]),
            },
            key_points(40, FaceKeyPoints::frontal()),
        ];
        let mut monitor = monitor(recording());
        let summary = monitor.replay(&events);

        assert_eq!(summary.events, 4);
        assert_eq!(summary.skipped_events, 2);
        assert_eq!(summary.frames, 1);
    }

    #[test]
    fn test_out_of_order_event_is_clamped() {
        let events = vec![
            SessionEvent::Start { t_ms: 0 },
            SessionEvent::NoFace { t_ms: 500 },
            SessionEvent::NoFace { t_ms: 200 },
        ];
        let mut monitor = monitor(recording());
        let summary = monitor.replay(&events);
        assert_eq!(summary.duration_ms, 500);
        assert_eq!(summary.missing_frames, 2);
    }

    #[test]
    fn test_from_settings_starts_running() {
        let settings = MonitorSettings {
            reject_playback: true,
            ..Default::default()
        };
        let monitor = Monitor::from_settings(&settings);
        assert!(monitor.engine().is_running());
        assert!(!monitor.output().channel(Channel::Soft).is_playing());

        let idle = Monitor::from_settings(&MonitorSettings {
            start_running: false,
            ..Default::default()
        });
        assert!(!idle.engine().is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_realtime_replay_matches_simulated() {
        let mut simulated = monitor(recording());
        let expected = simulated.replay(&glance_away());

        let mut realtime = monitor(recording());
        let begin = Instant::now();
        let summary = realtime
            .replay_realtime(&glance_away(), std::future::pending())
            .await;

        assert_eq!(summary, expected);
        assert_eq!(
            realtime.output().channel(Channel::Soft).calls(),
            simulated.output().channel(Channel::Soft).calls()
        );
        assert!(begin.elapsed() >= Duration::from_millis(2600));
    }

    #[tokio::test(start_paused = true)]
    async fn test_realtime_replay_stops_on_shutdown() {
        let mut monitor = monitor(recording());
        let summary = monitor
            .replay_realtime(
                &glance_away(),
                tokio::time::sleep(Duration::from_millis(1000)),
            )
            .await;

        assert_eq!(summary.events, 3);
        assert_eq!(summary.final_state, AlarmState::Warning);
        assert!((1000..1500).contains(&summary.duration_ms));
        // entry pulse plus the one at 500 ms
        assert_eq!(monitor.output().channel(Channel::Soft).starts(), 2);
        assert!(!monitor.engine().is_running());
    }
}
