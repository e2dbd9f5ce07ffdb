//! Recorded detector sessions
//!
//! A session is a JSON-lines file, one event per line, each tagged by
//! `kind` and stamped with `t_ms` since session start:
//!
//! ```text
//! {"kind":"start","t_ms":0}
//! {"kind":"key_points","t_ms":33,"points":{"nose":[0.5,0.51,-0.05], ...}}
//! {"kind":"no_face","t_ms":66}
//! {"kind":"set","t_ms":100,"key":"max_yaw_deg","value":25.0}
//! ```
//!
//! Blank lines and lines starting with `#` are ignored.

use alerting::Timestamp;
use face_geometry::{FaceKeyPoints, LandmarkFrame};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::MonitorError;

/// One recorded input to the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Full mesh from the detector
    Frame { t_ms: u64, landmarks: LandmarkFrame },
    /// Only the five points the pose model reads
    KeyPoints { t_ms: u64, points: FaceKeyPoints },
    /// Detector ran but found no face
    NoFace { t_ms: u64 },
    Calibrate { t_ms: u64 },
    Start { t_ms: u64 },
    Stop { t_ms: u64 },
    Toggle { t_ms: u64 },
    /// Live threshold change
    Set { t_ms: u64, key: String, value: f64 },
}

impl SessionEvent {
    /// Session time of this event
    pub fn at(&self) -> Timestamp {
        let t_ms = match self {
            SessionEvent::Frame { t_ms, .. }
            | SessionEvent::KeyPoints { t_ms, .. }
            | SessionEvent::NoFace { t_ms }
            | SessionEvent::Calibrate { t_ms }
            | SessionEvent::Start { t_ms }
            | SessionEvent::Stop { t_ms }
            | SessionEvent::Toggle { t_ms }
            | SessionEvent::Set { t_ms, .. } => *t_ms,
        };
        Duration::from_millis(t_ms)
    }
}

/// Parse a JSON-lines session
pub fn parse_session(text: &str) -> Result<Vec<SessionEvent>, MonitorError> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(i, line)| {
            serde_json::from_str(line).map_err(|source| MonitorError::Script {
                line: i + 1,
                source,
            })
        })
        .collect()
}

/// Read and parse a session file
pub fn load_session(path: &Path) -> Result<Vec<SessionEvent>, MonitorError> {
    let text = std::fs::read_to_string(path).map_err(|source| MonitorError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let events = parse_session(&text)?;
    info!("Loaded {} events from {}", events.len(), path.display());
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use face_geometry::Landmark;

    #[test]
    fn test_parse_mixed_session() {
        let text = r#"
# warm-up
{"kind":"start","t_ms":0}
{"kind":"frame","t_ms":33,"landmarks":[[0.1,0.2,0.0],[0.5,0.5,-0.05]]}

{"kind":"no_face","t_ms":66}
{"kind":"set","t_ms":70,"key":"max_yaw_deg","value":25.0}
{"kind":"calibrate","t_ms":100}
"#;
        let events = parse_session(text).unwrap();
        assert_eq!(events.len(), 5);
        assert_eq!(events[0], SessionEvent::Start { t_ms: 0 });
        match &events[1] {
            SessionEvent::Frame { landmarks, .. } => {
                assert_eq!(landmarks.points()[1], Landmark::new(0.5, 0.5, -0.05));
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(events[2], SessionEvent::NoFace { t_ms: 66 });
        assert_eq!(events[3].at(), Duration::from_millis(70));
        assert_eq!(events[4], SessionEvent::Calibrate { t_ms: 100 });
    }

    #[test]
    fn test_key_points_round_trip_through_json() {
        let event = SessionEvent::KeyPoints {
            t_ms: 500,
            points: FaceKeyPoints::frontal(),
        };
        let line = serde_json::to_string(&event).unwrap();
        assert!(line.starts_with(r#"{"kind":"key_points","t_ms":500"#));
        assert_eq!(parse_session(&line).unwrap(), vec![event]);
    }

    #[test]
    fn test_bad_line_reports_line_number() {
        let text = "{\"kind\":\"start\",\"t_ms\":0}\n\n{\"kind\":\"jump\",\"t_ms\":5}\n";
        match parse_session(text) {
            Err(MonitorError::Script { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected script error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_session(Path::new("/nonexistent/session.jsonl")).unwrap_err();
        assert!(matches!(err, MonitorError::Io { .. }));
    }
}
