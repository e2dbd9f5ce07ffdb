//! Posture Monitor
//!
//! Headless driver for the posture engine: loads settings, sets up
//! logging, replays a recorded detector session against the engine and
//! plays the alarm on log-backed sound channels.

pub mod channel;
pub mod logging;
pub mod runner;
pub mod session;
pub mod settings;

pub use channel::LogChannel;
pub use logging::init_logging;
pub use runner::{Monitor, SessionSummary, StateSummary};
pub use session::{load_session, parse_session, SessionEvent};
pub use settings::{LogFormat, MonitorSettings, ReportOutput};

use posture::PostureError;
use std::path::PathBuf;
use thiserror::Error;

/// Monitor error types
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Settings error: {0}")]
    Settings(#[from] config::ConfigError),

    #[error("Cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Session line {line}: {source}")]
    Script {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("No session file given")]
    NoSession,

    #[error("Posture engine error: {0}")]
    Posture(#[from] PostureError),
}
