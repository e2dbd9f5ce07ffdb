//! Monitor settings
//!
//! Layered with the `config` crate: built-in defaults, then an optional
//! `posture-monitor.{toml,json,yaml}` file (or the file named by
//! `POSTURE_MONITOR_CONFIG`), then `POSTURE__*` environment variables,
//! e.g. `POSTURE__THRESHOLDS__MAX_YAW_DEG=25`.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use posture::Thresholds;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::MonitorError;

const DEFAULT_CONFIG_FILE: &str = "posture-monitor";
const CONFIG_FILE_VAR: &str = "POSTURE_MONITOR_CONFIG";
const ENV_PREFIX: &str = "POSTURE";

/// Log line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// How per-frame status reports are written to stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportOutput {
    #[default]
    Off,
    Text,
    Json,
}

/// Monitor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    /// Detection thresholds handed to the engine
    pub thresholds: Thresholds,

    /// Recorded session to replay
    pub session_path: Option<PathBuf>,

    /// Sleep between events instead of replaying as fast as possible
    pub realtime: bool,

    /// Start monitoring before the first event
    pub start_running: bool,

    /// Default tracing filter when `RUST_LOG` is unset
    pub log_level: String,

    pub log_format: LogFormat,

    pub reports: ReportOutput,

    /// Refuse every playback, as a browser without user gesture would
    pub reject_playback: bool,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            session_path: None,
            realtime: false,
            start_running: true,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            reports: ReportOutput::Off,
            reject_playback: false,
        }
    }
}

impl MonitorSettings {
    /// Load from the default file and the process environment
    pub fn load() -> Result<Self, MonitorError> {
        let file =
            std::env::var(CONFIG_FILE_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        let builder = Config::builder()
            .add_source(File::with_name(&file).required(false))
            .add_source(environment());
        Self::from_builder(builder)
    }

    /// Deserialize from prepared sources; missing keys take defaults
    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, MonitorError> {
        let settings = builder.build()?.try_deserialize()?;
        Ok(settings)
    }
}

/// `POSTURE__SECTION__KEY` variables, values parsed as numbers and bools
fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .try_parsing(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    fn from_toml(text: &str) -> Result<MonitorSettings, MonitorError> {
        MonitorSettings::from_builder(
            Config::builder().add_source(File::from_str(text, FileFormat::Toml)),
        )
    }

    #[test]
    fn test_empty_sources_give_defaults() {
        let settings = MonitorSettings::from_builder(Config::builder()).unwrap();
        assert_eq!(settings, MonitorSettings::default());
    }

    #[test]
    fn test_partial_file_overrides() {
        let settings = from_toml(
            r#"
            realtime = true
            log_format = "json"
            reports = "text"
            session_path = "demos/desk.jsonl"

            [thresholds]
            max_yaw_deg = 25.0
            face_missing_delay_s = 5
            "#,
        )
        .unwrap();

        assert!(settings.realtime);
        assert_eq!(settings.log_format, LogFormat::Json);
        assert_eq!(settings.reports, ReportOutput::Text);
        assert_eq!(settings.session_path, Some(PathBuf::from("demos/desk.jsonl")));
        assert_eq!(settings.thresholds.max_yaw_deg, 25.0);
        assert_eq!(settings.thresholds.face_missing_delay_s, 5.0);
        assert_eq!(settings.thresholds.max_pitch_deg, 20.0);
    }

    #[test]
    fn test_environment_overrides_file() {
        let vars: config::Map<String, String> = [
            ("POSTURE__THRESHOLDS__MAX_YAW_DEG", "25"),
            ("POSTURE__REALTIME", "true"),
            ("POSTURE__LOG_FORMAT", "json"),
            ("HOME", "/root"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let builder = Config::builder()
            .add_source(File::from_str(
                r#"
                realtime = false

                [thresholds]
                max_yaw_deg = 40.0
                max_pitch_deg = 12.0
                "#,
                FileFormat::Toml,
            ))
            .add_source(environment().source(Some(vars)));
        let settings = MonitorSettings::from_builder(builder).unwrap();

        assert!(settings.realtime);
        assert_eq!(settings.log_format, LogFormat::Json);
        assert_eq!(settings.thresholds.max_yaw_deg, 25.0);
        assert_eq!(settings.thresholds.max_pitch_deg, 12.0);
        assert_eq!(settings.thresholds.eye_ratio_min, 0.70);
    }

    #[test]
    fn test_bad_value_is_settings_error() {
        let err = from_toml(r#"log_format = "xml""#).unwrap_err();
        assert!(matches!(err, MonitorError::Settings(_)));
    }
}
