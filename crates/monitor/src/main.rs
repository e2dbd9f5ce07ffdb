//! Posture Monitor - Main Entry Point
//!
//! Usage: `posture-monitor [SESSION.jsonl]`. Without an argument the
//! session path comes from settings.

use monitor::{init_logging, load_session, Monitor, MonitorError, MonitorSettings};
use std::path::PathBuf;
use tracing::info;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = MonitorSettings::load()?;
    init_logging(&settings.log_level, settings.log_format);

    info!("=== Posture Monitor v{} ===", env!("CARGO_PKG_VERSION"));

    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| settings.session_path.clone())
        .ok_or(MonitorError::NoSession)?;
    let events = load_session(&path)?;

    let mut monitor = Monitor::from_settings(&settings);
    let summary = if settings.realtime {
        let shutdown = async {
            if tokio::signal::ctrl_c().await.is_err() {
                std::future::pending::<()>().await;
            }
        };
        monitor.replay_realtime(&events, shutdown).await
    } else {
        monitor.replay(&events)
    };

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
