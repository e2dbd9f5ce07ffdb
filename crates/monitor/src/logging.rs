//! Tracing subscriber setup

use tracing_subscriber::EnvFilter;

use crate::settings::LogFormat;

/// Initialize the global subscriber
///
/// `RUST_LOG` overrides `level`. Calling this twice is harmless; the
/// second subscriber is dropped.
pub fn init_logging(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false);

    let result = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };

    if let Err(e) = result {
        eprintln!("Logging already initialized: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_double_init_is_harmless() {
        init_logging("debug", LogFormat::Text);
        init_logging("info", LogFormat::Json);
        tracing::info!("still logging");
    }
}
