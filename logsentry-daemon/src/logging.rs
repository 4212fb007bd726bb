//! Logging initialization for logsentry-daemon.
//!
//! Configures `tracing-subscriber` based on the `[general]` section
//! of `LogsentryConfig`. Supports JSON structured logging, a
//! human-readable pretty format, and an optional log file target.

use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use logsentry_core::config::GeneralConfig;

/// Initialize the global tracing subscriber.
///
/// Must be called exactly once, before any tracing macros are used.
///
/// # Formats
///
/// * `"json"` - Machine-parseable JSON lines (default for production)
/// * `"pretty"` - Human-readable colored output (for development)
///
/// When `log_file` is set, output is appended to that file instead of
/// stderr (with ANSI colors disabled).
pub fn init_tracing(config: &GeneralConfig) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let registry = tracing_subscriber::registry().with(env_filter);

    let file = if config.log_file.is_empty() {
        None
    } else {
        Some(Arc::new(open_log_file(&config.log_file)?))
    };

    match (config.log_format.as_str(), file) {
        ("json", None) => {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()
        }
        ("json", Some(file)) => {
            registry
                .with(tracing_subscriber::fmt::layer().json().with_writer(file))
                .try_init()
        }
        ("pretty", None) => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty())
                .try_init()
        }
        ("pretty", Some(file)) => {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .pretty()
                        .with_ansi(false)
                        .with_writer(file),
                )
                .try_init()
        }
        (other, _) => {
            return Err(anyhow::anyhow!(
                "unknown log format '{}', expected 'json' or 'pretty'",
                other
            ));
        }
    }
    .map_err(|e| anyhow::anyhow!("failed to initialize tracing subscriber: {}", e))?;

    Ok(())
}

/// Open the log file for appending, creating it if necessary.
fn open_log_file(path: &str) -> Result<std::fs::File> {
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| anyhow::anyhow!("failed to open log file '{}': {}", path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_log_file_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("daemon.log");
        open_log_file(&path.display().to_string()).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn open_log_file_fails_for_missing_directory() {
        assert!(open_log_file("/nonexistent-dir-logsentry/daemon.log").is_err());
    }
}
