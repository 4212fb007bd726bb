//! Daemon orchestration -- assembly, lifecycle, and shutdown handling.
//!
//! The [`Orchestrator`] wires the notify-backed watcher, the MQTT
//! publisher, and the tail reactor together from a loaded configuration,
//! then runs the reactor until a shutdown signal arrives.
//!
//! # Shutdown Triggers
//!
//! - `SIGTERM` (from systemd, Docker, or `kill`)
//! - `SIGINT` (Ctrl+C)
//! - The watch backend closing unexpectedly (reported as an error)

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Result;
use metrics::gauge;

use logsentry_core::LogsentryConfig;
use logsentry_core::metrics as m;
use logsentry_tail::{NotifyWatcher, PatternSet, Reactor};

use crate::metrics_server;
use crate::mqtt::MqttPublisher;

/// The main daemon orchestrator.
pub struct Orchestrator {
    /// Loaded and validated configuration.
    config: LogsentryConfig,
    /// Daemon start time (for uptime reporting).
    start_time: Instant,
}

impl Orchestrator {
    /// Build the orchestrator from an already-loaded configuration.
    pub fn new(config: LogsentryConfig) -> Self {
        Self {
            config,
            start_time: Instant::now(),
        }
    }

    /// Get a reference to the loaded configuration.
    pub fn config(&self) -> &LogsentryConfig {
        &self.config
    }

    /// Run the daemon until shutdown.
    ///
    /// Writes the PID file first (when configured) and removes it on every
    /// exit path, including startup failures.
    pub async fn run(&mut self) -> Result<()> {
        let pid_path = (!self.config.general.pid_file.is_empty())
            .then(|| PathBuf::from(&self.config.general.pid_file));
        if let Some(path) = &pid_path {
            write_pid_file(path)?;
        }

        let result = self.run_inner().await;

        if let Some(path) = &pid_path {
            remove_pid_file(path);
        }
        result
    }

    async fn run_inner(&mut self) -> Result<()> {
        if self.config.metrics.enabled {
            metrics_server::install_metrics_recorder(&self.config.metrics)?;
            m::describe_metrics();
            gauge!(m::DAEMON_BUILD_INFO, "version" => env!("CARGO_PKG_VERSION")).set(1.0);
            tracing::info!(port = self.config.metrics.port, "metrics endpoint enabled");
        }

        let (publisher, bus_driver) = MqttPublisher::connect(&self.config.bus)?;

        let watcher = NotifyWatcher::new()
            .map_err(|e| anyhow::anyhow!("failed to create file watcher: {}", e))?;

        let mut reactor = Reactor::builder()
            .config(self.config.tail.clone())
            .topic_prefix(&self.config.bus.topic_prefix)
            .watcher(watcher)
            .bus(publisher)
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build reactor: {}", e))?;

        if let Err(e) = reactor.start().await {
            bus_driver.abort();
            return Err(anyhow::anyhow!("failed to start reactor: {}", e));
        }

        // Signal handling runs beside the reactor and cancels it cooperatively.
        let token = reactor.shutdown_token();
        let signal_task = tokio::spawn(async move {
            match wait_for_shutdown_signal().await {
                Ok(signal) => tracing::info!(signal, "shutdown signal received"),
                Err(e) => tracing::error!(error = %e, "failed to install signal handlers"),
            }
            token.cancel();
        });

        let uptime_task = self
            .config
            .metrics
            .enabled
            .then(|| spawn_uptime_updater(self.start_time));

        tracing::info!("entering main event loop");
        let run_result = reactor.run().await;

        bus_driver.abort();
        signal_task.abort();
        if let Some(task) = uptime_task {
            task.abort();
        }

        run_result.map_err(|e| anyhow::anyhow!("reactor terminated abnormally: {}", e))
    }
}

/// Validate a configuration beyond the structural checks.
///
/// Compiles every feed's state patterns so `--validate` catches regex
/// errors before a deployment restart would.
pub fn validate_config(config: &LogsentryConfig) -> Result<()> {
    config.validate()?;
    for feed in &config.tail.feeds {
        PatternSet::compile(&feed.states)
            .map_err(|e| anyhow::anyhow!("feed '{}': {}", feed.file, e))?;
    }
    Ok(())
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
///
/// Returns the name of the signal that triggered the shutdown.
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Spawn a background task that periodically refreshes the uptime metric.
fn spawn_uptime_updater(start_time: Instant) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(10));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            #[allow(clippy::cast_precision_loss)]
            gauge!(m::DAEMON_UPTIME_SECONDS).set(start_time.elapsed().as_secs() as f64);
        }
    })
}

/// Write the current process PID to a file.
///
/// Uses `create_new` so the existence check and the creation are one
/// atomic step; a leftover file from a running instance fails the start
/// with the offending PID in the message.
fn write_pid_file(path: &Path) -> Result<()> {
    use std::io::Write;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = match std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
    {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            let existing =
                std::fs::read_to_string(path).unwrap_or_else(|_| "unknown".to_owned());
            return Err(anyhow::anyhow!(
                "PID file {} already exists with PID {}. Is another instance running?",
                path.display(),
                existing.trim()
            ));
        }
        Err(e) => return Err(e.into()),
    };

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }

    writeln!(file, "{}", std::process::id())?;
    tracing::info!(pid = std::process::id(), path = %path.display(), "PID file written");
    Ok(())
}

/// Remove the PID file on daemon shutdown.
///
/// Logs a warning but does not fail if the file cannot be removed.
fn remove_pid_file(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        tracing::warn!(path = %path.display(), error = %e, "failed to remove PID file");
    } else {
        tracing::info!(path = %path.display(), "PID file removed");
    }
}
