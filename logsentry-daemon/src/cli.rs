//! CLI argument definitions for logsentry-daemon.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// Logsentry log-to-MQTT sensor daemon.
///
/// Tails configured log files, evaluates per-feed state patterns against
/// appended lines, and republishes derived sensor states to an MQTT broker
/// whenever a state actually changes.
#[derive(Parser, Debug)]
#[command(name = "logsentry-daemon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to logsentry.toml configuration file.
    #[arg(short, long, default_value = "/etc/logsentry/logsentry.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_format: Option<String>,

    /// Replay existing file contents at startup, before live tailing begins.
    #[arg(long)]
    pub replay_existing: bool,

    /// Validate configuration (including state patterns) and exit.
    #[arg(long)]
    pub validate: bool,

    /// Override PID file path (takes precedence over config file).
    #[arg(long)]
    pub pid_file: Option<String>,
}

impl DaemonCli {
    /// Apply CLI overrides onto a loaded configuration.
    pub fn apply_overrides(&self, config: &mut logsentry_core::LogsentryConfig) {
        if let Some(level) = &self.log_level {
            config.general.log_level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.general.log_format = format.clone();
        }
        if let Some(pid_file) = &self.pid_file {
            config.general.pid_file = pid_file.clone();
        }
        if self.replay_existing {
            config.tail.replay_existing = true;
        }
    }
}
