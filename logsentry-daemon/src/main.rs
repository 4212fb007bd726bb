use anyhow::{Context, Result};
use clap::Parser;

use logsentry_core::LogsentryConfig;
use logsentry_daemon::cli::DaemonCli;
use logsentry_daemon::logging;
use logsentry_daemon::orchestrator::{self, Orchestrator};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DaemonCli::parse();

    let mut config = LogsentryConfig::load(&cli.config)
        .await
        .with_context(|| format!("failed to load config from {}", cli.config.display()))?;
    cli.apply_overrides(&mut config);

    logging::init_tracing(&config.general)?;

    if cli.validate {
        orchestrator::validate_config(&config).context("configuration is invalid")?;
        // print the effective configuration (file + env + CLI overrides)
        println!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        feeds = config.tail.feeds.len(),
        "logsentry-daemon starting"
    );

    let mut orchestrator = Orchestrator::new(config);
    orchestrator.run().await?;

    tracing::info!("logsentry-daemon shut down");
    Ok(())
}
