//! stakeward daemon: entry point for running the election orchestration loop.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;

use stakeward_node::{DaemonConfig, ElectionModeSetting, StakewardService};
use stakeward_utils::{init_logging, LogFormat};

#[derive(Parser)]
#[command(name = "stakeward", about = "Validator election orchestration daemon")]
struct Cli {
    /// Path to a TOML configuration file. File settings are the base; flags
    /// and environment variables override them.
    #[arg(long, env = "STAKEWARD_CONFIG")]
    config: Option<PathBuf>,

    /// Directory for the election registry and tool state.
    #[arg(long, env = "STAKEWARD_WORK_DIR")]
    work_dir: Option<PathBuf>,

    /// Name attached to every telemetry record.
    #[arg(long, env = "STAKEWARD_NODE_NAME")]
    node_name: Option<String>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "STAKEWARD_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "STAKEWARD_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Election mode: "off", "validator" or "depool".
    #[arg(long, env = "STAKEWARD_ELECTION_MODE")]
    election_mode: Option<ElectionModeSetting>,

    /// Logstash host; telemetry is disabled when neither this nor the file sets one.
    #[arg(long, env = "STAKEWARD_TELEMETRY_HOST")]
    telemetry_host: Option<String>,

    /// Write Prometheus metrics to this file after every cycle.
    #[arg(long, env = "STAKEWARD_METRICS_FILE")]
    metrics_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Run the orchestration loop until SIGINT or SIGTERM.
    Run,
    /// Load and validate the configuration, then exit.
    ValidateConfig,
    /// Print the effective configuration as TOML.
    PrintConfig,
}

impl Cli {
    fn load_config(&self) -> anyhow::Result<DaemonConfig> {
        let mut config = match &self.config {
            Some(path) => DaemonConfig::from_toml_file(path)
                .with_context(|| format!("loading config from {}", path.display()))?,
            None => DaemonConfig::default(),
        };

        if let Some(work_dir) = &self.work_dir {
            config.work_dir = work_dir.clone();
        }
        if let Some(node_name) = &self.node_name {
            config.node_name = node_name.clone();
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }
        if let Some(mode) = self.election_mode {
            config.elections.mode = mode;
        }
        if let Some(host) = &self.telemetry_host {
            config.telemetry.host = Some(host.clone());
        }
        if let Some(path) = &self.metrics_file {
            config.metrics_file = Some(path.clone());
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config()?;

    match cli.command {
        Command::ValidateConfig => {
            config.validate().context("invalid configuration")?;
            println!("configuration is valid");
        }
        Command::PrintConfig => {
            print!("{}", config.to_toml_string());
        }
        Command::Run => {
            init_logging(config.log_format, &config.log_level)?;
            tracing::info!(
                node_name = %config.node_name,
                work_dir = %config.work_dir.display(),
                mode = ?config.elections.mode,
                "starting stakeward"
            );

            let mut service = StakewardService::new(config).context("building service")?;
            service.start()?;

            service.shutdown_controller().wait_for_signal().await;
            tracing::info!("shutdown signal received, stopping");
            service.stop().await;

            tracing::info!("stakeward exited cleanly");
        }
    }

    Ok(())
}
