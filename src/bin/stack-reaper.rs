//! # Stack Reaper
//!
//! Command-line entry point: run the periodic cleanup service, run a single
//! tick, preview what a tick would select, or validate configuration.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use stack_reaper::config::{ConfigLoader, LoadedConfig};
use stack_reaper::logging::init_structured_logging;
use stack_reaper::orchestration::bootstrap::{aws_components, build_selection, bootstrap_aws};

#[derive(Parser)]
#[command(name = "stack-reaper")]
#[command(about = "Delete expired and abandoned CloudFormation stacks")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Configuration directory containing reaper.toml
    #[arg(short, long, env = "REAPER_CONFIG_DIR", default_value = "config")]
    config_dir: PathBuf,

    /// Environment overlay to apply (development, test, production)
    #[arg(short, long, env = "REAPER_ENV", default_value = "development")]
    environment: String,

    /// Emit JSON log lines regardless of configuration
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run cleanup ticks on the configured period until interrupted
    Run,

    /// Run a single cleanup tick and print its report
    Tick,

    /// Print the stacks a tick would select without deleting anything
    ///
    /// Branch-deletion messages are still received and acknowledged.
    Select,

    /// Load and validate configuration, then print it with secrets masked
    ValidateConfig,
}

fn load_config(cli: &Cli) -> Result<LoadedConfig> {
    let loaded = ConfigLoader::new(&cli.config_dir, &cli.environment)
        .build()
        .with_context(|| {
            format!(
                "failed to load configuration from {}",
                cli.config_dir.display()
            )
        })?;
    Ok(loaded)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let loaded = load_config(&cli)?;

    let mut logging = loaded.config().logging.clone();
    logging.json |= cli.json_logs;
    init_structured_logging(&logging);

    match cli.command {
        Commands::ValidateConfig => {
            println!("{}", serde_json::to_string_pretty(&loaded.sanitized())?);
            info!(environment = %loaded.environment(), "Configuration is valid");
        }
        Commands::Select => {
            let config = Arc::new(loaded.into_config());
            let components = aws_components(&config).await;
            let outcome = build_selection(config, &components).select().await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Commands::Tick => {
            let driver = bootstrap_aws(Arc::new(loaded.into_config())).await?;
            let report = driver.run_cleanup_tick().await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Run => {
            let driver = bootstrap_aws(Arc::new(loaded.into_config())).await?;
            driver
                .run(async {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        tracing::error!(error = %e, "Failed to listen for shutdown signal");
                        std::future::pending::<()>().await;
                    }
                })
                .await?;
            info!("Stack reaper stopped");
        }
    }

    Ok(())
}
