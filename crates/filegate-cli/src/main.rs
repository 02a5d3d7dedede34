//! filegate - check uploads by content, not by extension

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use filegate_cli::cmd;
use filegate_cli::{Cli, Commands};
use filegate_core::Config;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Check { files, allow, json } => {
            let config = Config::discover(cli.config.as_deref())
                .await
                .context("Failed to load config")?;

            let all_accepted = cmd::check::check(&files, &allow, json, &config).await?;
            Ok(if all_accepted {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Commands::Types => {
            cmd::types::types();
            Ok(ExitCode::SUCCESS)
        }
    }
}
