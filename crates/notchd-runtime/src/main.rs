//! notchd: notch overlay display-mode coordinator binary.
//! Embeds the coordinator, widget manager and a stdin/stdout JSON adapter
//! in one process.

use std::path::Path;

use anyhow::Context;
use clap::Parser;
use notchd_core::NotchConfig;

mod adapter;
mod cli;
mod recorder;
mod replay;

fn init_logging() {
    let filter = std::env::var("NOTCHD_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> anyhow::Result<NotchConfig> {
    match path {
        Some(path) => NotchConfig::load(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(NotchConfig::default()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();
    init_logging();

    let config = load_config(args.config.as_deref())?;
    let command = args
        .command
        .unwrap_or_else(|| cli::Command::Run(cli::RunOpts::default()));

    match command {
        cli::Command::Run(opts) => {
            tracing::info!("notchd starting");
            adapter::run(config, opts).await?;
        }
        cli::Command::Replay(opts) => {
            replay::run(config, &opts).await?;
        }
        cli::Command::Config => {
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}
