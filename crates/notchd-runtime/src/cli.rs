//! CLI definition using clap derive.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "notchd", about = "notch overlay display-mode coordinator")]
pub struct Cli {
    /// TOML config file (defaults apply when omitted)
    #[arg(long, short = 'c', global = true, env = "NOTCHD_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Read JSON-line requests on stdin, print mode changes on stdout (default)
    Run(RunOpts),
    /// Replay a scenario file in real time and check its expectations
    Replay(ReplayOpts),
    /// Print the effective configuration as TOML
    Config,
}

#[derive(clap::Args, Default)]
pub struct RunOpts {
    /// Append every mode change to this JSONL file
    #[arg(long)]
    pub record: Option<PathBuf>,
}

#[derive(clap::Args)]
pub struct ReplayOpts {
    /// Scenario JSON file
    pub file: PathBuf,

    /// Continue after a failed expectation
    #[arg(long)]
    pub keep_going: bool,
}
