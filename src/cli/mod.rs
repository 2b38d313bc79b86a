//! CLI argument parsing for cooplock.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Cooplock: cooperative named mutex with FIFO queues, wait timeouts and
/// hold expiry.
///
/// The CLI replays YAML scenarios of timed lock, release and recover steps
/// against a fresh engine and prints every transition as NDJSON.
#[derive(Parser, Debug)]
#[command(name = "cooplock")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for cooplock.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay a scenario file.
    ///
    /// Prints one JSON event per line on stdout and a summary on stderr.
    Run(RunArgs),

    /// Validate a scenario file without running it.
    Check(CheckArgs),

    /// Print the effective engine configuration as YAML.
    Config(ConfigArgs),
}

impl Command {
    /// Config file named on the command line, if any.
    pub fn config_path(&self) -> Option<&PathBuf> {
        match self {
            Command::Run(args) => args.config.as_ref(),
            Command::Check(_) => None,
            Command::Config(args) => args.config.as_ref(),
        }
    }
}

/// Arguments for the `run` command.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Scenario YAML file.
    pub scenario: PathBuf,

    /// Engine configuration file (defaults to ./cooplock.yaml if present).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Pace the run against the wall clock instead of simulating time.
    #[arg(long)]
    pub realtime: bool,

    /// Override the scenario's `run_for`, in milliseconds.
    #[arg(long)]
    pub run_for: Option<u64>,

    /// Print only the summary, not the event stream.
    #[arg(short, long)]
    pub quiet: bool,
}

/// Arguments for the `check` command.
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Scenario YAML file.
    pub scenario: PathBuf,
}

/// Arguments for the `config` command.
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Engine configuration file (defaults to ./cooplock.yaml if present).
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
