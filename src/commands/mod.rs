//! Command implementations for cooplock.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations.

mod check;
mod run;
mod show_config;

use crate::cli::Command;
use cooplock::config::EngineConfig;
use cooplock::error::Result;

/// Dispatch a command to its implementation.
///
/// `config` is the already-loaded engine configuration.
pub fn dispatch(command: Command, config: &EngineConfig) -> Result<()> {
    match command {
        Command::Run(args) => run::cmd_run(args, config),
        Command::Check(args) => check::cmd_check(args),
        Command::Config(_) => show_config::cmd_config(config),
    }
}
