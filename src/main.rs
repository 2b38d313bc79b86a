//! Cooplock CLI entry point.
//!
//! Parses arguments, loads the engine configuration, installs logging,
//! dispatches to the command handler, and maps errors to exit codes.

mod cli;
mod commands;

use cli::Cli;
use cooplock::config::EngineConfig;
use cooplock::exit_codes;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse_args();

    let result = EngineConfig::load_or_default(cli.command.config_path()).and_then(|config| {
        init_tracing(&config);
        commands::dispatch(cli.command, &config)
    });

    match result {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) => {
            // Print user-actionable error message to stderr
            eprintln!("Error: {}", err);

            ExitCode::from(err.exit_code() as u8)
        }
    }
}

/// Log to stderr, honouring `RUST_LOG` and falling back to the config filter.
fn init_tracing(config: &EngineConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_filter.as_str()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
