//! `cooplock config`: print the effective configuration.

use cooplock::config::EngineConfig;
use cooplock::error::Result;

pub fn cmd_config(config: &EngineConfig) -> Result<()> {
    print!("{}", config.to_yaml()?);
    Ok(())
}
