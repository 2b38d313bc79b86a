//! `cooplock run`: replay a scenario and print its trace.

use crate::cli::RunArgs;
use cooplock::config::EngineConfig;
use cooplock::error::{CooplockError, Result};
use cooplock::events::write_ndjson;
use cooplock::scenario::{self, Scenario};
use cooplock::scheduler::EventLoop;

pub fn cmd_run(args: RunArgs, config: &EngineConfig) -> Result<()> {
    let mut scenario = Scenario::load(&args.scenario)?;
    if let Some(run_for) = args.run_for {
        scenario.run_for = run_for;
        scenario.validate()?;
    }

    let event_loop = if args.realtime {
        EventLoop::realtime()
    } else {
        EventLoop::new()
    };

    let report = scenario::run(&scenario, config, event_loop);

    if !args.quiet {
        let stdout = std::io::stdout();
        write_ndjson(&mut stdout.lock(), &report.events)?;
    }

    eprintln!("{}", report.summary());
    for lock in &report.remaining {
        eprintln!("  still {}: {} ({})", lock.state, lock.name, lock.id);
    }

    if report.unrecovered_faults > 0 {
        return Err(CooplockError::UnrecoveredFaults(report.unrecovered_faults));
    }
    Ok(())
}
