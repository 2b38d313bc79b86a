//! `cooplock check`: validate a scenario file.

use crate::cli::CheckArgs;
use cooplock::error::Result;
use cooplock::scenario::{Scenario, StepAction};

pub fn cmd_check(args: CheckArgs) -> Result<()> {
    let scenario = Scenario::load(&args.scenario)?;

    let count = |action: StepAction| scenario.steps.iter().filter(|s| s.action == action).count();
    println!(
        "{}: ok ({} steps over {}ms: {} lock, {} release, {} recover)",
        args.scenario.display(),
        scenario.steps.len(),
        scenario.run_for,
        count(StepAction::Lock),
        count(StepAction::Release),
        count(StepAction::Recover),
    );
    Ok(())
}
