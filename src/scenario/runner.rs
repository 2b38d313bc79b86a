//! Replays a scenario against a fresh engine.

use super::{Scenario, Step, StepAction};
use crate::config::EngineConfig;
use crate::engine::{LockRequest, LockSnapshot, MutexEngine};
use crate::events::{Event, EventAction, EventLog};
use crate::scheduler::{EventLoop, Millis, Scheduler};
use crate::store::LockId;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

/// Outcome of a scenario run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Wall-clock time the run started.
    pub started_at: DateTime<Utc>,

    /// Scheduler time simulated.
    pub run_for: Millis,

    /// Every recorded transition, in order.
    pub events: Vec<Event>,

    /// Records still held or queued when the run ended.
    pub remaining: Vec<LockSnapshot>,

    /// Callback failures nothing recovered from.
    pub unrecovered_faults: usize,
}

impl RunReport {
    pub fn count(&self, action: EventAction) -> usize {
        self.events.iter().filter(|e| e.action == action).count()
    }

    /// One-line human summary.
    pub fn summary(&self) -> String {
        format!(
            "ran {}ms: {} granted, {} released, {} wait timeouts, {} hold expiries, {} faults, {} outstanding",
            self.run_for,
            self.count(EventAction::Granted),
            self.count(EventAction::Released),
            self.count(EventAction::WaitTimeout),
            self.count(EventAction::HoldExpired),
            self.count(EventAction::Fault),
            self.remaining.len()
        )
    }
}

/// Shared state handed to every scheduled step.
#[derive(Clone)]
struct Context {
    event_loop: EventLoop,
    engine: MutexEngine,
    log: EventLog,
    handles: Rc<RefCell<HashMap<String, LockId>>>,
}

impl Context {
    fn record(&self, event: Event) {
        self.log.record(event);
    }

    fn now(&self) -> Millis {
        self.event_loop.now()
    }
}

/// Run `scenario` on `event_loop` with a new engine built from `config`.
///
/// Callback failures are recorded as `fault` events. When
/// `config.recover_on_error` is set the runner answers each one with
/// `recover()`, the way a host error handler would.
pub fn run(scenario: &Scenario, config: &EngineConfig, event_loop: EventLoop) -> RunReport {
    let started_at = Utc::now();
    let engine = MutexEngine::new(event_loop.clone(), config.clone());
    let ctx = Context {
        event_loop: event_loop.clone(),
        engine: engine.clone(),
        log: EventLog::new(),
        handles: Rc::new(RefCell::new(HashMap::new())),
    };
    let unrecovered = Rc::new(Cell::new(0usize));

    {
        let ctx = ctx.clone();
        let unrecovered = Rc::clone(&unrecovered);
        let recover_on_error = config.recover_on_error;
        event_loop.set_error_handler(move |err| {
            ctx.record(Event::new(EventAction::Fault, ctx.now()).with_details(json!({
                "error": err.to_string(),
            })));
            if recover_on_error {
                ctx.engine.recover();
                ctx.record(Event::new(EventAction::Recovered, ctx.now()).with_details(json!({
                    "trigger": "fault",
                })));
            } else {
                unrecovered.set(unrecovered.get() + 1);
            }
        });
    }

    let start = event_loop.now();
    for step in &scenario.steps {
        let step_ctx = ctx.clone();
        let step = step.clone();
        event_loop.schedule(
            step.at,
            Box::new(move || {
                run_step(&step_ctx, &step);
                Ok(())
            }),
        );
    }

    tracing::info!(
        steps = scenario.steps.len(),
        run_for = scenario.run_for,
        realtime = event_loop.is_realtime(),
        "running scenario"
    );
    event_loop.advance(scenario.run_for);

    let remaining = engine.snapshot();
    // Drop outstanding work so nothing keeps the engine alive after the run.
    engine.reset();
    event_loop.clear();
    event_loop.clear_error_handler();

    tracing::info!(
        events = ctx.log.len(),
        remaining = remaining.len(),
        elapsed = event_loop.now().saturating_sub(start),
        "scenario finished"
    );

    RunReport {
        started_at,
        run_for: scenario.run_for,
        events: ctx.log.events(),
        remaining,
        unrecovered_faults: unrecovered.get(),
    }
}

fn run_step(ctx: &Context, step: &Step) {
    match step.action {
        StepAction::Lock => run_lock(ctx, step),
        StepAction::Release => run_release(ctx, step),
        StepAction::Recover => {
            ctx.engine.recover();
            ctx.record(Event::new(EventAction::Recovered, ctx.now()).with_details(json!({
                "trigger": "step",
            })));
        }
    }
}

fn run_lock(ctx: &Context, step: &Step) {
    // Validation guarantees both for lock steps.
    let (Some(name), Some(label)) = (step.name.clone(), step.label.clone()) else {
        return;
    };

    let mut request = LockRequest::new(name.clone(), grant_callback(ctx, step, &name, &label));

    if let Some(wait_ms) = step.wait_timeout {
        let (ctx, label) = (ctx.clone(), label.clone());
        request = request.wait_timeout(wait_ms).on_wait_timeout(move |err| {
            ctx.record(
                Event::new(EventAction::WaitTimeout, ctx.now())
                    .with_label(label)
                    .with_name(err.name.clone())
                    .with_details(json!({
                        "waited_ms": err.waited_ms,
                        "error": err.to_string(),
                    })),
            );
            Ok(())
        });
    }

    if let Some(hold_ms) = step.hold_for {
        let (ctx, label, name) = (ctx.clone(), label.clone(), name.clone());
        request = request.hold_for(hold_ms).on_hold_expired(move || {
            let lock_id = ctx.handles.borrow().get(&label).copied();
            let mut event = Event::new(EventAction::HoldExpired, ctx.now())
                .with_label(label)
                .with_name(name)
                .with_details(json!({ "hold_ms": hold_ms }));
            if let Some(id) = lock_id {
                event = event.with_lock(id);
            }
            ctx.record(event);
            Ok(())
        });
    }

    ctx.record(
        Event::new(EventAction::Requested, ctx.now())
            .with_label(label)
            .with_name(name)
            .with_details(json!({
                "wait_timeout": step.wait_timeout,
                "hold_for": step.hold_for,
            })),
    );
    ctx.engine.request(request);
}

fn grant_callback(
    ctx: &Context,
    step: &Step,
    name: &str,
    label: &str,
) -> impl FnOnce(LockId) -> anyhow::Result<()> + 'static {
    let ctx = ctx.clone();
    let name = name.to_string();
    let label = label.to_string();
    let release_after = step.release_after;
    let fail_on_grant = step.fail_on_grant;

    move |id| {
        ctx.handles.borrow_mut().insert(label.clone(), id);
        ctx.record(
            Event::new(EventAction::Granted, ctx.now())
                .with_label(label.clone())
                .with_name(name.clone())
                .with_lock(id),
        );

        if let Some(delay) = release_after {
            let release_ctx = ctx.clone();
            ctx.event_loop.schedule(
                delay,
                Box::new(move || {
                    release_label(&release_ctx, &label, "release_after");
                    Ok(())
                }),
            );
        }

        if fail_on_grant {
            anyhow::bail!("grant callback for '{}' on '{}' failed", id, name);
        }
        Ok(())
    }
}

fn run_release(ctx: &Context, step: &Step) {
    if let Some(label) = step.label.as_deref() {
        release_label(ctx, label, "step");
    }
}

/// Release whatever `label` was granted, or record why nothing happened.
fn release_label(ctx: &Context, label: &str, trigger: &str) {
    let lock_id = ctx.handles.borrow().get(label).copied();
    match lock_id {
        Some(id) if ctx.engine.contains(id) => {
            ctx.engine.release(id);
            ctx.record(
                Event::new(EventAction::Released, ctx.now())
                    .with_label(label)
                    .with_lock(id)
                    .with_details(json!({ "trigger": trigger })),
            );
        }
        Some(id) => ctx.record(
            Event::new(EventAction::ReleaseSkipped, ctx.now())
                .with_label(label)
                .with_lock(id)
                .with_details(json!({ "reason": "no longer held", "trigger": trigger })),
        ),
        None => ctx.record(
            Event::new(EventAction::ReleaseSkipped, ctx.now())
                .with_label(label)
                .with_details(json!({ "reason": "never granted", "trigger": trigger })),
        ),
    }
}
