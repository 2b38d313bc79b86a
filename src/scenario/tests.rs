//! Tests for scenario parsing and replay.

use super::*;
use crate::config::EngineConfig;
use crate::events::EventAction;
use crate::scheduler::EventLoop;
use tempfile::TempDir;

fn run_yaml(yaml: &str) -> RunReport {
    let scenario = Scenario::from_yaml(yaml).unwrap();
    run(&scenario, &EngineConfig::default(), EventLoop::new())
}

/// `(ts, action, label)` for each event, skipping `requested`.
fn timeline(report: &RunReport) -> Vec<(Millis, EventAction, Option<String>)> {
    report
        .events
        .iter()
        .filter(|e| e.action != EventAction::Requested)
        .map(|e| (e.ts, e.action, e.label.clone()))
        .collect()
}

fn at(ts: Millis, action: EventAction, label: &str) -> (Millis, EventAction, Option<String>) {
    (ts, action, Some(label.to_string()))
}

// ============================================================================
// Parsing and validation
// ============================================================================

#[test]
fn test_parse_defaults() {
    let scenario = Scenario::from_yaml("steps: []").unwrap();
    assert_eq!(scenario.run_for, 10_000);
    assert!(scenario.steps.is_empty());
}

#[test]
fn test_parse_full_step() {
    let yaml = r#"
run_for: 3000
steps:
  - at: 5
    action: lock
    name: printer
    label: a
    wait_timeout: 100
    hold_for: 200
    release_after: 50
    fail_on_grant: true
  - at: 10
    action: release
    label: a
  - at: 20
    action: recover
"#;
    let scenario = Scenario::from_yaml(yaml).unwrap();

    assert_eq!(scenario.run_for, 3000);
    let step = &scenario.steps[0];
    assert_eq!(step.at, 5);
    assert_eq!(step.action, StepAction::Lock);
    assert_eq!(step.name.as_deref(), Some("printer"));
    assert_eq!(step.wait_timeout, Some(100));
    assert_eq!(step.hold_for, Some(200));
    assert_eq!(step.release_after, Some(50));
    assert!(step.fail_on_grant);
    assert_eq!(scenario.steps[1].action, StepAction::Release);
    assert_eq!(scenario.steps[2].action, StepAction::Recover);
}

#[test]
fn test_lock_without_name_is_rejected() {
    let yaml = r#"
steps:
  - action: lock
    label: a
"#;
    let err = Scenario::from_yaml(yaml).unwrap_err();
    assert!(err.to_string().contains("missing a name"));
}

#[test]
fn test_lock_without_label_is_rejected() {
    let yaml = r#"
steps:
  - action: lock
    name: printer
"#;
    let err = Scenario::from_yaml(yaml).unwrap_err();
    assert!(err.to_string().contains("missing a label"));
}

#[test]
fn test_duplicate_labels_are_rejected() {
    let yaml = r#"
steps:
  - action: lock
    name: printer
    label: a
  - action: lock
    name: scanner
    label: a
"#;
    let err = Scenario::from_yaml(yaml).unwrap_err();
    assert!(err.to_string().contains("duplicate label 'a'"));
}

#[test]
fn test_release_of_unknown_label_is_rejected() {
    let yaml = r#"
steps:
  - action: release
    label: ghost
"#;
    let err = Scenario::from_yaml(yaml).unwrap_err();
    assert!(err.to_string().contains("unknown label 'ghost'"));
}

#[test]
fn test_step_after_run_for_is_rejected() {
    let yaml = r#"
run_for: 100
steps:
  - at: 200
    action: recover
"#;
    let err = Scenario::from_yaml(yaml).unwrap_err();
    assert!(err.to_string().contains("after run_for"));
}

#[test]
fn test_unknown_action_is_rejected() {
    let yaml = r#"
steps:
  - action: explode
"#;
    let err = Scenario::from_yaml(yaml).unwrap_err();
    assert!(matches!(err, crate::error::CooplockError::ScenarioError(_)));
}

#[test]
fn test_load_from_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("scenario.yaml");
    std::fs::write(
        &path,
        "steps:\n  - action: lock\n    name: printer\n    label: a\n",
    )
    .unwrap();

    let scenario = Scenario::load(&path).unwrap();
    assert_eq!(scenario.steps.len(), 1);
}

// ============================================================================
// Replay
// ============================================================================

#[test]
fn test_blocked_lock_is_granted_on_release() {
    let report = run_yaml(
        r#"
run_for: 3000
steps:
  - action: lock
    name: printer
    label: a
    release_after: 1000
  - action: lock
    name: printer
    label: b
    release_after: 10
"#,
    );

    assert_eq!(
        timeline(&report),
        vec![
            at(0, EventAction::Granted, "a"),
            at(1000, EventAction::Released, "a"),
            at(1000, EventAction::Granted, "b"),
            at(1010, EventAction::Released, "b"),
        ]
    );
    assert!(report.remaining.is_empty());
}

#[test]
fn test_wait_timeout_scenario() {
    let report = run_yaml(
        r#"
run_for: 3000
steps:
  - action: lock
    name: printer
    label: holder
  - action: lock
    name: printer
    label: waiter
    wait_timeout: 1500
"#,
    );

    assert_eq!(
        timeline(&report),
        vec![
            at(0, EventAction::Granted, "holder"),
            at(1500, EventAction::WaitTimeout, "waiter"),
        ]
    );
    assert_eq!(report.remaining.len(), 1);
    let timeout = report
        .events
        .iter()
        .find(|e| e.action == EventAction::WaitTimeout)
        .unwrap();
    assert_eq!(timeout.details["waited_ms"], 1500);
}

#[test]
fn test_hold_expiry_scenario() {
    let report = run_yaml(
        r#"
run_for: 3000
steps:
  - action: lock
    name: printer
    label: a
    hold_for: 1000
  - action: lock
    name: printer
    label: b
    hold_for: 1000
  - action: lock
    name: printer
    label: c
  - at: 2500
    action: release
    label: a
"#,
    );

    assert_eq!(
        timeline(&report),
        vec![
            at(0, EventAction::Granted, "a"),
            at(1000, EventAction::HoldExpired, "a"),
            at(1000, EventAction::Granted, "b"),
            at(2000, EventAction::HoldExpired, "b"),
            at(2000, EventAction::Granted, "c"),
            at(2500, EventAction::ReleaseSkipped, "a"),
        ]
    );
    assert_eq!(report.count(EventAction::HoldExpired), 2);
    assert_eq!(report.remaining.len(), 1);
}

#[test]
fn test_release_before_grant_is_skipped() {
    let report = run_yaml(
        r#"
run_for: 1000
steps:
  - action: lock
    name: printer
    label: a
  - action: lock
    name: printer
    label: b
  - at: 10
    action: release
    label: b
"#,
    );

    let skipped = report
        .events
        .iter()
        .find(|e| e.action == EventAction::ReleaseSkipped)
        .unwrap();
    assert_eq!(skipped.details["reason"], "never granted");
}

#[test]
fn test_failing_grants_are_recovered() {
    let report = run_yaml(
        r#"
run_for: 2000
steps:
  - action: lock
    name: foo
    label: first
    fail_on_grant: true
    release_after: 250
  - action: lock
    name: foo
    label: second
    fail_on_grant: true
    release_after: 250
  - action: lock
    name: foo
    label: third
    fail_on_grant: true
    release_after: 250
"#,
    );

    assert_eq!(report.count(EventAction::Granted), 3);
    assert_eq!(report.count(EventAction::Fault), 3);
    assert_eq!(report.count(EventAction::Recovered), 3);
    assert_eq!(report.unrecovered_faults, 0);
    assert!(report.remaining.is_empty());

    let grants: Vec<Millis> = report
        .events
        .iter()
        .filter(|e| e.action == EventAction::Granted)
        .map(|e| e.ts)
        .collect();
    assert_eq!(grants, vec![0, 250, 500]);
}

#[test]
fn test_failures_without_recovery_are_counted() {
    let scenario = Scenario::from_yaml(
        r#"
run_for: 100
steps:
  - action: lock
    name: foo
    label: a
    fail_on_grant: true
"#,
    )
    .unwrap();
    let config = EngineConfig {
        recover_on_error: false,
        ..EngineConfig::default()
    };

    let report = run(&scenario, &config, EventLoop::new());
    assert_eq!(report.count(EventAction::Fault), 1);
    assert_eq!(report.count(EventAction::Recovered), 0);
    assert_eq!(report.unrecovered_faults, 1);
}

#[test]
fn test_recover_step_is_recorded() {
    let report = run_yaml(
        r#"
run_for: 100
steps:
  - at: 50
    action: recover
"#,
    );

    assert_eq!(report.events.len(), 1);
    assert_eq!(report.events[0].action, EventAction::Recovered);
    assert_eq!(report.events[0].ts, 50);
    assert_eq!(report.events[0].details["trigger"], "step");
}

#[test]
fn test_run_leaves_loop_empty() {
    let scenario = Scenario::from_yaml(
        r#"
run_for: 100
steps:
  - action: lock
    name: printer
    label: a
"#,
    )
    .unwrap();
    let event_loop = EventLoop::new();

    let report = run(&scenario, &EngineConfig::default(), event_loop.clone());
    assert_eq!(report.remaining.len(), 1);
    assert_eq!(event_loop.pending(), 0);
    assert!(report.summary().contains("1 outstanding"));
}

#[test]
fn test_demo_scenarios_replay() {
    let printer = run_yaml(include_str!("../../demos/printer.yaml"));
    assert_eq!(printer.count(EventAction::Granted), 3);
    assert_eq!(printer.count(EventAction::WaitTimeout), 1);
    assert_eq!(printer.count(EventAction::HoldExpired), 1);
    assert!(printer.remaining.is_empty());

    let faulty = run_yaml(include_str!("../../demos/faulty.yaml"));
    assert_eq!(faulty.count(EventAction::Fault), 3);
    assert_eq!(faulty.unrecovered_faults, 0);
    assert!(faulty.remaining.is_empty());
}
