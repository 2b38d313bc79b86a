//! Tests for the event loop scheduler.

use super::*;
use std::cell::RefCell;
use std::rc::Rc;

fn recorder() -> (Rc<RefCell<Vec<String>>>, impl Fn(&str) -> Task) {
    let log = Rc::new(RefCell::new(Vec::new()));
    let make = {
        let log = Rc::clone(&log);
        move |label: &str| -> Task {
            let log = Rc::clone(&log);
            let label = label.to_string();
            Box::new(move || {
                log.borrow_mut().push(label);
                Ok(())
            })
        }
    };
    (log, make)
}

#[test]
fn test_tasks_run_in_due_order() {
    let event_loop = EventLoop::new();
    let (log, task) = recorder();

    event_loop.schedule(300, task("c"));
    event_loop.schedule(100, task("a"));
    event_loop.schedule(200, task("b"));

    assert_eq!(event_loop.advance(1000), 3);
    assert_eq!(*log.borrow(), vec!["a", "b", "c"]);
    assert_eq!(event_loop.now(), 1000);
}

#[test]
fn test_same_instant_runs_in_submission_order() {
    let event_loop = EventLoop::new();
    let (log, task) = recorder();

    event_loop.defer(task("first"));
    event_loop.schedule(0, task("second"));
    event_loop.defer(task("third"));

    assert_eq!(event_loop.run_ready(), 3);
    assert_eq!(*log.borrow(), vec!["first", "second", "third"]);
    assert_eq!(event_loop.now(), 0);
}

#[test]
fn test_advance_stops_at_window() {
    let event_loop = EventLoop::new();
    let (log, task) = recorder();

    event_loop.schedule(500, task("early"));
    event_loop.schedule(1500, task("late"));

    assert_eq!(event_loop.advance(1000), 1);
    assert_eq!(*log.borrow(), vec!["early"]);
    assert_eq!(event_loop.pending(), 1);
    assert_eq!(event_loop.next_due(), Some(1500));

    assert_eq!(event_loop.advance(500), 1);
    assert_eq!(*log.borrow(), vec!["early", "late"]);
}

#[test]
fn test_tasks_can_schedule_tasks_inside_the_window() {
    let event_loop = EventLoop::new();
    let hits = Rc::new(RefCell::new(Vec::new()));

    let inner_loop = event_loop.clone();
    let inner_hits = Rc::clone(&hits);
    event_loop.schedule(
        100,
        Box::new(move || {
            inner_hits.borrow_mut().push(inner_loop.now());
            let nested_hits = Rc::clone(&inner_hits);
            let nested_loop = inner_loop.clone();
            inner_loop.schedule(
                50,
                Box::new(move || {
                    nested_hits.borrow_mut().push(nested_loop.now());
                    Ok(())
                }),
            );
            Ok(())
        }),
    );

    assert_eq!(event_loop.advance(200), 2);
    assert_eq!(*hits.borrow(), vec![100, 150]);
}

#[test]
fn test_cancel_removes_pending_task() {
    let event_loop = EventLoop::new();
    let (log, task) = recorder();

    let id = event_loop.schedule(100, task("cancelled"));
    event_loop.schedule(100, task("kept"));
    assert!(event_loop.is_pending(id));

    assert!(event_loop.cancel(id));
    assert!(!event_loop.is_pending(id));
    assert!(!event_loop.cancel(id));

    event_loop.advance(100);
    assert_eq!(*log.borrow(), vec!["kept"]);
}

#[test]
fn test_ran_task_is_no_longer_pending() {
    let event_loop = EventLoop::new();
    let (_log, task) = recorder();

    let id = event_loop.defer(task("x"));
    event_loop.run_ready();
    assert!(!event_loop.is_pending(id));
    assert!(!event_loop.cancel(id));
}

#[test]
fn test_failures_without_handler_are_kept() {
    let event_loop = EventLoop::new();
    event_loop.defer(Box::new(|| Err(anyhow::anyhow!("boom"))));

    event_loop.run_ready();
    let uncaught = event_loop.take_uncaught();
    assert_eq!(uncaught.len(), 1);
    assert_eq!(uncaught[0].to_string(), "boom");
    assert!(event_loop.take_uncaught().is_empty());
}

#[test]
fn test_failures_go_to_handler() {
    let event_loop = EventLoop::new();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let handler_seen = Rc::clone(&seen);
    event_loop.set_error_handler(move |err| handler_seen.borrow_mut().push(err.to_string()));

    event_loop.defer(Box::new(|| Err(anyhow::anyhow!("one"))));
    event_loop.defer(Box::new(|| Ok(())));
    event_loop.defer(Box::new(|| Err(anyhow::anyhow!("two"))));
    event_loop.run_ready();

    assert_eq!(*seen.borrow(), vec!["one", "two"]);
    assert!(event_loop.take_uncaught().is_empty());
}

#[test]
fn test_handler_may_schedule_work() {
    let event_loop = EventLoop::new();
    let (log, task) = recorder();
    let task = Rc::new(task);

    let handler_loop = event_loop.clone();
    let handler_task = Rc::clone(&task);
    event_loop.set_error_handler(move |_| {
        handler_loop.defer((*handler_task)("recovered"));
    });

    event_loop.defer(Box::new(|| Err(anyhow::anyhow!("boom"))));
    event_loop.run_ready();

    assert_eq!(*log.borrow(), vec!["recovered"]);
}

#[test]
fn test_clear_drops_everything() {
    let event_loop = EventLoop::new();
    let (log, task) = recorder();

    event_loop.schedule(10, task("a"));
    event_loop.schedule(20, task("b"));
    assert_eq!(event_loop.clear(), 2);
    assert_eq!(event_loop.pending(), 0);

    event_loop.advance(100);
    assert!(log.borrow().is_empty());
}

#[test]
fn test_run_until_idle_respects_limit() {
    let event_loop = EventLoop::new();
    let (log, task) = recorder();

    event_loop.schedule(100, task("a"));
    event_loop.schedule(5000, task("b"));

    assert_eq!(event_loop.run_until_idle(1000), 1);
    assert_eq!(event_loop.now(), 100);
    assert_eq!(*log.borrow(), vec!["a"]);
    assert_eq!(event_loop.run_until_idle(10_000), 1);
    assert_eq!(event_loop.now(), 5000);
}
