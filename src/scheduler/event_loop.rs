//! Virtual-clock event loop.

use super::{Millis, Scheduler, Task, TimerId};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

/// Host hook for tasks that fail.
pub type ErrorHandler = Box<dyn FnMut(&anyhow::Error)>;

/// Single-threaded task queue driven by an explicit clock.
///
/// Cloning yields another handle to the same loop. Time only moves when the
/// host calls [`advance`](EventLoop::advance) or
/// [`run_until_idle`](EventLoop::run_until_idle), which makes every test that
/// uses it deterministic. [`EventLoop::realtime`] builds a loop that sleeps
/// through the gaps instead, for watching a run live.
#[derive(Clone, Default)]
pub struct EventLoop {
    shared: Rc<Shared>,
}

#[derive(Default)]
struct Shared {
    state: RefCell<LoopState>,
    handler: RefCell<Option<ErrorHandler>>,
    realtime: bool,
}

#[derive(Default)]
struct LoopState {
    now: Millis,
    next_seq: u64,
    queue: BTreeMap<(Millis, u64), Task>,
    due: HashMap<u64, Millis>,
    uncaught: Vec<anyhow::Error>,
}

impl EventLoop {
    /// A loop on a virtual clock starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// A loop that sleeps for real between tasks.
    pub fn realtime() -> Self {
        Self {
            shared: Rc::new(Shared {
                realtime: true,
                ..Shared::default()
            }),
        }
    }

    pub fn is_realtime(&self) -> bool {
        self.shared.realtime
    }

    /// Install the host error channel for failing tasks.
    ///
    /// The handler may submit tasks or call back into whatever submitted the
    /// failing task. It replaces any previous handler.
    pub fn set_error_handler(&self, handler: impl FnMut(&anyhow::Error) + 'static) {
        *self.shared.handler.borrow_mut() = Some(Box::new(handler));
    }

    pub fn clear_error_handler(&self) {
        self.shared.handler.borrow_mut().take();
    }

    /// Failures that arrived while no handler was installed.
    pub fn take_uncaught(&self) -> Vec<anyhow::Error> {
        std::mem::take(&mut self.shared.state.borrow_mut().uncaught)
    }

    /// Number of tasks waiting to run.
    pub fn pending(&self) -> usize {
        self.shared.state.borrow().queue.len()
    }

    /// When the earliest pending task is due.
    pub fn next_due(&self) -> Option<Millis> {
        self.shared
            .state
            .borrow()
            .queue
            .first_key_value()
            .map(|(&(due, _), _)| due)
    }

    /// Run every task due within the next `ms` milliseconds, then move the
    /// clock forward by `ms`. Returns the number of tasks run.
    pub fn advance(&self, ms: Millis) -> usize {
        let target = self.now().saturating_add(ms);
        let ran = self.run_through(target);
        let mut state = self.shared.state.borrow_mut();
        let gap = target.saturating_sub(state.now);
        state.now = state.now.max(target);
        drop(state);
        self.pace(gap);
        ran
    }

    /// Run the tasks due at the current instant, including ones they defer.
    pub fn run_ready(&self) -> usize {
        self.advance(0)
    }

    /// Keep running tasks until none remain or the next one is due after
    /// `limit`. The clock stops at the last task run.
    pub fn run_until_idle(&self, limit: Millis) -> usize {
        self.run_through(limit)
    }

    /// Drop every pending task without running it.
    pub fn clear(&self) -> usize {
        let dropped = {
            let mut state = self.shared.state.borrow_mut();
            state.due.clear();
            std::mem::take(&mut state.queue)
        };
        dropped.len()
    }

    fn run_through(&self, limit: Millis) -> usize {
        let mut ran = 0;
        while let Some(task) = self.pop_due(limit) {
            if let Err(err) = task() {
                self.report(err);
            }
            ran += 1;
        }
        ran
    }

    fn pop_due(&self, limit: Millis) -> Option<Task> {
        let mut state = self.shared.state.borrow_mut();
        let (&(due, seq), _) = state.queue.first_key_value()?;
        if due > limit {
            return None;
        }
        let task = state.queue.remove(&(due, seq))?;
        state.due.remove(&seq);
        let gap = due.saturating_sub(state.now);
        state.now = state.now.max(due);
        drop(state);
        self.pace(gap);
        Some(task)
    }

    fn pace(&self, gap: Millis) {
        if self.shared.realtime && gap > 0 {
            std::thread::sleep(Duration::from_millis(gap));
        }
    }

    fn report(&self, err: anyhow::Error) {
        tracing::warn!(error = %err, "uncaught task failure");
        let handler = self.shared.handler.borrow_mut().take();
        match handler {
            Some(mut handler) => {
                handler(&err);
                let mut slot = self.shared.handler.borrow_mut();
                // Keep a handler installed from inside the callback.
                if slot.is_none() {
                    *slot = Some(handler);
                }
            }
            None => self.shared.state.borrow_mut().uncaught.push(err),
        }
    }
}

impl Scheduler for EventLoop {
    fn now(&self) -> Millis {
        self.shared.state.borrow().now
    }

    fn schedule(&self, delay: Millis, task: Task) -> TimerId {
        let mut state = self.shared.state.borrow_mut();
        let seq = state.next_seq;
        state.next_seq += 1;
        let due = state.now.saturating_add(delay);
        state.queue.insert((due, seq), task);
        state.due.insert(seq, due);
        TimerId(seq)
    }

    fn cancel(&self, id: TimerId) -> bool {
        let removed = {
            let mut state = self.shared.state.borrow_mut();
            match state.due.remove(&id.0) {
                Some(due) => state.queue.remove(&(due, id.0)),
                None => None,
            }
        };
        removed.is_some()
    }

    fn is_pending(&self, id: TimerId) -> bool {
        self.shared.state.borrow().due.contains_key(&id.0)
    }
}

impl fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.borrow();
        f.debug_struct("EventLoop")
            .field("now", &state.now)
            .field("pending", &state.queue.len())
            .field("uncaught", &state.uncaught.len())
            .field("realtime", &self.shared.realtime)
            .finish()
    }
}
