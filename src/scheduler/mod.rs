//! Scheduling abstraction for the lock engine.
//!
//! The engine never touches a clock or timer directly. It submits tasks to a
//! [`Scheduler`] ("run this after D milliseconds", "run this on the next
//! tick") and cancels them by handle. [`EventLoop`] is the bundled
//! implementation: a single-threaded task queue with a virtual clock, which
//! can optionally pace itself against wall-clock time.

mod event_loop;

#[cfg(test)]
mod tests;

pub use event_loop::{ErrorHandler, EventLoop};

/// Milliseconds on the scheduler's clock.
pub type Millis = u64;

/// A unit of deferred work.
///
/// An `Err` is an uncaught failure: the scheduler hands it to its host error
/// channel instead of propagating it into whoever submitted the task.
pub type Task = Box<dyn FnOnce() -> anyhow::Result<()>>;

/// Handle for a submitted task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// Deferred task submission for a cooperative, single-threaded host.
pub trait Scheduler {
    /// Current time on this scheduler's clock.
    fn now(&self) -> Millis;

    /// Run `task` once `delay` milliseconds have elapsed.
    ///
    /// Tasks due at the same instant run in submission order.
    fn schedule(&self, delay: Millis, task: Task) -> TimerId;

    /// Run `task` on the next tick, after anything already due now.
    fn defer(&self, task: Task) -> TimerId {
        self.schedule(0, task)
    }

    /// Remove a pending task. Returns `false` if it already ran or was
    /// cancelled.
    fn cancel(&self, id: TimerId) -> bool;

    /// Whether `id` is still waiting to run.
    fn is_pending(&self, id: TimerId) -> bool;
}
