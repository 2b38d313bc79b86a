//! Cooplock: a cooperative, single-threaded named mutex.
//!
//! Callers ask a [`MutexEngine`](engine::MutexEngine) for exclusive access to
//! a named resource and are queued, first come first served, until it is
//! theirs. Requests can give up after a wait timeout, holds can be revoked
//! after a maximum duration, and [`recover`](engine::MutexEngine::recover)
//! puts the engine back in order after a failure in host code.
//!
//! Everything runs on one thread under a [`Scheduler`](scheduler::Scheduler);
//! [`EventLoop`](scheduler::EventLoop) is the bundled virtual-clock
//! implementation.

pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod exit_codes;
pub mod scenario;
pub mod scheduler;
pub mod store;

pub use engine::{LockRequest, MutexEngine};
pub use error::{CooplockError, Result, WaitTimeoutError};
pub use store::LockId;
