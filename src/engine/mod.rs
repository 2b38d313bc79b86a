//! Mutex engine.
//!
//! The public face of the crate: callers request exclusive access to a named
//! lock and learn about the outcome through callbacks. Requests for the same
//! name are granted strictly in arrival order; distinct names never interact.
//!
//! # Timing
//!
//! Every deadline is enforced twice. Each record arms its own scheduler tasks
//! (wait timeout, hold expiry) so transitions happen on time, and a single
//! pruning loop scans the store every `prune_interval_ms` while it holds any
//! records. The loop is the backstop for timers lost to a host failure; see
//! [`MutexEngine::recover`].
//!
//! # Callbacks
//!
//! Callbacks always run as their own scheduler task, never inside an engine
//! call, so they may call back into the engine freely. A callback returning
//! `Err` lands on the scheduler's error channel; the engine does not catch it.
//!
//! ```
//! use cooplock::config::EngineConfig;
//! use cooplock::engine::MutexEngine;
//! use cooplock::scheduler::EventLoop;
//!
//! let event_loop = EventLoop::new();
//! let engine = MutexEngine::new(event_loop.clone(), EngineConfig::default());
//!
//! let handle = engine.clone();
//! engine.lock("printer", move |id| {
//!     handle.release(id);
//!     Ok(())
//! });
//! event_loop.run_ready();
//! assert!(engine.is_empty());
//! ```

mod maintenance;
mod request;


pub use request::{GrantFn, HoldExpiredFn, LockRequest, WaitTimeoutFn};

use crate::config::EngineConfig;
use crate::error::WaitTimeoutError;
use crate::scheduler::{Millis, Scheduler, Task, TimerId};
use crate::store::{LockId, LockRecord, LockState, LockStore};
use request::Hooks;
use serde::Serialize;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

/// Point-in-time view of one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LockSnapshot {
    pub id: LockId,
    pub name: String,
    pub state: LockState,
    pub created_at: Millis,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acquired_at: Option<Millis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait_deadline: Option<Millis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hold_deadline: Option<Millis>,
}

impl LockSnapshot {
    fn of<A>(record: &LockRecord<A>) -> Self {
        Self {
            id: record.id(),
            name: record.name().to_string(),
            state: record.state(),
            created_at: record.created_at(),
            acquired_at: record.acquired_at(),
            wait_deadline: record.wait_deadline(),
            hold_deadline: record.hold_deadline(),
        }
    }
}

/// Cooperative named mutex for a single-threaded host.
///
/// Cloning gives another handle to the same engine.
#[derive(Clone)]
pub struct MutexEngine {
    inner: Rc<Inner>,
}

struct Inner {
    scheduler: Rc<dyn Scheduler>,
    config: EngineConfig,
    store: RefCell<LockStore<Hooks>>,
    pruner: Cell<Option<TimerId>>,
}

impl MutexEngine {
    /// Build an engine on `scheduler`.
    ///
    /// `config` is taken as given. A `prune_interval_ms` of zero runs the
    /// pruning loop every millisecond.
    pub fn new(scheduler: impl Scheduler + 'static, config: EngineConfig) -> Self {
        if let Err(err) = config.validate() {
            tracing::warn!(error = %err, "engine created with invalid config");
        }
        Self {
            inner: Rc::new(Inner {
                scheduler: Rc::new(scheduler),
                config,
                store: RefCell::new(LockStore::new()),
                pruner: Cell::new(None),
            }),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Current time on the engine's scheduler.
    pub fn now(&self) -> Millis {
        self.inner.scheduler.now()
    }

    /// Request `name` with no limit on waiting or holding.
    pub fn lock(
        &self,
        name: impl Into<String>,
        on_grant: impl FnOnce(LockId) -> anyhow::Result<()> + 'static,
    ) {
        self.request(LockRequest::new(name, on_grant));
    }

    /// Request `name`, giving up after `wait_ms` milliseconds in the queue.
    pub fn lock_with_timeout(
        &self,
        name: impl Into<String>,
        on_grant: impl FnOnce(LockId) -> anyhow::Result<()> + 'static,
        wait_ms: Millis,
        on_wait_timeout: impl FnOnce(WaitTimeoutError) -> anyhow::Result<()> + 'static,
    ) {
        self.request(
            LockRequest::new(name, on_grant)
                .wait_timeout(wait_ms)
                .on_wait_timeout(on_wait_timeout),
        );
    }

    /// Request `name` and release it automatically `hold_ms` after the grant.
    pub fn lock_for(
        &self,
        name: impl Into<String>,
        on_grant: impl FnOnce(LockId) -> anyhow::Result<()> + 'static,
        hold_ms: Millis,
    ) {
        self.request(LockRequest::new(name, on_grant).hold_for(hold_ms));
    }

    /// Like [`lock_for`](Self::lock_for), with a notice when the hold is
    /// revoked.
    pub fn lock_for_with_expiry(
        &self,
        name: impl Into<String>,
        on_grant: impl FnOnce(LockId) -> anyhow::Result<()> + 'static,
        hold_ms: Millis,
        on_hold_expired: impl FnOnce() -> anyhow::Result<()> + 'static,
    ) {
        self.request(
            LockRequest::new(name, on_grant)
                .hold_for(hold_ms)
                .on_hold_expired(on_hold_expired),
        );
    }

    /// Queue a request. The outcome arrives through its callbacks.
    pub fn request(&self, request: LockRequest) {
        let LockRequest {
            name,
            on_grant,
            wait_timeout,
            on_wait_timeout,
            hold_for,
            on_hold_expired,
        } = request;

        let hooks = Hooks {
            on_grant: Some(on_grant),
            on_wait_timeout,
            on_hold_expired,
            ..Hooks::default()
        };
        let mut record = LockRecord::new(name.clone(), self.now(), hooks);
        if let Some(wait_ms) = wait_timeout {
            record = record.with_wait_timeout(wait_ms);
        }
        if let Some(hold_ms) = hold_for {
            record = record.with_hold_duration(hold_ms);
        }
        let id = record.id();

        let is_head = self.inner.store.borrow_mut().insert(record);
        tracing::debug!(lock = %id, name = %name, is_head, "lock requested");

        if is_head {
            self.promote(&name);
        } else if let Some(wait_ms) = wait_timeout {
            let timer = self
                .inner
                .scheduler
                .schedule(wait_ms, self.engine_task(move |engine| engine.expire_wait(id)));
            if let Some(record) = self.inner.store.borrow_mut().get_mut(id) {
                record.attachment_mut().wait_timer = Some(timer);
            }
        }

        self.ensure_pruning();
    }

    /// Give up a lock or a queued request.
    ///
    /// Cancels everything armed for `id` and grants the next waiter if `id`
    /// was the holder. Unknown or already released ids are ignored.
    pub fn release(&self, id: LockId) {
        let removed = self.inner.store.borrow_mut().remove(id);
        let Some(record) = removed else {
            tracing::debug!(lock = %id, "release of unknown lock ignored");
            return;
        };

        let was_held = record.is_held();
        let name = record.name().to_string();
        self.cancel_timers(&record.into_attachment());
        tracing::debug!(lock = %id, name = %name, was_held, "lock released");

        if was_held {
            self.grant_next(&name);
        }
        self.stop_pruning_if_idle();
    }

    /// Total number of records, held or waiting, across all names.
    pub fn len(&self) -> usize {
        self.inner.store.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.store.borrow().is_empty()
    }

    /// Whether `id` is still held or queued.
    pub fn contains(&self, id: LockId) -> bool {
        self.inner.store.borrow().contains(id)
    }

    /// Whether someone currently holds `name`.
    pub fn is_locked(&self, name: &str) -> bool {
        self.holder(name).is_some()
    }

    pub fn holder(&self, name: &str) -> Option<LockId> {
        self.inner
            .store
            .borrow()
            .head(name)
            .filter(|record| record.is_held())
            .map(LockRecord::id)
    }

    /// Number of records for `name`, including the holder.
    pub fn queue_len(&self, name: &str) -> usize {
        self.inner.store.borrow().queue_len(name)
    }

    /// Whether the pruning loop is scheduled.
    pub fn is_pruning(&self) -> bool {
        self.inner.pruner.get().is_some()
    }

    pub fn snapshot(&self) -> Vec<LockSnapshot> {
        self.inner
            .store
            .borrow()
            .records()
            .map(LockSnapshot::of)
            .collect()
    }

    /// Pass `name` on to its next live waiter.
    ///
    /// Waiters at the front whose wait deadline has been reached are timed
    /// out first, so a release or hold expiry never grants a request that
    /// had already given up.
    fn grant_next(&self, name: &str) {
        let now = self.now();
        while let Some(record) = self.take_expired_head(name, now) {
            self.notify_wait_timeout(record);
        }
        self.promote(name);
    }

    fn take_expired_head(&self, name: &str, now: Millis) -> Option<LockRecord<Hooks>> {
        let mut store = self.inner.store.borrow_mut();
        let id = store
            .head(name)
            .filter(|head| head.wait_expired(now))
            .map(LockRecord::id)?;
        store.remove(id)
    }

    /// Grant the head of `name` if nobody holds it, arming its hold timer and
    /// scheduling its grant callback.
    fn promote(&self, name: &str) {
        let scheduler = &self.inner.scheduler;
        let now = scheduler.now();
        let mut store = self.inner.store.borrow_mut();
        let Some(id) = store.promote_head(name, now) else {
            return;
        };
        let Some(record) = store.get_mut(id) else {
            return;
        };
        let hold_duration = record.hold_duration();
        let hooks = record.attachment_mut();

        if let Some(timer) = hooks.wait_timer.take() {
            scheduler.cancel(timer);
        }
        if let Some(on_grant) = hooks.on_grant.take() {
            hooks.grant_task = Some(scheduler.defer(self.grant_task(id, on_grant)));
        }
        if let Some(hold_ms) = hold_duration {
            hooks.hold_timer = Some(
                scheduler.schedule(hold_ms, self.engine_task(move |engine| engine.expire_hold(id))),
            );
        }
        drop(store);

        tracing::debug!(lock = %id, name = %name, at = now, "lock granted");
    }

    /// Drop a waiting record whose deadline passed and tell its owner.
    fn expire_wait(&self, id: LockId) {
        let removed = {
            let mut store = self.inner.store.borrow_mut();
            if store.get(id).is_some_and(LockRecord::is_waiting) {
                store.remove(id)
            } else {
                None
            }
        };
        let Some(record) = removed else {
            return;
        };

        let name = record.name().to_string();
        self.notify_wait_timeout(record);
        self.grant_next(&name);
        self.stop_pruning_if_idle();
    }

    /// Disarm a removed waiter and schedule its timeout notice.
    fn notify_wait_timeout(&self, record: LockRecord<Hooks>) {
        let id = record.id();
        let name = record.name().to_string();
        let waited_ms = self.now().saturating_sub(record.created_at());
        let hooks = record.into_attachment();
        self.cancel_timers(&hooks);
        tracing::debug!(lock = %id, name = %name, waited_ms, "wait timed out");

        if let Some(on_wait_timeout) = hooks.on_wait_timeout {
            let error = WaitTimeoutError { name, waited_ms };
            self.inner
                .scheduler
                .defer(Box::new(move || on_wait_timeout(error)));
        }
    }

    /// Revoke a held record whose hold duration ran out and pass the lock on.
    fn expire_hold(&self, id: LockId) {
        let removed = {
            let mut store = self.inner.store.borrow_mut();
            if store.get(id).is_some_and(LockRecord::is_held) {
                store.remove(id)
            } else {
                None
            }
        };
        let Some(record) = removed else {
            return;
        };

        let name = record.name().to_string();
        let hooks = record.into_attachment();
        self.cancel_timers(&hooks);
        tracing::debug!(lock = %id, name = %name, "hold expired");

        if let Some(on_hold_expired) = hooks.on_hold_expired {
            self.inner.scheduler.defer(on_hold_expired);
        }
        self.grant_next(&name);
        self.stop_pruning_if_idle();
    }

    fn cancel_timers(&self, hooks: &Hooks) {
        for timer in hooks.timers() {
            self.inner.scheduler.cancel(timer);
        }
    }

    fn grant_task(&self, id: LockId, on_grant: GrantFn) -> Task {
        let inner = Rc::downgrade(&self.inner);
        Box::new(move || {
            let Some(inner) = inner.upgrade() else {
                return Ok(());
            };
            if let Some(record) = inner.store.borrow_mut().get_mut(id) {
                record.attachment_mut().grant_task = None;
            }
            on_grant(id)
        })
    }

    /// Wrap engine work as a scheduler task that holds the engine weakly.
    fn engine_task(&self, work: impl FnOnce(&MutexEngine) + 'static) -> Task {
        let inner: Weak<Inner> = Rc::downgrade(&self.inner);
        Box::new(move || {
            if let Some(inner) = inner.upgrade() {
                work(&MutexEngine { inner });
            }
            Ok(())
        })
    }
}

impl std::fmt::Debug for MutexEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutexEngine")
            .field("records", &self.len())
            .field("pruning", &self.is_pruning())
            .field("config", &self.inner.config)
            .finish()
    }
}
