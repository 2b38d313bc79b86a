//! Pruning loop, recovery and reset.

use super::MutexEngine;
use crate::store::{Expiry, LockId};

impl MutexEngine {
    /// Restore consistency after a failure in host code.
    ///
    /// Meant to be wired into the host's error channel. It does not try to
    /// work out which lock was involved. Instead it:
    ///
    /// 1. stops the pruning loop;
    /// 2. purges held records whose grant callback was owed but whose grant
    ///    task no longer exists, since their owner never learned the id and
    ///    can never release them;
    /// 3. forgets wait/hold timers the scheduler lost (the pruning loop still
    ///    enforces those deadlines);
    /// 4. grants the head of every name left without a holder;
    /// 5. restarts the pruning loop if any records remain.
    ///
    /// Safe to call at any time and any number of times.
    pub fn recover(&self) {
        let scheduler = &self.inner.scheduler;
        if let Some(timer) = self.inner.pruner.take() {
            scheduler.cancel(timer);
        }

        let orphaned: Vec<LockId> = {
            let mut store = self.inner.store.borrow_mut();
            let mut orphaned = Vec::new();
            for id in store.ids() {
                let Some(record) = store.get_mut(id) else {
                    continue;
                };
                let hooks = record.attachment_mut();
                if hooks
                    .grant_task
                    .is_some_and(|task| !scheduler.is_pending(task))
                {
                    orphaned.push(id);
                    continue;
                }
                if hooks
                    .wait_timer
                    .is_some_and(|timer| !scheduler.is_pending(timer))
                {
                    hooks.wait_timer = None;
                }
                if hooks
                    .hold_timer
                    .is_some_and(|timer| !scheduler.is_pending(timer))
                {
                    hooks.hold_timer = None;
                }
            }
            orphaned
        };

        for id in &orphaned {
            let removed = self.inner.store.borrow_mut().remove(*id);
            if let Some(record) = removed {
                tracing::warn!(lock = %id, name = %record.name(), "purged orphaned lock");
                self.cancel_timers(&record.into_attachment());
            }
        }

        let names: Vec<String> = self
            .inner
            .store
            .borrow()
            .all_names()
            .map(str::to_string)
            .collect();
        for name in &names {
            self.grant_next(name);
        }

        self.ensure_pruning();
        tracing::info!(
            purged = orphaned.len(),
            remaining = self.len(),
            pruning = self.is_pruning(),
            "lock engine recovered"
        );
    }

    /// Drop every record and timer without firing any callbacks.
    pub fn reset(&self) {
        if let Some(timer) = self.inner.pruner.take() {
            self.inner.scheduler.cancel(timer);
        }
        let drained = self.inner.store.borrow_mut().drain();
        for record in drained {
            self.cancel_timers(&record.into_attachment());
        }
    }

    /// One pass of the pruning loop: resolve every passed deadline.
    ///
    /// Wait timeouts are handled before hold expiry so a waiter whose
    /// deadline has passed is not granted by a holder expiring at the same
    /// instant. Returns the number of records resolved.
    pub(super) fn prune(&self) -> usize {
        self.inner.pruner.set(None);

        let now = self.now();
        let expired = self.inner.store.borrow().expired(now);
        let before = self.len();
        for expiry in &expired {
            if let Expiry::WaitTimedOut(id) = expiry {
                self.expire_wait(*id);
            }
        }
        for expiry in &expired {
            if let Expiry::HoldExpired(id) = expiry {
                self.expire_hold(*id);
            }
        }
        let resolved = before.saturating_sub(self.len());
        if resolved > 0 {
            tracing::debug!(resolved, at = now, "pruned expired locks");
        }

        self.ensure_pruning();
        resolved
    }

    /// Start the pruning loop if it is idle and there is something to scan.
    pub(super) fn ensure_pruning(&self) {
        if self.is_pruning() || self.is_empty() {
            return;
        }
        // A zero period would reschedule the loop at the same instant forever.
        let interval = self.inner.config.prune_interval_ms.max(1);
        let timer = self
            .inner
            .scheduler
            .schedule(interval, self.engine_task(|engine| {
                engine.prune();
            }));
        self.inner.pruner.set(Some(timer));
    }

    /// Stop the pruning loop once the store has emptied.
    pub(super) fn stop_pruning_if_idle(&self) {
        if !self.is_empty() {
            return;
        }
        if let Some(timer) = self.inner.pruner.take() {
            self.inner.scheduler.cancel(timer);
        }
    }
}
