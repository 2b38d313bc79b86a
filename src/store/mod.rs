//! LockRecord store.
//!
//! Holds every outstanding request and hold, grouped by lock name. For each
//! name the records form a FIFO sequence whose front is the only record that
//! may be `HELD`; everything behind it is `WAITING` in arrival order.
//!
//! The store is plain data. It never fires callbacks or touches timers, so it
//! can be exercised without a scheduler. Whoever drives it attaches their own
//! per-record state through the `A` type parameter.

mod record;


pub use record::{LockId, LockRecord, LockState};

use crate::scheduler::Millis;
use std::collections::{BTreeMap, HashMap, VecDeque};

/// A deadline that has passed for some record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// A waiting record passed its wait deadline.
    WaitTimedOut(LockId),
    /// A held record passed its hold deadline.
    HoldExpired(LockId),
}

/// Ordered collection of lock records keyed by name.
#[derive(Debug)]
pub struct LockStore<A> {
    queues: BTreeMap<String, VecDeque<LockRecord<A>>>,
    index: HashMap<LockId, String>,
}

impl<A> Default for LockStore<A> {
    fn default() -> Self {
        Self {
            queues: BTreeMap::new(),
            index: HashMap::new(),
        }
    }
}

impl<A> LockStore<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record to the tail of its name's queue.
    ///
    /// Returns `true` if the record is now the head of that queue.
    pub fn insert(&mut self, record: LockRecord<A>) -> bool {
        self.index.insert(record.id(), record.name().to_string());
        let queue = self.queues.entry(record.name().to_string()).or_default();
        queue.push_back(record);
        queue.len() == 1
    }

    /// The holder of `name`, or the first waiter if nobody holds it.
    pub fn head(&self, name: &str) -> Option<&LockRecord<A>> {
        self.queues.get(name).and_then(VecDeque::front)
    }

    pub fn get(&self, id: LockId) -> Option<&LockRecord<A>> {
        let name = self.index.get(&id)?;
        self.queues.get(name)?.iter().find(|r| r.id() == id)
    }

    pub fn get_mut(&mut self, id: LockId) -> Option<&mut LockRecord<A>> {
        let name = self.index.get(&id)?;
        self.queues.get_mut(name)?.iter_mut().find(|r| r.id() == id)
    }

    pub fn contains(&self, id: LockId) -> bool {
        self.index.contains_key(&id)
    }

    /// Remove a record regardless of its state.
    ///
    /// Returns `None` for ids that are unknown or already removed, so repeated
    /// calls are harmless.
    pub fn remove(&mut self, id: LockId) -> Option<LockRecord<A>> {
        let name = self.index.remove(&id)?;
        let queue = self.queues.get_mut(&name)?;
        let position = queue.iter().position(|r| r.id() == id)?;
        let record = queue.remove(position);
        if queue.is_empty() {
            self.queues.remove(&name);
        }
        record
    }

    /// Grant the head of `name` if it is still waiting.
    ///
    /// Returns the id of the newly held record, or `None` if the name has no
    /// records or its head is already held.
    pub fn promote_head(&mut self, name: &str, now: Millis) -> Option<LockId> {
        let head = self.queues.get_mut(name)?.front_mut()?;
        if head.is_held() {
            return None;
        }
        head.mark_held(now);
        Some(head.id())
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Total number of records across all names.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Names with at least one record, in sorted order.
    pub fn all_names(&self) -> impl Iterator<Item = &str> {
        self.queues.keys().map(String::as_str)
    }

    /// Records for `name`, head first.
    pub fn queue(&self, name: &str) -> impl Iterator<Item = &LockRecord<A>> {
        self.queues.get(name).into_iter().flatten()
    }

    pub fn queue_len(&self, name: &str) -> usize {
        self.queues.get(name).map_or(0, VecDeque::len)
    }

    /// Every record, grouped by name in sorted order.
    pub fn records(&self) -> impl Iterator<Item = &LockRecord<A>> {
        self.queues.values().flatten()
    }

    pub fn ids(&self) -> Vec<LockId> {
        self.records().map(LockRecord::id).collect()
    }

    /// Scan every queue for records whose deadline has passed at `now`.
    pub fn expired(&self, now: Millis) -> Vec<Expiry> {
        self.records()
            .filter_map(|record| {
                if record.wait_expired(now) {
                    Some(Expiry::WaitTimedOut(record.id()))
                } else if record.hold_expired(now) {
                    Some(Expiry::HoldExpired(record.id()))
                } else {
                    None
                }
            })
            .collect()
    }

    /// Remove every record, returning them.
    pub fn drain(&mut self) -> Vec<LockRecord<A>> {
        self.index.clear();
        std::mem::take(&mut self.queues)
            .into_values()
            .flatten()
            .collect()
    }
}
