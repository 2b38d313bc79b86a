//! Lock records: one per outstanding request or held lock.

use crate::scheduler::Millis;
use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_LOCK_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique handle for a lock record.
///
/// Callers receive one through their grant callback and hand it back to
/// `release`. There is no public constructor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LockId(u64);

impl LockId {
    pub(crate) fn next() -> Self {
        LockId(NEXT_LOCK_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for LockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lock-{}", self.0)
    }
}

impl Serialize for LockId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Lifecycle state of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LockState {
    /// Queued behind the current holder.
    Waiting,
    /// Exclusive holder of its name.
    Held,
}

impl fmt::Display for LockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockState::Waiting => write!(f, "WAITING"),
            LockState::Held => write!(f, "HELD"),
        }
    }
}

/// A request for, or hold of, a named lock.
///
/// `A` is an opaque attachment owned by whoever drives the store. The store
/// moves it around with the record but never looks inside.
#[derive(Debug)]
pub struct LockRecord<A> {
    id: LockId,
    name: String,
    state: LockState,
    created_at: Millis,
    acquired_at: Option<Millis>,
    wait_deadline: Option<Millis>,
    hold_duration: Option<Millis>,
    hold_deadline: Option<Millis>,
    attachment: A,
}

impl<A> LockRecord<A> {
    /// Create a waiting record with a fresh id.
    pub fn new(name: impl Into<String>, created_at: Millis, attachment: A) -> Self {
        Self {
            id: LockId::next(),
            name: name.into(),
            state: LockState::Waiting,
            created_at,
            acquired_at: None,
            wait_deadline: None,
            hold_duration: None,
            hold_deadline: None,
            attachment,
        }
    }

    /// Give up waiting `wait_ms` after creation.
    pub fn with_wait_timeout(mut self, wait_ms: Millis) -> Self {
        self.wait_deadline = Some(self.created_at.saturating_add(wait_ms));
        self
    }

    /// Auto-release `hold_ms` after the record is granted.
    pub fn with_hold_duration(mut self, hold_ms: Millis) -> Self {
        self.hold_duration = Some(hold_ms);
        self
    }

    pub fn id(&self) -> LockId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> LockState {
        self.state
    }

    pub fn is_held(&self) -> bool {
        self.state == LockState::Held
    }

    pub fn is_waiting(&self) -> bool {
        self.state == LockState::Waiting
    }

    pub fn created_at(&self) -> Millis {
        self.created_at
    }

    /// Set the instant the record became `HELD`; `None` while waiting.
    pub fn acquired_at(&self) -> Option<Millis> {
        self.acquired_at
    }

    pub fn wait_deadline(&self) -> Option<Millis> {
        self.wait_deadline
    }

    pub fn hold_duration(&self) -> Option<Millis> {
        self.hold_duration
    }

    /// Only known once the record is held.
    pub fn hold_deadline(&self) -> Option<Millis> {
        self.hold_deadline
    }

    pub fn attachment(&self) -> &A {
        &self.attachment
    }

    pub fn attachment_mut(&mut self) -> &mut A {
        &mut self.attachment
    }

    pub fn into_attachment(self) -> A {
        self.attachment
    }

    /// True if a waiting record's deadline has been reached at `now`.
    ///
    /// The deadline instant itself counts as expired: a request with a 1500ms
    /// wait timeout is no longer grantable at t+1500. Both the grant path and
    /// the pruning loop rely on this.
    pub fn wait_expired(&self, now: Millis) -> bool {
        self.is_waiting() && self.wait_deadline.is_some_and(|deadline| now >= deadline)
    }

    /// True if a held record's deadline has been reached at `now`.
    pub fn hold_expired(&self, now: Millis) -> bool {
        self.is_held() && self.hold_deadline.is_some_and(|deadline| now >= deadline)
    }

    pub(super) fn mark_held(&mut self, now: Millis) {
        self.state = LockState::Held;
        self.acquired_at = Some(now);
        self.hold_deadline = self.hold_duration.map(|hold| now.saturating_add(hold));
    }
}
