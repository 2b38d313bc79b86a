//! Trace events for lock engine runs.
//!
//! The scenario runner records one event per engine-visible transition and
//! the CLI prints them in NDJSON format (one JSON object per line).
//!
//! # Event Format
//!
//! Each event is a JSON object with the following fields:
//! - `ts`: time on the scheduler clock, in milliseconds
//! - `action`: what happened (requested, granted, released, ...)
//! - `label`: optional scenario label of the request involved
//! - `name`: optional lock name
//! - `lock_id`: optional lock id, once one has been granted
//! - `details`: freeform object with action-specific details

use crate::error::{CooplockError, Result};
use crate::scheduler::Millis;
use crate::store::LockId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

/// Transitions that can be recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventAction {
    /// A lock request entered the queue.
    Requested,
    /// A request became the holder.
    Granted,
    /// A holder or waiter released explicitly.
    Released,
    /// A waiter gave up after its wait timeout.
    WaitTimeout,
    /// A holder was revoked after its hold duration.
    HoldExpired,
    /// `recover()` ran.
    Recovered,
    /// A callback failed and reached the host error channel.
    Fault,
    /// A release step had nothing to release.
    ReleaseSkipped,
}

impl std::fmt::Display for EventAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventAction::Requested => write!(f, "requested"),
            EventAction::Granted => write!(f, "granted"),
            EventAction::Released => write!(f, "released"),
            EventAction::WaitTimeout => write!(f, "wait_timeout"),
            EventAction::HoldExpired => write!(f, "hold_expired"),
            EventAction::Recovered => write!(f, "recovered"),
            EventAction::Fault => write!(f, "fault"),
            EventAction::ReleaseSkipped => write!(f, "release_skipped"),
        }
    }
}

/// A single trace record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Scheduler time when the event occurred.
    pub ts: Millis,

    /// The transition that happened.
    pub action: EventAction,

    /// Scenario label of the request involved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Lock name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Lock id, rendered as text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock_id: Option<String>,

    /// Freeform details object with action-specific information.
    #[serde(default)]
    pub details: Value,
}

impl Event {
    /// Create a new event at time `ts`.
    pub fn new(action: EventAction, ts: Millis) -> Self {
        Self {
            ts,
            action,
            label: None,
            name: None,
            lock_id: None,
            details: Value::Object(serde_json::Map::new()),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_lock(mut self, id: LockId) -> Self {
        self.lock_id = Some(id.to_string());
        self
    }

    /// Set the details object for this event.
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    /// Serialize the event to a single-line JSON string.
    pub fn to_ndjson_line(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| {
            CooplockError::UserError(format!("failed to serialize event to JSON: {}", e))
        })
    }
}

/// Shared, append-only list of events.
///
/// Cloning yields another handle to the same list, so callbacks can each
/// carry one.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Rc<RefCell<Vec<Event>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, event: Event) {
        tracing::trace!(action = %event.action, ts = event.ts, "event recorded");
        self.events.borrow_mut().push(event);
    }

    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }

    /// Copy of every event recorded so far.
    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    pub fn count(&self, action: EventAction) -> usize {
        self.events
            .borrow()
            .iter()
            .filter(|e| e.action == action)
            .count()
    }
}

/// Write events as NDJSON, one line each.
pub fn write_ndjson<W: Write>(mut writer: W, events: &[Event]) -> Result<()> {
    for event in events {
        let line = event.to_ndjson_line()?;
        writeln!(writer, "{}", line)
            .map_err(|e| CooplockError::UserError(format!("failed to write event: {}", e)))?;
    }
    Ok(())
}
