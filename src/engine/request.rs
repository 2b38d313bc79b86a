//! Lock requests and the callbacks they carry.

use crate::error::WaitTimeoutError;
use crate::scheduler::{Millis, TimerId};
use crate::store::LockId;
use std::fmt;

/// Called once when a request becomes the holder of its lock.
pub type GrantFn = Box<dyn FnOnce(LockId) -> anyhow::Result<()>>;

/// Called once when a request gives up waiting.
pub type WaitTimeoutFn = Box<dyn FnOnce(WaitTimeoutError) -> anyhow::Result<()>>;

/// Called once when a hold is revoked after its maximum duration.
pub type HoldExpiredFn = Box<dyn FnOnce() -> anyhow::Result<()>>;

/// A request for exclusive access to a named lock.
///
/// ```
/// use cooplock::engine::LockRequest;
///
/// let request = LockRequest::new("printer", |id| {
///     println!("holding {}", id);
///     Ok(())
/// })
/// .wait_timeout(1500)
/// .on_wait_timeout(|err| {
///     println!("{}", err);
///     Ok(())
/// })
/// .hold_for(1000);
/// assert_eq!(request.name(), "printer");
/// ```
pub struct LockRequest {
    pub(super) name: String,
    pub(super) on_grant: GrantFn,
    pub(super) wait_timeout: Option<Millis>,
    pub(super) on_wait_timeout: Option<WaitTimeoutFn>,
    pub(super) hold_for: Option<Millis>,
    pub(super) on_hold_expired: Option<HoldExpiredFn>,
}

impl LockRequest {
    /// Request `name`, waiting as long as it takes.
    pub fn new(
        name: impl Into<String>,
        on_grant: impl FnOnce(LockId) -> anyhow::Result<()> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            on_grant: Box::new(on_grant),
            wait_timeout: None,
            on_wait_timeout: None,
            hold_for: None,
            on_hold_expired: None,
        }
    }

    /// Give up if not granted within `ms` milliseconds.
    pub fn wait_timeout(mut self, ms: Millis) -> Self {
        self.wait_timeout = Some(ms);
        self
    }

    pub fn on_wait_timeout(
        mut self,
        callback: impl FnOnce(WaitTimeoutError) -> anyhow::Result<()> + 'static,
    ) -> Self {
        self.on_wait_timeout = Some(Box::new(callback));
        self
    }

    /// Release automatically `ms` milliseconds after the grant.
    pub fn hold_for(mut self, ms: Millis) -> Self {
        self.hold_for = Some(ms);
        self
    }

    pub fn on_hold_expired(
        mut self,
        callback: impl FnOnce() -> anyhow::Result<()> + 'static,
    ) -> Self {
        self.on_hold_expired = Some(Box::new(callback));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for LockRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockRequest")
            .field("name", &self.name)
            .field("wait_timeout", &self.wait_timeout)
            .field("hold_for", &self.hold_for)
            .finish_non_exhaustive()
    }
}

/// Engine-side state carried by each record: the callbacks still owed and
/// the scheduler tasks armed on its behalf.
#[derive(Default)]
pub(super) struct Hooks {
    pub(super) on_grant: Option<GrantFn>,
    pub(super) on_wait_timeout: Option<WaitTimeoutFn>,
    pub(super) on_hold_expired: Option<HoldExpiredFn>,
    pub(super) grant_task: Option<TimerId>,
    pub(super) wait_timer: Option<TimerId>,
    pub(super) hold_timer: Option<TimerId>,
}

impl Hooks {
    pub(super) fn timers(&self) -> impl Iterator<Item = TimerId> {
        [self.grant_task, self.wait_timer, self.hold_timer]
            .into_iter()
            .flatten()
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("grant_task", &self.grant_task)
            .field("wait_timer", &self.wait_timer)
            .field("hold_timer", &self.hold_timer)
            .finish_non_exhaustive()
    }
}
