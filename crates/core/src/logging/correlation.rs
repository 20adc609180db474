//! Correlation IDs and the execution-scoped slot that carries them
//!
//! Every request task gets its own slot through a tokio task-local, so two
//! requests multiplexed over the same worker thread never observe each
//! other's ID, even across `.await` points. Code running outside any tokio
//! runtime (plain threads, synchronous startup code) falls back to a
//! thread-local slot. Inside a runtime there is no such fallback: a worker
//! thread is shared by every task it polls, so writes made outside a
//! [`scope`] are dropped and reads see no ID.

use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Sentinel rendered in place of a correlation ID when none is bound
pub const ABSENT: &str = "-";

/// An opaque correlation token
///
/// The value is carried verbatim and never parsed.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CorrelationId(Arc<str>);

impl CorrelationId {
    /// Generate a fresh random correlation ID (UUID v4)
    pub fn new() -> Self {
        Self(Arc::from(uuid::Uuid::new_v4().to_string()))
    }

    /// Accept an inbound header value; empty or blank values are treated as absent
    pub fn from_header(value: &str) -> Option<Self> {
        if value.trim().is_empty() {
            None
        } else {
            Some(Self(Arc::from(value)))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CorrelationId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CorrelationId {
    fn from(value: &str) -> Self {
        Self(Arc::from(value))
    }
}

impl From<String> for CorrelationId {
    fn from(value: String) -> Self {
        Self(Arc::from(value))
    }
}

impl FromStr for CorrelationId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl Serialize for CorrelationId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for CorrelationId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::from)
    }
}

tokio::task_local! {
    static TASK_SLOT: RefCell<Option<CorrelationId>>;
}

thread_local! {
    static THREAD_SLOT: RefCell<Option<CorrelationId>> = const { RefCell::new(None) };
}

/// Which slot a value was written into
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Slot {
    Task,
    Thread,
    /// Inside a runtime but outside any task scope; nothing was written
    Unscoped,
}

fn in_runtime() -> bool {
    tokio::runtime::Handle::try_current().is_ok()
}

fn write_slot(value: Option<CorrelationId>) -> (Slot, Option<CorrelationId>) {
    match TASK_SLOT.try_with(|slot| slot.replace(value.clone())) {
        Ok(previous) => (Slot::Task, previous),
        Err(_) if in_runtime() => {
            if value.is_some() {
                tracing::warn!(
                    "correlation ID set outside a correlation scope inside the runtime; ignored"
                );
            }
            (Slot::Unscoped, None)
        }
        Err(_) => (
            Slot::Thread,
            THREAD_SLOT.with(|slot| slot.replace(value)),
        ),
    }
}

/// Bind `value` (or a freshly generated ID) to the current execution scope
///
/// Inside a tokio runtime this only takes effect within [`scope`],
/// [`inherit`] or [`sync_scope`]; elsewhere in the runtime it is a logged
/// no-op. The ID is returned either way.
pub fn set(value: Option<CorrelationId>) -> CorrelationId {
    let id = value.unwrap_or_default();
    write_slot(Some(id.clone()));
    id
}

/// Read the correlation ID bound to the current execution scope
pub fn get() -> Option<CorrelationId> {
    match TASK_SLOT.try_with(|slot| slot.borrow().clone()) {
        Ok(value) => value,
        Err(_) if in_runtime() => None,
        Err(_) => THREAD_SLOT.with(|slot| slot.borrow().clone()),
    }
}

/// Reset the current execution scope to "no correlation ID"
pub fn clear() {
    write_slot(None);
}

/// Run `future` with its own empty slot
///
/// Values set inside the future are dropped with it, and nothing set
/// outside is visible inside.
pub async fn scope<F>(future: F) -> F::Output
where
    F: Future,
{
    TASK_SLOT.scope(RefCell::new(None), future).await
}

/// Run `future` in a fresh slot seeded with the caller's current ID
///
/// Use this for child tasks spawned on behalf of a request.
pub fn inherit<F>(future: F) -> impl Future<Output = F::Output>
where
    F: Future,
{
    TASK_SLOT.scope(RefCell::new(get()), future)
}

/// Synchronous counterpart of [`scope`]
pub fn sync_scope<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    TASK_SLOT.sync_scope(RefCell::new(None), f)
}

/// RAII guard for binding a correlation ID in a scope
///
/// Dropping the guard restores whatever was bound before, on every exit
/// path including unwinding and future cancellation.
pub struct CorrelationScope {
    slot: Slot,
    previous: Option<CorrelationId>,
}

impl CorrelationScope {
    pub fn new(id: CorrelationId) -> Self {
        let (slot, previous) = write_slot(Some(id));
        Self { slot, previous }
    }
}

impl Drop for CorrelationScope {
    fn drop(&mut self) {
        let previous = self.previous.take();
        match self.slot {
            // The task scope may already be gone; then there is nothing left to reset.
            Slot::Task => {
                let _ = TASK_SLOT.try_with(|slot| slot.replace(previous));
            }
            Slot::Thread => THREAD_SLOT.with(|slot| {
                slot.replace(previous);
            }),
            Slot::Unscoped => {}
        }
    }
}
