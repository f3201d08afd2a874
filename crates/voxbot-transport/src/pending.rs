//! [`PendingRequestTable`] – in-flight duplex requests keyed by correlation id.
//!
//! A caller registers a [`PendingSlot`] before its request is enqueued, then
//! waits on it.  The connection worker resolves slots as responses arrive.
//! Each entry is resolved at most once: resolution removes it from the table,
//! so a duplicate response for the same id finds nothing and is dropped.
//!
//! Dropping a [`PendingSlot`] removes its entry whether or not it was
//! resolved, which keeps the table bounded when callers time out.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::oneshot;
use voxbot_types::ActionResult;

/// One in-flight request.
#[derive(Debug)]
pub struct PendingRequest {
    pub created_at: Instant,
    resolution: oneshot::Sender<ActionResult>,
}

/// Correlation-id allocator plus the id → [`PendingRequest`] map.
///
/// Ids start at 1 and are never reused for the lifetime of the table.
#[derive(Debug)]
pub struct PendingRequestTable {
    next_id: AtomicU64,
    entries: DashMap<u64, PendingRequest>,
}

impl Default for PendingRequestTable {
    fn default() -> Self {
        Self::new()
    }
}

impl PendingRequestTable {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            entries: DashMap::new(),
        }
    }

    /// Allocate a fresh correlation id and register an entry for it.
    pub fn register(&self) -> PendingSlot<'_> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.entries.insert(
            id,
            PendingRequest {
                created_at: Instant::now(),
                resolution: tx,
            },
        );
        PendingSlot {
            table: self,
            id,
            receiver: rx,
        }
    }

    /// Resolve entry `id` with `result`.
    ///
    /// Returns `false` when no entry exists (unknown id, already resolved, or
    /// the caller has already given up).
    pub fn resolve(&self, id: u64, result: ActionResult) -> bool {
        match self.entries.remove(&id) {
            Some((_, pending)) => pending.resolution.send(result).is_ok(),
            None => false,
        }
    }

    /// Remove entry `id` without resolving it.
    pub fn remove(&self, id: u64) -> bool {
        self.entries.remove(&id).is_some()
    }

    pub fn contains(&self, id: u64) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Age of the oldest unresolved entry, if any.
    pub fn oldest_age(&self) -> Option<Duration> {
        self.entries
            .iter()
            .map(|entry| entry.value().created_at.elapsed())
            .max()
    }
}

/// A caller's handle on its [`PendingRequest`].  Removes the entry on drop.
#[derive(Debug)]
pub struct PendingSlot<'a> {
    table: &'a PendingRequestTable,
    id: u64,
    receiver: oneshot::Receiver<ActionResult>,
}

impl PendingSlot<'_> {
    /// The correlation id to put on the wire.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Wait up to `timeout` for the response.  `None` on timeout.
    pub async fn wait(mut self, timeout: Duration) -> Option<ActionResult> {
        match tokio::time::timeout(timeout, &mut self.receiver).await {
            Ok(Ok(result)) => Some(result),
            _ => None,
        }
    }
}

impl Drop for PendingSlot<'_> {
    fn drop(&mut self) {
        self.table.remove(self.id);
    }
}
