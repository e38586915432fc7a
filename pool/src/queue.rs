//! The task queue (spec §4.4): an mpsc channel of [`TaskDescriptor`]s, with
//! a shared receiver so every worker-handler task can pull from the same
//! queue.

use std::sync::Arc;
use tokio::sync::{mpsc, Mutex as AsyncMutex};

use crate::registry::TaskDescriptor;

/// Sending half, cloned into every caller's [`crate::submit::Submission`].
pub type TaskSender = mpsc::Sender<Arc<TaskDescriptor>>;

/// Receiving half, shared across worker-handler tasks behind an async
/// mutex: each handler locks, pulls exactly one descriptor, then unlocks,
/// so a descriptor is handed to exactly one handler (spec §5).
pub type TaskReceiver = Arc<AsyncMutex<mpsc::Receiver<Arc<TaskDescriptor>>>>;

/// Build a task queue sized `max(1, max_overflow)` (spec §4.4: Tokio's mpsc
/// has no true zero-capacity/rendezvous mode, so `max_overflow == 0` is
/// modeled as capacity 1, preserving the `workers + max_overflow` in-flight
/// bound).
pub fn build(max_overflow: usize) -> (TaskSender, TaskReceiver) {
    let capacity = max_overflow.max(1);
    let (tx, rx) = mpsc::channel(capacity);
    (tx, Arc::new(AsyncMutex::new(rx)))
}
