//! Shared bookkeeping (spec §3: pending table, fleet set, futures registry,
//! task-store registry) plus the [`OnceSender`] primitive they're built on.
//!
//! Each map has exactly one insertion site and one removal site (spec §5);
//! see `SPEC_FULL.md` §5 for why these are `Arc<parking_lot::Mutex<_>>`
//! rather than confined to a single task the way the source confines them
//! to a single event loop.

use parking_lot::Mutex;
use protocol::auth::Identity;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::oneshot;

use crate::child::SharedChild;
use crate::error::PoolError;

/// A `oneshot::Sender` that can be resolved at most once, with later
/// attempts silently becoming no-ops instead of panicking.
///
/// Shared by reference between whichever side resolves it first: the
/// worker-handler task on normal completion, or `close()` rejecting every
/// still-outstanding entry. Whichever calls [`OnceSender::resolve`] first
/// wins; the loser's value is simply dropped.
pub struct OnceSender<T>(Mutex<Option<oneshot::Sender<T>>>);

impl<T> OnceSender<T> {
    pub fn new(sender: oneshot::Sender<T>) -> Self {
        Self(Mutex::new(Some(sender)))
    }

    /// Resolve with `value`, if nobody has resolved this yet.
    pub fn resolve(&self, value: T) {
        if let Some(sender) = self.0.lock().take() {
            let _ = sender.send(value);
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.0.lock().is_none()
    }
}

/// One submitted task's outstanding state, shared between [`crate::submit`]
/// and whichever worker-handler task ends up servicing it.
pub struct TaskDescriptor {
    pub func: String,
    pub args: Vec<serde_json::Value>,
    pub kwargs: std::collections::BTreeMap<String, serde_json::Value>,
    /// Set once a handler claims this task and assigns it a child. A plain
    /// mutex rather than a `OnceSender`: `Submission`'s `Drop` impl needs to
    /// read it synchronously to decide whether there's a child to kill.
    pub process: Arc<Mutex<Option<SharedChild>>>,
    /// Resolved once with the task's outcome, by the handler on completion
    /// or by `close()` on rejection.
    pub result: Arc<OnceSender<Result<serde_json::Value, PoolError>>>,
}

/// The pool's shared, cross-task bookkeeping.
///
/// Maps are keyed by [`Identity`] (pending/fleet) or task id (futures); each
/// is mutated under its own short-lived lock, never across an `.await`.
#[derive(Default)]
pub struct Bookkeeping {
    /// Children that have been spawned and bootstrapped but whose handshake
    /// hasn't completed yet. Inserted by the supervisor on spawn, removed
    /// either by the auth driver on handshake success (promoted to
    /// `fleet`) or by the supervisor on an exit-poll observing death.
    pending: Mutex<HashMap<Identity, SharedChild>>,

    /// Children with a live, authenticated connection owned by a
    /// worker-handler task. Inserted by the auth driver, removed by the
    /// handler on disconnect or the supervisor on exit-poll death.
    fleet: Mutex<HashMap<Identity, SharedChild>>,

    /// Outstanding task futures, keyed by a monotonically increasing task
    /// id. Inserted by `submit`, removed once its `result` `OnceSender`
    /// resolves (by whichever side resolves it).
    futures: Mutex<HashMap<u64, Arc<TaskDescriptor>>>,

    next_task_id: Mutex<u64>,
}

impl Bookkeeping {
    pub fn insert_pending(&self, identity: Identity, child: SharedChild) {
        self.pending.lock().insert(identity, child);
    }

    pub fn remove_pending(&self, identity: &Identity) -> Option<SharedChild> {
        self.pending.lock().remove(identity)
    }

    pub fn promote_to_fleet(&self, identity: Identity, child: SharedChild) {
        self.fleet.lock().insert(identity, child);
    }

    pub fn remove_from_fleet(&self, identity: &Identity) -> Option<SharedChild> {
        self.fleet.lock().remove(identity)
    }

    /// All children currently tracked, pending or fleeted, for the
    /// supervisor's exit-poll sweep.
    pub fn all_children(&self) -> Vec<SharedChild> {
        let pending = self.pending.lock();
        let fleet = self.fleet.lock();
        pending.values().chain(fleet.values()).cloned().collect()
    }

    pub fn fleet_size(&self) -> usize {
        self.fleet.lock().len()
    }

    pub fn pending_size(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn next_task_id(&self) -> u64 {
        let mut id = self.next_task_id.lock();
        *id += 1;
        *id
    }

    pub fn insert_task(&self, id: u64, task: Arc<TaskDescriptor>) {
        self.futures.lock().insert(id, task);
    }

    pub fn remove_task(&self, id: u64) -> Option<Arc<TaskDescriptor>> {
        self.futures.lock().remove(&id)
    }

    /// Drain every outstanding task, for `close()` to reject (spec §4.7).
    /// Uses `std::mem::take` so the map is empty before any rejection is
    /// attempted — a panic mid-rejection can't leave a task half-drained.
    pub fn drain_tasks(&self) -> Vec<Arc<TaskDescriptor>> {
        std::mem::take(&mut *self.futures.lock())
            .into_values()
            .collect()
    }
}
