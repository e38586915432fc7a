//! Submission API (spec §4.6): `Pool::submit` and the `Submission` future
//! it returns.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

use crate::error::PoolError;
use crate::queue::TaskSender;
use crate::registry::{Bookkeeping, TaskDescriptor};

/// A future representing one in-flight task.
///
/// Dropping it before it resolves *is* cancellation (spec §4.6): there is
/// no separate cancel call, mirroring the convention `tokio::task::
/// JoinHandle` and friends already use. If a child had already been
/// assigned to this task by the time of the drop, that child is killed; if
/// not, the task descriptor is simply left for another handler to pick up
/// later (it still sits in `futures`, though nothing will ever poll this
/// particular future for its result again).
pub struct Submission {
    task_id: u64,
    bookkeeping: Arc<Bookkeeping>,
    process: Arc<Mutex<Option<crate::child::SharedChild>>>,
    receiver: oneshot::Receiver<Result<serde_json::Value, PoolError>>,
    completed: bool,
}

impl Future for Submission {
    type Output = Result<serde_json::Value, PoolError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Ready(result) => {
                self.completed = true;
                Poll::Ready(result.unwrap_or(Err(PoolError::PoolClosed)))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for Submission {
    fn drop(&mut self) {
        self.bookkeeping.remove_task(self.task_id);
        // Only a cancellation (dropped before the result arrived) kills the
        // assigned worker; a `Submission` that already resolved has nothing
        // left to cancel, successful or not.
        if self.completed {
            return;
        }
        if let Some(child) = self.process.lock().take() {
            if let Err(err) = child.kill_if_alive() {
                log::warn!("failed to kill cancelled task's worker: {err}");
            }
        }
    }
}

/// Submit a named call to the pool (spec §4.6). `func` must be a name the
/// connected workers recognize; argument values are opaque JSON as far as
/// the pool is concerned.
///
/// Awaits until the task queue has room (spec §4.4's bounded backpressure:
/// at most `workers + max_overflow` tasks in flight), the same way the
/// source blocks on `asyncio.Queue.put`.
pub async fn submit(
    bookkeeping: &Arc<Bookkeeping>,
    queue: &TaskSender,
    func: impl Into<String>,
    args: Vec<serde_json::Value>,
    kwargs: BTreeMap<String, serde_json::Value>,
) -> Submission {
    let (result_tx, result_rx) = oneshot::channel();
    let process = Arc::new(Mutex::new(None));
    let task = Arc::new(TaskDescriptor {
        func: func.into(),
        args,
        kwargs,
        process: process.clone(),
        result: Arc::new(crate::registry::OnceSender::new(result_tx)),
    });

    let task_id = bookkeeping.next_task_id();
    bookkeeping.insert_task(task_id, task.clone());

    if queue.send(task.clone()).await.is_err() {
        bookkeeping.remove_task(task_id);
        task.result.resolve(Err(PoolError::PoolClosed));
        log::warn!("task queue closed; pool is shutting down");
    }

    Submission {
        task_id,
        bookkeeping: bookkeeping.clone(),
        process,
        receiver: result_rx,
        completed: false,
    }
}
