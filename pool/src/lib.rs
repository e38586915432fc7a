//! Process-based worker pool supervisor.
//!
//! The core of this crate — and the hardest engineering in this repository
//! — is [`Pool`]: it listens for worker connections, authenticates them,
//! keeps a configured number of child processes alive, and hands submitted
//! tasks to whichever worker-handler task is free.

pub mod auth;
pub mod child;
pub mod config;
pub mod error;
pub mod handler;
pub mod lifecycle;
pub mod listener;
pub mod queue;
pub mod registry;
pub mod submit;
pub mod supervisor;

use std::collections::BTreeMap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use protocol::Address;
use tokio::task::JoinHandle;

pub use crate::config::{PoolConfig, PoolConfigOptions, WorkerCommand};
pub use crate::error::PoolError;
pub use crate::submit::Submission;

use crate::queue::TaskSender;
use crate::registry::Bookkeeping;

/// A running worker pool. Construct with [`Pool::start`] or, for
/// guaranteed cleanup, [`Pool::scoped`]; submit work with [`Pool::submit`].
pub struct Pool {
    config: PoolConfig,
    address: Address,
    bookkeeping: Arc<Bookkeeping>,
    queue_tx: TaskSender,
    closing: AtomicBool,
    background: parking_lot::Mutex<Vec<JoinHandle<()>>>,
}

impl Pool {
    /// Submit a named call with positional and keyword arguments, returning
    /// a future that resolves with its result or rejects with the reason it
    /// didn't run to completion (spec §4.6).
    pub async fn submit(
        &self,
        func: impl Into<String>,
        args: Vec<serde_json::Value>,
        kwargs: BTreeMap<String, serde_json::Value>,
    ) -> Submission {
        submit::submit(&self.bookkeeping, &self.queue_tx, func, args, kwargs).await
    }

    /// Submit a call with positional arguments only.
    pub async fn submit_args(
        &self,
        func: impl Into<String>,
        args: Vec<serde_json::Value>,
    ) -> Submission {
        self.submit(func, args, BTreeMap::new()).await
    }

    /// Number of children currently authenticated and servicing requests.
    pub fn fleet_size(&self) -> usize {
        self.bookkeeping.fleet_size()
    }

    /// The address workers connect back to, mostly useful for tests that
    /// want to drive a connection manually.
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// The configuration this pool was started with.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }
}
