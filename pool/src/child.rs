//! A supervised child process and its observable state (spec §3 "Child
//! record").

use parking_lot::Mutex;
use protocol::auth::Identity;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Child;

/// Lifecycle state of a spawned child, as seen by the supervisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChildState {
    /// Spawned, bootstrap payload written, handshake not yet complete.
    Spawning,
    /// Handshake succeeded; a worker-handler task owns the connection.
    Connected,
    /// `try_wait` observed the process has exited.
    Exited { code: Option<i32> },
}

/// A child process slot, shared between the supervisor (which spawns and
/// reaps it) and whichever worker-handler task ends up owning its
/// connection.
pub struct ChildSlot {
    pub identity: Identity,
    process: Mutex<Child>,
    state: Mutex<ChildState>,
}

impl ChildSlot {
    pub fn new(identity: Identity, process: Child) -> Self {
        Self {
            identity,
            process: Mutex::new(process),
            state: Mutex::new(ChildState::Spawning),
        }
    }

    pub fn state(&self) -> ChildState {
        self.state.lock().clone()
    }

    pub fn set_state(&self, state: ChildState) {
        *self.state.lock() = state;
    }

    /// Non-blocking exit check (spec §4.2, mirrors `Popen.poll()`).
    pub fn try_wait(&self) -> std::io::Result<Option<std::process::ExitStatus>> {
        self.process.lock().try_wait()
    }

    /// Kill the process if it hasn't already exited. No-ops if `try_wait`
    /// shows it already reaped, avoiding an `InvalidInput` error on an
    /// already-exited child (spec §4.2 supplement).
    pub fn kill_if_alive(&self) -> std::io::Result<()> {
        let mut process = self.process.lock();
        if process.try_wait()?.is_some() {
            return Ok(());
        }
        process.start_kill()
    }

    /// Take the child's stdin for writing the bootstrap payload, if it
    /// hasn't already been taken.
    pub fn take_stdin(&self) -> Option<tokio::process::ChildStdin> {
        self.process.lock().stdin.take()
    }

    /// Wait for the process to actually exit, polling `try_wait` at
    /// `poll_interval` (spec §4.5: mirrors the source's
    /// `await self.__wait_process(process)`). A socket EOF can be observed
    /// before the OS has reaped the child, so callers that need the exit
    /// code alongside a disconnection should wait here rather than taking
    /// one immediate `try_wait` snapshot.
    pub async fn wait_for_exit(&self, poll_interval: Duration) -> Option<i32> {
        loop {
            if let Ok(Some(status)) = self.try_wait() {
                return status.code();
            }
            tokio::time::sleep(poll_interval).await;
        }
    }
}

/// Shared handle to a supervised child, cloneable across the pending table,
/// fleet set, and any task descriptor that ends up assigned to it.
pub type SharedChild = Arc<ChildSlot>;
