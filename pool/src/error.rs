//! Error taxonomy (spec §7), as a typed enum surfaced to callers of
//! [`crate::Pool::submit`].

use protocol::WorkerFailure;

/// Everything that can fail a submitted task or the pool itself.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PoolError {
    /// Digest mismatch or unknown identity during the handshake. Only ever
    /// surfaces on the connection that failed it, never to a caller's task
    /// (the child is simply respawned).
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The connection closed mid-protocol; the child process is assumed to
    /// have died. Carries its exit code when one could be observed.
    #[error("worker process exited unexpectedly (code {code:?}): {description}")]
    ProcessExit {
        description: String,
        code: Option<i32>,
    },

    /// An unexpected packet type or malformed frame.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The future was still outstanding when `close()` ran.
    #[error("pool closed")]
    PoolClosed,

    /// The submission was cancelled by the caller (its future was dropped
    /// before it resolved).
    #[error("submission cancelled")]
    Cancelled,

    /// The callable itself raised inside the child.
    #[error("worker raised: {0}")]
    Worker(#[from] WorkerFailure),
}
