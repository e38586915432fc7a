//! Generic error plumbing shared across crates.

/// Catch-all result alias for code that only needs to propagate failures,
/// not match on them (mirrors the teacher's `failure::Fallible<T>`, updated
/// to the `anyhow` successor).
pub type Fallible<T> = anyhow::Result<T>;
