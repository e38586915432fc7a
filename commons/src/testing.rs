//! Test helpers.

use crate::Fallible;

/// Initialize logging for tests, ignoring a second call.
pub fn init_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default())
        .is_test(true)
        .try_init();
}

/// Build a current-thread tokio runtime for tests, with logging.
pub fn init_runtime() -> Fallible<tokio::runtime::Runtime> {
    init_logger();
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(anyhow::Error::from)
}
