//! Minimal usage demo: start a pool, submit a few calls to the reference
//! worker's `add` callable, print the results.
//!
//! Run with the worker binary on `PATH`, or point `WORKER_BIN` at it:
//! `WORKER_BIN=target/debug/worker cargo run -p pool --example add_numbers`

use commons::Fallible;
use pool::{Pool, PoolConfig, WorkerCommand};

#[tokio::main]
async fn main() -> Fallible<()> {
    env_logger::Builder::from_default_env().init();

    let worker_bin = std::env::var("WORKER_BIN").unwrap_or_else(|_| "worker".to_string());
    let command = WorkerCommand::new(worker_bin);
    let config = PoolConfig {
        workers: 2,
        ..Default::default()
    };

    Pool::scoped(config, command, |pool| async move {
        for (a, b) in [(1, 2), (10, 20), (100, 200)] {
            let result = pool
                .submit_args("add", vec![serde_json::json!(a), serde_json::json!(b)])
                .await
                .await?;
            println!("{a} + {b} = {result}");
        }
        Ok(())
    })
    .await
}
