//! Lifecycle manager (spec §4.7): `Pool::start`, `Pool::close`, and the
//! scoped-use helper `Pool::scoped`.

use std::future::Future;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use commons::Fallible;
use protocol::Cookie;

use crate::config::{PoolConfig, WorkerCommand};
use crate::listener::BoundListener;
use crate::queue;
use crate::registry::Bookkeeping;
use crate::supervisor;
use crate::Pool;

impl Pool {
    /// Bind the listener, spawn the accept loop and the exit-poll loop, and
    /// bring the fleet up to `config.workers` children (spec §4.7 "start").
    pub async fn start(config: PoolConfig, command: WorkerCommand) -> Fallible<Self> {
        let listener = BoundListener::bind().await?;
        let address = listener.address()?;
        let cookie = Cookie::generate();
        let bookkeeping = Arc::new(Bookkeeping::default());
        let (queue_tx, queue_rx) = queue::build(config.max_overflow);

        supervisor::top_up(&bookkeeping, &command, &address, &cookie, config.workers).await?;

        let accept_task = {
            let bookkeeping = bookkeeping.clone();
            let queue_rx = queue_rx.clone();
            let cookie = cookie.clone();
            let poll_interval = config.poll_interval;
            tokio::spawn(async move {
                loop {
                    match listener.accept().await {
                        Ok(channel) => {
                            let bookkeeping = bookkeeping.clone();
                            let queue_rx = queue_rx.clone();
                            let cookie = cookie.clone();
                            tokio::spawn(async move {
                                crate::handler::run(
                                    channel,
                                    cookie,
                                    bookkeeping,
                                    queue_rx,
                                    poll_interval,
                                )
                                .await;
                            });
                        }
                        Err(err) => {
                            log::error!("accept failed: {err}");
                            break;
                        }
                    }
                }
            })
        };

        let poll_task = {
            let bookkeeping = bookkeeping.clone();
            let command = command.clone();
            let address = address.clone();
            let cookie = cookie.clone();
            let poll_interval = config.poll_interval;
            let target = config.workers;
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(poll_interval);
                loop {
                    ticker.tick().await;
                    let exited = supervisor::reap_exited(&bookkeeping);
                    for identity in &exited {
                        log::warn!("worker {identity} exited, respawning");
                    }
                    if !exited.is_empty() {
                        if let Err(err) =
                            supervisor::top_up(&bookkeeping, &command, &address, &cookie, target)
                                .await
                        {
                            log::error!("failed to respawn worker: {err}");
                        }
                    }
                }
            })
        };

        Ok(Self {
            config,
            address,
            bookkeeping,
            queue_tx,
            closing: std::sync::atomic::AtomicBool::new(false),
            background: parking_lot::Mutex::new(vec![accept_task, poll_task]),
        })
    }

    /// Stop accepting new work, kill every tracked child, and reject every
    /// still-outstanding submission with [`crate::error::PoolError::PoolClosed`]
    /// (spec §4.7 "close").
    pub async fn close(&self) {
        self.close_sync();
    }

    /// The actual body of `close`: every step here is a plain, non-blocking
    /// operation (lock, abort, resolve, `start_kill`), so it runs equally
    /// well from the async `close` entrypoint or from a synchronous `Drop`
    /// during a panic unwind in [`Pool::scoped`].
    fn close_sync(&self) {
        if self.closing.swap(true, Ordering::SeqCst) {
            return;
        }

        for task in self.background.lock().drain(..) {
            task.abort();
        }

        for task in self.bookkeeping.drain_tasks() {
            task.result
                .resolve(Err(crate::error::PoolError::PoolClosed));
        }

        for child in self.bookkeeping.all_children() {
            if let Err(err) = child.kill_if_alive() {
                log::warn!("failed to kill {} during close: {err}", child.identity);
            }
        }
    }

    /// Scoped-use form (spec §4.7, the async equivalent of
    /// `__aenter__`/`__aexit__`): start, run `body`, then close on every
    /// exit path — success, error, or panic. A `Drop` guard holds the
    /// closing, since `body`'s future can unwind past a plain sequential
    /// `close().await` call and skip it entirely; `close_sync` has no
    /// `.await` points, so the guard can run it directly without needing a
    /// runtime handle inside `Drop`.
    pub async fn scoped<F, Fut, T>(config: PoolConfig, command: WorkerCommand, body: F) -> Fallible<T>
    where
        F: FnOnce(Arc<Pool>) -> Fut,
        Fut: Future<Output = Fallible<T>>,
    {
        struct CloseOnDrop(Arc<Pool>);
        impl Drop for CloseOnDrop {
            fn drop(&mut self) {
                self.0.close_sync();
            }
        }

        let pool = Arc::new(Self::start(config, command).await?);
        let _guard = CloseOnDrop(pool.clone());
        body(pool).await
    }
}
