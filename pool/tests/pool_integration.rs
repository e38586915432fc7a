//! Integration tests driving the real reference worker binary (spec §8,
//! scenarios S1-S6).

use pool::{Pool, PoolConfig, WorkerCommand};
use pretty_assertions::assert_eq;
use std::time::Duration;

fn worker_command() -> WorkerCommand {
    WorkerCommand::new(worker_binary_path())
}

/// `worker` is a sibling package's binary, so Cargo doesn't expose it
/// through `CARGO_BIN_EXE_worker` to this package's own tests (that
/// variable only covers the current package's binary targets). Locate it
/// relative to the test binary itself instead: both land in the same
/// `target/<profile>/` directory.
fn worker_binary_path() -> std::path::PathBuf {
    let mut path = std::env::current_exe().expect("test executable path");
    path.pop(); // .../target/<profile>/deps/
    path.pop(); // .../target/<profile>/
    path.push(if cfg!(windows) { "worker.exe" } else { "worker" });
    path
}

/// Connect a raw, unauthenticated channel to `pool`'s listener, for tests
/// that drive the handshake by hand instead of going through the real
/// worker binary.
async fn connect_raw(pool: &Pool) -> Box<dyn protocol::frame::Channel> {
    match pool.address() {
        #[cfg(unix)]
        protocol::Address::Unix(path) => {
            Box::new(tokio::net::UnixStream::connect(path).await.unwrap())
        }
        protocol::Address::Tcp(host, port) => {
            Box::new(tokio::net::TcpStream::connect((host.as_str(), *port)).await.unwrap())
        }
        #[cfg(not(unix))]
        protocol::Address::Unix(_) => unreachable!("unix sockets are not supported on this platform"),
    }
}

/// S1: a submitted call to a known callable resolves with its result.
#[tokio::test]
async fn submit_resolves_with_result() {
    let config = PoolConfig {
        workers: 1,
        ..Default::default()
    };
    let pool = Pool::start(config, worker_command()).await.unwrap();

    let result = pool
        .submit_args("add", vec![serde_json::json!(2), serde_json::json!(3)])
        .await
        .await
        .unwrap();
    assert_eq!(result, serde_json::json!(5.0));

    pool.close().await;
}

/// Supplemental: an unknown callable name comes back as a structured worker
/// failure, not a protocol error.
#[tokio::test]
async fn unknown_callable_is_reported_as_worker_failure() {
    let config = PoolConfig {
        workers: 1,
        ..Default::default()
    };
    let pool = Pool::start(config, worker_command()).await.unwrap();

    let err = pool
        .submit_args("does_not_exist", vec![])
        .await
        .await
        .unwrap_err();
    match err {
        pool::PoolError::Worker(failure) => assert_eq!(failure.kind, "unknown_callable"),
        other => panic!("expected a worker failure, got {other:?}"),
    }

    pool.close().await;
}

/// S2 (worker failure): a callable raising inside the worker surfaces as a
/// worker failure with the matching kind and message; the pool keeps
/// serving further requests afterward.
#[tokio::test]
async fn callable_failure_is_reported() {
    let config = PoolConfig {
        workers: 1,
        ..Default::default()
    };
    let pool = Pool::start(config, worker_command()).await.unwrap();

    let err = pool
        .submit_args("fail", vec![serde_json::json!("boom")])
        .await
        .await
        .unwrap_err();
    match err {
        pool::PoolError::Worker(failure) => {
            assert_eq!(failure.kind, "value_error");
            assert_eq!(failure.message, "boom");
        }
        other => panic!("expected a worker failure, got {other:?}"),
    }

    pool.close().await;
}

/// Supplemental: multiple concurrently submitted tasks all complete,
/// serviced by a multi-worker fleet.
#[tokio::test]
async fn concurrent_submissions_all_complete() {
    let config = PoolConfig {
        workers: 3,
        max_overflow: 4,
        ..Default::default()
    };
    let pool = std::sync::Arc::new(Pool::start(config, worker_command()).await.unwrap());

    let mut handles = Vec::new();
    for i in 0..10 {
        let pool = pool.clone();
        handles.push(tokio::spawn(async move {
            pool.submit_args("add", vec![serde_json::json!(i), serde_json::json!(1)])
                .await
                .await
        }));
    }

    for (i, handle) in handles.into_iter().enumerate() {
        let result = handle.await.unwrap().unwrap();
        assert_eq!(result, serde_json::json!((i as f64) + 1.0));
    }

    pool.close().await;
}

/// S3 (worker crash): a callable that exits the child process abruptly
/// surfaces as a process-exit error carrying the child's exit code; the
/// fleet is restored to its configured size within a few `poll_interval`s.
#[tokio::test]
async fn crashed_worker_reports_process_exit_with_code() {
    let config = PoolConfig {
        workers: 1,
        poll_interval: Duration::from_millis(20),
        ..Default::default()
    };
    let pool = std::sync::Arc::new(Pool::start(config, worker_command()).await.unwrap());

    let err = pool.submit_args("crash", vec![]).await.await.unwrap_err();
    match err {
        pool::PoolError::ProcessExit { code, .. } => assert_eq!(code, Some(7)),
        other => panic!("expected a process-exit error, got {other:?}"),
    }

    let mut attempts = 0;
    while pool.fleet_size() == 0 && attempts < 100 {
        tokio::time::sleep(Duration::from_millis(20)).await;
        attempts += 1;
    }
    assert_eq!(pool.fleet_size(), 1);

    pool.close().await;
}

/// S4 (wrong cookie): a rogue client presenting the wrong cookie receives
/// an `EXCEPTION` packet right after `AUTH_DIGEST` — never a `REQUEST` —
/// and the connection is closed; pool state is unaffected.
#[tokio::test]
async fn wrong_cookie_is_rejected_with_an_exception() {
    let config = PoolConfig {
        workers: 1,
        ..Default::default()
    };
    let pool = Pool::start(config, worker_command()).await.unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    let fleet_before = pool.fleet_size();

    let mut channel = connect_raw(&pool).await;
    let wrong_cookie = protocol::auth::Cookie::generate();
    let salt = protocol::auth::Salt::generate();
    let our_digest = protocol::auth::digest(&salt.0, wrong_cookie.as_ref());

    protocol::frame::send(&mut channel, protocol::PacketType::AuthSalt, &salt.0)
        .await
        .unwrap();
    protocol::frame::send(&mut channel, protocol::PacketType::AuthDigest, &our_digest)
        .await
        .unwrap();

    let packet = protocol::frame::read_packet(&mut channel).await.unwrap();
    assert_eq!(packet.packet_type, protocol::PacketType::Exception);
    let protocol::packet::ExceptionPayload(failure) =
        protocol::frame::decode::<protocol::packet::ExceptionPayload>(&packet.payload).unwrap();
    assert_eq!(failure.kind, "authentication");

    let eof = protocol::frame::read_packet(&mut channel).await;
    assert!(matches!(eof, Err(protocol::frame::FrameError::Eof)));

    assert_eq!(pool.fleet_size(), fleet_before);

    pool.close().await;
}

/// S5: dropping a `Submission` before it resolves cancels it; a later
/// `close()` doesn't panic or hang on the already-abandoned task.
#[tokio::test]
async fn dropping_a_submission_cancels_it() {
    let config = PoolConfig {
        workers: 1,
        ..Default::default()
    };
    let pool = Pool::start(config, worker_command()).await.unwrap();

    {
        let submission = pool.submit_args("sleep_ms", vec![serde_json::json!(5000)]).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        drop(submission);
    }

    pool.close().await;
}

/// S6: `close()` rejects every still-outstanding submission with
/// `PoolClosed` rather than hanging forever.
#[tokio::test]
async fn close_rejects_outstanding_submissions() {
    let config = PoolConfig {
        workers: 1,
        ..Default::default()
    };
    let pool = std::sync::Arc::new(Pool::start(config, worker_command()).await.unwrap());

    let pending = pool
        .submit_args("sleep_ms", vec![serde_json::json!(60_000)])
        .await;

    let pool_for_close = pool.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        pool_for_close.close().await;
    });

    let err = pending.await.unwrap_err();
    assert!(matches!(err, pool::PoolError::PoolClosed));
}
