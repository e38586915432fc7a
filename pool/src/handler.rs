//! Worker handler (spec §4.5): one task per accepted connection, pulling
//! tasks off the shared queue and round-tripping them with its child.

use protocol::packet::{ExceptionPayload, RequestPayload, ResultPayload};
use protocol::{Cookie, PacketType};
use std::sync::Arc;
use std::time::Duration;

use crate::auth;
use crate::child::ChildState;
use crate::error::PoolError;
use crate::queue::TaskReceiver;
use crate::registry::Bookkeeping;

/// Run the full lifetime of one accepted connection: authenticate, bind to
/// its pending child, then service tasks until the connection drops.
pub async fn run(
    mut channel: Box<dyn protocol::frame::Channel>,
    cookie: Cookie,
    bookkeeping: Arc<Bookkeeping>,
    queue: TaskReceiver,
    poll_interval: Duration,
) {
    let identity = match auth::authenticate(&mut channel, &cookie).await {
        Ok(identity) => identity,
        Err(err) => {
            log::warn!("handshake failed: {err}");
            return;
        }
    };

    let child = match bookkeeping.remove_pending(&identity) {
        Some(child) => child,
        None => {
            log::warn!("authenticated connection for unknown identity {identity}");
            return;
        }
    };
    child.set_state(ChildState::Connected);
    bookkeeping.promote_to_fleet(identity.clone(), child.clone());
    log::debug!("worker {identity} connected");

    loop {
        let task = {
            let mut rx = queue.lock().await;
            match rx.recv().await {
                Some(task) => task,
                None => break,
            }
        };

        // The caller may have dropped its `Submission` already; a resolved
        // `process` sender here means nobody is waiting for this slot.
        if task.result.is_resolved() {
            continue;
        }
        *task.process.lock() = Some(child.clone());

        let request = RequestPayload {
            func: task.func.clone(),
            args: task.args.clone(),
            kwargs: task.kwargs.clone(),
        };
        if let Err(err) = protocol::frame::send(&mut channel, PacketType::Request, &request).await
        {
            task.result
                .resolve(Err(PoolError::Protocol(err.to_string())));
            break;
        }

        match protocol::frame::read_packet(&mut channel).await {
            Ok(packet) => match packet.packet_type {
                PacketType::Result => match protocol::frame::decode::<ResultPayload>(&packet.payload) {
                    Ok(ResultPayload(value)) => task.result.resolve(Ok(value)),
                    Err(err) => task
                        .result
                        .resolve(Err(PoolError::Protocol(err.to_string()))),
                },
                PacketType::Exception => {
                    match protocol::frame::decode::<ExceptionPayload>(&packet.payload) {
                        Ok(ExceptionPayload(failure)) => {
                            task.result.resolve(Err(PoolError::Worker(failure)))
                        }
                        Err(err) => task
                            .result
                            .resolve(Err(PoolError::Protocol(err.to_string()))),
                    }
                }
                other => {
                    task.result.resolve(Err(PoolError::Protocol(format!(
                        "unexpected packet type {:?} as a task reply",
                        other
                    ))));
                }
            },
            Err(err) => {
                let code = child.wait_for_exit(poll_interval).await;
                task.result.resolve(Err(PoolError::ProcessExit {
                    description: err.to_string(),
                    code,
                }));
                break;
            }
        }
    }

    log::debug!("worker {identity} disconnected");
    bookkeeping.remove_from_fleet(&identity);
}
