//! Process supervisor (spec §4.2): spawns children up to the configured
//! fleet size, hands each its bootstrap payload, and reaps+respawns any
//! that exit.

use protocol::auth::Identity;
use protocol::{BootstrapPayload, Cookie};
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::child::{ChildSlot, ChildState, SharedChild};
use crate::config::WorkerCommand;
use crate::registry::Bookkeeping;

/// Spawn one child, write its bootstrap payload to stdin, then close stdin
/// (spec §4.2 steps 1-3).
pub async fn spawn_one(
    command: &WorkerCommand,
    address: &protocol::Address,
    cookie: &Cookie,
) -> std::io::Result<SharedChild> {
    let identity = Identity::generate();

    let process = Command::new(&command.program)
        .args(&command.args)
        .stdin(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    let slot = Arc::new(ChildSlot::new(identity.clone(), process));
    let payload = BootstrapPayload {
        address: address.clone(),
        cookie: cookie.as_ref().to_vec(),
        identity: identity.0.clone(),
    };

    if let Some(mut stdin) = slot.take_stdin() {
        let encoded = payload
            .encode()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        stdin.write_all(&encoded).await?;
        stdin.shutdown().await?;
    }

    Ok(slot)
}

/// Top up the fleet (pending + connected) to `target` by spawning fresh
/// children for the shortfall.
pub async fn top_up(
    bookkeeping: &Bookkeeping,
    command: &WorkerCommand,
    address: &protocol::Address,
    cookie: &Cookie,
    target: usize,
) -> std::io::Result<()> {
    let have = bookkeeping.pending_size() + bookkeeping.fleet_size();
    for _ in have..target {
        let child = spawn_one(command, address, cookie).await?;
        bookkeeping.insert_pending(child.identity.clone(), child);
    }
    Ok(())
}

/// One sweep of the exit-poll loop (spec §4.2: `try_wait` mirrors
/// `Popen.poll()`). Returns the identities observed to have exited so the
/// caller can log and top the fleet back up.
pub fn reap_exited(bookkeeping: &Bookkeeping) -> Vec<Identity> {
    let mut exited = Vec::new();
    for child in bookkeeping.all_children() {
        match child.try_wait() {
            Ok(Some(status)) => {
                child.set_state(ChildState::Exited {
                    code: status.code(),
                });
                bookkeeping.remove_pending(&child.identity);
                bookkeeping.remove_from_fleet(&child.identity);
                exited.push(child.identity.clone());
            }
            Ok(None) => {}
            Err(err) => {
                log::warn!("try_wait failed for {}: {err}", child.identity);
            }
        }
    }
    exited
}
