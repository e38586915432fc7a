//! Parent-side handshake driver (spec §4.3).
//!
//! The child speaks first: it sends a salt it generated, then the digest
//! `H(salt ‖ cookie)` computed from the cookie it was handed on its
//! bootstrap channel. The parent recomputes the same digest from its own
//! cookie and compares in constant time. Only on success does it learn
//! which pending child this connection belongs to, via the identity the
//! child echoes back.
//!
//! A failed handshake never reaches `pool::submit` callers directly (spec
//! §7): a digest mismatch gets an `EXCEPTION` packet carrying the
//! authentication failure before the connection is dropped (spec §4.3 step
//! 3), so a rogue peer sees why it was rejected instead of a bare EOF while
//! still waiting on `AUTH_OK`. Either way it's logged and dropped on this
//! side; the supervisor's exit-poll loop will notice the child process
//! didn't transition to `Connected` and reap/respawn it as usual.

use protocol::auth::{ct_eq, digest, Identity};
use protocol::frame::Channel;
use protocol::{Cookie, PacketType, WorkerFailure};

use crate::error::PoolError;

/// Drive the parent side of the handshake to completion, returning the
/// identity the child claims once authenticated.
pub async fn authenticate<C: Channel>(channel: &mut C, cookie: &Cookie) -> Result<Identity, PoolError> {
    let salt: Vec<u8> = protocol::frame::recv_expect(channel, PacketType::AuthSalt)
        .await
        .map_err(|e| PoolError::Protocol(e.to_string()))?;
    let their_digest: Vec<u8> = protocol::frame::recv_expect(channel, PacketType::AuthDigest)
        .await
        .map_err(|e| PoolError::Protocol(e.to_string()))?;

    let expected = digest(&salt, cookie.as_ref());
    if !ct_eq(&expected, &their_digest) {
        let failure = WorkerFailure::authentication("cookie digest mismatch");
        let _ = protocol::frame::send(
            channel,
            PacketType::Exception,
            &protocol::packet::ExceptionPayload(failure.clone()),
        )
        .await;
        return Err(PoolError::Authentication(failure.message));
    }

    protocol::frame::send(channel, PacketType::AuthOk, &())
        .await
        .map_err(|e| PoolError::Protocol(e.to_string()))?;

    let identity: String = protocol::frame::recv_expect(channel, PacketType::Identity)
        .await
        .map_err(|e| PoolError::Protocol(e.to_string()))?;

    Ok(Identity(identity))
}
