//! Packet types exchanged over a worker connection (spec §6).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::WorkerFailure;

/// One byte on the wire, see the packet-type table in spec §6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketType {
    /// child → parent: a fresh per-connection random salt.
    AuthSalt = 1,
    /// child → parent: `H(salt ‖ cookie)`.
    AuthDigest = 2,
    /// parent → child: handshake accepted.
    AuthOk = 3,
    /// child → parent: the identity handed to it on stdin.
    Identity = 4,
    /// parent → child: `(func, args, kwargs)`.
    Request = 5,
    /// child → parent: a call's return value.
    Result = 6,
    /// either direction: a structured failure.
    Exception = 7,
}

impl PacketType {
    /// Decode a wire byte, rejecting anything not in the table above.
    pub fn from_u8(byte: u8) -> Option<Self> {
        Some(match byte {
            1 => Self::AuthSalt,
            2 => Self::AuthDigest,
            3 => Self::AuthOk,
            4 => Self::Identity,
            5 => Self::Request,
            6 => Self::Result,
            7 => Self::Exception,
            _ => return None,
        })
    }
}

/// A decoded packet: its type plus the still-encoded payload bytes.
///
/// Callers decode the payload themselves once they know, from the type,
/// which concrete shape to expect — mirrors the source's
/// `PacketTypes(packet_type), data = await receive()` pairing.
#[derive(Debug, Clone)]
pub struct Packet {
    pub packet_type: PacketType,
    pub payload: Vec<u8>,
}

/// Payload of a `REQUEST` packet: a named callable plus its arguments.
///
/// The Design Notes recommend a registry of named callables for systems
/// languages rather than transmitting functions by value; unknown names are
/// a protocol error, not a silent no-op.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestPayload {
    pub func: String,
    pub args: Vec<serde_json::Value>,
    pub kwargs: BTreeMap<String, serde_json::Value>,
}

/// Payload of a `RESULT` packet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultPayload(pub serde_json::Value);

/// Payload of an `EXCEPTION` packet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExceptionPayload(pub WorkerFailure);
