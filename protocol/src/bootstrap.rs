//! The bootstrap payload handed to a child on its standard input (spec §6,
//! "Bootstrap channel"): `(address, cookie, identity)`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::frame::{decode, encode, FrameError};

/// Where the listener is reachable (spec §3 "Address").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Address {
    /// A filesystem local-domain socket path, mode `0600`.
    Unix(PathBuf),
    /// A loopback `(host, port)` pair, used where local-domain sockets
    /// aren't available.
    Tcp(String, u16),
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Address::Unix(path) => write!(f, "unix:{}", path.display()),
            Address::Tcp(host, port) => write!(f, "tcp:{host}:{port}"),
        }
    }
}

/// The triple written to a freshly spawned child's stdin, then the stdin
/// handle is closed (spec §4.2 step 3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapPayload {
    pub address: Address,
    pub cookie: Vec<u8>,
    pub identity: String,
}

impl BootstrapPayload {
    /// Encode for writing to a child's stdin.
    pub fn encode(&self) -> Result<Vec<u8>, FrameError> {
        encode(self)
    }

    /// Decode what a child reads from its stdin.
    pub fn decode(bytes: &[u8]) -> Result<Self, FrameError> {
        decode(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn round_trips_unix_address() {
        let payload = BootstrapPayload {
            address: Address::Unix(PathBuf::from("/tmp/worker-abc.sock")),
            cookie: vec![1, 2, 3, 4],
            identity: "deadbeef".into(),
        };
        let bytes = payload.encode().unwrap();
        let back = BootstrapPayload::decode(&bytes).unwrap();
        assert_eq!(back.address, payload.address);
        assert_eq!(back.identity, "deadbeef");
    }

    #[test]
    fn round_trips_tcp_address() {
        let payload = BootstrapPayload {
            address: Address::Tcp("127.0.0.1".into(), 4242),
            cookie: vec![9; 32],
            identity: "cafef00d".into(),
        };
        let bytes = payload.encode().unwrap();
        let back = BootstrapPayload::decode(&bytes).unwrap();
        assert_eq!(back.address, Address::Tcp("127.0.0.1".into(), 4242));
    }
}
