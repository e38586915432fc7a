//! Wire contract shared by the pool supervisor and the child worker.
//!
//! Kept as its own crate, the way `commons` is split out of
//! `cincinnati`/`graph-builder`, so that neither side of the process
//! boundary needs to depend on the other's crate, only on this one.

pub mod auth;
pub mod bootstrap;
pub mod error;
pub mod frame;
pub mod packet;

pub use crate::auth::{Cookie, Identity, Salt};
pub use crate::bootstrap::{Address, BootstrapPayload};
pub use crate::error::WorkerFailure;
pub use crate::frame::{read_packet, write_packet, Channel, FrameError};
pub use crate::packet::{Packet, PacketType};
