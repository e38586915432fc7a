//! Wire framing: `Header ‖ Payload`, as specified in spec §6.
//!
//! The header is fixed-layout: one byte `packet_type`, four bytes
//! `payload_length` in big-endian. Readers read exactly `HEADER_SIZE` bytes,
//! then exactly `payload_length` bytes, then decode — never a partial read,
//! matching the source's `reader.readexactly(...)` pairing.

use serde::{de::DeserializeOwned, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::packet::{Packet, PacketType};

/// Fixed header size in bytes: one packet-type byte + four length bytes.
pub const HEADER_SIZE: usize = 5;

/// Payloads above this many bytes are rejected before the length-prefixed
/// read, so a corrupt or hostile length field can't force an unbounded
/// allocation.
pub const MAX_PAYLOAD: u32 = 64 * 1024 * 1024;

/// Anything framing can read from and write to: a real `UnixStream` or
/// `TcpStream` accepted by the listener.
pub trait Channel: AsyncRead + AsyncWrite + Unpin + Send {}
impl<T: AsyncRead + AsyncWrite + Unpin + Send> Channel for T {}

/// Errors from framing a packet on or off the wire.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("connection closed")]
    Eof,
    #[error("payload of {0} bytes exceeds the {MAX_PAYLOAD} byte limit")]
    TooLarge(u32),
    #[error("unknown packet type byte {0}")]
    UnknownPacketType(u8),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("encoding error: {0}")]
    Encoding(#[from] bincode::Error),
}

/// Read exactly one packet off `channel`.
///
/// An EOF on the very first header byte is reported as [`FrameError::Eof`]
/// so callers can distinguish "peer hung up between messages" (expected,
/// e.g. on worker crash) from a frame that was cut off mid-payload (a real
/// `Io` error).
pub async fn read_packet<C: Channel>(channel: &mut C) -> Result<Packet, FrameError> {
    let mut header = [0u8; HEADER_SIZE];
    if let Err(err) = channel.read_exact(&mut header).await {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            return Err(FrameError::Eof);
        }
        return Err(FrameError::Io(err));
    }

    let packet_type =
        PacketType::from_u8(header[0]).ok_or(FrameError::UnknownPacketType(header[0]))?;
    let payload_length = u32::from_be_bytes([header[1], header[2], header[3], header[4]]);
    if payload_length > MAX_PAYLOAD {
        return Err(FrameError::TooLarge(payload_length));
    }

    let mut payload = vec![0u8; payload_length as usize];
    channel.read_exact(&mut payload).await?;

    Ok(Packet {
        packet_type,
        payload,
    })
}

/// Write one packet to `channel`, flushing afterwards.
pub async fn write_packet<C: Channel>(
    channel: &mut C,
    packet_type: PacketType,
    payload: &[u8],
) -> Result<(), FrameError> {
    if payload.len() > MAX_PAYLOAD as usize {
        return Err(FrameError::TooLarge(payload.len() as u32));
    }

    let mut header = [0u8; HEADER_SIZE];
    header[0] = packet_type as u8;
    header[1..5].copy_from_slice(&(payload.len() as u32).to_be_bytes());

    channel.write_all(&header).await?;
    channel.write_all(payload).await?;
    channel.flush().await?;
    Ok(())
}

/// Encode a payload value the way every packet payload is encoded on the
/// wire (spec §6: "a binary-encoded value whose concrete encoding is a
/// project-wide constant").
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, FrameError> {
    Ok(bincode::serialize(value)?)
}

/// Decode a payload value previously produced by [`encode`].
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, FrameError> {
    Ok(bincode::deserialize(bytes)?)
}

/// Send a packet whose payload is a typed value, encoding it first.
pub async fn send<C: Channel, T: Serialize>(
    channel: &mut C,
    packet_type: PacketType,
    value: &T,
) -> Result<(), FrameError> {
    let payload = encode(value)?;
    write_packet(channel, packet_type, &payload).await
}

/// Receive one packet and decode its payload as `T`, checking the packet
/// type matches `expected` first.
pub async fn recv_expect<C: Channel, T: DeserializeOwned>(
    channel: &mut C,
    expected: PacketType,
) -> Result<T, FrameError> {
    let packet = read_packet(channel).await?;
    if packet.packet_type != expected {
        return Err(FrameError::UnknownPacketType(packet.packet_type as u8));
    }
    decode(&packet.payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::RequestPayload;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn round_trips_a_request_payload() {
        let (mut a, mut b) = tokio::io::duplex(4096);

        let req = RequestPayload {
            func: "add".into(),
            args: vec![serde_json::json!(2), serde_json::json!(3)],
            kwargs: BTreeMap::new(),
        };

        send(&mut a, PacketType::Request, &req).await.unwrap();
        let got: RequestPayload = recv_expect(&mut b, PacketType::Request).await.unwrap();

        assert_eq!(got.func, "add");
        assert_eq!(got.args, req.args);
    }

    #[tokio::test]
    async fn reports_eof_cleanly_between_messages() {
        let (a, mut b) = tokio::io::duplex(4096);
        drop(a);

        let err = read_packet(&mut b).await.unwrap_err();
        assert!(matches!(err, FrameError::Eof));
    }

    #[tokio::test]
    async fn rejects_unknown_packet_type() {
        let (mut a, mut b) = tokio::io::duplex(4096);
        let mut header = [0u8; HEADER_SIZE];
        header[0] = 0xFF;
        tokio::io::AsyncWriteExt::write_all(&mut a, &header)
            .await
            .unwrap();

        let err = read_packet(&mut b).await.unwrap_err();
        assert!(matches!(err, FrameError::UnknownPacketType(0xFF)));
    }
}
