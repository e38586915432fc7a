//! Reference child worker (spec §1 supplement): implements exactly the
//! wire contract of spec §6 and nothing more, so the pool crate has a real
//! process to supervise in its own tests and examples.

mod registry;

use commons::Fallible;
use protocol::auth::{digest, Cookie, Salt};
use protocol::packet::{ExceptionPayload, RequestPayload, ResultPayload};
use protocol::{Address, BootstrapPayload, PacketType, WorkerFailure};
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
#[cfg(unix)]
use tokio::net::UnixStream;

#[tokio::main]
async fn main() -> Fallible<()> {
    env_logger::Builder::from_default_env().init();

    let bootstrap = read_bootstrap().await?;
    log::debug!("bootstrapped with identity {}", bootstrap.identity);

    match bootstrap.address.clone() {
        #[cfg(unix)]
        Address::Unix(path) => {
            let stream = UnixStream::connect(&path).await?;
            run(stream, bootstrap).await
        }
        Address::Tcp(host, port) => {
            let stream = TcpStream::connect((host.as_str(), port)).await?;
            run(stream, bootstrap).await
        }
        #[cfg(not(unix))]
        Address::Unix(_) => anyhow::bail!("unix sockets are not supported on this platform"),
    }
}

/// Read the bootstrap payload handed on stdin, then stdin is naturally
/// closed by the parent (spec §4.2 step 3); read-to-end picks up exactly
/// that one encoded value.
async fn read_bootstrap() -> Fallible<BootstrapPayload> {
    let mut buf = Vec::new();
    tokio::io::stdin().read_to_end(&mut buf).await?;
    Ok(BootstrapPayload::decode(&buf)?)
}

async fn run<C: protocol::frame::Channel>(mut channel: C, bootstrap: BootstrapPayload) -> Fallible<()> {
    let cookie = Cookie({
        let mut bytes = [0u8; protocol::auth::COOKIE_SIZE];
        bytes.copy_from_slice(&bootstrap.cookie);
        bytes
    });

    authenticate(&mut channel, &cookie, &bootstrap.identity).await?;
    log::info!("authenticated, servicing requests");

    loop {
        let packet = match protocol::frame::read_packet(&mut channel).await {
            Ok(packet) => packet,
            Err(protocol::frame::FrameError::Eof) => {
                log::debug!("parent closed the connection");
                break;
            }
            Err(err) => return Err(err.into()),
        };

        if packet.packet_type != PacketType::Request {
            log::warn!("unexpected packet type {:?}", packet.packet_type);
            continue;
        }

        let request: RequestPayload = protocol::frame::decode(&packet.payload)?;
        match registry::lookup(&request.func) {
            Some(callable) => match callable(request.args, request.kwargs) {
                Ok(value) => {
                    protocol::frame::send(&mut channel, PacketType::Result, &ResultPayload(value))
                        .await?;
                }
                Err(failure) => {
                    protocol::frame::send(
                        &mut channel,
                        PacketType::Exception,
                        &ExceptionPayload(failure),
                    )
                    .await?;
                }
            },
            None => {
                let failure = WorkerFailure::new(
                    "unknown_callable",
                    format!("no callable named {:?}", request.func),
                );
                protocol::frame::send(&mut channel, PacketType::Exception, &ExceptionPayload(failure))
                    .await?;
            }
        }
    }

    Ok(())
}

/// Child side of the handshake (spec §4.3): speak first with a fresh salt
/// and the digest it implies, wait for `AUTH_OK`, then echo the identity we
/// were handed on the bootstrap channel.
async fn authenticate<C: protocol::frame::Channel>(
    channel: &mut C,
    cookie: &Cookie,
    identity: &str,
) -> Fallible<()> {
    let salt = Salt::generate();
    let our_digest = digest(&salt.0, cookie.as_ref());

    protocol::frame::send(channel, PacketType::AuthSalt, &salt.0).await?;
    protocol::frame::send(channel, PacketType::AuthDigest, &our_digest).await?;

    let _ok: () = protocol::frame::recv_expect(channel, PacketType::AuthOk).await?;
    protocol::frame::send(channel, PacketType::Identity, &identity.to_string()).await?;

    Ok(())
}
