//! Binds the socket children connect back to (spec §4.1).

use protocol::Address;
use tokio::net::{TcpListener, UnixListener};

/// Either half of an accepted connection, type-erased behind
/// `protocol::frame::Channel`.
pub enum BoundListener {
    #[cfg(unix)]
    Unix {
        listener: UnixListener,
        path: std::path::PathBuf,
    },
    Tcp {
        listener: TcpListener,
    },
}

impl BoundListener {
    /// Bind a fresh `0600` unix-domain socket under the system temp dir.
    #[cfg(unix)]
    pub async fn bind() -> std::io::Result<Self> {
        Self::bind_in(&std::env::temp_dir()).await
    }

    /// Bind a fresh loopback TCP listener on an OS-assigned port.
    #[cfg(not(unix))]
    pub async fn bind() -> std::io::Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await?;
        Ok(Self::Tcp { listener })
    }

    /// Bind under a specific directory rather than the system temp dir,
    /// so tests can use an isolated scratch directory.
    #[cfg(unix)]
    pub async fn bind_in(dir: &std::path::Path) -> std::io::Result<Self> {
        use std::os::unix::fs::PermissionsExt;

        let name = format!("worker-pool-{}.sock", protocol::auth::Identity::generate());
        let path = dir.join(name);
        let listener = UnixListener::bind(&path)?;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))?;
        Ok(Self::Unix { listener, path })
    }

    /// The address to hand children on their bootstrap channel.
    pub fn address(&self) -> std::io::Result<Address> {
        match self {
            #[cfg(unix)]
            Self::Unix { path, .. } => Ok(Address::Unix(path.clone())),
            Self::Tcp { listener } => {
                let addr = listener.local_addr()?;
                Ok(Address::Tcp(addr.ip().to_string(), addr.port()))
            }
        }
    }

    /// Accept one connection, boxed behind `Channel` so callers don't care
    /// which transport is in use.
    pub async fn accept(&self) -> std::io::Result<Box<dyn protocol::frame::Channel>> {
        match self {
            #[cfg(unix)]
            Self::Unix { listener, .. } => {
                let (stream, _) = listener.accept().await?;
                Ok(Box::new(stream))
            }
            Self::Tcp { listener } => {
                let (stream, _) = listener.accept().await?;
                Ok(Box::new(stream))
            }
        }
    }
}

#[cfg(unix)]
impl Drop for BoundListener {
    fn drop(&mut self) {
        if let Self::Unix { path, .. } = self {
            let _ = std::fs::remove_file(path);
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    #[tokio::test]
    async fn binds_a_0600_socket_and_cleans_up_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = {
            let listener = BoundListener::bind_in(dir.path()).await.unwrap();
            let Address::Unix(path) = listener.address().unwrap() else {
                panic!("expected a unix address");
            };
            let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
            assert_eq!(mode, 0o600);
            path
        };
        assert!(!path.exists());
    }
}
