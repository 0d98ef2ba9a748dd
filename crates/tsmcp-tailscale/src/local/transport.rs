//! Platform transports to `tailscaled`.
//!
//! `tailscaled` listens on a Unix domain socket on Linux and macOS and on a
//! named pipe on Windows. [`LocalTransport`] hides the difference from
//! [`LocalClient`](super::LocalClient).

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};

use tokio::io::{AsyncRead, AsyncWrite};

/// Default socket path on Linux.
#[cfg(target_os = "linux")]
pub const DEFAULT_SOCKET_PATH: &str = "/var/run/tailscale/tailscaled.sock";

/// Default socket path on macOS.
#[cfg(target_os = "macos")]
pub const DEFAULT_SOCKET_PATH: &str = "/var/run/tailscaled.socket";

/// Default socket path for other Unix platforms.
#[cfg(all(unix, not(any(target_os = "linux", target_os = "macos"))))]
pub const DEFAULT_SOCKET_PATH: &str = "/var/run/tailscale/tailscaled.sock";

/// Default named pipe on Windows. Only administrators may open it.
#[cfg(windows)]
pub const DEFAULT_PIPE_NAME: &str = r"\\.\pipe\ProtectedPrefix\Administrators\Tailscale\tailscaled";

/// A byte stream connection to the local daemon.
pub trait LocalTransport: Send + Sync {
    /// Stream type produced by [`connect`](Self::connect).
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Open a new connection.
    fn connect(&self) -> impl Future<Output = io::Result<Self::Stream>> + Send;

    /// Socket path or pipe name, for diagnostics.
    fn endpoint(&self) -> &Path;
}

/// Unix domain socket transport.
#[cfg(unix)]
#[derive(Debug, Clone)]
pub struct UnixSocketTransport {
    path: PathBuf,
}

#[cfg(unix)]
impl UnixSocketTransport {
    /// Transport for the given socket path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[cfg(unix)]
impl Default for UnixSocketTransport {
    fn default() -> Self {
        Self::new(DEFAULT_SOCKET_PATH)
    }
}

#[cfg(unix)]
impl LocalTransport for UnixSocketTransport {
    type Stream = tokio::net::UnixStream;

    async fn connect(&self) -> io::Result<Self::Stream> {
        tokio::net::UnixStream::connect(&self.path).await
    }

    fn endpoint(&self) -> &Path {
        &self.path
    }
}

/// Windows named pipe transport.
#[cfg(windows)]
#[derive(Debug, Clone)]
pub struct NamedPipeTransport {
    name: PathBuf,
}

#[cfg(windows)]
impl NamedPipeTransport {
    /// Transport for the given pipe name.
    #[must_use]
    pub fn new(name: impl Into<PathBuf>) -> Self {
        Self { name: name.into() }
    }
}

#[cfg(windows)]
impl Default for NamedPipeTransport {
    fn default() -> Self {
        Self::new(DEFAULT_PIPE_NAME)
    }
}

#[cfg(windows)]
impl LocalTransport for NamedPipeTransport {
    type Stream = tokio::net::windows::named_pipe::NamedPipeClient;

    async fn connect(&self) -> io::Result<Self::Stream> {
        use std::time::Duration;
        use tokio::net::windows::named_pipe::ClientOptions;

        // ERROR_PIPE_BUSY: every server instance is taken. The caller's
        // connect timeout bounds this loop.
        const ERROR_PIPE_BUSY: i32 = 231;

        loop {
            match ClientOptions::new().open(&self.name) {
                Ok(client) => return Ok(client),
                Err(e) if e.raw_os_error() == Some(ERROR_PIPE_BUSY) => {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn endpoint(&self) -> &Path {
        &self.name
    }
}

/// Transport used when no other is specified.
#[cfg(unix)]
pub type DefaultTransport = UnixSocketTransport;

/// Transport used when no other is specified.
#[cfg(windows)]
pub type DefaultTransport = NamedPipeTransport;

/// Default transport pointed at `endpoint` instead of the platform default.
#[cfg(any(unix, windows))]
#[must_use]
pub fn default_transport_at(endpoint: impl Into<PathBuf>) -> DefaultTransport {
    DefaultTransport::new(endpoint)
}
