//! Errors raised while binding or running the listener.

use std::io;
use std::net::SocketAddr;

use camino::Utf8PathBuf;
use thiserror::Error;

/// Listener failures.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// Host name resolution failed.
    #[error("failed to resolve {host}:{port}: {source}")]
    Resolve {
        /// Configured host.
        host: String,
        /// Configured port.
        port: u16,
        /// Resolver error.
        #[source]
        source: io::Error,
    },
    /// The host resolved to nothing.
    #[error("{host}:{port} resolved to no addresses")]
    ResolveEmpty {
        /// Configured host.
        host: String,
        /// Configured port.
        port: u16,
    },
    /// Binding a TCP socket failed.
    #[error("failed to bind TCP listener at {addr}: {source}")]
    BindTcp {
        /// Address that could not be bound.
        addr: SocketAddr,
        /// OS error.
        #[source]
        source: io::Error,
    },
    /// Binding a Unix socket failed.
    #[error("failed to bind Unix listener at {path}: {source}")]
    BindUnix {
        /// Socket path.
        path: Utf8PathBuf,
        /// OS error.
        #[source]
        source: io::Error,
    },
    /// Unix sockets are not available on this platform.
    #[error("Unix sockets are unsupported here: {path}")]
    UnsupportedUnix {
        /// Socket path.
        path: Utf8PathBuf,
    },
    /// Another process is serving the socket path.
    #[error("socket {path} is already in use")]
    InUse {
        /// Socket path.
        path: Utf8PathBuf,
    },
    /// The socket path holds something other than a socket.
    #[error("{path} exists and is not a socket")]
    NotSocket {
        /// Socket path.
        path: Utf8PathBuf,
    },
    /// A stale socket file could not be inspected or removed.
    #[error("failed to clear stale socket {path}: {source}")]
    StaleSocket {
        /// Socket path.
        path: Utf8PathBuf,
        /// OS error.
        #[source]
        source: io::Error,
    },
    /// Switching the listener to non-blocking mode failed.
    #[error("failed to make listener non-blocking: {0}")]
    NonBlocking(#[source] io::Error),
    /// The accept thread could not be spawned.
    #[error("failed to spawn accept thread: {0}")]
    Spawn(#[source] io::Error),
    /// The accept thread panicked.
    #[error("accept thread panicked")]
    ThreadPanic,
}
