//! Socket transport for the RPC bridge.
//!
//! [`SocketListener`] binds the configured endpoint and hands every accepted
//! connection to a [`ConnectionHandler`] on its own thread.

mod errors;
mod listener;

use std::io::{self, Read, Write};
use std::net::TcpStream;
#[cfg(unix)]
use std::os::unix::net::UnixStream;

pub use self::errors::ListenerError;
pub use self::listener::{ListenerHandle, SocketListener};

const LISTENER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");

/// An accepted connection.
#[derive(Debug)]
pub enum ConnectionStream {
    /// TCP peer.
    Tcp(TcpStream),
    /// Unix domain socket peer.
    #[cfg(unix)]
    Unix(UnixStream),
}

impl ConnectionStream {
    fn inner(&mut self) -> &mut dyn ReadWrite {
        match self {
            Self::Tcp(stream) => stream,
            #[cfg(unix)]
            Self::Unix(stream) => stream,
        }
    }
}

trait ReadWrite: Read + Write {}

impl<T: Read + Write> ReadWrite for T {}

impl Read for ConnectionStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner().read(buf)
    }
}

impl Write for ConnectionStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner().flush()
    }
}

/// Serves one accepted connection.
pub trait ConnectionHandler: Send + Sync + 'static {
    /// Handles `stream` to completion. Must not panic.
    fn handle(&self, stream: ConnectionStream);
}
