//! Binding endpoints and running the accept loop.

use std::io;
use std::net::{SocketAddr, TcpListener, ToSocketAddrs};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use switchboard_config::SocketEndpoint;
use tracing::{debug, info, warn};

use super::{ConnectionHandler, ConnectionStream, LISTENER_TARGET, ListenerError};

#[cfg(unix)]
use camino::Utf8Path;
#[cfg(unix)]
use std::fs;
#[cfg(unix)]
use std::os::unix::fs::FileTypeExt;
#[cfg(unix)]
use std::os::unix::net::{UnixListener, UnixStream};

const IDLE_POLL: Duration = Duration::from_millis(20);
const ERROR_BACKOFF: Duration = Duration::from_millis(200);
/// Clients that stay silent this long are dropped so shutdown can finish.
const CLIENT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// A bound but not yet accepting socket.
#[derive(Debug)]
pub struct SocketListener {
    endpoint: SocketEndpoint,
    socket: BoundSocket,
}

#[derive(Debug)]
enum BoundSocket {
    Tcp(TcpListener),
    #[cfg(unix)]
    Unix(UnixListener),
}

impl BoundSocket {
    fn set_nonblocking(&self) -> io::Result<()> {
        match self {
            Self::Tcp(listener) => listener.set_nonblocking(true),
            #[cfg(unix)]
            Self::Unix(listener) => listener.set_nonblocking(true),
        }
    }

    /// Accepts a pending connection, if any, switched back to blocking
    /// reads.
    fn accept(&self) -> io::Result<Option<ConnectionStream>> {
        let accepted = match self {
            Self::Tcp(listener) => listener.accept().and_then(|(stream, _)| {
                stream.set_nonblocking(false)?;
                stream.set_read_timeout(Some(CLIENT_READ_TIMEOUT))?;
                Ok(ConnectionStream::Tcp(stream))
            }),
            #[cfg(unix)]
            Self::Unix(listener) => listener.accept().and_then(|(stream, _)| {
                stream.set_nonblocking(false)?;
                stream.set_read_timeout(Some(CLIENT_READ_TIMEOUT))?;
                Ok(ConnectionStream::Unix(stream))
            }),
        };
        match accepted {
            Ok(stream) => Ok(Some(stream)),
            Err(error) if error.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(error) => Err(error),
        }
    }
}

impl SocketListener {
    /// Binds `endpoint`. A stale Unix socket left by a dead process is
    /// replaced; a live one is an error.
    ///
    /// # Errors
    ///
    /// Fails when the endpoint cannot be resolved or bound.
    pub fn bind(endpoint: &SocketEndpoint) -> Result<Self, ListenerError> {
        let socket = match endpoint {
            SocketEndpoint::Tcp { host, port } => BoundSocket::Tcp(bind_tcp(host, *port)?),
            #[cfg(unix)]
            SocketEndpoint::Unix { path } => BoundSocket::Unix(bind_unix(path)?),
            #[cfg(not(unix))]
            SocketEndpoint::Unix { path } => {
                return Err(ListenerError::UnsupportedUnix { path: path.clone() });
            }
        };
        Ok(Self {
            endpoint: endpoint.clone(),
            socket,
        })
    }

    /// The endpoint actually bound; TCP port zero is replaced by the port
    /// the OS picked.
    #[must_use]
    pub fn endpoint(&self) -> SocketEndpoint {
        match (&self.endpoint, self.local_addr()) {
            (SocketEndpoint::Tcp { host, .. }, Some(addr)) => SocketEndpoint::tcp(host.clone(), addr.port()),
            (endpoint, _) => endpoint.clone(),
        }
    }

    /// Local address of a TCP listener.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match &self.socket {
            BoundSocket::Tcp(listener) => listener.local_addr().ok(),
            #[cfg(unix)]
            BoundSocket::Unix(_) => None,
        }
    }

    /// Starts the accept loop on a background thread.
    ///
    /// # Errors
    ///
    /// Fails when the socket cannot be made non-blocking or the thread
    /// cannot be spawned. The Unix socket file is removed in both cases.
    pub fn start(self, handler: Arc<dyn ConnectionHandler>) -> Result<ListenerHandle, ListenerError> {
        if let Err(source) = self.socket.set_nonblocking() {
            self.remove_socket_file();
            return Err(ListenerError::NonBlocking(source));
        }
        let local_addr = self.local_addr();
        let endpoint = self.endpoint.clone();
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        thread::Builder::new()
            .name("switchboard-accept".to_owned())
            .spawn(move || self.accept_until(&stop_flag, &handler))
            .map(|thread| ListenerHandle {
                stop,
                local_addr,
                thread: Some(thread),
            })
            .map_err(|source| {
                remove_socket_file(&endpoint);
                ListenerError::Spawn(source)
            })
    }

    fn accept_until(&self, stop: &AtomicBool, handler: &Arc<dyn ConnectionHandler>) {
        info!(target: LISTENER_TARGET, endpoint = %self.endpoint, "listening");
        let mut last_error = None::<io::ErrorKind>;
        while !stop.load(Ordering::SeqCst) {
            match self.socket.accept() {
                Ok(Some(stream)) => {
                    last_error = None;
                    spawn_connection(stream, Arc::clone(handler));
                }
                Ok(None) => thread::sleep(IDLE_POLL),
                Err(error) => {
                    if last_error != Some(error.kind()) {
                        warn!(target: LISTENER_TARGET, error = %error, "accept failed");
                    }
                    last_error = Some(error.kind());
                    thread::sleep(ERROR_BACKOFF);
                }
            }
        }
        self.remove_socket_file();
        info!(target: LISTENER_TARGET, endpoint = %self.endpoint, "listener stopped");
    }

    fn remove_socket_file(&self) {
        remove_socket_file(&self.endpoint);
    }
}

fn spawn_connection(stream: ConnectionStream, handler: Arc<dyn ConnectionHandler>) {
    let spawned = thread::Builder::new()
        .name("switchboard-conn".to_owned())
        .spawn(move || handler.handle(stream));
    if let Err(error) = spawned {
        warn!(target: LISTENER_TARGET, error = %error, "dropping connection: cannot spawn thread");
    }
}

/// Handle to a running accept loop. Dropping it stops the loop without
/// waiting.
#[derive(Debug)]
pub struct ListenerHandle {
    stop: Arc<AtomicBool>,
    local_addr: Option<SocketAddr>,
    thread: Option<JoinHandle<()>>,
}

impl ListenerHandle {
    /// Asks the accept loop to stop.
    pub fn shutdown(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Local address of a TCP listener.
    #[must_use]
    pub const fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Stops the accept loop and waits for it to finish.
    ///
    /// Connections already accepted run to completion on their own threads.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError::ThreadPanic`] when the loop panicked.
    pub fn join(mut self) -> Result<(), ListenerError> {
        self.shutdown();
        match self.thread.take() {
            Some(thread) => thread.join().map_err(|_| ListenerError::ThreadPanic),
            None => Ok(()),
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn bind_tcp(host: &str, port: u16) -> Result<TcpListener, ListenerError> {
    let addr = (host, port)
        .to_socket_addrs()
        .map_err(|source| ListenerError::Resolve {
            host: host.to_owned(),
            port,
            source,
        })?
        .next()
        .ok_or_else(|| ListenerError::ResolveEmpty {
            host: host.to_owned(),
            port,
        })?;
    TcpListener::bind(addr).map_err(|source| ListenerError::BindTcp { addr, source })
}

#[cfg(unix)]
fn bind_unix(path: &Utf8Path) -> Result<UnixListener, ListenerError> {
    match fs::symlink_metadata(path) {
        Ok(metadata) if !metadata.file_type().is_socket() => {
            return Err(ListenerError::NotSocket {
                path: path.to_path_buf(),
            });
        }
        Ok(_) => clear_stale_socket(path)?,
        Err(error) if error.kind() == io::ErrorKind::NotFound => {}
        Err(source) => {
            return Err(ListenerError::StaleSocket {
                path: path.to_path_buf(),
                source,
            });
        }
    }
    UnixListener::bind(path).map_err(|source| ListenerError::BindUnix {
        path: path.to_path_buf(),
        source,
    })
}

/// Removes a socket file nobody is listening on.
#[cfg(unix)]
fn clear_stale_socket(path: &Utf8Path) -> Result<(), ListenerError> {
    match UnixStream::connect(path) {
        Ok(_) => Err(ListenerError::InUse {
            path: path.to_path_buf(),
        }),
        Err(error)
            if matches!(
                error.kind(),
                io::ErrorKind::ConnectionRefused | io::ErrorKind::NotFound
            ) =>
        {
            debug!(target: LISTENER_TARGET, path = %path, "removing stale socket");
            fs::remove_file(path).map_err(|source| ListenerError::StaleSocket {
                path: path.to_path_buf(),
                source,
            })
        }
        Err(source) => Err(ListenerError::StaleSocket {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[cfg(unix)]
fn remove_socket_file(endpoint: &SocketEndpoint) {
    let Some(path) = endpoint.unix_path() else {
        return;
    };
    if let Err(error) = fs::remove_file(path)
        && error.kind() != io::ErrorKind::NotFound
    {
        warn!(target: LISTENER_TARGET, path = %path, error = %error, "failed to remove socket file");
    }
}

#[cfg(not(unix))]
const fn remove_socket_file(_endpoint: &SocketEndpoint) {}
