//! Starting, running and stopping the daemon.

use std::net::SocketAddr;
use std::sync::Arc;

use switchboard_config::SocketEndpoint;
use thiserror::Error;
use tracing::info;

use crate::bootstrap::{BootstrapError, ConfigLoader, Daemon, SystemConfigLoader, bootstrap_with};
use crate::dispatch::RpcConnectionHandler;
use crate::health::{HealthReporter, StructuredHealthReporter};
use crate::reactor::{Reactor, ReactorError, ReactorThread};
use crate::shutdown::{ShutdownError, ShutdownSignal, SystemShutdownSignal};
use crate::transport::{ListenerError, ListenerHandle, SocketListener};

const RUNTIME_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::runtime");

/// Errors that end the daemon.
#[derive(Debug, Error)]
pub enum RunError {
    /// Bootstrap failed.
    #[error("daemon bootstrap failed: {0}")]
    Bootstrap(#[from] BootstrapError),
    /// The reactor failed to start or stop.
    #[error(transparent)]
    Reactor(#[from] ReactorError),
    /// The listener failed to bind, start or stop.
    #[error(transparent)]
    Listener(#[from] ListenerError),
    /// Waiting for the shutdown signal failed.
    #[error(transparent)]
    Shutdown(#[from] ShutdownError),
}

/// A daemon accepting connections.
pub struct RunningDaemon {
    endpoint: SocketEndpoint,
    listener: ListenerHandle,
    reactor: ReactorThread,
    reporter: Arc<dyn HealthReporter>,
}

impl Daemon {
    /// Starts the reactor and the listener.
    ///
    /// # Errors
    ///
    /// Fails when the command set does not register or the endpoint cannot
    /// be bound. A reactor that already started is stopped again.
    pub fn start(self) -> Result<RunningDaemon, RunError> {
        let (config, session, reporter) = self.into_parts();
        let (handle, reactor) = Reactor::spawn(session)?;

        let started = SocketListener::bind(config.rpc_socket()).and_then(|listener| {
            let endpoint = listener.endpoint();
            let handler = Arc::new(RpcConnectionHandler::new(handle));
            listener.start(handler).map(|listener| (endpoint, listener))
        });
        match started {
            Ok((endpoint, listener)) => {
                reporter.listener_ready(&endpoint);
                Ok(RunningDaemon {
                    endpoint,
                    listener,
                    reactor,
                    reporter,
                })
            }
            Err(error) => {
                reactor.join()?;
                Err(error.into())
            }
        }
    }
}

impl RunningDaemon {
    /// Endpoint clients connect to.
    #[must_use]
    pub const fn endpoint(&self) -> &SocketEndpoint {
        &self.endpoint
    }

    /// Local address when serving over TCP.
    #[must_use]
    pub const fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.local_addr()
    }

    /// Stops accepting, waits for in-flight connections and releases the
    /// command map. Returns how many commands were released.
    ///
    /// # Errors
    ///
    /// Fails when the accept loop or the reactor panicked.
    pub fn stop(self) -> Result<usize, RunError> {
        self.listener.join()?;
        let released = self.reactor.join()?;
        self.reporter.reactor_stopped(released);
        Ok(released)
    }
}

/// Runs the daemon until SIGTERM, SIGINT, SIGQUIT or SIGHUP.
///
/// # Errors
///
/// See [`run_daemon_with`].
pub fn run_daemon() -> Result<(), RunError> {
    run_daemon_with(
        &SystemConfigLoader,
        Arc::new(StructuredHealthReporter::new()),
        &SystemShutdownSignal,
    )
}

/// Runs the daemon with injected collaborators until `shutdown` returns.
///
/// # Errors
///
/// Fails when bootstrap or startup fails, when the shutdown signal cannot
/// be awaited, or when stopping fails.
pub fn run_daemon_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    shutdown: &dyn ShutdownSignal,
) -> Result<(), RunError> {
    let running = bootstrap_with(loader, reporter)?.start()?;
    let waited = shutdown.wait();
    info!(target: RUNTIME_TARGET, "shutting down");
    running.stop()?;
    waited?;
    Ok(())
}
