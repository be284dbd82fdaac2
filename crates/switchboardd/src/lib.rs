//! RPC bridge daemon for the switchboard command engine.
//!
//! The daemon loads its configuration through [`switchboard_config`], builds
//! a session from an optional JSON manifest, and serves the public commands
//! of a [`switchboard::Engine`] over a Unix or TCP socket using one JSONL
//! request per connection.
//!
//! The engine is not thread-safe, so it lives on a single reactor thread.
//! Connection threads parse requests and hand them to the reactor, which
//! runs them one at a time. Only commands registered as public reach the
//! bridge's method table; everything else answers `unknown method`.

mod bootstrap;
mod bridge;
pub mod dispatch;
mod health;
mod reactor;
mod runtime;
mod shutdown;
pub mod telemetry;
pub mod transport;

pub use bootstrap::{
    BootstrapError, ConfigLoader, Daemon, StaticConfigLoader, SystemConfigLoader, bootstrap_with,
    load_session,
};
pub use bridge::{MethodInfo, MethodTable};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use reactor::{
    LIST_METHODS, METHOD_HELP, METHOD_SIGNATURE, Reactor, ReactorError, ReactorHandle,
    ReactorThread,
};
pub use runtime::{RunError, RunningDaemon, run_daemon, run_daemon_with};
pub use shutdown::{ShutdownError, ShutdownSignal, SystemShutdownSignal};
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
