//! Layered configuration for the switchboard daemon.
//!
//! [`Config`] is loaded with `ortho_config`, which merges, from lowest to
//! highest precedence, the built-in defaults, a configuration file, the
//! `SWITCHBOARD_*` environment variables and command-line flags.

mod defaults;
mod logging;
mod socket;

use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::{OrthoConfig, OrthoError};
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_LOG_FILTER, DEFAULT_TCP_PORT, SOCKET_FILE_NAME, default_log_filter,
    default_log_filter_string, default_log_format, default_socket_endpoint,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use socket::{SocketEndpoint, SocketParseError, SocketPreparationError};

/// Daemon configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "SWITCHBOARD")]
pub struct Config {
    /// Endpoint the RPC bridge listens on.
    #[ortho_config(default = default_socket_endpoint())]
    pub rpc_socket: SocketEndpoint,
    /// `tracing-subscriber` filter directive.
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Log output format.
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
    /// JSON session manifest describing the downloads to serve.
    #[serde(default)]
    pub session_manifest: Option<Utf8PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc_socket: default_socket_endpoint(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            session_manifest: None,
        }
    }
}

impl Config {
    /// Loads the configuration from the process arguments and environment.
    ///
    /// # Errors
    ///
    /// Returns the aggregated `ortho_config` error when any layer is invalid.
    pub fn load_from_env() -> Result<Self, Arc<OrthoError>> {
        Self::load_from_iter(std::env::args_os())
    }

    /// Endpoint the RPC bridge listens on.
    #[must_use]
    pub const fn rpc_socket(&self) -> &SocketEndpoint {
        &self.rpc_socket
    }

    /// Filter directive for the log subscriber.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Session manifest path, when one is configured.
    #[must_use]
    pub fn session_manifest(&self) -> Option<&Utf8Path> {
        self.session_manifest.as_deref()
    }
}
