//! Daemon bootstrap: configuration, telemetry, socket directory and the
//! session the daemon serves.

use std::fs;
use std::io;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::OrthoError;
use switchboard::session::ManifestError;
use switchboard::{Session, SessionManifest};
use thiserror::Error;

use switchboard_config::{Config, SocketPreparationError};

use crate::health::HealthReporter;
use crate::telemetry::{self, TelemetryError, TelemetryHandle};

/// Source of the daemon configuration.
pub trait ConfigLoader: Send + Sync {
    /// Loads the configuration.
    ///
    /// # Errors
    ///
    /// Returns the aggregated loader error.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loads from the process arguments, environment and config file.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load_from_env()
    }
}

/// Hands out a fixed configuration.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps `config`.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry could not be installed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// The socket directory could not be prepared.
    #[error("failed to prepare RPC socket: {source}")]
    Socket {
        /// Filesystem error.
        #[source]
        source: SocketPreparationError,
    },
    /// The session manifest could not be read.
    #[error("failed to read session manifest '{path}': {source}")]
    ManifestRead {
        /// Manifest path.
        path: Utf8PathBuf,
        /// IO error.
        #[source]
        source: io::Error,
    },
    /// The session manifest is not valid JSON for a manifest.
    #[error("failed to parse session manifest '{path}': {source}")]
    ManifestParse {
        /// Manifest path.
        path: Utf8PathBuf,
        /// JSON error.
        #[source]
        source: serde_json::Error,
    },
    /// The manifest parsed but describes an invalid session.
    #[error("invalid session manifest '{path}': {source}")]
    Manifest {
        /// Manifest path.
        path: Utf8PathBuf,
        /// Validation error.
        #[source]
        source: ManifestError,
    },
}

/// A bootstrapped daemon, ready to start serving.
pub struct Daemon {
    config: Config,
    session: Session,
    telemetry: TelemetryHandle,
    reporter: Arc<dyn HealthReporter>,
}

impl Daemon {
    /// Resolved configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Session that will be served.
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Telemetry handle.
    #[must_use]
    pub const fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    pub(crate) fn into_parts(self) -> (Config, Session, Arc<dyn HealthReporter>) {
        (self.config, self.session, self.reporter)
    }
}

/// Bootstraps the daemon with the supplied collaborators.
///
/// # Errors
///
/// Fails at the first step that fails; `reporter` sees the error first.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
) -> Result<Daemon, BootstrapError> {
    reporter.bootstrap_starting();
    let report = |error: BootstrapError| {
        reporter.bootstrap_failed(&error);
        error
    };

    let config = loader
        .load()
        .map_err(|source| report(BootstrapError::Configuration { source }))?;
    let telemetry = telemetry::initialise(&config)
        .map_err(|source| report(BootstrapError::Telemetry { source }))?;
    config
        .rpc_socket()
        .prepare_filesystem()
        .map_err(|source| report(BootstrapError::Socket { source }))?;
    let session = load_session(config.session_manifest()).map_err(report)?;

    reporter.session_loaded(session.len());
    reporter.bootstrap_succeeded(&config);
    Ok(Daemon {
        config,
        session,
        telemetry,
        reporter,
    })
}

/// Builds the session described by the manifest at `path`, or an empty
/// session when no manifest is configured.
///
/// # Errors
///
/// Fails when the file cannot be read, is not a manifest or describes an
/// invalid session.
pub fn load_session(path: Option<&Utf8Path>) -> Result<Session, BootstrapError> {
    let Some(path) = path else {
        return Ok(Session::new());
    };
    let text = fs::read_to_string(path).map_err(|source| BootstrapError::ManifestRead {
        path: path.to_path_buf(),
        source,
    })?;
    let manifest: SessionManifest =
        serde_json::from_str(&text).map_err(|source| BootstrapError::ManifestParse {
            path: path.to_path_buf(),
            source,
        })?;
    manifest.build().map_err(|source| BootstrapError::Manifest {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use rstest::rstest;
    use switchboard_config::SocketEndpoint;

    use super::*;

    #[derive(Default)]
    struct RecordingReporter {
        events: Mutex<Vec<String>>,
    }

    impl RecordingReporter {
        fn record(&self, event: impl Into<String>) {
            self.events.lock().expect("events lock").push(event.into());
        }

        fn events(&self) -> Vec<String> {
            self.events.lock().expect("events lock").clone()
        }
    }

    impl HealthReporter for RecordingReporter {
        fn bootstrap_starting(&self) {
            self.record("starting");
        }

        fn bootstrap_succeeded(&self, _config: &Config) {
            self.record("succeeded");
        }

        fn bootstrap_failed(&self, _error: &BootstrapError) {
            self.record("failed");
        }

        fn session_loaded(&self, downloads: usize) {
            self.record(format!("session:{downloads}"));
        }

        fn listener_ready(&self, _endpoint: &SocketEndpoint) {
            self.record("listening");
        }

        fn reactor_stopped(&self, _released: usize) {
            self.record("stopped");
        }
    }

    fn config_in(dir: &tempfile::TempDir) -> Config {
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 path");
        Config {
            rpc_socket: SocketEndpoint::unix(root.join("run/rpc.sock")),
            ..Config::default()
        }
    }

    fn write_manifest(dir: &tempfile::TempDir, text: &str) -> Utf8PathBuf {
        let path = Utf8PathBuf::from_path_buf(dir.path().join("session.json")).expect("utf-8 path");
        fs::write(&path, text).expect("write manifest");
        path
    }

    #[test]
    fn bootstrap_prepares_socket_and_loads_manifest() {
        let dir = tempfile::tempdir().expect("temp dir");
        let manifest = write_manifest(
            &dir,
            r#"{"downloads":[{"name":"a","hash":"0101010101010101010101010101010101010101"}]}"#,
        );
        let config = Config {
            session_manifest: Some(manifest),
            ..config_in(&dir)
        };
        let reporter = Arc::new(RecordingReporter::default());

        let daemon = bootstrap_with(&StaticConfigLoader::new(config), reporter.clone())
            .expect("bootstrap");

        assert_eq!(daemon.session().len(), 1);
        assert!(dir.path().join("run").is_dir());
        assert_eq!(reporter.events(), vec!["starting", "session:1", "succeeded"]);
    }

    #[rstest]
    #[case("{\"downloads\": [", "parse")]
    #[case(r#"{"downloads":[{"name":"a","hash":"abc"}]}"#, "invalid")]
    fn bad_manifests_fail_bootstrap(#[case] text: &str, #[case] expected: &str) {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = Config {
            session_manifest: Some(write_manifest(&dir, text)),
            ..config_in(&dir)
        };
        let reporter = Arc::new(RecordingReporter::default());

        let Err(error) = bootstrap_with(&StaticConfigLoader::new(config), reporter.clone()) else {
            panic!("bootstrap should fail");
        };
        match expected {
            "parse" => assert!(matches!(error, BootstrapError::ManifestParse { .. })),
            _ => assert!(matches!(error, BootstrapError::Manifest { .. })),
        }
        assert_eq!(reporter.events(), vec!["starting", "failed"]);
    }

    #[test]
    fn missing_manifest_file_is_reported() {
        let error = load_session(Some(Utf8Path::new("/nonexistent/switchboard/session.json")))
            .expect_err("missing");
        assert!(matches!(error, BootstrapError::ManifestRead { .. }));
    }

    #[test]
    fn no_manifest_means_empty_session() {
        assert!(load_session(None).expect("empty").is_empty());
    }
}
