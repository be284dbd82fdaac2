//! Errors raised while serving an RPC request.

use std::io;

use switchboard::CommandError;
use thiserror::Error;

/// Failures reported to RPC clients.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The request line is not JSON.
    #[error("malformed JSONL: {message}")]
    MalformedJsonl {
        /// Parser diagnostic.
        message: String,
    },
    /// The request is JSON but not a valid request.
    #[error("invalid request: {message}")]
    InvalidStructure {
        /// What was wrong.
        message: String,
    },
    /// The method is not published to RPC clients.
    #[error("unknown method \"{method}\"")]
    UnknownMethod {
        /// Requested method.
        method: String,
    },
    /// A target named a download hash the session does not hold.
    #[error("no download with hash {hash}")]
    UnknownDownload {
        /// Requested hash.
        hash: String,
    },
    /// The request line exceeded the size limit.
    #[error("request exceeds {limit} bytes")]
    RequestTooLarge {
        /// Maximum accepted size.
        limit: u64,
    },
    /// Reading or writing the connection failed.
    #[error("connection error: {0}")]
    Io(#[from] io::Error),
    /// A response could not be encoded.
    #[error("failed to serialise response: {0}")]
    SerializeResponse(#[source] serde_json::Error),
    /// The command ran and failed.
    #[error("{source}")]
    Command {
        /// Method that failed.
        method: String,
        /// Failure reported by the engine.
        source: CommandError,
    },
    /// The reactor thread is gone.
    #[error("the command reactor is not running")]
    ReactorUnavailable,
}

impl DispatchError {
    /// Creates a malformed JSONL error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedJsonl {
            message: message.into(),
        }
    }

    /// Creates an invalid structure error.
    pub fn invalid_structure(message: impl Into<String>) -> Self {
        Self::InvalidStructure {
            message: message.into(),
        }
    }

    /// Creates an unknown method error.
    pub fn unknown_method(method: impl Into<String>) -> Self {
        Self::UnknownMethod {
            method: method.into(),
        }
    }

    /// Creates an unknown download error.
    pub fn unknown_download(hash: impl Into<String>) -> Self {
        Self::UnknownDownload { hash: hash.into() }
    }

    /// Wraps a command failure.
    pub fn command(method: impl Into<String>, source: CommandError) -> Self {
        Self::Command {
            method: method.into(),
            source,
        }
    }

    /// Stable code sent to clients. Command failures forward the engine's
    /// own code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MalformedJsonl { .. } => "malformed_jsonl",
            Self::InvalidStructure { .. } => "invalid_structure",
            Self::UnknownMethod { .. } => "unknown_method",
            Self::UnknownDownload { .. } => "unknown_download",
            Self::RequestTooLarge { .. } => "request_too_large",
            Self::Io(_) => "io",
            Self::SerializeResponse(_) => "serialize",
            Self::Command { source, .. } => source.code(),
            Self::ReactorUnavailable => "reactor_unavailable",
        }
    }

    /// Exit status reported after the error: 1 for problems with the
    /// request, 2 for problems on the daemon side.
    #[must_use]
    pub const fn exit_status(&self) -> i32 {
        match self {
            Self::Io(_) | Self::SerializeResponse(_) | Self::ReactorUnavailable => 2,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(DispatchError::malformed("x"), 1)]
    #[case(DispatchError::unknown_method("d.secret"), 1)]
    #[case(DispatchError::RequestTooLarge { limit: 8 }, 1)]
    #[case(DispatchError::command("d.get_name", CommandError::TooFewArguments), 1)]
    #[case(DispatchError::Io(io::Error::other("gone")), 2)]
    #[case(DispatchError::ReactorUnavailable, 2)]
    fn exit_status_separates_client_and_daemon_faults(
        #[case] error: DispatchError,
        #[case] status: i32,
    ) {
        assert_eq!(error.exit_status(), status);
    }

    #[test]
    fn command_failures_keep_engine_code_and_text() {
        let error = DispatchError::command("d.get_name", CommandError::invalid_handle("download 3"));
        assert_eq!(error.code(), "invalid_handle");
        assert_eq!(error.to_string(), "invalid handle: download 3");
    }
}
