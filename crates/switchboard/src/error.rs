//! Error types for registration and command dispatch.
//!
//! Registration failures ([`RegistryError`]) are programming errors surfaced
//! while the command set is being built. Dispatch failures ([`CommandError`])
//! are returned from every call and carry enough context for the caller to
//! decide whether to log, substitute a value, or report to a remote client.

use thiserror::Error;

use crate::target::TargetKind;
use crate::value::ValueError;

/// Errors surfaced while invoking a command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// The key is not registered.
    #[error("command \"{key}\" does not exist")]
    UnknownCommand {
        /// Key that was looked up.
        key: String,
    },

    /// The target cannot be used with the command's registered kind.
    #[error("command type mismatch for \"{key}\": expected {expected} target, got {actual}")]
    TargetTypeMismatch {
        /// Key being dispatched.
        key: String,
        /// Kind the entry was registered with.
        expected: TargetKind,
        /// Kind carried by the target.
        actual: TargetKind,
    },

    /// A list argument had fewer elements than the command requires.
    #[error("too few arguments")]
    TooFewArguments,

    /// A required argument or stored value is absent.
    #[error("missing argument: {message}")]
    MissingArgument {
        /// What was missing.
        message: String,
    },

    /// An argument or stored value had the wrong kind.
    #[error(transparent)]
    Value(#[from] ValueError),

    /// A handle referred to an entity that no longer exists.
    #[error("invalid handle: {handle}")]
    InvalidHandle {
        /// Rendered handle.
        handle: String,
    },

    /// A command rejected its input.
    #[error("{message}")]
    Input {
        /// Human-readable reason.
        message: String,
    },

    /// A command string could not be parsed.
    #[error("parse error: {message}")]
    Parse {
        /// Human-readable reason.
        message: String,
    },

    /// An invariant of the engine was violated.
    #[error("internal error: {message}")]
    Internal {
        /// Human-readable reason.
        message: String,
    },
}

impl CommandError {
    /// Creates an unknown command error.
    pub fn unknown_command(key: impl Into<String>) -> Self {
        Self::UnknownCommand { key: key.into() }
    }

    /// Creates a target type mismatch error.
    pub fn type_mismatch(key: impl Into<String>, expected: TargetKind, actual: TargetKind) -> Self {
        Self::TargetTypeMismatch {
            key: key.into(),
            expected,
            actual,
        }
    }

    /// Creates a missing argument error.
    pub fn missing_argument(message: impl Into<String>) -> Self {
        Self::MissingArgument {
            message: message.into(),
        }
    }

    /// Creates an invalid handle error.
    pub fn invalid_handle(handle: impl std::fmt::Display) -> Self {
        Self::InvalidHandle {
            handle: handle.to_string(),
        }
    }

    /// Creates an input error.
    pub fn input(message: impl Into<String>) -> Self {
        Self::Input {
            message: message.into(),
        }
    }

    /// Creates a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns a stable identifier for the error category.
    ///
    /// Remote clients receive this code alongside the rendered message.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::UnknownCommand { .. } => "unknown_command",
            Self::TargetTypeMismatch { .. } => "target_type_mismatch",
            Self::TooFewArguments => "too_few_arguments",
            Self::MissingArgument { .. } => "missing_argument",
            Self::Value(_) => "value_type",
            Self::InvalidHandle { .. } => "invalid_handle",
            Self::Input { .. } => "input",
            Self::Parse { .. } => "parse",
            Self::Internal { .. } => "internal",
        }
    }

    /// Returns true for invariant violations, which callers must not swallow.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }
}

/// Errors surfaced while building the command map.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The key is already registered.
    #[error("tried to insert an already existing key \"{key}\"")]
    DuplicateKey {
        /// Key that collided.
        key: String,
    },

    /// An alias named a source key that is not registered.
    #[error("cannot alias \"{alias}\": source \"{source_key}\" does not exist")]
    UnknownSource {
        /// Key the alias would have been registered under.
        alias: String,
        /// Missing source key.
        source_key: String,
    },
}

impl From<RegistryError> for CommandError {
    fn from(error: RegistryError) -> Self {
        Self::internal(error.to_string())
    }
}
