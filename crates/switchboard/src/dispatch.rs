//! The dispatcher: resolves a key and invokes it against a target.
//!
//! [`Engine`] bundles the command map with the session it operates on and is
//! passed by `&mut` to every caller. Callables receive the engine as well, so
//! a command may call further commands or register new ones while running.
//! Before invoking, the entry is cloned out of the map; registry mutations
//! made by the running command therefore never invalidate it.

use std::collections::VecDeque;

use tracing::{trace, warn};

use crate::command::{Callable, CommandEntry, CommandResult};
use crate::commands;
use crate::error::{CommandError, RegistryError};
use crate::parse::{parse_command, split_script};
use crate::registry::CommandMap;
use crate::session::Session;
use crate::target::{DownloadId, EntityRef, Target, TargetKind};
use crate::value::{Value, ValueError};

/// Tracing target for dispatch events.
pub const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

const MESSAGE_LOG_CAPACITY: usize = 256;

/// Deepest nesting of scripts calling scripts before a call is refused.
pub const MAX_SCRIPT_DEPTH: usize = 64;

/// Bounded log of user-facing messages.
#[derive(Debug, Clone)]
pub struct MessageLog {
    entries: VecDeque<String>,
    capacity: usize,
}

impl Default for MessageLog {
    fn default() -> Self {
        Self::with_capacity(MESSAGE_LOG_CAPACITY)
    }
}

impl MessageLog {
    /// Creates a log retaining at most `capacity` messages.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(MESSAGE_LOG_CAPACITY)),
            capacity: capacity.max(1),
        }
    }

    /// Appends a message, evicting the oldest once full.
    pub fn push(&mut self, message: impl Into<String>) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(message.into());
    }

    /// Messages from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// Most recent message.
    #[must_use]
    pub fn latest(&self) -> Option<&str> {
        self.entries.back().map(String::as_str)
    }

    /// Number of retained messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when no message is retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Process-scoped command state.
#[derive(Debug, Default)]
pub struct Engine {
    /// Registered commands.
    pub commands: CommandMap,
    /// Downloads commands operate on.
    pub session: Session,
    /// Messages produced by commands and by [`Engine::call_catch`].
    pub messages: MessageLog,
    script_depth: usize,
}

impl Engine {
    /// Creates an engine with no commands over `session`.
    #[must_use]
    pub fn new(session: Session) -> Self {
        Self {
            commands: CommandMap::new(),
            session,
            messages: MessageLog::default(),
            script_depth: 0,
        }
    }

    /// Creates an engine over `session` with the built-in command set.
    ///
    /// # Errors
    ///
    /// Fails when the built-in set registers a key twice.
    pub fn with_builtin_commands(session: Session) -> Result<Self, RegistryError> {
        let mut engine = Self::new(session);
        commands::initialize(&mut engine.commands)?;
        Ok(engine)
    }

    /// Releases every registered command and reports how many were dropped.
    pub fn shutdown(&mut self) -> usize {
        self.commands.clear()
    }

    /// Looks up a command, returning a cheap clone of its entry.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::UnknownCommand`] when `key` is not registered.
    pub fn resolve(&self, key: &str) -> Result<CommandEntry, CommandError> {
        self.commands
            .find(key)
            .cloned()
            .ok_or_else(|| CommandError::unknown_command(key))
    }

    /// Invokes `key` against `target`.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::UnknownCommand`] for unregistered keys,
    /// [`CommandError::TargetTypeMismatch`] when the target cannot be used
    /// with the entry's kind, and whatever the callable itself returns.
    pub fn call(&mut self, key: &str, target: &Target, args: &Value) -> CommandResult {
        let entry = self.resolve(key)?;
        self.call_entry(key, &entry, target, args)
    }

    /// Invokes an already resolved entry, applying the same target rules as
    /// [`Engine::call`].
    ///
    /// # Errors
    ///
    /// As [`Engine::call`], minus the lookup failure.
    pub fn call_entry(
        &mut self,
        key: &str,
        entry: &CommandEntry,
        target: &Target,
        args: &Value,
    ) -> CommandResult {
        trace!(
            target: DISPATCH_TARGET,
            key,
            entry_kind = %entry.kind(),
            target_kind = %target.kind(),
            "dispatching command"
        );
        let target = self.effective_target(key, entry.kind(), target)?;
        match entry.callable() {
            Callable::Any(f) => f(self, &target, args),
            Callable::Generic(f) => f(self, args),
            Callable::Download(f) => {
                let id = download_of(key, TargetKind::Download, &target, target.primary())?;
                f(self, id, args)
            }
            Callable::Peer(f) => match primary(key, TargetKind::Peer, &target)? {
                EntityRef::Peer(peer) => f(self, peer, args),
                _ => Err(mismatch(key, TargetKind::Peer, &target)),
            },
            Callable::Tracker(f) => match primary(key, TargetKind::Tracker, &target)? {
                EntityRef::Tracker(tracker) => f(self, tracker, args),
                _ => Err(mismatch(key, TargetKind::Tracker, &target)),
            },
            Callable::File(f) => match primary(key, TargetKind::File, &target)? {
                EntityRef::File(file) => f(self, file, args),
                _ => Err(mismatch(key, TargetKind::File, &target)),
            },
            Callable::FileIterator(f) => match primary(key, TargetKind::FileIterator, &target)? {
                EntityRef::FileCursor(cursor) => f(self, cursor, args),
                _ => Err(mismatch(key, TargetKind::FileIterator, &target)),
            },
            Callable::DownloadPair(f) => {
                let kind = TargetKind::DownloadPair;
                let first = download_of(key, kind, &target, target.primary())?;
                let second = download_of(key, kind, &target, target.secondary())?;
                f(self, first, second, args)
            }
        }
    }

    fn effective_target(
        &self,
        key: &str,
        kind: TargetKind,
        target: &Target,
    ) -> Result<Target, CommandError> {
        let mut effective = *target;
        if effective.kind() != TargetKind::Generic && effective.primary().is_none() {
            if !kind.is_untyped() {
                return Err(mismatch(key, kind, target));
            }
            effective = Target::generic();
        }
        if kind.is_untyped() || kind == effective.kind() {
            return Ok(effective);
        }
        match (kind, effective.primary()) {
            (TargetKind::File, Some(EntityRef::FileCursor(cursor))) => {
                let files = &self.session.download(cursor.download)?.files;
                if cursor.position >= files.len() {
                    return Err(CommandError::invalid_handle(cursor));
                }
                Ok(Target::file(cursor.current()))
            }
            _ => Err(mismatch(key, kind, target)),
        }
    }

    /// Invokes `key`, logging failures as `prefix` followed by the error and
    /// substituting [`Value::Empty`].
    ///
    /// # Errors
    ///
    /// Only [`CommandError::Internal`] is returned; every other failure is
    /// logged and swallowed.
    pub fn call_catch(
        &mut self,
        key: &str,
        target: &Target,
        args: &Value,
        prefix: &str,
    ) -> CommandResult {
        match self.call(key, target, args) {
            Ok(value) => Ok(value),
            Err(error) if error.is_internal() => Err(error),
            Err(error) => {
                let message = format!("{prefix}{error}");
                warn!(target: DISPATCH_TARGET, key, error = %error, "{message}");
                self.messages.push(message);
                Ok(Value::Empty)
            }
        }
    }

    /// Invokes `key` and requires an integer result.
    ///
    /// # Errors
    ///
    /// As [`Engine::call`], plus a value error for non-integer results.
    pub fn call_int(&mut self, key: &str, target: &Target, args: &Value) -> Result<i64, CommandError> {
        Ok(self.call(key, target, args)?.as_int()?)
    }

    /// Invokes `key` and requires a string result.
    ///
    /// # Errors
    ///
    /// As [`Engine::call`], plus a value error for non-string results.
    pub fn call_string(
        &mut self,
        key: &str,
        target: &Target,
        args: &Value,
    ) -> Result<String, CommandError> {
        match self.call(key, target, args)? {
            Value::String(text) => Ok(text),
            other => Err(ValueError::TypeMismatch {
                expected: "string",
                found: other.type_name(),
            }
            .into()),
        }
    }

    /// Parses and runs a single command string such as `d.set_custom=k,v`.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Parse`] for malformed text, otherwise as
    /// [`Engine::call`].
    pub fn execute(&mut self, target: &Target, text: &str) -> CommandResult {
        let command = parse_command(text)?;
        self.call(&command.key, target, &command.args)
    }

    /// Runs every `;`-separated statement of `script` against the same target,
    /// returning the last result. Empty statements are skipped.
    ///
    /// # Errors
    ///
    /// Stops at and returns the first failure. Scripts nested deeper than
    /// [`MAX_SCRIPT_DEPTH`] fail with [`CommandError::Input`].
    pub fn execute_script(&mut self, target: &Target, script: &str) -> CommandResult {
        if self.script_depth >= MAX_SCRIPT_DEPTH {
            warn!(
                target: DISPATCH_TARGET,
                depth = self.script_depth,
                "script nesting limit reached"
            );
            return Err(CommandError::input(format!(
                "scripts nested deeper than {MAX_SCRIPT_DEPTH} levels"
            )));
        }
        self.script_depth += 1;
        let result = self.run_statements(target, script);
        self.script_depth -= 1;
        result
    }

    fn run_statements(&mut self, target: &Target, script: &str) -> CommandResult {
        let mut last = Value::Empty;
        for statement in split_script(script)? {
            if statement.trim().is_empty() {
                continue;
            }
            last = self.execute(target, statement)?;
        }
        Ok(last)
    }
}

fn mismatch(key: &str, expected: TargetKind, target: &Target) -> CommandError {
    CommandError::type_mismatch(key, expected, target.kind())
}

fn primary(key: &str, expected: TargetKind, target: &Target) -> Result<EntityRef, CommandError> {
    target
        .primary()
        .ok_or_else(|| mismatch(key, expected, target))
}

fn download_of(
    key: &str,
    expected: TargetKind,
    target: &Target,
    entity: Option<EntityRef>,
) -> Result<DownloadId, CommandError> {
    match entity {
        Some(EntityRef::Download(id)) => Ok(id),
        _ => Err(mismatch(key, expected, target)),
    }
}
