//! Registered commands: callables, flags and metadata.
//!
//! A [`Callable`] is one variant per calling convention, so the kind a
//! command was registered with is carried by the variant itself and
//! dispatch matches on it exhaustively.

use std::borrow::Cow;
use std::fmt;
use std::rc::Rc;

use bitflags::bitflags;

use crate::dispatch::Engine;
use crate::error::CommandError;
use crate::target::{DownloadId, FileCursor, FileRef, PeerRef, Target, TargetKind, TrackerRef};
use crate::value::Value;

/// Result of invoking a command.
pub type CommandResult = Result<Value, CommandError>;

/// Receives the full target unconverted.
pub type AnyFn = dyn Fn(&mut Engine, &Target, &Value) -> CommandResult;
/// Receives no entity.
pub type GenericFn = dyn Fn(&mut Engine, &Value) -> CommandResult;
/// Receives a download.
pub type DownloadFn = dyn Fn(&mut Engine, DownloadId, &Value) -> CommandResult;
/// Receives a peer connection.
pub type PeerFn = dyn Fn(&mut Engine, PeerRef, &Value) -> CommandResult;
/// Receives a tracker.
pub type TrackerFn = dyn Fn(&mut Engine, TrackerRef, &Value) -> CommandResult;
/// Receives a file.
pub type FileFn = dyn Fn(&mut Engine, FileRef, &Value) -> CommandResult;
/// Receives a file cursor.
pub type FileIteratorFn = dyn Fn(&mut Engine, FileCursor, &Value) -> CommandResult;
/// Receives two downloads.
pub type DownloadPairFn = dyn Fn(&mut Engine, DownloadId, DownloadId, &Value) -> CommandResult;

/// A command implementation tagged with its calling convention.
#[derive(Clone)]
pub enum Callable {
    /// Untyped; accepts every target.
    Any(Rc<AnyFn>),
    /// No entity.
    Generic(Rc<GenericFn>),
    /// A download.
    Download(Rc<DownloadFn>),
    /// A peer connection.
    Peer(Rc<PeerFn>),
    /// A tracker.
    Tracker(Rc<TrackerFn>),
    /// A file.
    File(Rc<FileFn>),
    /// A file cursor.
    FileIterator(Rc<FileIteratorFn>),
    /// Two downloads.
    DownloadPair(Rc<DownloadPairFn>),
}

impl Callable {
    /// Wraps an untyped callable.
    pub fn any(f: impl Fn(&mut Engine, &Target, &Value) -> CommandResult + 'static) -> Self {
        Self::Any(Rc::new(f))
    }

    /// Wraps a callable that takes no entity.
    pub fn generic(f: impl Fn(&mut Engine, &Value) -> CommandResult + 'static) -> Self {
        Self::Generic(Rc::new(f))
    }

    /// Wraps a download callable.
    pub fn download(f: impl Fn(&mut Engine, DownloadId, &Value) -> CommandResult + 'static) -> Self {
        Self::Download(Rc::new(f))
    }

    /// Wraps a peer callable.
    pub fn peer(f: impl Fn(&mut Engine, PeerRef, &Value) -> CommandResult + 'static) -> Self {
        Self::Peer(Rc::new(f))
    }

    /// Wraps a tracker callable.
    pub fn tracker(f: impl Fn(&mut Engine, TrackerRef, &Value) -> CommandResult + 'static) -> Self {
        Self::Tracker(Rc::new(f))
    }

    /// Wraps a file callable.
    pub fn file(f: impl Fn(&mut Engine, FileRef, &Value) -> CommandResult + 'static) -> Self {
        Self::File(Rc::new(f))
    }

    /// Wraps a file cursor callable.
    pub fn file_iterator(
        f: impl Fn(&mut Engine, FileCursor, &Value) -> CommandResult + 'static,
    ) -> Self {
        Self::FileIterator(Rc::new(f))
    }

    /// Wraps a download pair callable.
    pub fn download_pair(
        f: impl Fn(&mut Engine, DownloadId, DownloadId, &Value) -> CommandResult + 'static,
    ) -> Self {
        Self::DownloadPair(Rc::new(f))
    }

    /// Kind of target the callable expects.
    #[must_use]
    pub const fn kind(&self) -> TargetKind {
        match self {
            Self::Any(_) => TargetKind::Any,
            Self::Generic(_) => TargetKind::Generic,
            Self::Download(_) => TargetKind::Download,
            Self::Peer(_) => TargetKind::Peer,
            Self::Tracker(_) => TargetKind::Tracker,
            Self::File(_) => TargetKind::File,
            Self::FileIterator(_) => TargetKind::FileIterator,
            Self::DownloadPair(_) => TargetKind::DownloadPair,
        }
    }

    /// Returns true when both callables are the same allocation.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Any(a), Self::Any(b)) => Rc::ptr_eq(a, b),
            (Self::Generic(a), Self::Generic(b)) => Rc::ptr_eq(a, b),
            (Self::Download(a), Self::Download(b)) => Rc::ptr_eq(a, b),
            (Self::Peer(a), Self::Peer(b)) => Rc::ptr_eq(a, b),
            (Self::Tracker(a), Self::Tracker(b)) => Rc::ptr_eq(a, b),
            (Self::File(a), Self::File(b)) => Rc::ptr_eq(a, b),
            (Self::FileIterator(a), Self::FileIterator(b)) => Rc::ptr_eq(a, b),
            (Self::DownloadPair(a), Self::DownloadPair(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Number of registry entries and in-flight calls holding this callable.
    #[must_use]
    pub fn holders(&self) -> usize {
        match self {
            Self::Any(f) => Rc::strong_count(f),
            Self::Generic(f) => Rc::strong_count(f),
            Self::Download(f) => Rc::strong_count(f),
            Self::Peer(f) => Rc::strong_count(f),
            Self::Tracker(f) => Rc::strong_count(f),
            Self::File(f) => Rc::strong_count(f),
            Self::FileIterator(f) => Rc::strong_count(f),
            Self::DownloadPair(f) => Rc::strong_count(f),
        }
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Callable").field(&self.kind()).finish()
    }
}

bitflags! {
    /// Ownership and visibility flags of a registry entry.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CommandFlags: u8 {
        /// The entry borrows its callable from another entry.
        const DONT_DELETE = 1;
        /// The registry owns the key string.
        const DELETE_KEY = 1 << 1;
        /// The entry is visible to the external RPC bridge.
        const PUBLIC_RPC = 1 << 2;
    }
}

/// A registered command.
#[derive(Debug, Clone)]
pub struct CommandEntry {
    callable: Callable,
    flags: CommandFlags,
    param_spec: Cow<'static, str>,
    doc: Cow<'static, str>,
}

impl CommandEntry {
    /// Creates an entry.
    pub fn new(
        callable: Callable,
        flags: CommandFlags,
        param_spec: impl Into<Cow<'static, str>>,
        doc: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            callable,
            flags,
            param_spec: param_spec.into(),
            doc: doc.into(),
        }
    }

    /// The callable.
    #[must_use]
    pub const fn callable(&self) -> &Callable {
        &self.callable
    }

    /// Kind the entry was registered with.
    #[must_use]
    pub const fn kind(&self) -> TargetKind {
        self.callable.kind()
    }

    /// Flags.
    #[must_use]
    pub const fn flags(&self) -> CommandFlags {
        self.flags
    }

    /// Whether the bridge mirrors the entry.
    #[must_use]
    pub const fn is_public(&self) -> bool {
        self.flags.contains(CommandFlags::PUBLIC_RPC)
    }

    /// Parameter signature, e.g. `"i:s"`.
    #[must_use]
    pub fn param_spec(&self) -> &str {
        &self.param_spec
    }

    /// Documentation string.
    #[must_use]
    pub fn doc(&self) -> &str {
        &self.doc
    }

    pub(crate) fn with_flags(mut self, flags: CommandFlags) -> Self {
        self.flags = flags;
        self
    }
}
