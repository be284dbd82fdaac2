//! Typed command registry and dispatcher for a download session.
//!
//! Every operation the client exposes lives under a single flat namespace of
//! keys such as `d.get_name` or `f.get_size_bytes`. A key resolves to a
//! [`CommandEntry`] whose [`Callable`] declares the kind of entity it works
//! on: a download, a file, a file cursor, a peer, a tracker, a pair of
//! downloads, or nothing at all. The [`Engine`] checks the caller's
//! [`Target`] against that kind before invoking, narrowing a file cursor to
//! its current file where needed, so commands never see an entity of the
//! wrong type.
//!
//! The same registry serves two audiences:
//!
//! - the command language, where strings like `d.set_custom=label,music` are
//!   parsed by [`parse_command`] and scripts chain statements with `;`;
//! - an external RPC surface, which only learns about entries flagged
//!   [`CommandFlags::PUBLIC_RPC`] through an attached [`RpcBridge`].
//!
//! Multicall commands (`d.multicall`, `f.multicall`, `p.multicall`,
//! `t.multicall`) run a list of command strings against every element of a
//! collection and return one row per element.

mod command;
pub mod commands;
mod dispatch;
mod error;
pub mod multicall;
mod parse;
mod registry;
pub mod session;
mod target;
mod value;

pub use command::{
    AnyFn, Callable, CommandEntry, CommandFlags, CommandResult, DownloadFn, DownloadPairFn,
    FileFn, FileIteratorFn, GenericFn, PeerFn, TrackerFn,
};
pub use dispatch::{DISPATCH_TARGET, Engine, MAX_SCRIPT_DEPTH, MessageLog};
pub use error::{CommandError, RegistryError};
pub use parse::{ParsedCommand, parse_arguments, parse_command, split_script};
pub use registry::{CommandMap, RpcBridge};
pub use session::{Download, Session, SessionManifest};
pub use target::{
    DownloadId, EntityRef, FileCursor, FileRef, PeerRef, Target, TargetKind, TrackerRef,
};
pub use value::{Value, ValueError, ValueList, ValueMap};

#[cfg(test)]
mod tests;
