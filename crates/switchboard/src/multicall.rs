//! Batch invocation of command strings across a collection.
//!
//! The argument is a list whose first element is reserved (it names a view
//! or filter and is ignored) and whose remaining elements are command
//! strings. Each element of the collection yields one row holding one cell
//! per command, in argument order. Command strings are parsed for every cell
//! and the first failing cell aborts the whole call.

use crate::command::CommandResult;
use crate::dispatch::Engine;
use crate::error::CommandError;
use crate::target::{DownloadId, FileRef, PeerRef, Target, TrackerRef};
use crate::value::Value;

/// Runs the command strings in `args` against each target in order.
///
/// # Errors
///
/// Fails when `args` is not a list, when it holds no command after the
/// reserved element ([`CommandError::TooFewArguments`]), or when any cell
/// fails.
pub fn multicall(
    engine: &mut Engine,
    targets: impl IntoIterator<Item = Target>,
    args: &Value,
) -> CommandResult {
    let columns = match args.as_list()?.split_first() {
        Some((_, columns)) if !columns.is_empty() => columns,
        _ => return Err(CommandError::TooFewArguments),
    };
    let mut rows = Vec::new();
    for target in targets {
        let mut row = Vec::with_capacity(columns.len());
        for column in columns {
            row.push(engine.execute(&target, column.as_str()?)?);
        }
        rows.push(Value::List(row));
    }
    Ok(Value::List(rows))
}

/// Runs `args` against every file of a download.
///
/// # Errors
///
/// As [`multicall`], plus [`CommandError::InvalidHandle`] for a stale
/// download.
pub fn file_multicall(engine: &mut Engine, download: DownloadId, args: &Value) -> CommandResult {
    let count = engine.session.download(download)?.files.len();
    let targets = (0..count).map(|index| Target::file(FileRef { download, index }));
    multicall(engine, targets.collect::<Vec<_>>(), args)
}

/// Runs `args` against every peer connection of a download.
///
/// # Errors
///
/// As [`file_multicall`].
pub fn peer_multicall(engine: &mut Engine, download: DownloadId, args: &Value) -> CommandResult {
    let count = engine.session.download(download)?.peers.len();
    let targets = (0..count).map(|index| Target::peer(PeerRef { download, index }));
    multicall(engine, targets.collect::<Vec<_>>(), args)
}

/// Runs `args` against every tracker of a download.
///
/// # Errors
///
/// As [`file_multicall`].
pub fn tracker_multicall(engine: &mut Engine, download: DownloadId, args: &Value) -> CommandResult {
    let count = engine.session.download(download)?.trackers.trackers.len();
    let targets = (0..count).map(|index| Target::tracker(TrackerRef { download, index }));
    multicall(engine, targets.collect::<Vec<_>>(), args)
}

/// Runs `args` against every download in the session.
///
/// # Errors
///
/// As [`multicall`].
pub fn download_multicall(engine: &mut Engine, args: &Value) -> CommandResult {
    let targets: Vec<_> = engine.session.ids().into_iter().map(Target::download).collect();
    multicall(engine, targets, args)
}
