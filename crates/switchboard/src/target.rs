//! Target kinds, entity handles and the request-scoped [`Target`] pair.
//!
//! Entities live in the [`Session`](crate::session::Session) arena and are
//! referenced by small `Copy` handles. A handle whose download has been
//! removed no longer resolves, so a stale target surfaces as
//! [`CommandError::InvalidHandle`](crate::CommandError::InvalidHandle).

use std::fmt;

/// Category of entity a command operates on.
///
/// The declaration order is significant: kinds at or below [`TargetKind::Any`]
/// accept any target, every kind above it is typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TargetKind {
    /// No entity.
    Generic,
    /// Any entity, passed through unconverted.
    Any,
    /// A download.
    Download,
    /// A peer connection of a download.
    Peer,
    /// A tracker of a download.
    Tracker,
    /// A file of a download.
    File,
    /// A cursor positioned on a file of a download.
    FileIterator,
    /// Two downloads compared against each other.
    DownloadPair,
}

impl TargetKind {
    /// Returns true for kinds that accept any target.
    #[must_use]
    pub fn is_untyped(self) -> bool {
        self <= Self::Any
    }

    /// Returns the lowercase name of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Generic => "generic",
            Self::Any => "any",
            Self::Download => "download",
            Self::Peer => "peer",
            Self::Tracker => "tracker",
            Self::File => "file",
            Self::FileIterator => "file_iterator",
            Self::DownloadPair => "download_pair",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Generational handle of a download in the session arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DownloadId {
    index: u32,
    generation: u32,
}

impl DownloadId {
    pub(crate) const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub(crate) const fn index(self) -> u32 {
        self.index
    }

    pub(crate) const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for DownloadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "download#{}.{}", self.index, self.generation)
    }
}

/// A file of a download, by position in its file list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileRef {
    /// Owning download.
    pub download: DownloadId,
    /// Position in the download's file list.
    pub index: usize,
}

impl fmt::Display for FileRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/file#{}", self.download, self.index)
    }
}

/// A cursor over a download's file list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileCursor {
    /// Owning download.
    pub download: DownloadId,
    /// Position of the file the cursor points at.
    pub position: usize,
}

impl FileCursor {
    /// Returns the file the cursor currently points at.
    #[must_use]
    pub const fn current(self) -> FileRef {
        FileRef {
            download: self.download,
            index: self.position,
        }
    }
}

impl fmt::Display for FileCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/cursor@{}", self.download, self.position)
    }
}

/// A peer connection of a download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerRef {
    /// Owning download.
    pub download: DownloadId,
    /// Position in the download's connection list.
    pub index: usize,
}

impl fmt::Display for PeerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/peer#{}", self.download, self.index)
    }
}

/// A tracker of a download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrackerRef {
    /// Owning download.
    pub download: DownloadId,
    /// Position in the download's tracker list.
    pub index: usize,
}

impl fmt::Display for TrackerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/tracker#{}", self.download, self.index)
    }
}

/// Any entity handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityRef {
    /// A download.
    Download(DownloadId),
    /// A file.
    File(FileRef),
    /// A file cursor.
    FileCursor(FileCursor),
    /// A peer connection.
    Peer(PeerRef),
    /// A tracker.
    Tracker(TrackerRef),
}

impl EntityRef {
    /// Returns the kind a target carrying this entity has.
    #[must_use]
    pub const fn kind(self) -> TargetKind {
        match self {
            Self::Download(_) => TargetKind::Download,
            Self::File(_) => TargetKind::File,
            Self::FileCursor(_) => TargetKind::FileIterator,
            Self::Peer(_) => TargetKind::Peer,
            Self::Tracker(_) => TargetKind::Tracker,
        }
    }

    /// Returns the download the entity belongs to.
    #[must_use]
    pub const fn download(self) -> DownloadId {
        match self {
            Self::Download(id) => id,
            Self::File(file) => file.download,
            Self::FileCursor(cursor) => cursor.download,
            Self::Peer(peer) => peer.download,
            Self::Tracker(tracker) => tracker.download,
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Download(id) => id.fmt(f),
            Self::File(file) => file.fmt(f),
            Self::FileCursor(cursor) => cursor.fmt(f),
            Self::Peer(peer) => peer.fmt(f),
            Self::Tracker(tracker) => tracker.fmt(f),
        }
    }
}

/// The kind and entities a single invocation is aimed at.
///
/// Targets are built per call and never own the entities they name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    kind: TargetKind,
    primary: Option<EntityRef>,
    secondary: Option<EntityRef>,
}

impl Target {
    /// A target with no entity.
    #[must_use]
    pub const fn generic() -> Self {
        Self::unbound(TargetKind::Generic)
    }

    /// An untyped target without an entity.
    #[must_use]
    pub const fn any() -> Self {
        Self::unbound(TargetKind::Any)
    }

    /// A target of the given kind that names no entity.
    ///
    /// Typed commands reject such targets; untyped commands treat them as
    /// generic.
    #[must_use]
    pub const fn unbound(kind: TargetKind) -> Self {
        Self {
            kind,
            primary: None,
            secondary: None,
        }
    }

    /// Aims at a download.
    #[must_use]
    pub const fn download(id: DownloadId) -> Self {
        Self::entity(EntityRef::Download(id))
    }

    /// Aims at a file.
    #[must_use]
    pub const fn file(file: FileRef) -> Self {
        Self::entity(EntityRef::File(file))
    }

    /// Aims at a file cursor.
    #[must_use]
    pub const fn file_cursor(cursor: FileCursor) -> Self {
        Self::entity(EntityRef::FileCursor(cursor))
    }

    /// Aims at a peer connection.
    #[must_use]
    pub const fn peer(peer: PeerRef) -> Self {
        Self::entity(EntityRef::Peer(peer))
    }

    /// Aims at a tracker.
    #[must_use]
    pub const fn tracker(tracker: TrackerRef) -> Self {
        Self::entity(EntityRef::Tracker(tracker))
    }

    /// Aims at two downloads.
    #[must_use]
    pub const fn download_pair(first: DownloadId, second: DownloadId) -> Self {
        Self {
            kind: TargetKind::DownloadPair,
            primary: Some(EntityRef::Download(first)),
            secondary: Some(EntityRef::Download(second)),
        }
    }

    /// Aims at a single entity, taking the kind from it.
    #[must_use]
    pub const fn entity(entity: EntityRef) -> Self {
        Self {
            kind: entity.kind(),
            primary: Some(entity),
            secondary: None,
        }
    }

    /// Kind of the target.
    #[must_use]
    pub const fn kind(&self) -> TargetKind {
        self.kind
    }

    /// Primary entity, if any.
    #[must_use]
    pub const fn primary(&self) -> Option<EntityRef> {
        self.primary
    }

    /// Secondary entity, only set for download pairs.
    #[must_use]
    pub const fn secondary(&self) -> Option<EntityRef> {
        self.secondary
    }
}

impl Default for Target {
    fn default() -> Self {
        Self::generic()
    }
}

impl From<EntityRef> for Target {
    fn from(entity: EntityRef) -> Self {
        Self::entity(entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(TargetKind::Generic, true)]
    #[case(TargetKind::Any, true)]
    #[case(TargetKind::Download, false)]
    #[case(TargetKind::FileIterator, false)]
    #[case(TargetKind::DownloadPair, false)]
    fn untyped_kinds_rank_at_or_below_any(#[case] kind: TargetKind, #[case] untyped: bool) {
        assert_eq!(kind.is_untyped(), untyped);
    }

    #[test]
    fn kinds_follow_declared_order() {
        assert!(TargetKind::Generic < TargetKind::Any);
        assert!(TargetKind::Any < TargetKind::Download);
        assert!(TargetKind::File < TargetKind::FileIterator);
        assert!(TargetKind::FileIterator < TargetKind::DownloadPair);
    }

    #[test]
    fn entity_targets_take_kind_from_entity() {
        let download = DownloadId::new(0, 1);
        let cursor = FileCursor {
            download,
            position: 2,
        };
        let target = Target::file_cursor(cursor);
        assert_eq!(target.kind(), TargetKind::FileIterator);
        assert_eq!(target.primary(), Some(EntityRef::FileCursor(cursor)));
        assert_eq!(target.secondary(), None);
        assert_eq!(
            cursor.current(),
            FileRef {
                download,
                index: 2
            }
        );
    }

    #[test]
    fn download_pair_carries_both_ids() {
        let first = DownloadId::new(0, 1);
        let second = DownloadId::new(1, 1);
        let target = Target::download_pair(first, second);
        assert_eq!(target.kind(), TargetKind::DownloadPair);
        assert_eq!(target.primary(), Some(EntityRef::Download(first)));
        assert_eq!(target.secondary(), Some(EntityRef::Download(second)));
    }

    #[test]
    fn unbound_target_has_no_entities() {
        let target = Target::unbound(TargetKind::Peer);
        assert_eq!(target.kind(), TargetKind::Peer);
        assert!(target.primary().is_none());
    }
}
