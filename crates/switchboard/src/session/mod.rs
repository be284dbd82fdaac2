//! The set of downloads commands operate on.
//!
//! [`Session`] is a generational arena. Removing a download bumps its slot's
//! generation, so every [`DownloadId`] and derived handle issued before the
//! removal stops resolving instead of aliasing whatever reuses the slot.

mod download;
mod file;
mod manifest;
mod peer;

pub use download::{ConnectionType, DEFAULT_PEER_PORT, Download, STATE_SECTION};
pub use file::{DEFAULT_CHUNK_SIZE, File, FileList};
pub use manifest::{
    DownloadManifest, FileManifest, ManifestError, PeerManifest, SessionManifest, TrackerManifest,
};
pub use peer::{Peer, Rate, Tracker, TrackerList, TrackerType};

use crate::error::CommandError;
use crate::target::{DownloadId, FileRef, PeerRef, TrackerRef};

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    download: Option<Download>,
}

/// Owning collection of downloads addressed by [`DownloadId`].
#[derive(Debug, Clone, Default)]
pub struct Session {
    slots: Vec<Slot>,
    free: Vec<u32>,
    order: Vec<DownloadId>,
}

impl Session {
    /// Creates an empty session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a download and returns its handle.
    pub fn insert(&mut self, download: Download) -> DownloadId {
        let id = match self.free.pop() {
            Some(index) => self.refill(index, download),
            None => self.push(download),
        };
        self.order.push(id);
        id
    }

    fn refill(&mut self, index: u32, download: Download) -> DownloadId {
        match self.slot_mut(index) {
            Some(slot) => {
                slot.download = Some(download);
                DownloadId::new(index, slot.generation)
            }
            None => self.push(download),
        }
    }

    fn push(&mut self, download: Download) -> DownloadId {
        let index = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
        self.slots.push(Slot {
            generation: 0,
            download: Some(download),
        });
        DownloadId::new(index, 0)
    }

    fn slot(&self, index: u32) -> Option<&Slot> {
        usize::try_from(index)
            .ok()
            .and_then(|index| self.slots.get(index))
    }

    fn slot_mut(&mut self, index: u32) -> Option<&mut Slot> {
        usize::try_from(index)
            .ok()
            .and_then(|index| self.slots.get_mut(index))
    }

    /// Removes a download, invalidating every handle that names it.
    pub fn remove(&mut self, id: DownloadId) -> Option<Download> {
        let slot = self.slot_mut(id.index())?;
        if slot.generation != id.generation() {
            return None;
        }
        let download = slot.download.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index());
        self.order.retain(|existing| *existing != id);
        Some(download)
    }

    /// Looks up a download.
    #[must_use]
    pub fn get(&self, id: DownloadId) -> Option<&Download> {
        self.slot(id.index())
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.download.as_ref())
    }

    /// Looks up a download for mutation.
    #[must_use]
    pub fn get_mut(&mut self, id: DownloadId) -> Option<&mut Download> {
        self.slot_mut(id.index())
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.download.as_mut())
    }

    /// Returns true when `id` still names a download.
    #[must_use]
    pub fn contains(&self, id: DownloadId) -> bool {
        self.get(id).is_some()
    }

    /// Resolves a download handle.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::InvalidHandle`] for stale handles.
    pub fn download(&self, id: DownloadId) -> Result<&Download, CommandError> {
        self.get(id).ok_or_else(|| CommandError::invalid_handle(id))
    }

    /// Resolves a download handle for mutation.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::InvalidHandle`] for stale handles.
    pub fn download_mut(&mut self, id: DownloadId) -> Result<&mut Download, CommandError> {
        self.get_mut(id).ok_or_else(|| CommandError::invalid_handle(id))
    }

    /// Resolves a file handle.
    ///
    /// # Errors
    ///
    /// Fails when the download is gone or the index is out of range.
    pub fn file(&self, file: FileRef) -> Result<&File, CommandError> {
        self.download(file.download)?
            .files
            .files
            .get(file.index)
            .ok_or_else(|| CommandError::invalid_handle(file))
    }

    /// Resolves a file handle for mutation.
    ///
    /// # Errors
    ///
    /// Fails when the download is gone or the index is out of range.
    pub fn file_mut(&mut self, file: FileRef) -> Result<&mut File, CommandError> {
        self.download_mut(file.download)?
            .files
            .files
            .get_mut(file.index)
            .ok_or_else(|| CommandError::invalid_handle(file))
    }

    /// Resolves a peer handle.
    ///
    /// # Errors
    ///
    /// Fails when the download is gone or the index is out of range.
    pub fn peer(&self, peer: PeerRef) -> Result<&Peer, CommandError> {
        self.download(peer.download)?
            .peers
            .get(peer.index)
            .ok_or_else(|| CommandError::invalid_handle(peer))
    }

    /// Resolves a tracker handle.
    ///
    /// # Errors
    ///
    /// Fails when the download is gone or the index is out of range.
    pub fn tracker(&self, tracker: TrackerRef) -> Result<&Tracker, CommandError> {
        self.download(tracker.download)?
            .trackers
            .trackers
            .get(tracker.index)
            .ok_or_else(|| CommandError::invalid_handle(tracker))
    }

    /// Resolves a tracker handle for mutation.
    ///
    /// # Errors
    ///
    /// Fails when the download is gone or the index is out of range.
    pub fn tracker_mut(&mut self, tracker: TrackerRef) -> Result<&mut Tracker, CommandError> {
        self.download_mut(tracker.download)?
            .trackers
            .trackers
            .get_mut(tracker.index)
            .ok_or_else(|| CommandError::invalid_handle(tracker))
    }

    /// Handles of all downloads in insertion order.
    #[must_use]
    pub fn ids(&self) -> Vec<DownloadId> {
        self.order.clone()
    }

    /// Iterates downloads in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (DownloadId, &Download)> {
        self.order
            .iter()
            .filter_map(|id| self.get(*id).map(|download| (*id, download)))
    }

    /// Finds a download by info hash.
    #[must_use]
    pub fn find_by_hash(&self, hash: &[u8; 20]) -> Option<DownloadId> {
        self.iter()
            .find(|(_, download)| &download.info_hash == hash)
            .map(|(id, _)| id)
    }

    /// Finds a download by the hex rendering of its info hash, ignoring case.
    #[must_use]
    pub fn find_by_hex(&self, hash: &str) -> Option<DownloadId> {
        let bytes: [u8; 20] = hex::decode(hash).ok()?.try_into().ok()?;
        self.find_by_hash(&bytes)
    }

    /// Number of downloads.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns true when the session holds no downloads.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn download(byte: u8) -> Download {
        Download::new(format!("d{byte}"), [byte; 20])
    }

    #[test]
    fn iterates_in_insertion_order() {
        let mut session = Session::new();
        let first = session.insert(download(1));
        let second = session.insert(download(2));
        let ids: Vec<_> = session.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![first, second]);
        assert_eq!(session.len(), 2);
    }

    #[test]
    fn removed_handles_stop_resolving() {
        let mut session = Session::new();
        let first = session.insert(download(1));
        session.remove(first).expect("removed");
        let reused = session.insert(download(2));

        assert_ne!(first, reused);
        assert_eq!(session.slots.len(), 1);
        assert!(session.get(first).is_none());
        assert!(matches!(
            session.download(first),
            Err(CommandError::InvalidHandle { .. })
        ));
        assert_eq!(session.download(reused).expect("live").name, "d2");
        assert!(session.remove(first).is_none());
    }

    #[test]
    fn file_handles_check_bounds() {
        let mut session = Session::new();
        let mut entry = download(1);
        entry.files.files.push(File::new("a", 1));
        let id = session.insert(entry);
        assert!(session.file(FileRef { download: id, index: 0 }).is_ok());
        assert!(matches!(
            session.file(FileRef { download: id, index: 1 }),
            Err(CommandError::InvalidHandle { .. })
        ));
    }

    #[test]
    fn finds_downloads_by_hex_hash() {
        let mut session = Session::new();
        let id = session.insert(download(0xab));
        let hex = "AB".repeat(20);
        assert_eq!(session.find_by_hex(&hex), Some(id));
        assert_eq!(session.find_by_hex("abcd"), None);
        assert_eq!(session.find_by_hex("not hex"), None);
    }
}
