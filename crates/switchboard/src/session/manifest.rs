//! Declarative description of a session.
//!
//! A manifest is plain data that deserializes from JSON and builds a
//! [`Session`]. Tests use it to describe fixtures and the daemon can load one
//! at startup.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::CommandError;
use crate::value::Value;

use super::download::{ConnectionType, Download};
use super::file::{DEFAULT_CHUNK_SIZE, File};
use super::peer::{Peer, Rate, Tracker};
use super::Session;

/// Errors raised while building a session from a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// A hash or peer id was not 40 hex digits.
    #[error("invalid {field} '{value}' for download '{download}': expected 40 hex digits")]
    InvalidHash {
        /// Download being built.
        download: String,
        /// Field holding the bad value.
        field: &'static str,
        /// Rejected value.
        value: String,
    },
    /// Two downloads share an info hash.
    #[error("duplicate info hash {hash}")]
    DuplicateHash {
        /// Offending hash.
        hash: String,
    },
    /// The download's state section could not be seeded.
    #[error("cannot seed state of download '{download}': {source}")]
    State {
        /// Download being built.
        download: String,
        /// Underlying failure.
        source: CommandError,
    },
    /// A bitfield was not hex.
    #[error("invalid bitfield '{value}' for download '{download}'")]
    InvalidBitfield {
        /// Download being built.
        download: String,
        /// Rejected value.
        value: String,
    },
    /// A connection type was not recognised.
    #[error("unknown connection type '{value}' for download '{download}'")]
    UnknownConnectionType {
        /// Download being built.
        download: String,
        /// Rejected value.
        value: String,
    },
}

/// A whole session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionManifest {
    /// Downloads in session order.
    pub downloads: Vec<DownloadManifest>,
}

/// One download.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadManifest {
    /// Display name.
    pub name: String,
    /// Info hash as 40 hex digits.
    pub hash: String,
    /// Local peer id as 40 hex digits; zeroed when absent.
    pub local_id: Option<String>,
    /// Storage directory.
    pub directory: String,
    /// Whether the payload is a directory of files.
    pub multi_file: bool,
    /// Piece size in bytes.
    pub chunk_size: Option<i64>,
    /// Files in torrent order.
    pub files: Vec<FileManifest>,
    /// Connected peers.
    pub peers: Vec<PeerManifest>,
    /// Trackers in announce order.
    pub trackers: Vec<TrackerManifest>,
    /// Whether the torrent is private.
    pub private: bool,
    /// Whether the download starts active.
    pub active: bool,
    /// Priority, 0..=3.
    pub priority: Option<i64>,
    /// Connection type name.
    pub connection: Option<String>,
    /// Bytes uploaded so far.
    pub up_total: i64,
    /// Bytes of verified payload.
    pub bytes_done: i64,
    /// Creation time as a unix timestamp.
    pub creation_date: i64,
    /// Custom key/value fields.
    pub custom: BTreeMap<String, String>,
    /// Views the download belongs to.
    pub views: Vec<String>,
    /// Verified-chunk bitfield as hex digits.
    pub bitfield: Option<String>,
    /// Whether peer exchange is disabled.
    pub pex_disabled: bool,
}

/// One file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileManifest {
    /// Relative path with `/` separators.
    pub path: String,
    /// Size in bytes.
    pub size: i64,
    /// Verified chunks.
    pub completed_chunks: i64,
    /// Priority; defaults to normal.
    pub priority: Option<i64>,
}

/// One peer connection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeerManifest {
    /// Remote address.
    pub address: String,
    /// Remote port.
    pub port: u16,
    /// Client name and version.
    pub client_version: String,
    /// Peer id as 40 hex digits; zeroed when absent.
    pub id: Option<String>,
    /// Upload rate towards the peer.
    pub up_rate: i64,
    /// Download rate from the peer.
    pub down_rate: i64,
    /// Whether the connection is encrypted.
    pub encrypted: bool,
    /// Whether the peer initiated the connection.
    pub incoming: bool,
    /// Share of the payload the peer has, in percent.
    pub completed_percent: i64,
}

/// One tracker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerManifest {
    /// Announce URL.
    pub url: String,
    /// Tier.
    pub group: i64,
    /// Whether the tracker starts disabled.
    pub disabled: bool,
    /// Seeders from the last scrape.
    pub scrape_complete: i64,
    /// Leechers from the last scrape.
    pub scrape_incomplete: i64,
    /// Completed downloads from the last scrape.
    pub scrape_downloaded: i64,
}

fn decode_id(download: &str, field: &'static str, value: &str) -> Result<[u8; 20], ManifestError> {
    hex::decode(value)
        .ok()
        .and_then(|bytes| <[u8; 20]>::try_from(bytes).ok())
        .ok_or_else(|| ManifestError::InvalidHash {
            download: download.to_owned(),
            field,
            value: value.to_owned(),
        })
}

impl SessionManifest {
    /// Builds a session holding every described download.
    ///
    /// # Errors
    ///
    /// Fails on malformed hashes, duplicate hashes or unknown connection
    /// types.
    pub fn build(&self) -> Result<Session, ManifestError> {
        let mut session = Session::new();
        for manifest in &self.downloads {
            let download = manifest.build()?;
            if session.find_by_hash(&download.info_hash).is_some() {
                return Err(ManifestError::DuplicateHash {
                    hash: download.hash_hex(),
                });
            }
            session.insert(download);
        }
        Ok(session)
    }
}

impl DownloadManifest {
    /// Builds a single download.
    ///
    /// # Errors
    ///
    /// Fails on malformed hashes or unknown connection types.
    pub fn build(&self) -> Result<Download, ManifestError> {
        let mut download = Download::new(&self.name, decode_id(&self.name, "hash", &self.hash)?);
        if let Some(local_id) = &self.local_id {
            download.local_id = decode_id(&self.name, "local_id", local_id)?;
        }
        download.files.root_dir.clone_from(&self.directory);
        download.files.multi_file = self.multi_file;
        download.files.chunk_size = self.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE);
        download.files.files = self.files.iter().map(FileManifest::build).collect();
        download.peers = self
            .peers
            .iter()
            .map(|peer| peer.build(&self.name))
            .collect::<Result<_, _>>()?;
        download.trackers.trackers = self.trackers.iter().map(TrackerManifest::build).collect();
        if let Some(bitfield) = &self.bitfield {
            download.bitfield =
                hex::decode(bitfield).map_err(|_| ManifestError::InvalidBitfield {
                    download: self.name.clone(),
                    value: bitfield.clone(),
                })?;
        }
        download.pex_enabled = !self.pex_disabled;
        download.private = self.private;
        download.active = self.active;
        download.open = self.active;
        if let Some(priority) = self.priority {
            download.priority = priority;
        }
        if let Some(connection) = &self.connection {
            download.connection_type =
                connection
                    .parse::<ConnectionType>()
                    .map_err(|_| ManifestError::UnknownConnectionType {
                        download: self.name.clone(),
                        value: connection.clone(),
                    })?;
        }
        download.up.total = self.up_total;
        download.bytes_done = self.bytes_done;
        download.creation_date = self.creation_date;
        download.peers_accounted = i64::try_from(download.peers.len()).unwrap_or(i64::MAX);
        download.peers_complete = download
            .peers
            .iter()
            .filter(|peer| peer.completed_percent >= 100)
            .count()
            .try_into()
            .unwrap_or(i64::MAX);

        self.seed_state(&mut download)
            .map_err(|source| ManifestError::State {
                download: self.name.clone(),
                source,
            })?;
        Ok(download)
    }

    fn seed_state(&self, download: &mut Download) -> Result<(), CommandError> {
        let section = download.section_mut()?;
        if self.active {
            section.insert_key("state", Value::Int(1))?;
        }
        section.get_key_mut("custom")?.as_map_mut()?.extend(
            self.custom
                .iter()
                .map(|(key, value)| (key.clone(), Value::from(value.as_str()))),
        );
        section
            .get_key_mut("views")?
            .as_list_mut()?
            .extend(self.views.iter().map(|view| Value::from(view.as_str())));
        Ok(())
    }
}

impl FileManifest {
    fn build(&self) -> File {
        let mut file = File::new(&self.path, self.size);
        file.completed_chunks = self.completed_chunks;
        if let Some(priority) = self.priority {
            file.priority = priority;
        }
        file
    }
}

impl PeerManifest {
    fn build(&self, download: &str) -> Result<Peer, ManifestError> {
        let id = match &self.id {
            Some(id) => decode_id(download, "peer id", id)?,
            None => [0; 20],
        };
        Ok(Peer {
            address: self.address.clone(),
            port: self.port,
            client_version: self.client_version.clone(),
            id,
            up: Rate {
                rate: self.up_rate,
                total: 0,
            },
            down: Rate {
                rate: self.down_rate,
                total: 0,
            },
            encrypted: self.encrypted,
            incoming: self.incoming,
            completed_percent: self.completed_percent,
        })
    }
}

impl TrackerManifest {
    fn build(&self) -> Tracker {
        let mut tracker = Tracker::new(&self.url, self.group);
        tracker.enabled = !self.disabled;
        tracker.scrape_complete = self.scrape_complete;
        tracker.scrape_incomplete = self.scrape_incomplete;
        tracker.scrape_downloaded = self.scrape_downloaded;
        tracker
    }
}
