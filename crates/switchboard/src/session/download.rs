//! Downloads and their mutable state.

use std::fmt;
use std::str::FromStr;

use crate::error::CommandError;
use crate::value::{Value, ValueMap};

use super::file::FileList;
use super::peer::{Peer, Rate, TrackerList};

/// Name of the state section holding variables, custom fields and views.
pub const STATE_SECTION: &str = "rtorrent";

/// Port used by `d.add_peer` when the address carries none.
pub const DEFAULT_PEER_PORT: u16 = 6881;

/// How a download exchanges data with its peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionType {
    /// Downloading.
    #[default]
    Leech,
    /// Uploading a complete payload.
    Seed,
    /// Seeding a payload nobody else has yet.
    InitialSeed,
}

impl ConnectionType {
    /// Returns the configuration name of the connection type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Leech => "leech",
            Self::Seed => "seed",
            Self::InitialSeed => "initial_seed",
        }
    }
}

impl fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConnectionType {
    type Err = CommandError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "leech" => Ok(Self::Leech),
            "seed" => Ok(Self::Seed),
            "initial_seed" => Ok(Self::InitialSeed),
            _ => Err(CommandError::input(
                "unknown peer connection type selected",
            )),
        }
    }
}

/// A download and everything attached to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    /// Display name, usually the payload's top-level name.
    pub name: String,
    /// Info hash.
    pub info_hash: [u8; 20],
    /// Peer id this client announces for the download.
    pub local_id: [u8; 20],
    /// Files and their layout.
    pub files: FileList,
    /// Connected peers.
    pub peers: Vec<Peer>,
    /// Peer addresses queued for connection.
    pub pending_peers: Vec<String>,
    /// Trackers.
    pub trackers: TrackerList,
    /// Variables, custom fields and views, stored under [`STATE_SECTION`].
    pub state: Value,
    /// Priority: 0 off, 1 low, 2 normal, 3 high.
    pub priority: i64,
    /// Last status message.
    pub message: String,
    /// Current connection type.
    pub connection_type: ConnectionType,
    /// Whether storage is open.
    pub open: bool,
    /// Whether the download is transferring.
    pub active: bool,
    /// Whether the payload has been verified.
    pub hash_checked: bool,
    /// Whether verification is running.
    pub hash_checking: bool,
    /// Whether the last verification failed.
    pub hash_failed: bool,
    /// Whether the torrent is private.
    pub private: bool,
    /// Whether peer exchange is running.
    pub pex_active: bool,
    /// Whether peer exchange may be used.
    pub pex_enabled: bool,
    /// Peers learned through peer exchange.
    pub size_pex: i64,
    /// Most peers accepted through peer exchange.
    pub max_size_pex: i64,
    /// Verified chunks, one bit per chunk, most significant bit first.
    pub bitfield: Vec<u8>,
    /// Upload rate.
    pub up: Rate,
    /// Download rate.
    pub down: Rate,
    /// Rate of discarded data.
    pub skip: Rate,
    /// Bytes of verified payload.
    pub bytes_done: i64,
    /// Chunks verified so far.
    pub chunks_hashed: i64,
    /// Creation time of the torrent as a unix timestamp.
    pub creation_date: i64,
    /// Minimum number of peer connections.
    pub peers_min: i64,
    /// Maximum number of peer connections.
    pub peers_max: i64,
    /// Maximum number of unchoked peers.
    pub uploads_max: i64,
    /// Peers known to have the full payload.
    pub peers_complete: i64,
    /// Peers counted towards the download's statistics.
    pub peers_accounted: i64,
}

impl Download {
    /// Creates a closed, inactive download with a fresh state section.
    #[must_use]
    pub fn new(name: impl Into<String>, info_hash: [u8; 20]) -> Self {
        Self {
            name: name.into(),
            info_hash,
            local_id: [0; 20],
            files: FileList::default(),
            peers: Vec::new(),
            pending_peers: Vec::new(),
            trackers: TrackerList {
                numwant: -1,
                ..TrackerList::default()
            },
            state: initial_state(),
            priority: 2,
            message: String::new(),
            connection_type: ConnectionType::default(),
            open: false,
            active: false,
            hash_checked: false,
            hash_checking: false,
            hash_failed: false,
            private: false,
            pex_active: false,
            pex_enabled: true,
            size_pex: 0,
            max_size_pex: 8,
            bitfield: Vec::new(),
            up: Rate::default(),
            down: Rate::default(),
            skip: Rate::default(),
            bytes_done: 0,
            chunks_hashed: 0,
            creation_date: 0,
            peers_min: 40,
            peers_max: 100,
            uploads_max: 15,
            peers_complete: 0,
            peers_accounted: 0,
        }
    }

    /// Uppercase hex rendering of the info hash.
    #[must_use]
    pub fn hash_hex(&self) -> String {
        hex::encode_upper(self.info_hash)
    }

    /// Returns the state section.
    ///
    /// # Errors
    ///
    /// Fails when the state tree lost its section or is not a map.
    pub fn section(&self) -> Result<&Value, CommandError> {
        Ok(self.state.get_key(STATE_SECTION)?)
    }

    /// Returns the state section for mutation.
    ///
    /// # Errors
    ///
    /// Fails when the state tree lost its section or is not a map.
    pub fn section_mut(&mut self) -> Result<&mut Value, CommandError> {
        Ok(self.state.get_key_mut(STATE_SECTION)?)
    }

    /// Uppercase hex rendering of the verified-chunk bitfield, empty when no
    /// bitfield is known.
    #[must_use]
    pub fn bitfield_hex(&self) -> String {
        hex::encode_upper(&self.bitfield)
    }

    /// Enables or disables peer exchange; disabling stops it.
    pub fn set_peer_exchange(&mut self, enabled: bool) {
        self.pex_enabled = enabled;
        if !enabled {
            self.pex_active = false;
        }
    }

    /// Whether the `ignore_commands` variable is set.
    ///
    /// # Errors
    ///
    /// Fails when the state section is damaged.
    pub fn ignores_commands(&self) -> Result<bool, CommandError> {
        Ok(self.section()?.get_key("ignore_commands")?.as_int()? != 0)
    }

    /// Opens storage.
    pub fn open(&mut self) {
        self.open = true;
    }

    /// Closes storage.
    ///
    /// # Errors
    ///
    /// Active downloads cannot be closed.
    pub fn close(&mut self) -> Result<(), CommandError> {
        if self.active {
            return Err(CommandError::input("cannot close an active download"));
        }
        self.open = false;
        Ok(())
    }

    /// Opens and starts the download.
    ///
    /// # Errors
    ///
    /// Fails when the state section is damaged.
    pub fn resume(&mut self) -> Result<(), CommandError> {
        self.open = true;
        self.active = true;
        self.set_state_counter_variable("state", 1)
    }

    /// Stops the download, leaving storage open.
    ///
    /// # Errors
    ///
    /// Fails when the state section is damaged.
    pub fn pause(&mut self) -> Result<(), CommandError> {
        self.active = false;
        self.set_state_counter_variable("state", 0)
    }

    /// Verifies the payload. Completion is recorded immediately.
    ///
    /// # Errors
    ///
    /// Active downloads cannot be rechecked.
    pub fn check_hash(&mut self) -> Result<(), CommandError> {
        if self.active {
            return Err(CommandError::input(
                "cannot check the hash of an active download",
            ));
        }
        self.hash_checking = false;
        self.hash_checked = true;
        self.hash_failed = false;
        self.chunks_hashed = self.files.size_chunks();
        self.bytes_done = self.files.completed_bytes();
        Ok(())
    }

    fn set_state_counter_variable(&mut self, key: &str, value: i64) -> Result<(), CommandError> {
        let section = self.section_mut()?;
        section.insert_key(key, Value::Int(value))?;
        let counter = section.get_key("state_counter")?.as_int()?;
        section.insert_key("state_counter", Value::Int(counter.saturating_add(1)))?;
        Ok(())
    }

    /// Upload ratio in thousandths; zero while verifying or before any data
    /// has been completed.
    #[must_use]
    pub fn ratio(&self) -> i64 {
        if self.hash_checking || self.bytes_done <= 0 {
            return 0;
        }
        self.up
            .total
            .saturating_mul(1000)
            .checked_div(self.bytes_done)
            .unwrap_or(0)
    }

    /// Path of the payload: the root directory for multi-file downloads,
    /// otherwise the single file's path.
    #[must_use]
    pub fn base_path(&self) -> String {
        if self.files.multi_file {
            return self.files.root_dir.clone();
        }
        self.files
            .files
            .first()
            .map(|file| join_path(&self.files.root_dir, &file.path_string()))
            .unwrap_or_default()
    }

    /// Last component of [`Self::base_path`].
    #[must_use]
    pub fn base_filename(&self) -> String {
        let base = self.base_path();
        match base.rsplit_once('/') {
            Some((_, last)) => last.to_owned(),
            None => base,
        }
    }

    /// Sets the storage directory the way `d.set_directory` does: multi-file
    /// downloads get their name appended.
    pub fn set_directory(&mut self, directory: &str) {
        self.files.root_dir = if !self.files.multi_file {
            directory.to_owned()
        } else if directory.is_empty() || directory.ends_with('/') {
            format!("{directory}{}", self.name)
        } else {
            format!("{directory}/{}", self.name)
        };
    }

    /// Human-readable priority name.
    ///
    /// # Errors
    ///
    /// Fails when the priority is outside 0..=3.
    pub fn priority_str(&self) -> Result<&'static str, CommandError> {
        match self.priority {
            0 => Ok("off"),
            1 => Ok("low"),
            2 => Ok("normal"),
            3 => Ok("high"),
            _ => Err(CommandError::input("priority out of range")),
        }
    }

    /// Queues a peer address for connection.
    ///
    /// Accepts `host` or `host:port`; the port defaults to
    /// [`DEFAULT_PEER_PORT`].
    ///
    /// # Errors
    ///
    /// Fails for private downloads, unparsable addresses and ports outside
    /// 1..=65535.
    pub fn add_peer(&mut self, address: &str) -> Result<(), CommandError> {
        if self.private {
            return Err(CommandError::input("download is private"));
        }
        let (host, port) = parse_peer_address(address)?;
        self.pending_peers.push(format!("{host}:{port}"));
        Ok(())
    }
}

fn join_path(root: &str, relative: &str) -> String {
    if root.is_empty() {
        relative.to_owned()
    } else if root.ends_with('/') {
        format!("{root}{relative}")
    } else {
        format!("{root}/{relative}")
    }
}

fn parse_peer_address(address: &str) -> Result<(&str, u16), CommandError> {
    let (host, port) = match address.split_once(':') {
        Some((host, port)) => {
            let port: i64 = port
                .parse()
                .map_err(|_| CommandError::input("could not parse host"))?;
            (host, port)
        }
        None => (address, i64::from(DEFAULT_PEER_PORT)),
    };
    if host.is_empty() {
        return Err(CommandError::input("could not parse host"));
    }
    let port = u16::try_from(port)
        .ok()
        .filter(|port| *port >= 1)
        .ok_or_else(|| CommandError::input("invalid port number"))?;
    Ok((host, port))
}

fn initial_state() -> Value {
    let mut section = ValueMap::new();
    for key in [
        "state",
        "complete",
        "mode",
        "hashing",
        "state_changed",
        "state_counter",
        "ignore_commands",
    ] {
        section.insert(key.to_owned(), Value::Int(0));
    }
    for key in [
        "tied_to_file",
        "loaded_file",
        "throttle_name",
        "custom1",
        "custom2",
        "custom3",
        "custom4",
        "custom5",
    ] {
        section.insert(key.to_owned(), Value::from(""));
    }
    section.insert("connection_leech".to_owned(), Value::from("leech"));
    section.insert("connection_seed".to_owned(), Value::from("seed"));
    section.insert("views".to_owned(), Value::list());
    section.insert("custom".to_owned(), Value::map());

    Value::Map(ValueMap::from([(STATE_SECTION.to_owned(), Value::Map(section))]))
}
