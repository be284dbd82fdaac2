//! File lists and the files they contain.

/// Default piece size used when a manifest does not name one.
pub const DEFAULT_CHUNK_SIZE: i64 = 256 * 1024;

/// A single file of a download.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct File {
    /// Path components relative to the download's root directory.
    pub path: Vec<String>,
    /// Size in bytes.
    pub size_bytes: i64,
    /// Chunks of this file that have been verified.
    pub completed_chunks: i64,
    /// Download priority: 0 off, 1 normal, 2 high.
    pub priority: i64,
}

impl File {
    /// Creates a file from a slash-separated relative path.
    #[must_use]
    pub fn new(path: &str, size_bytes: i64) -> Self {
        Self {
            path: path
                .split('/')
                .filter(|component| !component.is_empty())
                .map(str::to_owned)
                .collect(),
            size_bytes,
            completed_chunks: 0,
            priority: 1,
        }
    }

    /// Returns the relative path joined with `/`.
    #[must_use]
    pub fn path_string(&self) -> String {
        self.path.join("/")
    }
}

/// Ordered files of a download together with their layout parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileList {
    /// Directory the files are stored under.
    pub root_dir: String,
    /// Whether the download is stored as a directory of files.
    pub multi_file: bool,
    /// Piece size in bytes.
    pub chunk_size: i64,
    /// Largest file the download may create, 0 for no limit.
    pub max_file_size: i64,
    /// Files in torrent order.
    pub files: Vec<File>,
}

impl Default for FileList {
    fn default() -> Self {
        Self {
            root_dir: String::new(),
            multi_file: false,
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_file_size: 0,
            files: Vec::new(),
        }
    }
}

impl FileList {
    /// Number of files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns true when the list holds no files.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Total size of all files.
    #[must_use]
    pub fn size_bytes(&self) -> i64 {
        saturating_sum(self.files.iter().map(|file| file.size_bytes))
    }

    fn chunk(&self) -> i64 {
        self.chunk_size.max(1)
    }

    /// Whole chunks preceding byte `offset`.
    fn chunk_floor(&self, offset: i64) -> i64 {
        offset.checked_div(self.chunk()).unwrap_or(0)
    }

    /// Chunks needed to cover the first `offset` bytes.
    fn chunk_ceil(&self, offset: i64) -> i64 {
        let floor = self.chunk_floor(offset);
        if offset.checked_rem(self.chunk()).unwrap_or(0) > 0 {
            floor.saturating_add(1)
        } else {
            floor
        }
    }

    /// Number of chunks spanning every file.
    #[must_use]
    pub fn size_chunks(&self) -> i64 {
        self.chunk_ceil(self.size_bytes())
    }

    /// Verified chunks across the download, capped at [`Self::size_chunks`].
    #[must_use]
    pub fn completed_chunks(&self) -> i64 {
        saturating_sum(self.files.iter().map(|file| file.completed_chunks)).min(self.size_chunks())
    }

    /// Bytes covered by verified chunks.
    #[must_use]
    pub fn completed_bytes(&self) -> i64 {
        self.completed_chunks()
            .saturating_mul(self.chunk())
            .min(self.size_bytes())
    }

    /// Bytes still missing.
    #[must_use]
    pub fn left_bytes(&self) -> i64 {
        self.size_bytes().saturating_sub(self.completed_bytes())
    }

    /// Byte offset of the file at `index` within the concatenated payload.
    #[must_use]
    pub fn offset(&self, index: usize) -> i64 {
        saturating_sum(self.files.iter().take(index).map(|file| file.size_bytes))
    }

    /// Number of chunks the file at `index` touches.
    #[must_use]
    pub fn file_chunks(&self, index: usize) -> i64 {
        let Some(file) = self.files.get(index) else {
            return 0;
        };
        if file.size_bytes <= 0 {
            return 0;
        }
        let start = self.offset(index);
        let end = start.saturating_add(file.size_bytes);
        self.chunk_ceil(end).saturating_sub(self.chunk_floor(start))
    }
}

fn saturating_sum(values: impl Iterator<Item = i64>) -> i64 {
    values.fold(0, i64::saturating_add)
}
