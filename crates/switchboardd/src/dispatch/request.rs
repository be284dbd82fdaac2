//! Request lines and the target specs they carry.

use serde::Deserialize;
use serde_json::error::Category;
use switchboard::{DownloadId, FileCursor, FileRef, PeerRef, Session, Target, TrackerRef, Value};

use super::errors::DispatchError;

/// One RPC call.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RpcRequest {
    /// Command key or `system.*` built-in.
    pub method: String,
    /// Entity the command runs against.
    #[serde(default)]
    pub target: TargetSpec,
    /// Argument value handed to the command unchanged.
    #[serde(default)]
    pub params: Value,
}

/// Entity named by download hash and position, as sent by clients.
///
/// Serialised in serde's external tagging: `"generic"`,
/// `{"download": "<hash>"}`, `{"file": ["<hash>", 0]}` and so on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetSpec {
    /// No entity.
    #[default]
    Generic,
    /// A download.
    Download(String),
    /// A file by index.
    File(String, usize),
    /// A file cursor at a position.
    FileCursor(String, usize),
    /// A peer by index.
    Peer(String, usize),
    /// A tracker by index.
    Tracker(String, usize),
    /// Two downloads.
    DownloadPair(String, String),
}

impl RpcRequest {
    /// Parses one request line. Trailing whitespace, including the newline,
    /// is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::MalformedJsonl`] for empty or non-JSON lines
    /// and [`DispatchError::InvalidStructure`] for JSON that does not match
    /// the request shape or names an empty method.
    pub fn parse(line: &[u8]) -> Result<Self, DispatchError> {
        let trimmed = line.trim_ascii_end();
        if trimmed.is_empty() {
            return Err(DispatchError::malformed("empty request line"));
        }

        let request: Self = serde_json::from_slice(trimmed).map_err(|error| match error.classify() {
            Category::Data => DispatchError::invalid_structure(error.to_string()),
            Category::Io | Category::Syntax | Category::Eof => {
                DispatchError::malformed(error.to_string())
            }
        })?;
        request.validate()?;
        Ok(request)
    }

    fn validate(&self) -> Result<(), DispatchError> {
        if self.method.trim().is_empty() {
            return Err(DispatchError::invalid_structure("method is empty"));
        }
        Ok(())
    }
}

impl TargetSpec {
    /// Resolves the named entity against `session`.
    ///
    /// Only hashes are checked here; positions are validated when the
    /// command dereferences its handle.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::UnknownDownload`] when a hash is not in the
    /// session.
    pub fn resolve(&self, session: &Session) -> Result<Target, DispatchError> {
        let lookup = |hash: &str| -> Result<DownloadId, DispatchError> {
            session
                .find_by_hex(hash)
                .ok_or_else(|| DispatchError::unknown_download(hash))
        };

        Ok(match self {
            Self::Generic => Target::generic(),
            Self::Download(hash) => Target::download(lookup(hash)?),
            Self::File(hash, index) => Target::file(FileRef {
                download: lookup(hash)?,
                index: *index,
            }),
            Self::FileCursor(hash, position) => Target::file_cursor(FileCursor {
                download: lookup(hash)?,
                position: *position,
            }),
            Self::Peer(hash, index) => Target::peer(PeerRef {
                download: lookup(hash)?,
                index: *index,
            }),
            Self::Tracker(hash, index) => Target::tracker(TrackerRef {
                download: lookup(hash)?,
                index: *index,
            }),
            Self::DownloadPair(first, second) => Target::download_pair(lookup(first)?, lookup(second)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use switchboard::{Download, TargetKind};

    use super::*;

    const HASH: &str = "0101010101010101010101010101010101010101";

    fn session() -> Session {
        let mut session = Session::new();
        session.insert(Download::new("one", [1; 20]));
        session
    }

    #[test]
    fn parses_minimal_request() {
        let request = RpcRequest::parse(br#"{"method":"download_list"}"#).expect("parse");
        assert_eq!(request.method, "download_list");
        assert_eq!(request.target, TargetSpec::Generic);
        assert_eq!(request.params, Value::Empty);
    }

    #[test]
    fn parses_target_and_params() {
        let line = format!(
            "{{\"method\":\"f.multicall\",\"target\":{{\"download\":\"{HASH}\"}},\"params\":[\"\",\"f.get_path\"]}}\n"
        );
        let request = RpcRequest::parse(line.as_bytes()).expect("parse");
        assert_eq!(request.target, TargetSpec::Download(HASH.to_owned()));
        assert_eq!(
            request.params,
            Value::List(vec![Value::from(""), Value::from("f.get_path")])
        );
    }

    #[rstest]
    #[case(b"".as_slice())]
    #[case(b"   \n".as_slice())]
    #[case(b"not json".as_slice())]
    #[case(b"{\"method\":".as_slice())]
    fn rejects_malformed_lines(#[case] line: &[u8]) {
        let result = RpcRequest::parse(line);
        assert!(matches!(result, Err(DispatchError::MalformedJsonl { .. })));
    }

    #[rstest]
    #[case(br#"{"target":"generic"}"#.as_slice())]
    #[case(br#"{"method":"  "}"#.as_slice())]
    #[case(br#"{"method":"x","target":{"galaxy":"far"}}"#.as_slice())]
    #[case(br#"{"method":"x","extra":1}"#.as_slice())]
    #[case(br#"{"method":"x","params":1.5}"#.as_slice())]
    fn rejects_invalid_structure(#[case] line: &[u8]) {
        let result = RpcRequest::parse(line);
        assert!(
            matches!(result, Err(DispatchError::InvalidStructure { .. })),
            "unexpected {result:?}"
        );
    }

    #[rstest]
    #[case(TargetSpec::Generic, TargetKind::Generic)]
    #[case(TargetSpec::Download(HASH.to_owned()), TargetKind::Download)]
    #[case(TargetSpec::File(HASH.to_lowercase(), 4), TargetKind::File)]
    #[case(TargetSpec::FileCursor(HASH.to_owned(), 0), TargetKind::FileIterator)]
    #[case(TargetSpec::Peer(HASH.to_owned(), 1), TargetKind::Peer)]
    #[case(TargetSpec::Tracker(HASH.to_owned(), 2), TargetKind::Tracker)]
    #[case(TargetSpec::DownloadPair(HASH.to_owned(), HASH.to_owned()), TargetKind::DownloadPair)]
    fn resolves_known_hashes(#[case] spec: TargetSpec, #[case] kind: TargetKind) {
        let target = spec.resolve(&session()).expect("resolve");
        assert_eq!(target.kind(), kind);
    }

    #[test]
    fn unknown_hash_is_reported() {
        let spec = TargetSpec::Download("FF".repeat(20));
        let error = spec.resolve(&session()).expect_err("unknown");
        assert!(matches!(error, DispatchError::UnknownDownload { .. }));
    }
}
