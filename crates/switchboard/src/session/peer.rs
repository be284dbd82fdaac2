//! Peer connections and trackers attached to a download.

/// A transfer rate with its running total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rate {
    /// Current rate in bytes per second.
    pub rate: i64,
    /// Bytes transferred so far.
    pub total: i64,
}

/// A connected peer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Peer {
    /// Remote address.
    pub address: String,
    /// Remote port.
    pub port: u16,
    /// Client name and version reported by the peer.
    pub client_version: String,
    /// Peer id.
    pub id: [u8; 20],
    /// Upload rate towards the peer.
    pub up: Rate,
    /// Download rate from the peer.
    pub down: Rate,
    /// Whether the connection is encrypted.
    pub encrypted: bool,
    /// Whether the peer initiated the connection.
    pub incoming: bool,
    /// Share of the payload the peer has, in percent.
    pub completed_percent: i64,
}

/// Announce protocol of a tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackerType {
    /// HTTP announce.
    #[default]
    Http,
    /// UDP announce.
    Udp,
    /// Distributed hash table.
    Dht,
}

impl TrackerType {
    /// Numeric code reported by `t.get_type`.
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::Http => 1,
            Self::Udp => 2,
            Self::Dht => 3,
        }
    }

    /// Infers the protocol from an announce URL.
    #[must_use]
    pub fn from_url(url: &str) -> Self {
        if url.starts_with("udp://") {
            Self::Udp
        } else if url.starts_with("dht://") {
            Self::Dht
        } else {
            Self::Http
        }
    }
}

/// A tracker of a download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tracker {
    /// Announce URL.
    pub url: String,
    /// Tier the tracker belongs to.
    pub group: i64,
    /// Announce protocol.
    pub kind: TrackerType,
    /// Whether the tracker is used.
    pub enabled: bool,
    /// Seeders reported by the last scrape.
    pub scrape_complete: i64,
    /// Leechers reported by the last scrape.
    pub scrape_incomplete: i64,
    /// Completed downloads reported by the last scrape.
    pub scrape_downloaded: i64,
}

impl Tracker {
    /// Creates an enabled tracker in `group`.
    #[must_use]
    pub fn new(url: impl Into<String>, group: i64) -> Self {
        let url = url.into();
        Self {
            kind: TrackerType::from_url(&url),
            url,
            group,
            enabled: true,
            scrape_complete: 0,
            scrape_incomplete: 0,
            scrape_downloaded: 0,
        }
    }
}

/// Ordered trackers of a download.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TrackerList {
    /// Trackers in announce order.
    pub trackers: Vec<Tracker>,
    /// Peers requested per announce, -1 for the tracker's default.
    pub numwant: i64,
    /// Index of the tracker currently in use.
    pub focus: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("http://tracker.example/announce", TrackerType::Http)]
    #[case("udp://tracker.example:6969", TrackerType::Udp)]
    #[case("dht://", TrackerType::Dht)]
    fn tracker_type_follows_url_scheme(#[case] url: &str, #[case] expected: TrackerType) {
        let tracker = Tracker::new(url, 0);
        assert_eq!(tracker.kind, expected);
        assert!(tracker.enabled);
    }
}
