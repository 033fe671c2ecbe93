//! Testing utilities and mock implementations.
//!
//! This module provides a mock `TorrentClient` and fixtures, allowing the
//! executor to be exercised against several fake instances without a real
//! qBittorrent.
//!
//! # Example
//!
//! ```rust,ignore
//! use seedbox_core::testing::{fixtures, MockTorrentClient};
//!
//! let source = MockTorrentClient::new("aClient");
//! source.add_mock_torrent(fixtures::torrent("abc", "movies", "stoppedUP", 1.0)).await;
//!
//! let dest = MockTorrentClient::new("bClient");
//! dest.set_unreachable(true);
//! ```

mod mock_torrent_client;

pub use mock_torrent_client::{MockTorrentClient, RecordedCall};

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::registry::ClientDescriptor;
    use crate::torrent_client::TorrentInfo;

    /// Create a torrent record with reasonable defaults.
    pub fn torrent(hash: &str, category: &str, state: &str, progress: f64) -> TorrentInfo {
        TorrentInfo {
            hash: hash.to_string(),
            name: format!("Torrent {}", hash),
            category: category.to_string(),
            state: state.to_string(),
            progress,
            size_bytes: 1024 * 1024 * 100, // 100 MB
            download_speed: 0,
            upload_speed: 0,
            added_at: None,
        }
    }

    /// Create a torrent record that is actively transferring.
    pub fn active_torrent(hash: &str, download_speed: u64, upload_speed: u64) -> TorrentInfo {
        let progress = if download_speed > 0 { 0.5 } else { 1.0 };
        let state = if download_speed > 0 { "downloading" } else { "uploading" };
        TorrentInfo {
            download_speed,
            upload_speed,
            ..torrent(hash, "", state, progress)
        }
    }

    /// Bencoded single-file .torrent whose info hash depends on `name`.
    pub fn torrent_bytes(name: &str) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(b"d8:announce23:http://tracker.test/ann4:infod");
        data.extend_from_slice(b"6:lengthi12345e");
        data.extend_from_slice(format!("4:name{}:{}", name.len(), name).as_bytes());
        data.extend_from_slice(b"12:piece lengthi16384e");
        data.extend_from_slice(b"6:pieces20:");
        data.extend_from_slice(&[0xab; 20]);
        data.extend_from_slice(b"ee");
        data
    }

    /// Client descriptor pointing nowhere in particular.
    pub fn descriptor(name: &str, category: Option<&str>) -> ClientDescriptor {
        ClientDescriptor {
            name: name.to_string(),
            url: format!("http://{}.test:8080", name.to_lowercase()),
            username: "admin".to_string(),
            password: "adminadmin".to_string(),
            category: category.map(String::from),
            timeout_secs: 30,
        }
    }
}
