//! Types for torrent client operations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during torrent client operations.
#[derive(Debug, Error)]
pub enum TorrentClientError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Torrent not found: {0}")]
    TorrentNotFound(String),

    #[error("Invalid torrent data: {0}")]
    InvalidTorrent(String),

    /// The instance answered but refused the request (qBittorrent `Fails.`).
    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Request timeout")]
    Timeout,
}

impl TorrentClientError {
    /// Whether the error means the instance could not be reached at all.
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            TorrentClientError::ConnectionFailed(_) | TorrentClientError::Timeout
        )
    }
}

/// Result of probing an instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reachability {
    Reachable,
    Unreachable(String),
}

impl Reachability {
    pub fn is_reachable(&self) -> bool {
        matches!(self, Reachability::Reachable)
    }
}

/// Information about a torrent as reported by an instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TorrentInfo {
    /// Info hash (lowercase hex).
    pub hash: String,
    /// Torrent name.
    pub name: String,
    /// Category, empty when uncategorized. Subcategories use `/`.
    #[serde(default)]
    pub category: String,
    /// Raw state token as reported by the client (e.g. `stoppedUP`).
    pub state: String,
    /// Completion fraction (0.0 - 1.0).
    pub progress: f64,
    /// Total size in bytes.
    pub size_bytes: u64,
    /// Current download speed in bytes/second.
    pub download_speed: u64,
    /// Current upload speed in bytes/second.
    pub upload_speed: u64,
    /// When the torrent was added.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub added_at: Option<DateTime<Utc>>,
}

impl TorrentInfo {
    /// Whether payload data is currently flowing to peers.
    pub fn is_uploading(&self) -> bool {
        self.upload_speed > 0
    }

    /// Whether payload data is currently flowing from peers.
    pub fn is_downloading(&self) -> bool {
        self.download_speed > 0
    }

    /// Whether every piece has been downloaded and verified.
    pub fn is_complete(&self) -> bool {
        self.progress >= 1.0
    }
}

/// Request to add a `.torrent` file to an instance.
#[derive(Debug, Clone)]
pub struct AddTorrentRequest {
    /// Raw .torrent file bytes.
    pub data: Vec<u8>,
    /// Info hash of `data` (lowercase hex).
    pub hash: String,
    /// Original filename (for the multipart upload and logging).
    pub filename: Option<String>,
    /// Optional category.
    pub category: Option<String>,
    /// Add in a stopped state.
    pub stopped: bool,
}

impl AddTorrentRequest {
    /// Create a request with default options.
    pub fn new(data: Vec<u8>, hash: impl Into<String>) -> Self {
        Self {
            data,
            hash: hash.into(),
            filename: None,
            category: None,
            stopped: false,
        }
    }

    /// Set the upload filename.
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Set the category. Empty categories are treated as none.
    pub fn with_category(mut self, category: Option<String>) -> Self {
        self.category = category.filter(|c| !c.is_empty());
        self
    }

    /// Set whether to add in a stopped state.
    pub fn with_stopped(mut self, stopped: bool) -> Self {
        self.stopped = stopped;
        self
    }
}

/// Result of adding a torrent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddTorrentResult {
    /// Info hash of the added torrent.
    pub hash: String,
}

/// Control API of a single torrent client instance.
#[async_trait]
pub trait TorrentClient: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// List torrents, restricted to a category when given.
    async fn list_torrents(
        &self,
        category: Option<&str>,
    ) -> Result<Vec<TorrentInfo>, TorrentClientError>;

    /// Names of the categories known to the instance.
    async fn categories(&self) -> Result<Vec<String>, TorrentClientError>;

    /// Add a new torrent.
    async fn add_torrent(
        &self,
        request: AddTorrentRequest,
    ) -> Result<AddTorrentResult, TorrentClientError>;

    /// Start (resume) the given torrents.
    async fn start_torrents(&self, hashes: &[String]) -> Result<(), TorrentClientError>;

    /// Recheck/verify the given torrents.
    async fn recheck_torrents(&self, hashes: &[String]) -> Result<(), TorrentClientError>;

    /// Export the raw .torrent file of a torrent.
    async fn export_torrent(&self, hash: &str) -> Result<Vec<u8>, TorrentClientError>;

    /// Check whether the instance answers at all.
    async fn probe(&self) -> Reachability;

    /// End the API session, if one was opened.
    async fn logout(&self) -> Result<(), TorrentClientError>;
}
