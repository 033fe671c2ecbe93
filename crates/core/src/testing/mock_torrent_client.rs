//! Mock torrent client for testing.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::filter::category::is_within;
use crate::torrent_client::{
    AddTorrentRequest, AddTorrentResult, Reachability, TorrentClient, TorrentClientError,
    TorrentInfo,
};

/// A recorded mutating or export call for test assertions.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    Add {
        hash: String,
        category: Option<String>,
        stopped: bool,
    },
    Start(Vec<String>),
    Recheck(Vec<String>),
    Export(String),
}

/// Mock implementation of the TorrentClient trait.
///
/// Provides controllable behavior for testing:
/// - Record every add/start/recheck/export call in order
/// - Pre-populate listings
/// - Simulate an unreachable instance or rejected adds
///
/// # Example
///
/// ```rust,ignore
/// let client = MockTorrentClient::new("aClient");
/// client.add_mock_torrent(fixtures::torrent("abc", "movies", "stoppedUP", 1.0)).await;
///
/// client.reject_adds_for("def").await;
/// client.set_unreachable(true);
///
/// let calls = client.calls().await;
/// ```
#[derive(Debug)]
pub struct MockTorrentClient {
    name: String,
    /// Torrents in listing order.
    torrents: Arc<RwLock<Vec<TorrentInfo>>>,
    /// Recorded calls.
    calls: Arc<RwLock<Vec<RecordedCall>>>,
    /// Categories reported by `categories()`.
    categories: Arc<RwLock<Vec<String>>>,
    /// If set, the next operation will fail with this error.
    next_error: Arc<RwLock<Option<TorrentClientError>>>,
    /// Hashes whose add is refused.
    rejected: Arc<RwLock<HashSet<String>>>,
    /// Whether every call fails with a connection error.
    unreachable: AtomicBool,
    /// Number of `logout` calls.
    logouts: AtomicUsize,
}

impl MockTorrentClient {
    /// Create a new mock torrent client.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            torrents: Arc::new(RwLock::new(Vec::new())),
            calls: Arc::new(RwLock::new(Vec::new())),
            categories: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            rejected: Arc::new(RwLock::new(HashSet::new())),
            unreachable: AtomicBool::new(false),
            logouts: AtomicUsize::new(0),
        }
    }

    /// Number of times the session was closed.
    pub fn logout_count(&self) -> usize {
        self.logouts.load(Ordering::SeqCst)
    }

    /// Get all recorded calls.
    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.calls.read().await.clone()
    }

    /// Hashes passed to `add_torrent`, in call order.
    pub async fn added_hashes(&self) -> Vec<String> {
        self.calls
            .read()
            .await
            .iter()
            .filter_map(|c| match c {
                RecordedCall::Add { hash, .. } => Some(hash.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of calls that change instance state.
    pub async fn mutation_count(&self) -> usize {
        self.calls
            .read()
            .await
            .iter()
            .filter(|c| !matches!(c, RecordedCall::Export(_)))
            .count()
    }

    /// Clear recorded calls.
    pub async fn clear_recorded(&self) {
        self.calls.write().await.clear();
    }

    /// Pre-populate a torrent (for testing list operations).
    pub async fn add_mock_torrent(&self, info: TorrentInfo) {
        self.torrents.write().await.push(info);
    }

    /// Current state of a torrent.
    pub async fn torrent(&self, hash: &str) -> Option<TorrentInfo> {
        self.torrents
            .read()
            .await
            .iter()
            .find(|t| t.hash == hash)
            .cloned()
    }

    /// Get the number of torrents.
    pub async fn torrent_count(&self) -> usize {
        self.torrents.read().await.len()
    }

    /// Set the categories the instance reports.
    pub async fn set_categories(&self, categories: &[&str]) {
        *self.categories.write().await = categories.iter().map(|c| c.to_string()).collect();
    }

    /// Refuse every add of the given hash.
    pub async fn reject_adds_for(&self, hash: &str) {
        self.rejected.write().await.insert(hash.to_lowercase());
    }

    /// Make every call fail as if the instance were down.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Configure the next operation to fail with the given error.
    pub async fn set_next_error(&self, error: TorrentClientError) {
        *self.next_error.write().await = Some(error);
    }

    /// Pending injected error, or a connection error when unreachable.
    async fn take_error(&self) -> Option<TorrentClientError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Some(TorrentClientError::ConnectionFailed(format!(
                "{}: connection refused",
                self.name
            )));
        }
        self.next_error.write().await.take()
    }

    async fn set_state(&self, hashes: &[String], state_for: impl Fn(&TorrentInfo) -> &'static str) {
        let mut torrents = self.torrents.write().await;
        for torrent in torrents.iter_mut().filter(|t| hashes.contains(&t.hash)) {
            torrent.state = state_for(torrent).to_string();
        }
    }
}

#[async_trait]
impl TorrentClient for MockTorrentClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_torrents(
        &self,
        category: Option<&str>,
    ) -> Result<Vec<TorrentInfo>, TorrentClientError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }

        Ok(self
            .torrents
            .read()
            .await
            .iter()
            .filter(|t| category.is_none_or(|scope| is_within(&t.category, scope)))
            .cloned()
            .collect())
    }

    async fn categories(&self) -> Result<Vec<String>, TorrentClientError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }
        Ok(self.categories.read().await.clone())
    }

    async fn add_torrent(
        &self,
        request: AddTorrentRequest,
    ) -> Result<AddTorrentResult, TorrentClientError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }

        let hash = request.hash.to_lowercase();
        self.calls.write().await.push(RecordedCall::Add {
            hash: hash.clone(),
            category: request.category.clone(),
            stopped: request.stopped,
        });

        if self.rejected.read().await.contains(&hash) {
            return Err(TorrentClientError::Rejected(format!(
                "{} refused torrent {}",
                self.name, hash
            )));
        }

        let mut torrents = self.torrents.write().await;
        if !torrents.iter().any(|t| t.hash == hash) {
            let hash_prefix = if hash.len() >= 8 { &hash[..8] } else { &hash };
            torrents.push(TorrentInfo {
                hash: hash.clone(),
                name: request
                    .filename
                    .clone()
                    .unwrap_or_else(|| format!("Mock Torrent {}", hash_prefix)),
                category: request.category.clone().unwrap_or_default(),
                state: if request.stopped { "stoppedDL" } else { "downloading" }.to_string(),
                progress: 0.0,
                size_bytes: 100 * 1024 * 1024, // 100 MB default
                download_speed: 0,
                upload_speed: 0,
                added_at: Some(Utc::now()),
            });
        }

        Ok(AddTorrentResult { hash })
    }

    async fn start_torrents(&self, hashes: &[String]) -> Result<(), TorrentClientError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }
        self.calls
            .write()
            .await
            .push(RecordedCall::Start(hashes.to_vec()));
        self.set_state(hashes, |t| {
            if t.is_complete() {
                "stalledUP"
            } else {
                "stalledDL"
            }
        })
        .await;
        Ok(())
    }

    async fn recheck_torrents(&self, hashes: &[String]) -> Result<(), TorrentClientError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }
        self.calls
            .write()
            .await
            .push(RecordedCall::Recheck(hashes.to_vec()));
        self.set_state(hashes, |t| {
            if t.is_complete() {
                "checkingUP"
            } else {
                "checkingDL"
            }
        })
        .await;
        Ok(())
    }

    async fn export_torrent(&self, hash: &str) -> Result<Vec<u8>, TorrentClientError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }
        self.calls
            .write()
            .await
            .push(RecordedCall::Export(hash.to_string()));

        match self.torrent(hash).await {
            Some(t) => Ok(format!("mock-torrent:{}", t.hash).into_bytes()),
            None => Err(TorrentClientError::TorrentNotFound(hash.to_string())),
        }
    }

    async fn logout(&self) -> Result<(), TorrentClientError> {
        self.logouts.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.take_error().await {
            return Err(err);
        }
        Ok(())
    }

    async fn probe(&self) -> Reachability {
        if self.unreachable.load(Ordering::SeqCst) {
            Reachability::Unreachable(format!("{}: connection refused", self.name))
        } else {
            Reachability::Reachable
        }
    }
}
