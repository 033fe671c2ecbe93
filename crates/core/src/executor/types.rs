//! Types for bulk execution outcomes.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::registry::ClientDescriptor;
use crate::torrent_client::{QBittorrentClient, TorrentClient, TorrentClientError, TorrentInfo};

/// Runtime failure of one (target, item) pair. Recorded, never propagated.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionError {
    #[error("{target} is unreachable: {reason}")]
    Unreachable { target: String, reason: String },

    #[error("{target} rejected adding {item}: {reason}")]
    AddRejected {
        target: String,
        item: String,
        reason: String,
    },

    #[error("{target} rejected action on {item}: {reason}")]
    ActionRejected {
        target: String,
        item: String,
        reason: String,
    },

    #[error("category '{category}' does not exist on {target}")]
    CategoryMissing { target: String, category: String },
}

/// Which bulk action a report belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Add,
    Copy,
    Start,
    Recheck,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Add => "add",
            ActionKind::Copy => "cp",
            ActionKind::Start => "start",
            ActionKind::Recheck => "recheck",
        }
    }
}

/// What an outcome is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutcomeItem {
    /// The target as a whole (listing or category check failed).
    Target,
    /// A torrent known by hash on some instance.
    Torrent { hash: String, name: String },
    /// A .torrent payload read from disk.
    Payload { hash: String, label: String },
}

impl OutcomeItem {
    pub fn torrent(info: &TorrentInfo) -> Self {
        OutcomeItem::Torrent {
            hash: info.hash.clone(),
            name: info.name.clone(),
        }
    }

    /// Hash of the item, if it has one.
    pub fn hash(&self) -> Option<&str> {
        match self {
            OutcomeItem::Target => None,
            OutcomeItem::Torrent { hash, .. } | OutcomeItem::Payload { hash, .. } => {
                Some(hash.as_str())
            }
        }
    }

    /// Short label for reports.
    pub fn label(&self) -> &str {
        match self {
            OutcomeItem::Target => "*",
            OutcomeItem::Torrent { name, .. } => name.as_str(),
            OutcomeItem::Payload { label, .. } => label.as_str(),
        }
    }
}

/// Why an item was not acted upon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The target already has a torrent with this hash.
    AlreadyPresent,
    /// Shutdown was requested before the item started.
    Cancelled,
    /// The torrent's category lies outside the target's category scope.
    OutsideScope,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::AlreadyPresent => "already present",
            SkipReason::Cancelled => "cancelled",
            SkipReason::OutsideScope => "outside category scope",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    Succeeded,
    /// Dry run: the action would have been issued.
    WouldAct,
    Skipped { reason: SkipReason },
    Failed { error: ActionError },
}

impl OutcomeStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, OutcomeStatus::Failed { .. })
    }

    /// Whether the item is on the target after this outcome.
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            OutcomeStatus::Succeeded
                | OutcomeStatus::Skipped {
                    reason: SkipReason::AlreadyPresent
                }
        )
    }
}

/// Outcome of one (target, item) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionOutcome {
    pub target: String,
    pub item: OutcomeItem,
    #[serde(flatten)]
    pub status: OutcomeStatus,
}

impl ActionOutcome {
    pub fn new(target: impl Into<String>, item: OutcomeItem, status: OutcomeStatus) -> Self {
        Self {
            target: target.into(),
            item,
            status,
        }
    }
}

/// Outcome counts by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub succeeded: usize,
    pub would_act: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Aggregated result of one bulk command.
#[derive(Debug, Clone, Serialize)]
pub struct CommandReport {
    pub action: ActionKind,
    pub dry_run: bool,
    pub outcomes: Vec<ActionOutcome>,
    /// Payload files removed after being added everywhere.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub deleted: Vec<PathBuf>,
}

impl CommandReport {
    pub fn new(action: ActionKind, dry_run: bool, outcomes: Vec<ActionOutcome>) -> Self {
        Self {
            action,
            dry_run,
            outcomes,
            deleted: Vec::new(),
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &ActionOutcome> {
        self.outcomes.iter().filter(|o| o.status.is_failed())
    }

    pub fn summary(&self) -> ReportSummary {
        let mut summary = ReportSummary::default();
        for outcome in &self.outcomes {
            match outcome.status {
                OutcomeStatus::Succeeded => summary.succeeded += 1,
                OutcomeStatus::WouldAct => summary.would_act += 1,
                OutcomeStatus::Skipped { .. } => summary.skipped += 1,
                OutcomeStatus::Failed { .. } => summary.failed += 1,
            }
        }
        summary
    }

    /// Dry runs always succeed; real runs succeed when nothing failed.
    pub fn is_success(&self) -> bool {
        self.dry_run || self.failures().next().is_none()
    }

    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            0
        } else {
            1
        }
    }
}

/// Outcomes appended concurrently by per-target tasks.
///
/// Entries carry (target index, item index) so the final report is ordered
/// deterministically no matter which task finished first.
#[derive(Debug, Clone, Default)]
pub struct OutcomeLog {
    entries: Arc<RwLock<Vec<(usize, usize, ActionOutcome)>>>,
}

impl OutcomeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push(&self, target_idx: usize, item_idx: usize, outcome: ActionOutcome) {
        self.entries
            .write()
            .await
            .push((target_idx, item_idx, outcome));
    }

    pub async fn into_sorted(self) -> Vec<ActionOutcome> {
        let mut entries = std::mem::take(&mut *self.entries.write().await);
        entries.sort_by_key(|(t, i, _)| (*t, *i));
        entries.into_iter().map(|(_, _, o)| o).collect()
    }
}

/// A resolved client paired with the gateway that talks to it.
#[derive(Clone)]
pub struct Target {
    pub descriptor: Arc<ClientDescriptor>,
    pub client: Arc<dyn TorrentClient>,
}

impl Target {
    pub fn new(descriptor: Arc<ClientDescriptor>, client: Arc<dyn TorrentClient>) -> Self {
        Self { descriptor, client }
    }

    /// Build a qBittorrent-backed target.
    pub fn connect(descriptor: Arc<ClientDescriptor>) -> Result<Self, TorrentClientError> {
        let client = QBittorrentClient::new(&descriptor)?;
        Ok(Self::new(descriptor, Arc::new(client)))
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// Category scope of the client, if any.
    pub fn scope(&self) -> Option<&str> {
        self.descriptor.category.as_deref()
    }
}

impl std::fmt::Debug for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Target")
            .field("descriptor", &self.descriptor)
            .field("client", &self.client.name())
            .finish()
    }
}

/// Filtered listing of one target, or why it could not be fetched.
#[derive(Debug, Clone, Serialize)]
pub struct TargetListing {
    pub target: String,
    pub torrents: Vec<TorrentInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ActionError>,
}
