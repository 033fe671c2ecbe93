//! Status filters over torrent records.
//!
//! Statuses overlap: a stopped, fully downloaded torrent is both `stopped`
//! and `completed`. Every filter is therefore its own predicate over the raw
//! fields, and the compound filters are conjunctions of the base ones.

use std::fmt;
use std::str::FromStr;

use super::FilterError;
use crate::torrent_client::TorrentInfo;

const STOPPED_STATES: &[&str] = &["stoppedDL", "stoppedUP", "pausedDL", "pausedUP"];
const CHECKING_STATES: &[&str] = &["checkingDL", "checkingUP", "checkingResumeData"];
const ERRORED_STATES: &[&str] = &["error", "missingFiles"];

/// A named status filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Downloading,
    Seeding,
    Completed,
    /// Also accepted as `paused`.
    Stopped,
    /// Also accepted as `resumed`.
    Running,
    Active,
    Inactive,
    Stalled,
    StalledUploading,
    StalledDownloading,
    Checking,
    Moving,
    Errored,
    CompletedStopped,
    DownloadingStopped,
}

impl StatusFilter {
    /// Every filter, in display order.
    pub const ALL: &'static [StatusFilter] = &[
        StatusFilter::All,
        StatusFilter::Downloading,
        StatusFilter::Seeding,
        StatusFilter::Completed,
        StatusFilter::Stopped,
        StatusFilter::Running,
        StatusFilter::Active,
        StatusFilter::Inactive,
        StatusFilter::Stalled,
        StatusFilter::StalledUploading,
        StatusFilter::StalledDownloading,
        StatusFilter::Checking,
        StatusFilter::Moving,
        StatusFilter::Errored,
        StatusFilter::CompletedStopped,
        StatusFilter::DownloadingStopped,
    ];

    /// Canonical name.
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusFilter::All => "all",
            StatusFilter::Downloading => "downloading",
            StatusFilter::Seeding => "seeding",
            StatusFilter::Completed => "completed",
            StatusFilter::Stopped => "stopped",
            StatusFilter::Running => "running",
            StatusFilter::Active => "active",
            StatusFilter::Inactive => "inactive",
            StatusFilter::Stalled => "stalled",
            StatusFilter::StalledUploading => "stalled_uploading",
            StatusFilter::StalledDownloading => "stalled_downloading",
            StatusFilter::Checking => "checking",
            StatusFilter::Moving => "moving",
            StatusFilter::Errored => "errored",
            StatusFilter::CompletedStopped => "completed_stopped",
            StatusFilter::DownloadingStopped => "downloading_stopped",
        }
    }

    /// Evaluate the filter against a torrent.
    pub fn matches(&self, t: &TorrentInfo) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Downloading => !is_completed(t) && !is_errored(t),
            StatusFilter::Seeding => is_completed(t) && !is_stopped(t) && t.is_uploading(),
            StatusFilter::Completed => is_completed(t),
            StatusFilter::Stopped => is_stopped(t),
            StatusFilter::Running => !is_stopped(t),
            StatusFilter::Active => is_active(t),
            StatusFilter::Inactive => !is_active(t),
            StatusFilter::Stalled => is_stalled(t),
            StatusFilter::StalledUploading => is_stalled(t) && is_completed(t),
            StatusFilter::StalledDownloading => is_stalled(t) && !is_completed(t),
            StatusFilter::Checking => CHECKING_STATES.contains(&t.state.as_str()),
            StatusFilter::Moving => t.state == "moving",
            StatusFilter::Errored => is_errored(t),
            StatusFilter::CompletedStopped => is_stopped(t) && is_completed(t),
            StatusFilter::DownloadingStopped => is_stopped(t) && !is_completed(t),
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusFilter {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase().replace('-', "_");
        match name.as_str() {
            "paused" => return Ok(StatusFilter::Stopped),
            "resumed" => return Ok(StatusFilter::Running),
            _ => {}
        }
        StatusFilter::ALL
            .iter()
            .find(|f| f.as_str() == name)
            .copied()
            .ok_or_else(|| FilterError::UnknownFilter(s.to_string()))
    }
}

/// Evaluate a filter given by name.
pub fn matches(torrent: &TorrentInfo, filter_name: &str) -> Result<bool, FilterError> {
    Ok(filter_name.parse::<StatusFilter>()?.matches(torrent))
}

fn is_completed(t: &TorrentInfo) -> bool {
    t.is_complete()
}

fn is_stopped(t: &TorrentInfo) -> bool {
    STOPPED_STATES.contains(&t.state.as_str())
}

fn is_active(t: &TorrentInfo) -> bool {
    t.is_uploading() || t.is_downloading()
}

fn is_stalled(t: &TorrentInfo) -> bool {
    !t.is_uploading() && !t.is_downloading()
}

fn is_errored(t: &TorrentInfo) -> bool {
    ERRORED_STATES.contains(&t.state.as_str())
}
