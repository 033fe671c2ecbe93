//! Torrent filtering by status and category.

pub mod category;
pub mod status;

pub use category::{CategoryFilter, CATEGORY_SEPARATOR};
pub use status::StatusFilter;

use thiserror::Error;

use crate::torrent_client::TorrentInfo;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("Unknown status filter '{0}'")]
    UnknownFilter(String),
}

/// Status and category filter applied together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TorrentQuery {
    pub status: StatusFilter,
    pub category: CategoryFilter,
}

impl TorrentQuery {
    pub fn new(status: StatusFilter, category: CategoryFilter) -> Self {
        Self { status, category }
    }

    /// Parse CLI-style arguments. A missing status means `all`.
    pub fn from_args(status: Option<&str>, category: Option<&str>) -> Result<Self, FilterError> {
        let status = match status {
            Some(s) => s.parse()?,
            None => StatusFilter::All,
        };
        Ok(Self {
            status,
            category: CategoryFilter::from_arg(category),
        })
    }

    pub fn matches(&self, torrent: &TorrentInfo) -> bool {
        self.category.matches(&torrent.category) && self.status.matches(torrent)
    }

    /// Keep the torrents matching both filters, in listing order.
    pub fn apply(&self, torrents: Vec<TorrentInfo>) -> Vec<TorrentInfo> {
        torrents.into_iter().filter(|t| self.matches(t)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn torrent(hash: &str, category: &str, state: &str, progress: f64) -> TorrentInfo {
        TorrentInfo {
            hash: hash.to_string(),
            name: hash.to_uppercase(),
            category: category.to_string(),
            state: state.to_string(),
            progress,
            size_bytes: 0,
            download_speed: 0,
            upload_speed: 0,
            added_at: None,
        }
    }

    #[test]
    fn test_query_combines_filters() {
        let listing = vec![
            torrent("a", "movies", "stoppedUP", 1.0),
            torrent("b", "movies/hd", "stoppedDL", 0.2),
            torrent("c", "tv", "stoppedUP", 1.0),
            torrent("d", "moviesarchive", "stoppedUP", 1.0),
        ];
        let query = TorrentQuery::from_args(Some("completed_stopped"), Some("movies")).unwrap();
        let hashes: Vec<_> = query.apply(listing).into_iter().map(|t| t.hash).collect();
        assert_eq!(hashes, vec!["a"]);
    }

    #[test]
    fn test_default_query_matches_everything() {
        let query = TorrentQuery::from_args(None, None).unwrap();
        assert_eq!(query, TorrentQuery::default());
        assert!(query.matches(&torrent("a", "", "error", 0.0)));
    }

    #[test]
    fn test_from_args_unknown_status() {
        let err = TorrentQuery::from_args(Some("nope"), None).unwrap_err();
        assert_eq!(err, FilterError::UnknownFilter("nope".to_string()));
    }
}
