use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Configured torrent client instances keyed by name
    pub clients: BTreeMap<String, ClientConfig>,
    #[serde(default)]
    pub executor: ExecutorConfig,
}

/// Connection settings for one qBittorrent instance
#[derive(Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    /// Web UI URL (e.g., "http://localhost:8080")
    pub url: String,
    pub username: String,
    pub password: String,
    /// Restrict every listing and add on this client to a category subtree
    #[serde(default)]
    pub category: Option<String>,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("category", &self.category)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

fn default_timeout() -> u32 {
    30
}

/// Concurrency limits for bulk operations
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// Instances worked on at the same time
    #[serde(default = "default_parallelism")]
    pub max_concurrent_targets: usize,
    /// Torrents worked on at the same time within one instance
    #[serde(default = "default_parallelism")]
    pub max_concurrent_items: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_targets: default_parallelism(),
            max_concurrent_items: default_parallelism(),
        }
    }
}

fn default_parallelism() -> usize {
    4
}
