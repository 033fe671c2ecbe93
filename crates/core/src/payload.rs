//! Torrent payloads - `.torrent` files to be added to instances.
//!
//! Uses librqbit-core to parse bencoded .torrent data and compute the v1
//! info hash, which is the identity used to match torrents across instances.

use std::path::{Path, PathBuf};

use librqbit_core::torrent_metainfo::{torrent_from_bytes, TorrentMetaV1Owned};
use thiserror::Error;
use tracing::debug;

/// Errors that can occur when loading torrent payloads.
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse torrent {name}: {reason}")]
    Parse { name: String, reason: String },

    #[error("No .torrent files found")]
    NoTorrents,
}

/// A `.torrent` file and its identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TorrentPayload {
    /// Raw .torrent bytes.
    pub data: Vec<u8>,
    /// v1 info hash (lowercase hex).
    pub hash: String,
    /// Torrent name from the info dictionary.
    pub name: String,
    /// File the payload was read from, if any.
    pub path: Option<PathBuf>,
}

impl TorrentPayload {
    /// Parse raw .torrent bytes.
    pub fn from_bytes(data: Vec<u8>, path: Option<PathBuf>) -> Result<Self, PayloadError> {
        let label = path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<memory>".to_string());

        let (hash, name) = {
            let torrent: TorrentMetaV1Owned =
                torrent_from_bytes(&data).map_err(|e| PayloadError::Parse {
                    name: label.clone(),
                    reason: e.to_string(),
                })?;
            let name = torrent
                .info
                .name
                .as_ref()
                .map(|b| String::from_utf8_lossy(b.as_ref()).into_owned())
                .unwrap_or_else(|| "unknown".to_string());
            (torrent.info_hash.as_string(), name)
        };

        Ok(Self {
            data,
            hash: hash.to_lowercase(),
            name,
            path,
        })
    }

    /// Read and parse a .torrent file.
    pub async fn load(path: &Path) -> Result<Self, PayloadError> {
        let data = tokio::fs::read(path).await.map_err(|source| PayloadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(data, Some(path.to_path_buf()))
    }

    /// Filename used when uploading to an instance.
    pub fn filename(&self) -> String {
        self.path
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("{}.torrent", self.hash))
    }

    /// Human-readable label for reports.
    pub fn label(&self) -> String {
        match &self.path {
            Some(path) => path.display().to_string(),
            None => self.name.clone(),
        }
    }

    /// Remove the file this payload was read from. No-op without a path.
    pub async fn delete_backing_file(&self) -> Result<(), PayloadError> {
        if let Some(path) = &self.path {
            tokio::fs::remove_file(path)
                .await
                .map_err(|source| PayloadError::Io {
                    path: path.clone(),
                    source,
                })?;
            debug!(path = %path.display(), "Deleted torrent file");
        }
        Ok(())
    }
}

/// Expand inputs into .torrent file paths.
///
/// Directories contribute their `*.torrent` entries (not recursive), sorted
/// by name. Files are taken as given.
pub async fn collect_torrent_paths(inputs: &[PathBuf]) -> Result<Vec<PathBuf>, PayloadError> {
    let mut paths = Vec::new();

    for input in inputs {
        let metadata = tokio::fs::metadata(input)
            .await
            .map_err(|source| PayloadError::Io {
                path: input.clone(),
                source,
            })?;

        if !metadata.is_dir() {
            paths.push(input.clone());
            continue;
        }

        let mut entries = tokio::fs::read_dir(input)
            .await
            .map_err(|source| PayloadError::Io {
                path: input.clone(),
                source,
            })?;
        let mut found = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|source| PayloadError::Io {
            path: input.clone(),
            source,
        })? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "torrent") {
                found.push(path);
            }
        }
        found.sort();
        paths.extend(found);
    }

    let mut seen = std::collections::HashSet::new();
    paths.retain(|p| seen.insert(p.clone()));

    if paths.is_empty() {
        return Err(PayloadError::NoTorrents);
    }
    Ok(paths)
}

/// Load every payload named by `inputs`.
pub async fn load_payloads(inputs: &[PathBuf]) -> Result<Vec<TorrentPayload>, PayloadError> {
    let mut payloads = Vec::new();
    for path in collect_torrent_paths(inputs).await? {
        payloads.push(TorrentPayload::load(&path).await?);
    }
    Ok(payloads)
}
