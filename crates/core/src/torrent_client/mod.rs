//! Torrent client abstraction.
//!
//! This module provides a `TorrentClient` trait for talking to one running
//! torrent client instance, with a qBittorrent Web API implementation.

mod qbittorrent;
mod types;

pub use qbittorrent::QBittorrentClient;
pub use types::*;
