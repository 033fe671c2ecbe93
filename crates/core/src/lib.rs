pub mod config;
pub mod executor;
pub mod filter;
pub mod payload;
pub mod registry;
pub mod testing;
pub mod torrent_client;

pub use config::{
    default_config_path, load_config, load_config_from_str, validate_config, ClientConfig,
    Config, ConfigError, ExecutorConfig,
};
pub use executor::{
    ActionError, ActionKind, ActionOutcome, BulkExecutor, CommandReport, OutcomeItem,
    OutcomeStatus, ReportSummary, SkipReason, Target, TargetListing,
};
pub use filter::{CategoryFilter, FilterError, StatusFilter, TorrentQuery};
pub use payload::{load_payloads, PayloadError, TorrentPayload};
pub use registry::{ClientDescriptor, ClientRegistry, RegistryError};
pub use torrent_client::{
    AddTorrentRequest, AddTorrentResult, QBittorrentClient, Reachability, TorrentClient,
    TorrentClientError, TorrentInfo,
};
