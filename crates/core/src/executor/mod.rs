//! Bulk execution across qBittorrent instances.
//!
//! The executor fans one command out across its targets and gathers the results:
//! - **Listing**: scoped to each target's category, then filtered
//! - **Diff**: torrents missing on a destination, by info hash (`cp`)
//! - **Mutation**: add + recheck, start or recheck, never on a dry run
//!
//! Failures are recorded per (target, item) and never abort other targets.

pub mod diff;
mod runner;
mod types;

pub use runner::BulkExecutor;
pub use types::{
    ActionError, ActionKind, ActionOutcome, CommandReport, OutcomeItem, OutcomeLog,
    OutcomeStatus, ReportSummary, SkipReason, Target, TargetListing,
};
