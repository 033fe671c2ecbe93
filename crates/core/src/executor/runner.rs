//! Bulk executor implementation.
//!
//! Every command fans out across its targets and gathers one outcome per
//! (target, item) pair:
//! - Targets: concurrent, bounded by `max_concurrent_targets`
//! - Items within a target: concurrent, bounded by `max_concurrent_items`
//! - add -> recheck for one torrent on one target: sequential

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::config::ExecutorConfig;
use crate::filter::category::is_within;
use crate::filter::TorrentQuery;
use crate::payload::TorrentPayload;
use crate::torrent_client::{AddTorrentRequest, Reachability, TorrentClientError, TorrentInfo};

use super::diff;
use super::types::{
    ActionError, ActionKind, ActionOutcome, CommandReport, OutcomeItem, OutcomeLog,
    OutcomeStatus, SkipReason, Target, TargetListing,
};

/// Item index of target-level outcomes. Item outcomes are numbered from 1.
const TARGET_ITEM: usize = 0;

/// Failed gateway call, after probing the instance.
#[derive(Debug, Clone)]
enum Failure {
    Unreachable(String),
    Rejected(String),
}

impl Failure {
    async fn diagnose(target: &Target, err: TorrentClientError) -> Self {
        if err.is_connectivity() {
            return Failure::Unreachable(err.to_string());
        }
        match target.client.probe().await {
            Reachability::Reachable => Failure::Rejected(err.to_string()),
            Reachability::Unreachable(reason) => Failure::Unreachable(reason),
        }
    }

    fn into_error(self, target: &Target, rejected: impl FnOnce(String) -> ActionError) -> ActionError {
        match self {
            Failure::Unreachable(reason) => ActionError::Unreachable {
                target: target.name().to_string(),
                reason,
            },
            Failure::Rejected(reason) => rejected(reason),
        }
    }
}

async fn listing_error(target: &Target, err: TorrentClientError) -> ActionError {
    Failure::diagnose(target, err)
        .await
        .into_error(target, |reason| ActionError::ActionRejected {
            target: target.name().to_string(),
            item: "torrent listing".to_string(),
            reason,
        })
}

/// One torrent to put on a target: a local payload or an export from another instance.
enum AddJob<'a> {
    Payload {
        index: usize,
        payload: &'a TorrentPayload,
    },
    Export {
        index: usize,
        source: &'a Target,
        torrent: &'a TorrentInfo,
    },
}

impl AddJob<'_> {
    fn index(&self) -> usize {
        match self {
            AddJob::Payload { index, .. } | AddJob::Export { index, .. } => *index,
        }
    }

    fn hash(&self) -> &str {
        match self {
            AddJob::Payload { payload, .. } => &payload.hash,
            AddJob::Export { torrent, .. } => &torrent.hash,
        }
    }

    fn label(&self) -> String {
        match self {
            AddJob::Payload { payload, .. } => payload.label(),
            AddJob::Export { torrent, .. } => torrent.name.clone(),
        }
    }

    fn item(&self) -> OutcomeItem {
        match self {
            AddJob::Payload { payload, .. } => OutcomeItem::Payload {
                hash: payload.hash.clone(),
                label: payload.label(),
            },
            AddJob::Export { torrent, .. } => OutcomeItem::torrent(torrent),
        }
    }

    /// Whether the torrent would land inside the target's category scope.
    ///
    /// Payloads always take the scope. An exported torrent keeps its source
    /// category, which a scoped target may not cover.
    fn fits_scope(&self, target: &Target) -> bool {
        match (self, target.scope()) {
            (AddJob::Export { torrent, .. }, Some(scope)) => is_within(&torrent.category, scope),
            _ => true,
        }
    }

    /// Build the add request for `target`.
    ///
    /// Payloads take the target's category scope; exported torrents keep
    /// their source category.
    async fn request(&self, target: &Target) -> Result<AddTorrentRequest, ActionError> {
        match self {
            AddJob::Payload { payload, .. } => Ok(AddTorrentRequest::new(
                payload.data.clone(),
                payload.hash.as_str(),
            )
            .with_filename(payload.filename())
            .with_category(target.scope().map(String::from))
            .with_stopped(true)),
            AddJob::Export { source, torrent, .. } => {
                let data = match source.client.export_torrent(&torrent.hash).await {
                    Ok(data) => data,
                    Err(e) => {
                        return Err(Failure::diagnose(source, e).await.into_error(
                            source,
                            |reason| ActionError::ActionRejected {
                                target: source.name().to_string(),
                                item: torrent.hash.clone(),
                                reason,
                            },
                        ))
                    }
                };
                Ok(AddTorrentRequest::new(data, torrent.hash.as_str())
                    .with_filename(format!("{}.torrent", torrent.hash))
                    .with_category(Some(torrent.category.clone()))
                    .with_stopped(true))
            }
        }
    }
}

/// Runs bulk commands against resolved targets.
#[derive(Debug, Clone)]
pub struct BulkExecutor {
    config: ExecutorConfig,
    dry_run: bool,
    shutdown: Arc<AtomicBool>,
}

impl BulkExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self {
            config,
            dry_run: false,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Issue no mutating calls; record `would_act` instead.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Share a shutdown flag with a signal handler.
    pub fn with_shutdown_flag(mut self, shutdown: Arc<AtomicBool>) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    fn cancelled(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    fn target_limit(&self) -> usize {
        self.config.max_concurrent_targets.max(1)
    }

    fn item_limit(&self) -> usize {
        self.config.max_concurrent_items.max(1)
    }

    /// Filtered listing of every target, in target order.
    pub async fn ls(&self, targets: &[Target], query: &TorrentQuery) -> Vec<TargetListing> {
        stream::iter(targets)
            .map(|target| async move {
                match target.client.list_torrents(target.scope()).await {
                    Ok(torrents) => {
                        let torrents = query.apply(torrents);
                        debug!(client = %target.name(), count = torrents.len(), "Listed torrents");
                        TargetListing {
                            target: target.name().to_string(),
                            torrents,
                            error: None,
                        }
                    }
                    Err(e) => {
                        let error = listing_error(target, e).await;
                        warn!(client = %target.name(), error = %error, "Listing failed");
                        TargetListing {
                            target: target.name().to_string(),
                            torrents: Vec::new(),
                            error: Some(error),
                        }
                    }
                }
            })
            .buffered(self.target_limit())
            .collect()
            .await
    }

    /// Add payloads to every target that does not have them yet.
    ///
    /// With `delete_after`, a payload file is removed once it is on every
    /// target. Dry runs never delete.
    pub async fn add(
        &self,
        targets: &[Target],
        payloads: &[TorrentPayload],
        delete_after: bool,
    ) -> CommandReport {
        let payloads = distinct_payloads(payloads);
        info!(
            targets = targets.len(),
            payloads = payloads.len(),
            dry_run = self.dry_run,
            "Adding torrents"
        );

        let jobs: Vec<AddJob<'_>> = payloads
            .iter()
            .copied()
            .enumerate()
            .map(|(index, payload)| AddJob::Payload { index, payload })
            .collect();

        let log = OutcomeLog::new();
        let log_ref = &log;
        let jobs_ref = &jobs;
        stream::iter(targets.iter().enumerate())
            .map(|(t_idx, target)| async move {
                if self.cancelled() {
                    for job in jobs_ref {
                        record(log_ref, t_idx, job.index() + 1, cancelled(target, job.item())).await;
                    }
                    return;
                }
                let present: HashSet<String> = match self.prepare(target).await {
                    Ok(listing) => listing.into_iter().map(|t| t.hash.to_lowercase()).collect(),
                    Err(error) => {
                        record_target_failure(log_ref, t_idx, target, error).await;
                        return;
                    }
                };
                self.run_adds(t_idx, target, jobs_ref, &present, log_ref).await;
            })
            .buffered(self.target_limit())
            .collect::<Vec<_>>()
            .await;

        let mut report = CommandReport::new(ActionKind::Add, self.dry_run, log.into_sorted().await);
        if delete_after && !self.dry_run {
            report.deleted = delete_settled(targets, &payloads, &report.outcomes).await;
        }
        report
    }

    /// Start the matching torrents on every target.
    pub async fn start(&self, targets: &[Target], query: &TorrentQuery) -> CommandReport {
        self.transition(ActionKind::Start, targets, query).await
    }

    /// Recheck the matching torrents on every target.
    pub async fn recheck(&self, targets: &[Target], query: &TorrentQuery) -> CommandReport {
        self.transition(ActionKind::Recheck, targets, query).await
    }

    /// Replicate torrents from `source` that the destinations lack.
    ///
    /// Destinations are independent: one failing does not stop the others.
    pub async fn cp(
        &self,
        source: &Target,
        destinations: &[Target],
        query: &TorrentQuery,
    ) -> CommandReport {
        info!(
            source = %source.name(),
            destinations = destinations.len(),
            dry_run = self.dry_run,
            "Copying torrents"
        );

        let source_listing = self.prepare(source).await.map(|l| query.apply(l));
        if let Err(error) = &source_listing {
            warn!(client = %source.name(), error = %error, "Source listing failed");
        }

        let log = OutcomeLog::new();
        let log_ref = &log;
        let source_ref = &source_listing;
        stream::iter(destinations.iter().enumerate())
            .map(|(t_idx, dest)| async move {
                let source_listing = match source_ref {
                    Ok(listing) => listing,
                    Err(error) => {
                        record_target_failure(log_ref, t_idx, dest, error.clone()).await;
                        return;
                    }
                };
                if self.cancelled() {
                    record(log_ref, t_idx, TARGET_ITEM, cancelled(dest, OutcomeItem::Target)).await;
                    return;
                }
                let listing = match self.prepare(dest).await {
                    Ok(listing) => listing,
                    Err(error) => {
                        record_target_failure(log_ref, t_idx, dest, error).await;
                        return;
                    }
                };

                let missing = diff::missing(source_listing, &listing);
                info!(
                    client = %dest.name(),
                    source = %source.name(),
                    missing = missing.len(),
                    "Computed missing torrents"
                );
                let jobs: Vec<AddJob<'_>> = missing
                    .iter()
                    .enumerate()
                    .map(|(index, torrent)| AddJob::Export {
                        index,
                        source,
                        torrent,
                    })
                    .collect();
                self.run_adds(t_idx, dest, &jobs, &HashSet::new(), log_ref).await;
            })
            .buffered(self.target_limit())
            .collect::<Vec<_>>()
            .await;

        CommandReport::new(ActionKind::Copy, self.dry_run, log.into_sorted().await)
    }

    /// Close the API session of every target.
    ///
    /// Failures are logged and otherwise ignored; the command has already
    /// produced its outcomes.
    pub async fn logout(&self, targets: &[Target]) {
        stream::iter(targets)
            .map(|target| async move {
                if let Err(e) = target.client.logout().await {
                    warn!(client = %target.name(), error = %e, "Logout failed");
                }
            })
            .buffer_unordered(self.target_limit())
            .collect::<Vec<_>>()
            .await;
    }

    /// Check the scope category exists, then fetch the scoped listing.
    async fn prepare(&self, target: &Target) -> Result<Vec<TorrentInfo>, ActionError> {
        if let Some(scope) = target.scope() {
            let categories = match target.client.categories().await {
                Ok(categories) => categories,
                Err(e) => return Err(listing_error(target, e).await),
            };
            if !categories.iter().any(|c| c == scope) {
                return Err(ActionError::CategoryMissing {
                    target: target.name().to_string(),
                    category: scope.to_string(),
                });
            }
        }

        match target.client.list_torrents(target.scope()).await {
            Ok(listing) => {
                debug!(client = %target.name(), count = listing.len(), "Fetched listing");
                Ok(listing)
            }
            Err(e) => Err(listing_error(target, e).await),
        }
    }

    async fn run_adds(
        &self,
        t_idx: usize,
        target: &Target,
        jobs: &[AddJob<'_>],
        present: &HashSet<String>,
        log: &OutcomeLog,
    ) {
        stream::iter(jobs)
            .map(|job| async move {
                let status = if self.cancelled() {
                    OutcomeStatus::Skipped {
                        reason: SkipReason::Cancelled,
                    }
                } else if present.contains(job.hash()) {
                    OutcomeStatus::Skipped {
                        reason: SkipReason::AlreadyPresent,
                    }
                } else if !job.fits_scope(target) {
                    OutcomeStatus::Skipped {
                        reason: SkipReason::OutsideScope,
                    }
                } else if self.dry_run {
                    OutcomeStatus::WouldAct
                } else {
                    self.add_then_recheck(target, job).await
                };
                record(
                    log,
                    t_idx,
                    job.index() + 1,
                    ActionOutcome::new(target.name(), job.item(), status),
                )
                .await;
            })
            .buffered(self.item_limit())
            .collect::<Vec<_>>()
            .await;
    }

    async fn add_then_recheck(&self, target: &Target, job: &AddJob<'_>) -> OutcomeStatus {
        let request = match job.request(target).await {
            Ok(request) => request,
            Err(error) => return OutcomeStatus::Failed { error },
        };

        if let Err(e) = target.client.add_torrent(request).await {
            let error = Failure::diagnose(target, e)
                .await
                .into_error(target, |reason| ActionError::AddRejected {
                    target: target.name().to_string(),
                    item: job.label(),
                    reason,
                });
            return OutcomeStatus::Failed { error };
        }
        debug!(client = %target.name(), hash = %job.hash(), "Added torrent");

        match target.client.recheck_torrents(&[job.hash().to_string()]).await {
            Ok(()) => OutcomeStatus::Succeeded,
            Err(e) => {
                let error = Failure::diagnose(target, e)
                    .await
                    .into_error(target, |reason| ActionError::ActionRejected {
                        target: target.name().to_string(),
                        item: job.hash().to_string(),
                        reason,
                    });
                OutcomeStatus::Failed { error }
            }
        }
    }

    /// Shared body of start and recheck: one bulk call per target.
    async fn transition(
        &self,
        kind: ActionKind,
        targets: &[Target],
        query: &TorrentQuery,
    ) -> CommandReport {
        info!(
            action = kind.as_str(),
            targets = targets.len(),
            dry_run = self.dry_run,
            "Running bulk action"
        );

        let log = OutcomeLog::new();
        let log_ref = &log;
        stream::iter(targets.iter().enumerate())
            .map(|(t_idx, target)| async move {
                if self.cancelled() {
                    record(log_ref, t_idx, TARGET_ITEM, cancelled(target, OutcomeItem::Target)).await;
                    return;
                }
                let matched = match self.prepare(target).await {
                    Ok(listing) => query.apply(listing),
                    Err(error) => {
                        record_target_failure(log_ref, t_idx, target, error).await;
                        return;
                    }
                };
                if matched.is_empty() {
                    debug!(client = %target.name(), action = kind.as_str(), "No torrents matched");
                    return;
                }

                let failure = if self.dry_run {
                    None
                } else {
                    let hashes: Vec<String> = matched.iter().map(|t| t.hash.clone()).collect();
                    let result = match kind {
                        ActionKind::Start => target.client.start_torrents(&hashes).await,
                        _ => target.client.recheck_torrents(&hashes).await,
                    };
                    match result {
                        Ok(()) => None,
                        Err(e) => Some(Failure::diagnose(target, e).await),
                    }
                };

                for (i_idx, torrent) in matched.iter().enumerate() {
                    let status = match (&failure, self.dry_run) {
                        (_, true) => OutcomeStatus::WouldAct,
                        (None, false) => OutcomeStatus::Succeeded,
                        (Some(failure), false) => OutcomeStatus::Failed {
                            error: failure.clone().into_error(target, |reason| {
                                ActionError::ActionRejected {
                                    target: target.name().to_string(),
                                    item: torrent.hash.clone(),
                                    reason,
                                }
                            }),
                        },
                    };
                    record(
                        log_ref,
                        t_idx,
                        i_idx + 1,
                        ActionOutcome::new(target.name(), OutcomeItem::torrent(torrent), status),
                    )
                    .await;
                }
            })
            .buffered(self.target_limit())
            .collect::<Vec<_>>()
            .await;

        CommandReport::new(kind, self.dry_run, log.into_sorted().await)
    }
}

fn cancelled(target: &Target, item: OutcomeItem) -> ActionOutcome {
    ActionOutcome::new(
        target.name(),
        item,
        OutcomeStatus::Skipped {
            reason: SkipReason::Cancelled,
        },
    )
}

async fn record(log: &OutcomeLog, t_idx: usize, i_idx: usize, outcome: ActionOutcome) {
    match &outcome.status {
        OutcomeStatus::Failed { error } => {
            warn!(client = %outcome.target, item = %outcome.item.label(), error = %error, "Action failed")
        }
        status => {
            debug!(client = %outcome.target, item = %outcome.item.label(), ?status, "Action outcome")
        }
    }
    log.push(t_idx, i_idx, outcome).await;
}

async fn record_target_failure(log: &OutcomeLog, t_idx: usize, target: &Target, error: ActionError) {
    let outcome = ActionOutcome::new(target.name(), OutcomeItem::Target, OutcomeStatus::Failed { error });
    record(log, t_idx, TARGET_ITEM, outcome).await;
}

/// First payload per info hash, in input order.
fn distinct_payloads(payloads: &[TorrentPayload]) -> Vec<&TorrentPayload> {
    let mut seen = HashSet::new();
    payloads
        .iter()
        .filter(|p| {
            let first = seen.insert(p.hash.as_str());
            if !first {
                warn!(file = %p.label(), hash = %p.hash, "Skipping duplicate torrent");
            }
            first
        })
        .collect()
}

/// Delete payload files that ended up on every target.
async fn delete_settled(
    targets: &[Target],
    payloads: &[&TorrentPayload],
    outcomes: &[ActionOutcome],
) -> Vec<PathBuf> {
    let mut deleted = Vec::new();
    if targets.is_empty() {
        return deleted;
    }

    for payload in payloads {
        let Some(path) = &payload.path else {
            continue;
        };
        let everywhere = targets.iter().all(|target| {
            outcomes.iter().any(|o| {
                o.target == target.name()
                    && o.item.hash() == Some(payload.hash.as_str())
                    && o.status.is_settled()
            })
        });
        if !everywhere {
            debug!(path = %path.display(), "Keeping torrent file, not on every target");
            continue;
        }
        match payload.delete_backing_file().await {
            Ok(()) => deleted.push(path.clone()),
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to delete torrent file"),
        }
    }
    deleted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixtures, MockTorrentClient, RecordedCall};
    use std::sync::Arc;

    fn target(name: &str, scope: Option<&str>) -> (Target, Arc<MockTorrentClient>) {
        let mock = Arc::new(MockTorrentClient::new(name));
        let target = Target::new(Arc::new(fixtures::descriptor(name, scope)), mock.clone());
        (target, mock)
    }

    fn payload(name: &str) -> TorrentPayload {
        TorrentPayload::from_bytes(fixtures::torrent_bytes(name), None).unwrap()
    }

    #[tokio::test]
    async fn test_add_then_recheck_in_stopped_state() {
        let (a, mock) = target("aClient", None);
        let p = payload("one.iso");

        let report = BulkExecutor::new(ExecutorConfig::default())
            .add(&[a], &[p.clone()], false)
            .await;

        assert!(report.is_success());
        assert_eq!(report.summary().succeeded, 1);
        assert_eq!(
            mock.calls().await,
            vec![
                RecordedCall::Add {
                    hash: p.hash.clone(),
                    category: None,
                    stopped: true,
                },
                RecordedCall::Recheck(vec![p.hash.clone()]),
            ]
        );
    }

    #[tokio::test]
    async fn test_add_skips_present_torrent() {
        let (a, mock) = target("aClient", None);
        let p = payload("one.iso");
        mock.add_mock_torrent(fixtures::torrent(&p.hash, "", "stoppedUP", 1.0))
            .await;

        let report = BulkExecutor::new(ExecutorConfig::default())
            .add(&[a], &[p], false)
            .await;

        assert_eq!(report.summary().skipped, 1);
        assert_eq!(mock.mutation_count().await, 0);
    }

    #[tokio::test]
    async fn test_add_uses_scope_category() {
        let (a, mock) = target("aClient", Some("tv"));
        mock.set_categories(&["tv", "movies"]).await;
        let p = payload("show.mkv");

        BulkExecutor::new(ExecutorConfig::default())
            .add(&[a], &[p.clone()], false)
            .await;

        assert_eq!(
            mock.calls().await[0],
            RecordedCall::Add {
                hash: p.hash,
                category: Some("tv".to_string()),
                stopped: true,
            }
        );
    }

    #[tokio::test]
    async fn test_missing_scope_category_fails_target() {
        let (a, mock) = target("aClient", Some("tv"));
        mock.set_categories(&["movies"]).await;

        let report = BulkExecutor::new(ExecutorConfig::default())
            .add(&[a], &[payload("show.mkv")], false)
            .await;

        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(report.outcomes[0].item, OutcomeItem::Target);
        assert_eq!(
            report.outcomes[0].status,
            OutcomeStatus::Failed {
                error: ActionError::CategoryMissing {
                    target: "aClient".to_string(),
                    category: "tv".to_string(),
                }
            }
        );
        assert_eq!(mock.mutation_count().await, 0);
    }

    #[tokio::test]
    async fn test_rejected_add_is_classified_after_probe() {
        let (a, mock) = target("aClient", None);
        let p = payload("bad.iso");
        mock.reject_adds_for(&p.hash).await;

        let report = BulkExecutor::new(ExecutorConfig::default())
            .add(&[a], &[p], false)
            .await;

        let failure = report.failures().next().unwrap();
        assert!(matches!(
            failure.status,
            OutcomeStatus::Failed {
                error: ActionError::AddRejected { .. }
            }
        ));
    }

    #[tokio::test]
    async fn test_listing_error_on_reachable_target_is_rejection() {
        let (a, mock) = target("aClient", None);
        mock.set_next_error(TorrentClientError::ApiError("boom".to_string()))
            .await;

        let report = BulkExecutor::new(ExecutorConfig::default())
            .add(&[a], &[payload("one.iso")], false)
            .await;

        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(report.outcomes[0].item, OutcomeItem::Target);
        assert!(matches!(
            report.outcomes[0].status,
            OutcomeStatus::Failed {
                error: ActionError::ActionRejected { .. }
            }
        ));
    }

    #[tokio::test]
    async fn test_start_one_outcome_per_match() {
        let (a, mock) = target("aClient", None);
        mock.add_mock_torrent(fixtures::torrent("aaa", "", "stoppedUP", 1.0))
            .await;
        mock.add_mock_torrent(fixtures::torrent("bbb", "", "stoppedDL", 0.5))
            .await;
        mock.add_mock_torrent(fixtures::torrent("ccc", "", "stalledUP", 1.0))
            .await;

        let query = TorrentQuery::from_args(Some("paused"), None).unwrap();
        let report = BulkExecutor::new(ExecutorConfig::default())
            .start(&[a], &query)
            .await;

        assert_eq!(report.action, ActionKind::Start);
        assert_eq!(report.summary().succeeded, 2);
        assert_eq!(
            mock.calls().await,
            vec![RecordedCall::Start(vec!["aaa".to_string(), "bbb".to_string()])]
        );
    }

    #[tokio::test]
    async fn test_empty_match_issues_no_call() {
        let (a, mock) = target("aClient", None);
        mock.add_mock_torrent(fixtures::torrent("aaa", "", "stalledUP", 1.0))
            .await;

        let query = TorrentQuery::from_args(Some("stopped"), None).unwrap();
        let report = BulkExecutor::new(ExecutorConfig::default())
            .recheck(&[a], &query)
            .await;

        assert!(report.outcomes.is_empty());
        assert_eq!(mock.mutation_count().await, 0);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_records_skips() {
        let (a, mock) = target("aClient", None);
        let executor = BulkExecutor::new(ExecutorConfig::default());
        executor.shutdown_flag().store(true, Ordering::SeqCst);

        let report = executor
            .add(&[a], &[payload("one.iso"), payload("two.iso")], false)
            .await;

        assert_eq!(report.summary().skipped, 2);
        assert!(report.outcomes.iter().all(|o| o.status
            == OutcomeStatus::Skipped {
                reason: SkipReason::Cancelled
            }));
        assert_eq!(mock.mutation_count().await, 0);
    }

    #[tokio::test]
    async fn test_duplicate_payloads_added_once() {
        let (a, mock) = target("aClient", None);
        let p = payload("one.iso");

        let report = BulkExecutor::new(ExecutorConfig::default())
            .add(&[a], &[p.clone(), p], false)
            .await;

        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(mock.added_hashes().await.len(), 1);
    }

    #[tokio::test]
    async fn test_ls_reports_unreachable_target() {
        let (a, mock_a) = target("aClient", None);
        let (b, mock_b) = target("bClient", None);
        mock_a
            .add_mock_torrent(fixtures::torrent("aaa", "movies", "stoppedUP", 1.0))
            .await;
        mock_b.set_unreachable(true);

        let listings = BulkExecutor::new(ExecutorConfig::default())
            .ls(&[a, b], &TorrentQuery::default())
            .await;

        assert_eq!(listings.len(), 2);
        assert_eq!(listings[0].torrents.len(), 1);
        assert!(listings[0].error.is_none());
        assert!(matches!(
            listings[1].error,
            Some(ActionError::Unreachable { .. })
        ));
    }

    #[tokio::test]
    async fn test_cp_skips_torrents_outside_destination_scope() {
        let (a, mock_a) = target("aClient", None);
        let (b, mock_b) = target("bClient", Some("tv"));
        mock_b.set_categories(&["tv"]).await;
        for (hash, category) in [("aaa", "movies"), ("bbb", "tv/hd"), ("ccc", ""), ("ddd", "tvshows")] {
            mock_a
                .add_mock_torrent(fixtures::torrent(hash, category, "stoppedUP", 1.0))
                .await;
        }

        let report = BulkExecutor::new(ExecutorConfig::default())
            .cp(&a, &[b], &TorrentQuery::default())
            .await;

        assert!(report.is_success());
        assert_eq!(mock_b.added_hashes().await, vec!["bbb".to_string()]);
        let skipped: Vec<_> = report
            .outcomes
            .iter()
            .filter(|o| {
                o.status
                    == OutcomeStatus::Skipped {
                        reason: SkipReason::OutsideScope,
                    }
            })
            .filter_map(|o| o.item.hash())
            .collect();
        assert_eq!(skipped, vec!["aaa", "ccc", "ddd"]);
        assert!(!mock_a.calls().await.contains(&RecordedCall::Export("aaa".to_string())));
    }

    #[tokio::test]
    async fn test_logout_every_target_despite_failures() {
        let (a, mock_a) = target("aClient", None);
        let (b, mock_b) = target("bClient", None);
        mock_a.set_unreachable(true);

        BulkExecutor::new(ExecutorConfig::default())
            .logout(&[a, b])
            .await;

        assert_eq!(mock_a.logout_count(), 1);
        assert_eq!(mock_b.logout_count(), 1);
    }
}
