//! Report and listing renderers.

use anyhow::{Context, Result};
use serde::Serialize;

use seedbox_core::{
    ActionOutcome, CommandReport, OutcomeItem, OutcomeStatus, TargetListing, TorrentInfo,
};

use crate::cli::OutputFormat;

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to format JSON")?;
    println!("{text}");
    Ok(())
}

pub fn render_clients<'a>(names: impl Iterator<Item = &'a str>, format: OutputFormat) -> Result<()> {
    let names: Vec<&str> = names.collect();
    match format {
        OutputFormat::Json => print_json(&names)?,
        OutputFormat::Table => {
            for name in names {
                println!("{name}");
            }
        }
    }
    Ok(())
}

pub fn render_listings(listings: &[TargetListing], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(listings)?,
        OutputFormat::Table => {
            for listing in listings {
                println!("== {} ==", listing.target);
                if let Some(error) = &listing.error {
                    println!("error: {error}");
                    continue;
                }
                println!(
                    "{:<40} {:<20} {:>7} {:>11} {:<16} NAME",
                    "HASH", "STATE", "PROG", "SIZE", "CATEGORY"
                );
                for torrent in &listing.torrents {
                    println!("{}", torrent_row(torrent));
                }
            }
        }
    }
    Ok(())
}

fn torrent_row(torrent: &TorrentInfo) -> String {
    format!(
        "{:<40} {:<20} {:>7} {:>11} {:<16} {}",
        torrent.hash,
        torrent.state,
        format!("{:.1}%", torrent.progress * 100.0),
        format_bytes(torrent.size_bytes),
        if torrent.category.is_empty() {
            "-"
        } else {
            torrent.category.as_str()
        },
        torrent.name
    )
}

pub fn render_report(report: &CommandReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(report)?,
        OutputFormat::Table => {
            for outcome in &report.outcomes {
                println!("{}", outcome_row(outcome));
            }
            for path in &report.deleted {
                println!("deleted {}", path.display());
            }
            let summary = report.summary();
            println!(
                "{}{}: {} succeeded, {} would act, {} skipped, {} failed",
                report.action.as_str(),
                if report.dry_run { " (dry run)" } else { "" },
                summary.succeeded,
                summary.would_act,
                summary.skipped,
                summary.failed
            );
        }
    }
    Ok(())
}

fn outcome_row(outcome: &ActionOutcome) -> String {
    let status = match &outcome.status {
        OutcomeStatus::Succeeded => "ok".to_string(),
        OutcomeStatus::WouldAct => "would act".to_string(),
        OutcomeStatus::Skipped { reason } => format!("skipped ({})", reason.as_str()),
        OutcomeStatus::Failed { error } => format!("failed: {error}"),
    };
    let item = match &outcome.item {
        OutcomeItem::Target => "*".to_string(),
        OutcomeItem::Torrent { hash, name } => format!("{name} [{hash}]"),
        OutcomeItem::Payload { label, .. } => label.clone(),
    };
    format!("{:<16} {:<12} {}", outcome.target, item, status)
}

pub(crate) fn format_bytes(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = KIB * 1024.0;
    const GIB: f64 = MIB * 1024.0;
    let value = bytes as f64;
    if value >= GIB {
        format!("{:.2} GiB", value / GIB)
    } else if value >= MIB {
        format!("{:.2} MiB", value / MIB)
    } else if value >= KIB {
        format!("{:.2} KiB", value / KIB)
    } else {
        format!("{bytes} B")
    }
}
