//! `--status` report.

use std::fmt::Write as _;

use anyhow::Result;
use chrono::NaiveDate;
use discography_core::CatalogStore;
use discography_core::store::{EntityTable, ErrorLogEntry, QueueCounts, StatusCode};

const RECENT_ERRORS: u32 = 10;

/// What is known about the current public identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum IdentityAge {
    /// No router configured.
    NotConfigured,
    /// Probe failed or the identity was never recorded.
    Unknown,
    Days(i64),
}

#[derive(Debug, Clone)]
pub(crate) struct StatusReport {
    pub queue: QueueCounts,
    pub fetched_today: i64,
    pub daily_limit: u32,
    pub artists: Vec<(StatusCode, i64)>,
    pub albums: Vec<(StatusCode, i64)>,
    pub tracks: Vec<(StatusCode, i64)>,
    pub recent_errors: Vec<ErrorLogEntry>,
    pub identity: IdentityAge,
}

pub(crate) async fn collect(
    store: &CatalogStore,
    daily_limit: u32,
    today: NaiveDate,
    identity: IdentityAge,
) -> Result<StatusReport> {
    Ok(StatusReport {
        queue: store.queue_counts().await?,
        fetched_today: store.fetches_on(today).await?,
        daily_limit,
        artists: store.count_by_status(EntityTable::Artists).await?,
        albums: store.count_by_status(EntityTable::Albums).await?,
        tracks: store.count_by_status(EntityTable::Tracks).await?,
        recent_errors: store.recent_errors(RECENT_ERRORS).await?,
        identity,
    })
}

pub(crate) fn render(report: &StatusReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Queue: {} pending, {} done ({} rejected)",
        report.queue.pending, report.queue.done, report.queue.rejected
    );
    if report.daily_limit == 0 {
        let _ = writeln!(out, "Fetched today: {} (no daily limit)", report.fetched_today);
    } else {
        let _ = writeln!(
            out,
            "Fetched today: {} of {}",
            report.fetched_today, report.daily_limit
        );
    }

    for (label, counts) in [
        ("Artists", &report.artists),
        ("Albums", &report.albums),
        ("Tracks", &report.tracks),
    ] {
        let _ = writeln!(out, "{label}: {}", format_counts(counts));
    }

    match report.identity {
        IdentityAge::NotConfigured => {}
        IdentityAge::Unknown => {
            let _ = writeln!(out, "Identity: unknown");
        }
        IdentityAge::Days(days) => {
            let _ = writeln!(out, "Identity: first seen {days} day(s) ago");
        }
    }

    if !report.recent_errors.is_empty() {
        let _ = writeln!(out, "Recent errors:");
        for entry in &report.recent_errors {
            let _ = writeln!(
                out,
                "  {} [{}] {}{}",
                entry.logged_at.format("%Y-%m-%d %H:%M"),
                entry.code,
                entry
                    .entity
                    .as_deref()
                    .map(|entity| format!("{entity}: "))
                    .unwrap_or_default(),
                entry.message
            );
        }
    }
    out
}

fn format_counts(counts: &[(StatusCode, i64)]) -> String {
    if counts.is_empty() {
        return "none".to_string();
    }
    counts
        .iter()
        .map(|(status, count)| format!("{count} {status}"))
        .collect::<Vec<_>>()
        .join(", ")
}
