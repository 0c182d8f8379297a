//! Renders crawl progress events as a spinner or as log lines.

use std::time::Duration;

use discography_core::crawl::{ProgressEvent, RunSummary, TrackOutcome};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Consumes `events` until every sender is dropped.
pub(crate) fn spawn_progress_consumer(
    use_spinner: bool,
    mut events: UnboundedReceiver<ProgressEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let spinner = use_spinner.then(new_spinner);
        while let Some(event) = events.recv().await {
            match &spinner {
                Some(spinner) => render(spinner, &event),
                None => log_event(&event),
            }
        }
        if let Some(spinner) = spinner {
            spinner.finish_and_clear();
        }
    })
}

fn new_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

fn render(spinner: &ProgressBar, event: &ProgressEvent) {
    let line = describe(event);
    match event {
        ProgressEvent::ArtistStarted { .. }
        | ProgressEvent::AlbumStarted { .. }
        | ProgressEvent::TrackFinished { .. } => spinner.set_message(line),
        _ => spinner.println(line),
    }
}

fn log_event(event: &ProgressEvent) {
    let line = describe(event);
    match event {
        ProgressEvent::AlbumStarted { .. } | ProgressEvent::TrackFinished { .. } => {
            debug!("{line}");
        }
        ProgressEvent::Cooldown { .. } | ProgressEvent::ArtistRejected { .. } => warn!("{line}"),
        _ => info!("{line}"),
    }
}

/// One human-readable line for `event`.
pub(crate) fn describe(event: &ProgressEvent) -> String {
    match event {
        ProgressEvent::RunStarted { artists } => format!("Crawling {artists} artist(s)"),
        ProgressEvent::ArtistStarted { index, total, name } => format!("[{index}/{total}] {name}"),
        ProgressEvent::ArtistSkipped { name, status } => format!("{name}: already {status}"),
        ProgressEvent::ArtistRejected {
            name,
            suggestion: Some(best),
        } => format!("{name}: no confident match (best hit: {best})"),
        ProgressEvent::ArtistRejected {
            name,
            suggestion: None,
        } => format!("{name}: not found"),
        ProgressEvent::ArtistPreloaded { name } => format!("{name}: preloaded"),
        ProgressEvent::ArtistFinished {
            name,
            status: Some(status),
        } => format!("{name}: {status}"),
        ProgressEvent::ArtistFinished { name, status: None } => format!("{name}: no releases"),
        ProgressEvent::AlbumStarted {
            index,
            total,
            title,
        } => format!("  album {index}/{total}: {title}"),
        ProgressEvent::AlbumFinished { title, status } => format!("  {title}: {status}"),
        ProgressEvent::TrackFinished { title, outcome } => {
            format!("    {title}: {}", outcome_label(outcome))
        }
        ProgressEvent::Cooldown { cause, wait } => format!(
            "Fetch failed ({cause}); waiting {}s before retrying",
            wait.as_secs()
        ),
        ProgressEvent::RunFinished(summary) => summary_line(summary),
    }
}

fn outcome_label(outcome: &TrackOutcome) -> String {
    match outcome {
        TrackOutcome::Skipped(status) => format!("already {status}"),
        TrackOutcome::Present => "already on disk".to_string(),
        TrackOutcome::Unavailable => "no source".to_string(),
        TrackOutcome::Fetched { tagged: true } => "fetched".to_string(),
        TrackOutcome::Fetched { tagged: false } => "fetched, untagged".to_string(),
        TrackOutcome::Abandoned(cause) => format!("abandoned ({cause})"),
    }
}

/// End-of-run summary line.
pub(crate) fn summary_line(summary: &RunSummary) -> String {
    let secs = summary.elapsed.as_secs();
    format!(
        "{} album(s), {} track(s) in {:02}:{:02}:{:02} ({:.1} tracks/hour)",
        summary.albums_visited,
        summary.tracks_fetched,
        secs / 3600,
        (secs % 3600) / 60,
        secs % 60,
        summary.tracks_per_hour()
    )
}
