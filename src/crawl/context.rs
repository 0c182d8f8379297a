//! Run options, per-run bookkeeping and the end-of-run summary.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use serde::Serialize;

use super::matching::DEFAULT_SIMILARITY_THRESHOLD;
use crate::governor::{DEFAULT_BATCH_LIMIT, DEFAULT_DAILY_LIMIT};
use crate::store::SkipPolicy;

/// Nominal pause between track fetches, jittered by ±50 %.
pub const DEFAULT_TRACK_DELAY: Duration = Duration::from_secs(20);

/// Cool-down before the single retry of a non-skippable fetch failure.
pub const DEFAULT_ERROR_COOLDOWN: Duration = Duration::from_secs(1100);

/// Non-skippable fetch failures tolerated per run.
pub const DEFAULT_MAX_RUN_FAILURES: u32 = 3;

/// Every knob of a crawl run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Fetch live albums instead of marking them LIVE.
    pub include_live: bool,
    /// Do not write metadata tags; fetched tracks stay at NOMETADATA.
    pub skip_tags: bool,
    /// Only create artist rows; leave catalogs for a later run.
    pub preload: bool,
    /// Daily fetch ceiling, 0 for none.
    pub daily_limit: u32,
    /// Per-run fetch ceiling, 0 for none.
    pub batch_limit: u32,
    pub track_delay: Duration,
    pub error_cooldown: Duration,
    /// Sleep [`RunOptions::track_delay`] after each network fetch.
    pub pace: bool,
    pub max_run_failures: u32,
    pub similarity_threshold: f64,
    /// Root of the `artist/album/track` tree.
    pub output_dir: PathBuf,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            include_live: false,
            skip_tags: false,
            preload: false,
            daily_limit: DEFAULT_DAILY_LIMIT,
            batch_limit: DEFAULT_BATCH_LIMIT,
            track_delay: DEFAULT_TRACK_DELAY,
            error_cooldown: DEFAULT_ERROR_COOLDOWN,
            pace: true,
            max_run_failures: DEFAULT_MAX_RUN_FAILURES,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            output_dir: PathBuf::from("."),
        }
    }
}

impl RunOptions {
    /// Which stored statuses count as already handled for this run.
    #[must_use]
    pub fn skip_policy(&self) -> SkipPolicy {
        SkipPolicy {
            include_live: self.include_live,
            skip_tags: self.skip_tags,
        }
    }
}

/// Counts reported at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub artists_visited: usize,
    pub artists_rejected: usize,
    /// Artists abandoned after a catalog lookup error.
    pub artists_failed: usize,
    pub albums_visited: usize,
    pub tracks_fetched: usize,
    /// Tracks abandoned with a skippable fetch failure.
    pub tracks_abandoned: usize,
    pub elapsed: Duration,
}

impl RunSummary {
    /// Fetch rate over the whole run.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn tracks_per_hour(&self) -> f64 {
        let hours = self.elapsed.as_secs_f64() / 3600.0;
        if hours <= 0.0 {
            return 0.0;
        }
        self.tracks_fetched as f64 / hours
    }
}

/// Mutable state threaded through every step of one run.
#[derive(Debug)]
pub struct RunContext {
    pub artist_index: usize,
    pub total_artists: usize,
    pub album_index: usize,
    pub total_albums: usize,
    /// Non-skippable fetch failures so far.
    pub failures: u32,
    pub summary: RunSummary,
    started: Instant,
}

impl RunContext {
    #[must_use]
    pub fn new(total_artists: usize) -> Self {
        Self {
            artist_index: 0,
            total_artists,
            album_index: 0,
            total_albums: 0,
            failures: 0,
            summary: RunSummary::default(),
            started: Instant::now(),
        }
    }

    /// Stamps the elapsed time and returns the summary.
    #[must_use]
    pub fn finish(mut self) -> RunSummary {
        self.summary.elapsed = self.started.elapsed();
        self.summary
    }
}
