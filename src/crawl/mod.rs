//! Artist → album → track crawl.
//!
//! [`Crawler`] is the state machine. The catalog, fetch and tagging steps
//! sit behind [`CatalogClient`], [`TrackFetcher`] and [`TrackTagger`] so the
//! machine can be driven by in-process fakes.

mod classify;
mod client;
mod command_client;
mod context;
mod crawler;
mod error;
mod events;
mod fetch;
mod live;
mod matching;
mod naming;
mod plan;
mod tagging;

pub use classify::FetchFailureCause;
pub use client::{
    AlbumDetails, ArtistCatalog, ArtistMatch, CatalogClient, CatalogError, ReleaseSummary,
    SongSummary, TrackInfo,
};
pub use command_client::CommandCatalogClient;
pub use context::{
    DEFAULT_ERROR_COOLDOWN, DEFAULT_MAX_RUN_FAILURES, DEFAULT_TRACK_DELAY, RunContext, RunOptions,
    RunSummary,
};
pub use crawler::Crawler;
pub use error::{CrawlError, FatalError};
pub use events::{ProgressEvent, ProgressSink, TrackOutcome};
pub use fetch::{FetchError, FetchOutput, FetchRequest, TrackFetcher, YtDlpFetcher};
pub use live::{is_live_album, is_live_title};
pub use matching::{DEFAULT_SIMILARITY_THRESHOLD, is_confident_match, name_similarity};
pub use naming::{find_existing, sanitize_name, track_file_stem};
pub use plan::{Release, SINGLES_TITLE, number_playlist_tracks, plan_releases};
pub use tagging::{LoftyTagger, TagError, TrackTagger, TrackTags};
