//! The crawl state machine.
//!
//! Each artist goes through search, match validation, catalog fetch, the
//! per-album and per-track visits, and finally status aggregation. Children
//! are always persisted before their parent's aggregate is written, so an
//! interrupted run never records a parent as finished on partial data.
//!
//! Every step returns a [`CrawlError`]: entity-scoped errors are logged and
//! the run moves on, fatal errors end the run.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info, instrument, warn};

use super::classify::FetchFailureCause;
use super::client::{CatalogClient, CatalogError, TrackInfo};
use super::context::{RunContext, RunOptions, RunSummary};
use super::error::{CrawlError, FatalError};
use super::events::{ProgressEvent, ProgressSink, TrackOutcome};
use super::fetch::{FetchOutput, FetchRequest, TrackFetcher};
use super::live::{is_live_album, is_live_title};
use super::matching::{is_confident_match, name_similarity};
use super::naming::{find_existing, sanitize_name, track_file_stem};
use super::plan::{Release, number_playlist_tracks, plan_releases};
use super::tagging::{TrackTagger, TrackTags};
use crate::governor::{RateGovernor, Sleeper, TokioSleeper, jittered, local_today};
use crate::store::{
    CatalogStore, EntityKind, EntityTable, NO_MATCH_SUGGESTION, Presence, StatusCode,
    propagate_min,
};

/// Error log code for a failed catalog lookup.
const LOOKUP_CODE: &str = "LOOKUP";

/// Drives a crawl over a list of artists.
pub struct Crawler {
    store: CatalogStore,
    governor: RateGovernor,
    client: Box<dyn CatalogClient>,
    fetcher: Box<dyn TrackFetcher>,
    tagger: Box<dyn TrackTagger>,
    sleeper: Arc<dyn Sleeper>,
    events: ProgressSink,
    interrupted: Arc<AtomicBool>,
    options: RunOptions,
}

impl Crawler {
    /// Creates a crawler with real sleeps, no progress events and no interrupt flag.
    #[must_use]
    pub fn new(
        store: CatalogStore,
        client: Box<dyn CatalogClient>,
        fetcher: Box<dyn TrackFetcher>,
        tagger: Box<dyn TrackTagger>,
        options: RunOptions,
    ) -> Self {
        let governor = RateGovernor::new(store.clone(), options.daily_limit, options.batch_limit);
        Self {
            store,
            governor,
            client,
            fetcher,
            tagger,
            sleeper: Arc::new(TokioSleeper),
            events: ProgressSink::disabled(),
            interrupted: Arc::new(AtomicBool::new(false)),
            options,
        }
    }

    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    #[must_use]
    pub fn with_events(mut self, events: ProgressSink) -> Self {
        self.events = events;
        self
    }

    /// Uses `flag` to stop the run; it is checked before each track and after each fetch.
    #[must_use]
    pub fn with_interrupt(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupted = flag;
        self
    }

    #[must_use]
    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Crawls `artists` in order.
    ///
    /// # Errors
    ///
    /// Returns the [`FatalError`] that stopped the run. Artists and albums
    /// whose catalog lookup fails are logged and skipped instead.
    #[instrument(skip(self, artists), fields(artists = artists.len()))]
    pub async fn run(&mut self, artists: &[String]) -> Result<RunSummary, FatalError> {
        self.governor = RateGovernor::new(
            self.store.clone(),
            self.options.daily_limit,
            self.options.batch_limit,
        );
        let mut ctx = RunContext::new(artists.len());

        self.store
            .log_run_header(&format!("run started for {} artist(s)", artists.len()))
            .await?;
        self.events.emit(ProgressEvent::RunStarted {
            artists: artists.len(),
        });

        if !self.options.preload {
            self.governor.check_before_fetch(local_today()).await?;
        }

        for (index, artist) in artists.iter().enumerate() {
            ctx.artist_index = index + 1;
            match self.crawl_artist(&mut ctx, artist).await {
                Ok(()) => {}
                Err(CrawlError::Entity { entity, source }) => {
                    self.record_lookup_failure(&entity, &source).await?;
                    ctx.summary.artists_failed += 1;
                }
                Err(CrawlError::Fatal(fatal)) => {
                    warn!(artist = %artist, error = %fatal, "run stopped");
                    if let Err(err) = self
                        .store
                        .log_error(fatal.code(), Some(artist), &fatal.to_string())
                        .await
                    {
                        warn!(error = %err, "could not record fatal error");
                    }
                    return Err(fatal);
                }
            }
        }

        let summary = ctx.finish();
        info!(
            artists = summary.artists_visited,
            albums = summary.albums_visited,
            tracks = summary.tracks_fetched,
            elapsed_secs = summary.elapsed.as_secs(),
            tracks_per_hour = summary.tracks_per_hour(),
            "run complete"
        );
        self.events.emit(ProgressEvent::RunFinished(summary.clone()));
        Ok(summary)
    }

    #[instrument(skip(self, ctx), fields(index = ctx.artist_index, total = ctx.total_artists))]
    async fn crawl_artist(&mut self, ctx: &mut RunContext, query: &str) -> Result<(), CrawlError> {
        self.check_interrupt()?;
        let query = query.trim();
        ctx.summary.artists_visited += 1;
        self.events.emit(ProgressEvent::ArtistStarted {
            index: ctx.artist_index,
            total: ctx.total_artists,
            name: query.to_string(),
        });
        let policy = self.options.skip_policy();

        let known = self
            .store
            .find_status(&EntityKind::Artist {
                name: &sanitize_name(query),
            })
            .await?
            .filter(|status| policy.is_terminal(*status));
        if let Some(status) = known {
            info!(%status, "artist already handled");
            return self.skip_artist(query, status).await;
        }

        let hits = self
            .client
            .search_artists(query)
            .await
            .map_err(|source| CrawlError::Entity {
                entity: format!("artist '{query}'"),
                source,
            })?;
        let Some(best) = hits.into_iter().next() else {
            warn!("no catalog match");
            self.store
                .log_error("NOMATCH", Some(query), "search returned no artists")
                .await?;
            return self.reject_artist(ctx, query, NO_MATCH_SUGGESTION, None).await;
        };

        if !is_confident_match(query, &best.artist, self.options.similarity_threshold) {
            let similarity = name_similarity(query, &best.artist);
            warn!(best = %best.artist, similarity, "low-confidence match");
            self.store
                .log_error(
                    "MISMATCH",
                    Some(query),
                    &format!("best match '{}' scored {similarity:.2}", best.artist),
                )
                .await?;
            return self
                .reject_artist(ctx, query, &best.artist, Some(best.artist.clone()))
                .await;
        }

        let artist_name = sanitize_name(&best.artist);
        let presence = self
            .store
            .check_or_create(&EntityKind::Artist { name: &artist_name }, &policy)
            .await?;
        let artist_id = match presence {
            Presence::Skip { status } => return self.skip_artist(query, status).await,
            presence => presence.id(),
        };

        if self.options.preload {
            info!(artist = %best.artist, "artist preloaded");
            self.events.emit(ProgressEvent::ArtistPreloaded {
                name: best.artist.clone(),
            });
            return Ok(());
        }

        let catalog = self
            .client
            .get_artist(&best.browse_id)
            .await
            .map_err(|source| CrawlError::Entity {
                entity: format!("artist '{}'", best.artist),
                source,
            })?;
        let releases = plan_releases(&catalog, &best.artist);
        if releases.is_empty() {
            warn!(artist = %best.artist, "artist lists no releases");
            self.store
                .log_error("NOALBUMS", Some(&best.artist), "artist lists no releases")
                .await?;
            self.store.mark_artist_done(query).await?;
            self.events.emit(ProgressEvent::ArtistFinished {
                name: best.artist.clone(),
                status: None,
            });
            return Ok(());
        }

        ctx.total_albums = releases.len();
        let mut statuses = Vec::with_capacity(releases.len());
        for (index, release) in releases.iter().enumerate() {
            ctx.album_index = index + 1;
            let status = self
                .crawl_release(ctx, artist_id, &artist_name, &best.artist, release)
                .await?;
            statuses.push(status);
        }

        let status = propagate_min(statuses);
        if let Some(status) = status {
            self.store
                .update_status(EntityTable::Artists, artist_id, status)
                .await?;
        }
        self.store.mark_artist_done(query).await?;
        info!(artist = %best.artist, status = ?status, "artist done");
        self.events.emit(ProgressEvent::ArtistFinished {
            name: best.artist,
            status,
        });
        Ok(())
    }

    #[instrument(
        skip(self, ctx, artist_dir, artist, release),
        fields(album = release.title(), index = ctx.album_index, total = ctx.total_albums)
    )]
    async fn crawl_release(
        &mut self,
        ctx: &mut RunContext,
        artist_id: i64,
        artist_dir: &str,
        artist: &str,
        release: &Release,
    ) -> Result<StatusCode, CrawlError> {
        let title = release.title();
        let album_name = sanitize_name(title);
        ctx.summary.albums_visited += 1;
        self.events.emit(ProgressEvent::AlbumStarted {
            index: ctx.album_index,
            total: ctx.total_albums,
            title: title.to_string(),
        });

        let presence = self
            .store
            .check_or_create(
                &EntityKind::Album {
                    artist_id,
                    title: &album_name,
                },
                &self.options.skip_policy(),
            )
            .await?;
        let album_id = match presence {
            Presence::Skip { status } => {
                debug!(%status, "album already handled");
                self.emit_album(title, status);
                return Ok(status);
            }
            presence => presence.id(),
        };

        if !self.options.include_live && is_live_title(title) {
            return self.finish_album(album_id, title, StatusCode::Live).await;
        }

        let resolved = match release {
            Release::Album {
                browse_id, year, ..
            } => self
                .client
                .get_album(browse_id)
                .await
                .map(|details| (details.tracks, year.clone().or(details.year))),
            Release::Playlist {
                playlist_id, year, ..
            } => self
                .client
                .get_playlist(playlist_id)
                .await
                .map(|tracks| {
                    (
                        number_playlist_tracks(tracks, artist, year.as_deref()),
                        year.clone(),
                    )
                }),
            Release::Singles { tracks } => Ok((tracks.clone(), None)),
        };
        let (tracks, year) = match resolved {
            Ok(resolved) => resolved,
            Err(source) => {
                self.record_lookup_failure(&format!("{artist} / {title}"), &source)
                    .await?;
                let status = presence.status();
                self.emit_album(title, status);
                return Ok(status);
            }
        };

        if !self.options.include_live
            && is_live_album(title, tracks.iter().map(|track| track.title.as_str()))
        {
            return self.finish_album(album_id, title, StatusCode::Live).await;
        }

        let album_dir = self.options.output_dir.join(artist_dir).join(&album_name);
        let mut statuses = Vec::with_capacity(tracks.len());
        for track in &tracks {
            let tags = TrackTags {
                album: title.to_string(),
                artist: track.artist.clone().unwrap_or_else(|| artist.to_string()),
                title: track.title.clone(),
                year: track.year.clone().or_else(|| year.clone()),
                track_number: track.track_number,
            };
            statuses.push(
                self.crawl_track(ctx, album_id, &album_dir, track, &tags)
                    .await?,
            );
        }

        match propagate_min(statuses) {
            Some(status) => self.finish_album(album_id, title, status).await,
            None => {
                let status = presence.status();
                self.emit_album(title, status);
                Ok(status)
            }
        }
    }

    #[instrument(skip(self, ctx, album_dir, track, tags), fields(track = %track.title))]
    async fn crawl_track(
        &mut self,
        ctx: &mut RunContext,
        album_id: i64,
        album_dir: &Path,
        track: &TrackInfo,
        tags: &TrackTags,
    ) -> Result<StatusCode, CrawlError> {
        self.check_interrupt()?;
        let title = sanitize_name(&track.title);
        let presence = self
            .store
            .check_or_create(
                &EntityKind::Track {
                    album_id,
                    title: &title,
                },
                &self.options.skip_policy(),
            )
            .await?;
        let track_id = match presence {
            Presence::Skip { status } => {
                self.emit_track(&track.title, TrackOutcome::Skipped(status));
                return Ok(status);
            }
            presence => presence.id(),
        };

        let stem = track_file_stem(track.track_number, &title);
        let (status, outcome, networked) = if find_existing(album_dir, &stem).is_some() {
            debug!("file already present");
            (StatusCode::Incomplete, TrackOutcome::Present, false)
        } else if let Some(source_id) = track.video_id.as_deref() {
            let (status, outcome) = self
                .fetch_track(ctx, album_dir, &stem, source_id, tags)
                .await?;
            (status, outcome, true)
        } else {
            debug!("no source id");
            (StatusCode::Null, TrackOutcome::Unavailable, false)
        };

        self.store
            .update_status(EntityTable::Tracks, track_id, status)
            .await?;
        self.emit_track(&track.title, outcome);

        if networked && self.options.pace {
            self.sleeper.sleep(jittered(self.options.track_delay)).await;
        }
        Ok(status)
    }

    /// Fetches one track, retrying a non-skippable failure once after the cool-down.
    async fn fetch_track(
        &mut self,
        ctx: &mut RunContext,
        directory: &Path,
        stem: &str,
        source_id: &str,
        tags: &TrackTags,
    ) -> Result<(StatusCode, TrackOutcome), CrawlError> {
        let entity = format!("{} / {} / {}", tags.artist, tags.album, tags.title);
        let request = FetchRequest {
            directory,
            file_stem: stem,
            source_id,
        };

        self.governor.check_before_fetch(local_today()).await?;
        let output = self.fetch_once(&request).await;

        if !output.succeeded() {
            self.check_interrupt()?;
            let cause = self.record_fetch_failure(&entity, &output).await?;
            if cause.is_skippable() {
                warn!(%cause, "fetch failed; abandoning track");
                ctx.summary.tracks_abandoned += 1;
                return Ok((StatusCode::Incomplete, TrackOutcome::Abandoned(cause)));
            }

            ctx.failures += 1;
            if ctx.failures >= self.options.max_run_failures {
                return Err(FatalError::FailureTallyExceeded {
                    failures: ctx.failures,
                }
                .into());
            }

            let wait = self.options.error_cooldown;
            warn!(
                %cause,
                failures = ctx.failures,
                wait_secs = wait.as_secs(),
                "fetch failed; cooling down before retry"
            );
            self.events.emit(ProgressEvent::Cooldown { cause, wait });
            self.sleeper.sleep(wait).await;
            self.check_interrupt()?;

            self.governor.check_before_fetch(local_today()).await?;
            let retry = self.fetch_once(&request).await;
            if !retry.succeeded() {
                self.check_interrupt()?;
                let cause = self.record_fetch_failure(&entity, &retry).await?;
                return Err(FatalError::PersistentFetchFailure {
                    track: entity,
                    cause,
                }
                .into());
            }
        }

        // The file is on disk, so it counts even if the run stops here.
        let today_count = self.governor.record_fetch(local_today()).await?;
        ctx.summary.tracks_fetched += 1;
        debug!(today_count, "track fetched");
        self.check_interrupt()?;

        if self.options.skip_tags {
            return Ok((
                StatusCode::NoMetadata,
                TrackOutcome::Fetched { tagged: false },
            ));
        }

        let tagged = match find_existing(directory, stem) {
            Some(path) => match self.tagger.tag(&path, tags).await {
                Ok(()) => true,
                Err(err) => {
                    warn!(error = %err, "tagging failed");
                    self.store
                        .log_error("TAG", Some(&entity), &err.to_string())
                        .await?;
                    false
                }
            },
            None => {
                warn!("fetched file not found; leaving untagged");
                false
            }
        };
        let status = if tagged {
            StatusCode::Finished
        } else {
            StatusCode::NoMetadata
        };
        Ok((status, TrackOutcome::Fetched { tagged }))
    }

    async fn fetch_once(&self, request: &FetchRequest<'_>) -> FetchOutput {
        match self.fetcher.fetch(request).await {
            Ok(output) => output,
            Err(err) => {
                warn!(error = %err, "fetcher did not run");
                FetchOutput::failure(err.to_string())
            }
        }
    }

    async fn record_fetch_failure(
        &self,
        entity: &str,
        output: &FetchOutput,
    ) -> Result<FetchFailureCause, CrawlError> {
        let cause = FetchFailureCause::classify(&output.diagnostic);
        self.store
            .log_error(
                cause.code(),
                Some(entity),
                diagnostic_summary(&output.diagnostic),
            )
            .await?;
        Ok(cause)
    }

    async fn record_lookup_failure(
        &self,
        entity: &str,
        source: &CatalogError,
    ) -> Result<(), FatalError> {
        warn!(%entity, error = %source, "catalog lookup failed; skipping");
        self.store
            .log_error(LOOKUP_CODE, Some(entity), &source.to_string())
            .await?;
        Ok(())
    }

    async fn skip_artist(&self, query: &str, status: StatusCode) -> Result<(), CrawlError> {
        self.store.mark_artist_done(query).await?;
        self.events.emit(ProgressEvent::ArtistSkipped {
            name: query.to_string(),
            status,
        });
        Ok(())
    }

    async fn reject_artist(
        &self,
        ctx: &mut RunContext,
        query: &str,
        recorded: &str,
        suggestion: Option<String>,
    ) -> Result<(), CrawlError> {
        self.store.mark_artist_rejected(query, recorded).await?;
        ctx.summary.artists_rejected += 1;
        self.events.emit(ProgressEvent::ArtistRejected {
            name: query.to_string(),
            suggestion,
        });
        Ok(())
    }

    async fn finish_album(
        &self,
        album_id: i64,
        title: &str,
        status: StatusCode,
    ) -> Result<StatusCode, CrawlError> {
        self.store
            .update_status(EntityTable::Albums, album_id, status)
            .await?;
        debug!(%status, "album done");
        self.emit_album(title, status);
        Ok(status)
    }

    fn emit_album(&self, title: &str, status: StatusCode) {
        self.events.emit(ProgressEvent::AlbumFinished {
            title: title.to_string(),
            status,
        });
    }

    fn emit_track(&self, title: &str, outcome: TrackOutcome) {
        self.events.emit(ProgressEvent::TrackFinished {
            title: title.to_string(),
            outcome,
        });
    }

    fn check_interrupt(&self) -> Result<(), FatalError> {
        if self.interrupted.load(Ordering::SeqCst) {
            return Err(FatalError::Interrupted);
        }
        Ok(())
    }
}

/// The line of a fetcher diagnostic worth keeping in the error log.
fn diagnostic_summary(diagnostic: &str) -> &str {
    let mut lines = diagnostic.lines().map(str::trim).filter(|line| !line.is_empty());
    let last = lines.clone().last();
    lines
        .find(|line| line.starts_with("ERROR"))
        .or(last)
        .unwrap_or("no diagnostic")
}
