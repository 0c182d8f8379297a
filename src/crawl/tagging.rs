//! Metadata tagging of fetched files.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use lofty::config::WriteOptions;
use lofty::file::{AudioFile, TaggedFileExt};
use lofty::prelude::Accessor;
use lofty::read_from_path;
use lofty::tag::{ItemKey, Tag};
use thiserror::Error;
use tracing::debug;

/// Year values that are release-type labels rather than years.
const NON_YEAR_LABELS: [&str; 2] = ["Single", "EP"];

/// Errors raised while tagging a file.
#[derive(Debug, Error)]
pub enum TagError {
    #[error("cannot read tags from {}: {message}", path.display())]
    Read { path: PathBuf, message: String },

    #[error("no writable tag for {}", path.display())]
    NoWritableTag { path: PathBuf },

    #[error("cannot write tags to {}: {message}", path.display())]
    Write { path: PathBuf, message: String },

    #[error("tagging task failed: {0}")]
    Task(String),
}

/// Tags written to a fetched track.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackTags {
    pub album: String,
    pub artist: String,
    pub title: String,
    /// Release year; release-type labels are left blank.
    pub year: Option<String>,
    pub track_number: Option<u32>,
}

impl TrackTags {
    /// Year to write, or `None` for blank or release-type labels.
    #[must_use]
    pub fn effective_year(&self) -> Option<&str> {
        self.year
            .as_deref()
            .map(str::trim)
            .filter(|year| !year.is_empty() && !NON_YEAR_LABELS.contains(year))
    }
}

/// Writes tags to a fetched file.
#[async_trait]
pub trait TrackTagger: Send + Sync {
    /// Tags `path`. A file whose album tag is already set counts as tagged.
    async fn tag(&self, path: &Path, tags: &TrackTags) -> Result<(), TagError>;
}

/// [`TrackTagger`] backed by `lofty`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoftyTagger;

impl LoftyTagger {
    fn tag_blocking(path: &Path, tags: &TrackTags) -> Result<(), TagError> {
        let mut tagged_file = read_from_path(path).map_err(|e| TagError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let tag_type = tagged_file.primary_tag_type();
        if tagged_file
            .tag(tag_type)
            .and_then(|tag| tag.album())
            .is_some_and(|album| !album.is_empty())
        {
            debug!(path = %path.display(), "already tagged");
            return Ok(());
        }
        if tagged_file.tag(tag_type).is_none() {
            tagged_file.insert_tag(Tag::new(tag_type));
        }

        let tag = tagged_file
            .tag_mut(tag_type)
            .ok_or_else(|| TagError::NoWritableTag {
                path: path.to_path_buf(),
            })?;

        tag.set_album(tags.album.clone());
        tag.set_artist(tags.artist.clone());
        tag.set_title(tags.title.clone());
        if let Some(year) = tags.effective_year() {
            tag.insert_text(ItemKey::Year, year.to_string());
        }
        if let Some(number) = tags.track_number {
            tag.insert_text(ItemKey::TrackNumber, number.to_string());
        }

        tagged_file
            .save_to_path(path, WriteOptions::default())
            .map_err(|e| TagError::Write {
                path: path.to_path_buf(),
                message: e.to_string(),
            })
    }
}

#[async_trait]
impl TrackTagger for LoftyTagger {
    async fn tag(&self, path: &Path, tags: &TrackTags) -> Result<(), TagError> {
        let path = path.to_path_buf();
        let tags = tags.clone();
        tokio::task::spawn_blocking(move || Self::tag_blocking(&path, &tags))
            .await
            .map_err(|e| TagError::Task(e.to_string()))?
    }
}
