//! Catalog client seam and the catalog shapes the crawler consumes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by a catalog lookup.
#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    /// The lookup could not be performed (network, helper process, API failure).
    #[error("catalog {operation} failed for {target:?}: {message}")]
    Lookup {
        operation: &'static str,
        target: String,
        message: String,
    },

    /// The catalog answered with something that is not the expected shape.
    #[error("catalog {operation} returned malformed data for {target:?}: {message}")]
    Malformed {
        operation: &'static str,
        target: String,
        message: String,
    },
}

/// One artist search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtistMatch {
    /// Display name of the matched artist.
    pub artist: String,
    /// Catalog id used for [`CatalogClient::get_artist`].
    pub browse_id: String,
}

/// An album, EP or single as listed on an artist page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReleaseSummary {
    pub title: String,
    /// Catalog id used for [`CatalogClient::get_album`].
    pub browse_id: Option<String>,
    /// Present on releases only reachable as a playlist.
    pub audio_playlist_id: Option<String>,
    /// Release year, or `"Single"`/`"EP"` for short releases.
    pub year: Option<String>,
    /// Release type label (`"Album"`, `"EP"`, `"Single"`).
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// A song listed on an artist page, used to resolve singles to a source id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SongSummary {
    pub title: String,
    pub video_id: Option<String>,
    /// Id of the release the song belongs to.
    pub album_id: Option<String>,
}

/// Everything an artist page lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtistCatalog {
    pub albums: Vec<ReleaseSummary>,
    pub singles: Vec<ReleaseSummary>,
    pub eps: Vec<ReleaseSummary>,
    pub songs: Vec<SongSummary>,
}

/// One track of an album or playlist.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TrackInfo {
    pub title: String,
    /// Source id handed to the fetcher; `None` when the track is unavailable.
    pub video_id: Option<String>,
    pub track_number: Option<u32>,
    /// First credited artist.
    pub artist: Option<String>,
    pub year: Option<String>,
}

/// Album contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlbumDetails {
    pub title: String,
    pub year: Option<String>,
    pub tracks: Vec<TrackInfo>,
}

/// Read-only access to the external music catalog.
///
/// Every call is a fallible network operation.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Artist hits for `name`, best first.
    async fn search_artists(&self, name: &str) -> Result<Vec<ArtistMatch>, CatalogError>;

    /// The releases listed for an artist.
    async fn get_artist(&self, browse_id: &str) -> Result<ArtistCatalog, CatalogError>;

    /// Tracks of one album.
    async fn get_album(&self, browse_id: &str) -> Result<AlbumDetails, CatalogError>;

    /// Tracks of a playlist-backed release, in playlist order.
    async fn get_playlist(&self, playlist_id: &str) -> Result<Vec<TrackInfo>, CatalogError>;
}
