//! Turns an artist page into the ordered list of releases to visit.

use std::collections::HashSet;

use tracing::warn;

use super::client::{ArtistCatalog, ReleaseSummary, TrackInfo};

/// Title of the pseudo-album collecting standalone singles.
pub const SINGLES_TITLE: &str = "Singles";

/// Year label the catalog uses for EPs listed among singles.
const EP_LABEL: &str = "EP";

/// One release to visit, in the shape the crawler needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Release {
    /// Album or EP whose tracks come from [`CatalogClient::get_album`](super::CatalogClient::get_album).
    Album {
        title: String,
        browse_id: String,
        year: Option<String>,
    },
    /// Release only reachable as a playlist; tracks are numbered in playlist order.
    Playlist {
        title: String,
        playlist_id: String,
        year: Option<String>,
    },
    /// Standalone singles gathered under [`SINGLES_TITLE`].
    Singles { tracks: Vec<TrackInfo> },
}

impl Release {
    #[must_use]
    pub fn title(&self) -> &str {
        match self {
            Self::Album { title, .. } | Self::Playlist { title, .. } => title,
            Self::Singles { .. } => SINGLES_TITLE,
        }
    }
}

/// Builds the visit order: albums, then EPs, then the singles pseudo-album.
///
/// Singles labelled `"EP"` that have their own page are promoted to EPs.
/// Remaining singles become unnumbered tracks whose source id is looked up
/// among the artist's songs. Releases listed twice are visited once.
#[must_use]
pub fn plan_releases(catalog: &ArtistCatalog, artist: &str) -> Vec<Release> {
    let mut seen = HashSet::new();
    let mut releases = Vec::new();
    let mut singles = Vec::new();

    for summary in catalog.albums.iter().chain(&catalog.eps) {
        push_release(&mut releases, &mut seen, summary);
    }

    for single in &catalog.singles {
        if single.year.as_deref() == Some(EP_LABEL) && single.browse_id.is_some() {
            push_release(&mut releases, &mut seen, single);
        } else {
            singles.push(single_track(catalog, single, artist));
        }
    }

    if !singles.is_empty() {
        releases.push(Release::Singles { tracks: singles });
    }
    releases
}

/// Numbers playlist tracks from 1 and fills in missing artist/year.
#[must_use]
pub fn number_playlist_tracks(
    tracks: Vec<TrackInfo>,
    artist: &str,
    year: Option<&str>,
) -> Vec<TrackInfo> {
    tracks
        .into_iter()
        .zip(1..)
        .map(|(track, number)| TrackInfo {
            track_number: Some(number),
            artist: track.artist.or_else(|| Some(artist.to_string())),
            year: track.year.or_else(|| year.map(str::to_string)),
            ..track
        })
        .collect()
}

fn push_release(
    releases: &mut Vec<Release>,
    seen: &mut HashSet<String>,
    summary: &ReleaseSummary,
) {
    let key = summary
        .audio_playlist_id
        .as_ref()
        .or(summary.browse_id.as_ref());
    let Some(key) = key else {
        warn!(title = %summary.title, "release has no catalog id; skipping");
        return;
    };
    if !seen.insert(key.clone()) {
        return;
    }

    let year = summary.year.clone();
    let release = match (&summary.audio_playlist_id, &summary.browse_id) {
        (Some(playlist_id), _) => Release::Playlist {
            title: summary.title.clone(),
            playlist_id: playlist_id.clone(),
            year,
        },
        (None, Some(browse_id)) => Release::Album {
            title: summary.title.clone(),
            browse_id: browse_id.clone(),
            year,
        },
        (None, None) => return,
    };
    releases.push(release);
}

fn single_track(catalog: &ArtistCatalog, single: &ReleaseSummary, artist: &str) -> TrackInfo {
    let video_id = single.browse_id.as_ref().and_then(|release_id| {
        catalog
            .songs
            .iter()
            .find(|song| song.album_id.as_ref() == Some(release_id))
            .and_then(|song| song.video_id.clone())
    });
    TrackInfo {
        title: single.title.clone(),
        video_id,
        track_number: None,
        artist: Some(artist.to_string()),
        year: single.year.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawl::client::SongSummary;

    fn release(title: &str, browse_id: Option<&str>, year: Option<&str>) -> ReleaseSummary {
        ReleaseSummary {
            title: title.to_string(),
            browse_id: browse_id.map(str::to_string),
            year: year.map(str::to_string),
            ..ReleaseSummary::default()
        }
    }

    #[test]
    fn test_plan_orders_albums_eps_then_singles() {
        let catalog = ArtistCatalog {
            albums: vec![release("Autobahn", Some("A1"), Some("1974"))],
            eps: vec![release("Tour EP", Some("E1"), Some("EP"))],
            singles: vec![
                release("Pocket Calculator", Some("S1"), Some("Single")),
                release("Expo EP", Some("E2"), Some("EP")),
            ],
            songs: vec![SongSummary {
                title: "Pocket Calculator".to_string(),
                video_id: Some("vid-pc".to_string()),
                album_id: Some("S1".to_string()),
            }],
        };

        let plan = plan_releases(&catalog, "Kraftwerk");
        let titles: Vec<_> = plan.iter().map(Release::title).collect();
        assert_eq!(titles, vec!["Autobahn", "Tour EP", "Expo EP", SINGLES_TITLE]);

        let Release::Singles { tracks } = &plan[3] else {
            panic!("expected singles pseudo-album");
        };
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].video_id.as_deref(), Some("vid-pc"));
        assert_eq!(tracks[0].track_number, None);
        assert_eq!(tracks[0].artist.as_deref(), Some("Kraftwerk"));
    }

    #[test]
    fn test_single_without_song_has_no_source() {
        let catalog = ArtistCatalog {
            singles: vec![release("Rare Single", Some("S9"), Some("Single"))],
            ..ArtistCatalog::default()
        };

        let plan = plan_releases(&catalog, "Neu!");
        let Release::Singles { tracks } = &plan[0] else {
            panic!("expected singles pseudo-album");
        };
        assert_eq!(tracks[0].video_id, None);
    }

    #[test]
    fn test_playlist_backed_release_and_duplicates() {
        let mut playlist = release("Live Bootleg", Some("B1"), Some("1977"));
        playlist.audio_playlist_id = Some("PL1".to_string());
        let catalog = ArtistCatalog {
            albums: vec![playlist.clone(), playlist],
            ..ArtistCatalog::default()
        };

        let plan = plan_releases(&catalog, "Can");
        assert_eq!(
            plan,
            vec![Release::Playlist {
                title: "Live Bootleg".to_string(),
                playlist_id: "PL1".to_string(),
                year: Some("1977".to_string()),
            }]
        );
    }

    #[test]
    fn test_number_playlist_tracks_from_one() {
        let tracks = vec![
            TrackInfo {
                title: "A".to_string(),
                ..TrackInfo::default()
            },
            TrackInfo {
                title: "B".to_string(),
                artist: Some("Guest".to_string()),
                ..TrackInfo::default()
            },
        ];

        let numbered = number_playlist_tracks(tracks, "Can", Some("1971"));
        assert_eq!(numbered[0].track_number, Some(1));
        assert_eq!(numbered[1].track_number, Some(2));
        assert_eq!(numbered[0].artist.as_deref(), Some("Can"));
        assert_eq!(numbered[1].artist.as_deref(), Some("Guest"));
        assert_eq!(numbered[0].year.as_deref(), Some("1971"));
    }

    #[test]
    fn test_empty_catalog_plans_nothing() {
        assert!(plan_releases(&ArtistCatalog::default(), "Nobody").is_empty());
    }
}
