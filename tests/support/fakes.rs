//! In-process stand-ins for the catalog, fetcher, tagger, router and probe.
//!
//! Every fake is `Clone` over shared state so a test can keep a handle for
//! assertions after boxing a copy into the crawler or rotator.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use discography_core::crawl::{
    AlbumDetails, ArtistCatalog, ArtistMatch, CatalogClient, CatalogError, FetchError,
    FetchOutput, FetchRequest, ReleaseSummary, TagError, TrackFetcher, TrackInfo, TrackTagger,
    TrackTags,
};
use discography_core::identity::{
    HardwareId, IdentityError, IdentityTransport, PublicIdentityProbe,
};

// ==================== Catalog ====================

#[derive(Default)]
struct CatalogState {
    search: HashMap<String, Vec<ArtistMatch>>,
    artists: HashMap<String, ArtistCatalog>,
    albums: HashMap<String, AlbumDetails>,
    playlists: HashMap<String, Vec<TrackInfo>>,
    failing: HashSet<String>,
    calls: Vec<String>,
}

/// Catalog answering from fixed tables; unknown ids are lookup errors.
#[derive(Clone, Default)]
pub struct FakeCatalog {
    state: Arc<Mutex<CatalogState>>,
}

impl FakeCatalog {
    pub fn with_search(self, query: &str, hits: &[(&str, &str)]) -> Self {
        let hits = hits
            .iter()
            .map(|(artist, browse_id)| ArtistMatch {
                artist: (*artist).to_string(),
                browse_id: (*browse_id).to_string(),
            })
            .collect();
        self.state
            .lock()
            .unwrap()
            .search
            .insert(query.to_string(), hits);
        self
    }

    pub fn with_artist(self, browse_id: &str, catalog: ArtistCatalog) -> Self {
        self.state
            .lock()
            .unwrap()
            .artists
            .insert(browse_id.to_string(), catalog);
        self
    }

    pub fn with_album(self, browse_id: &str, details: AlbumDetails) -> Self {
        self.state
            .lock()
            .unwrap()
            .albums
            .insert(browse_id.to_string(), details);
        self
    }

    pub fn with_playlist(self, playlist_id: &str, tracks: Vec<TrackInfo>) -> Self {
        self.state
            .lock()
            .unwrap()
            .playlists
            .insert(playlist_id.to_string(), tracks);
        self
    }

    /// Makes every lookup of `id` fail.
    pub fn failing(self, id: &str) -> Self {
        self.state.lock().unwrap().failing.insert(id.to_string());
        self
    }

    /// Every call as `"operation:target"`, in order.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn called(&self, call: &str) -> bool {
        self.calls().iter().any(|made| made == call)
    }

    fn lookup<T: Clone>(
        &self,
        operation: &'static str,
        target: &str,
        table: impl Fn(&CatalogState) -> Option<T>,
    ) -> Result<T, CatalogError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("{operation}:{target}"));
        let answer = if state.failing.contains(target) {
            None
        } else {
            table(&state)
        };
        answer.ok_or_else(|| CatalogError::Lookup {
            operation,
            target: target.to_string(),
            message: "not in fake catalog".to_string(),
        })
    }
}

#[async_trait]
impl CatalogClient for FakeCatalog {
    async fn search_artists(&self, name: &str) -> Result<Vec<ArtistMatch>, CatalogError> {
        self.lookup("search", name, |state| {
            Some(state.search.get(name).cloned().unwrap_or_default())
        })
    }

    async fn get_artist(&self, browse_id: &str) -> Result<ArtistCatalog, CatalogError> {
        self.lookup("artist", browse_id, |state| state.artists.get(browse_id).cloned())
    }

    async fn get_album(&self, browse_id: &str) -> Result<AlbumDetails, CatalogError> {
        self.lookup("album", browse_id, |state| state.albums.get(browse_id).cloned())
    }

    async fn get_playlist(&self, playlist_id: &str) -> Result<Vec<TrackInfo>, CatalogError> {
        self.lookup("playlist", playlist_id, |state| {
            state.playlists.get(playlist_id).cloned()
        })
    }
}

pub fn release(title: &str, browse_id: &str, year: &str) -> ReleaseSummary {
    ReleaseSummary {
        title: title.to_string(),
        browse_id: Some(browse_id.to_string()),
        year: Some(year.to_string()),
        ..ReleaseSummary::default()
    }
}

pub fn track(title: &str, number: u32, video_id: &str) -> TrackInfo {
    TrackInfo {
        title: title.to_string(),
        video_id: Some(video_id.to_string()),
        track_number: Some(number),
        ..TrackInfo::default()
    }
}

pub fn album(title: &str, year: &str, tracks: Vec<TrackInfo>) -> AlbumDetails {
    AlbumDetails {
        title: title.to_string(),
        year: Some(year.to_string()),
        tracks,
    }
}

// ==================== Fetcher ====================

#[derive(Default)]
struct FetcherState {
    scripted: VecDeque<FetchOutput>,
    requests: Vec<String>,
    raise_on_success: Option<Arc<AtomicBool>>,
}

/// Fetcher that plays back scripted outputs, then succeeds.
///
/// A successful fetch writes `{stem}.opus` into the request directory.
#[derive(Clone, Default)]
pub struct FakeFetcher {
    state: Arc<Mutex<FetcherState>>,
}

impl FakeFetcher {
    /// Queues a failure whose diagnostic is `diagnostic`.
    pub fn then_fail(self, diagnostic: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .scripted
            .push_back(FetchOutput::failure(diagnostic));
        self
    }

    pub fn then_succeed(self) -> Self {
        self.state
            .lock()
            .unwrap()
            .scripted
            .push_back(FetchOutput::success());
        self
    }

    /// Raises `flag` as each successful fetch finishes, like Ctrl-C mid-download.
    pub fn raising_on_success(self, flag: Arc<AtomicBool>) -> Self {
        self.state.lock().unwrap().raise_on_success = Some(flag);
        self
    }

    /// Source ids requested so far, including failed attempts.
    pub fn requests(&self) -> Vec<String> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn count(&self) -> usize {
        self.requests().len()
    }
}

#[async_trait]
impl TrackFetcher for FakeFetcher {
    async fn fetch(&self, request: &FetchRequest<'_>) -> Result<FetchOutput, FetchError> {
        let (output, raise) = {
            let mut state = self.state.lock().unwrap();
            state.requests.push(request.source_id.to_string());
            let output = state
                .scripted
                .pop_front()
                .unwrap_or_else(FetchOutput::success);
            (output, state.raise_on_success.clone())
        };
        if output.succeeded() {
            std::fs::create_dir_all(request.directory).map_err(|source| {
                FetchError::Destination {
                    path: request.directory.to_path_buf(),
                    source,
                }
            })?;
            let path = request
                .directory
                .join(format!("{}.opus", request.file_stem));
            std::fs::write(&path, b"opus").map_err(|source| FetchError::Destination {
                path: path.clone(),
                source,
            })?;
            if let Some(flag) = raise {
                flag.store(true, Ordering::SeqCst);
            }
        }
        Ok(output)
    }
}

// ==================== Tagger ====================

#[derive(Default)]
struct TaggerState {
    tagged: Vec<(PathBuf, TrackTags)>,
    fail: bool,
}

#[derive(Clone, Default)]
pub struct FakeTagger {
    state: Arc<Mutex<TaggerState>>,
}

impl FakeTagger {
    pub fn failing() -> Self {
        let tagger = Self::default();
        tagger.state.lock().unwrap().fail = true;
        tagger
    }

    pub fn tagged(&self) -> Vec<(PathBuf, TrackTags)> {
        self.state.lock().unwrap().tagged.clone()
    }
}

#[async_trait]
impl TrackTagger for FakeTagger {
    async fn tag(&self, path: &Path, tags: &TrackTags) -> Result<(), TagError> {
        let mut state = self.state.lock().unwrap();
        if state.fail {
            return Err(TagError::NoWritableTag {
                path: path.to_path_buf(),
            });
        }
        state.tagged.push((path.to_path_buf(), tags.clone()));
        Ok(())
    }
}

// ==================== Identity ====================

/// Router whose hardware id changes as soon as it is set.
#[derive(Clone)]
pub struct FakeRouter {
    mac: Arc<Mutex<String>>,
    restarts: Arc<Mutex<usize>>,
}

impl FakeRouter {
    pub fn new(mac: &str) -> Self {
        Self {
            mac: Arc::new(Mutex::new(mac.to_string())),
            restarts: Arc::new(Mutex::new(0)),
        }
    }

    pub fn mac(&self) -> String {
        self.mac.lock().unwrap().clone()
    }

    pub fn restarts(&self) -> usize {
        *self.restarts.lock().unwrap()
    }
}

#[async_trait]
impl IdentityTransport for FakeRouter {
    async fn current_hardware_id(&self) -> Result<HardwareId, IdentityError> {
        self.mac.lock().unwrap().parse()
    }

    async fn set_hardware_id(&self, id: &HardwareId) -> Result<(), IdentityError> {
        *self.mac.lock().unwrap() = id.to_string();
        Ok(())
    }

    async fn commit(&self) -> Result<(), IdentityError> {
        Ok(())
    }

    async fn restart_network(&self) -> Result<(), IdentityError> {
        *self.restarts.lock().unwrap() += 1;
        Ok(())
    }
}

/// Probe answering from a script; the last answer repeats forever.
#[derive(Clone)]
pub struct ScriptedProbe {
    answers: Arc<Mutex<VecDeque<String>>>,
    last: Arc<Mutex<Option<String>>>,
}

impl ScriptedProbe {
    pub fn new(answers: &[&str]) -> Self {
        Self {
            answers: Arc::new(Mutex::new(
                answers.iter().map(ToString::to_string).collect(),
            )),
            last: Arc::new(Mutex::new(None)),
        }
    }
}

#[async_trait]
impl PublicIdentityProbe for ScriptedProbe {
    async fn public_identity(&self) -> Result<String, IdentityError> {
        let next = self.answers.lock().unwrap().pop_front();
        let mut last = self.last.lock().unwrap();
        if let Some(answer) = next {
            *last = Some(answer);
        }
        last.clone().ok_or_else(|| IdentityError::Probe {
            message: "no scripted answer".to_string(),
        })
    }
}
