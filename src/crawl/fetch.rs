//! Track fetch seam and the `yt-dlp` implementation.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, instrument};

/// Errors raised before a fetch could run at all.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Destination directory could not be created.
    #[error("cannot create {}: {source}", path.display())]
    Destination {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The fetch program could not be started.
    #[error("cannot launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// What to fetch and where to put it.
#[derive(Debug, Clone, Copy)]
pub struct FetchRequest<'a> {
    /// Album directory; created if missing.
    pub directory: &'a Path,
    /// File name without extension; the fetcher picks the extension.
    pub file_stem: &'a str,
    /// Catalog source id of the track.
    pub source_id: &'a str,
}

/// Exit status and diagnostic text of one fetch attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutput {
    pub exit_code: i32,
    pub diagnostic: String,
}

impl FetchOutput {
    /// Successful fetch with no diagnostic.
    #[must_use]
    pub fn success() -> Self {
        Self {
            exit_code: 0,
            diagnostic: String::new(),
        }
    }

    /// Failed fetch carrying `diagnostic`.
    #[must_use]
    pub fn failure(diagnostic: impl Into<String>) -> Self {
        Self {
            exit_code: 1,
            diagnostic: diagnostic.into(),
        }
    }

    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

/// Materializes one track as a file.
#[async_trait]
pub trait TrackFetcher: Send + Sync {
    async fn fetch(&self, request: &FetchRequest<'_>) -> Result<FetchOutput, FetchError>;
}

/// Fetches best-quality audio with `yt-dlp` and extracts it to Opus.
#[derive(Debug, Clone)]
pub struct YtDlpFetcher {
    program: String,
}

impl Default for YtDlpFetcher {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

impl YtDlpFetcher {
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn arguments(request: &FetchRequest<'_>) -> Vec<String> {
        let template = request
            .directory
            .join(format!("{}.%(ext)s", request.file_stem));
        vec![
            "--format".to_string(),
            "bestaudio/best".to_string(),
            "--extract-audio".to_string(),
            "--audio-format".to_string(),
            "opus".to_string(),
            "--audio-quality".to_string(),
            "0".to_string(),
            "--quiet".to_string(),
            "--no-progress".to_string(),
            "--output".to_string(),
            template.display().to_string(),
            "--".to_string(),
            request.source_id.to_string(),
        ]
    }
}

#[async_trait]
impl TrackFetcher for YtDlpFetcher {
    #[instrument(
        skip(self, request),
        fields(source_id = request.source_id, stem = request.file_stem)
    )]
    async fn fetch(&self, request: &FetchRequest<'_>) -> Result<FetchOutput, FetchError> {
        tokio::fs::create_dir_all(request.directory)
            .await
            .map_err(|source| FetchError::Destination {
                path: request.directory.to_path_buf(),
                source,
            })?;

        let output = Command::new(&self.program)
            .args(Self::arguments(request))
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| FetchError::Launch {
                program: self.program.clone(),
                source,
            })?;

        let exit_code = output.status.code().unwrap_or(-1);
        debug!(exit_code, "fetch finished");
        Ok(FetchOutput {
            exit_code,
            diagnostic: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
