//! Catalog client backed by an external helper command that prints JSON.
//!
//! The helper is invoked as `<program> [args...] <subcommand> <target>` with
//! subcommands `search`, `artist`, `album` and `playlist`, and must write a
//! single JSON document to stdout:
//! - `search` - array of `{"artist", "browseId"}`
//! - `artist` - `{"albums", "singles", "eps", "songs"}`
//! - `album` - `{"title", "year", "tracks"}`
//! - `playlist` - array of tracks

use std::path::PathBuf;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio::process::Command;
use tracing::{debug, instrument};

use super::client::{
    AlbumDetails, ArtistCatalog, ArtistMatch, CatalogClient, CatalogError, TrackInfo,
};

/// [`CatalogClient`] that shells out to a JSON-printing helper.
#[derive(Debug, Clone)]
pub struct CommandCatalogClient {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandCatalogClient {
    /// Creates a client for `program`, with `args` placed before each subcommand.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    #[instrument(skip(self), fields(program = %self.program.display()))]
    async fn call<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        target: &str,
    ) -> Result<T, CatalogError> {
        let lookup_error = |message: String| CatalogError::Lookup {
            operation,
            target: target.to_string(),
            message,
        };

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(operation)
            .arg(target)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| lookup_error(format!("failed to run helper: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(lookup_error(format!(
                "helper exited with {}: {}",
                output.status.code().unwrap_or(-1),
                stderr.trim()
            )));
        }

        debug!(bytes = output.stdout.len(), "helper answered");
        serde_json::from_slice(&output.stdout).map_err(|e| CatalogError::Malformed {
            operation,
            target: target.to_string(),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl CatalogClient for CommandCatalogClient {
    async fn search_artists(&self, name: &str) -> Result<Vec<ArtistMatch>, CatalogError> {
        self.call("search", name).await
    }

    async fn get_artist(&self, browse_id: &str) -> Result<ArtistCatalog, CatalogError> {
        self.call("artist", browse_id).await
    }

    async fn get_album(&self, browse_id: &str) -> Result<AlbumDetails, CatalogError> {
        self.call("album", browse_id).await
    }

    async fn get_playlist(&self, playlist_id: &str) -> Result<Vec<TrackInfo>, CatalogError> {
        self.call("playlist", playlist_id).await
    }
}
