//! Catalog state store: persisted completeness of every artist, album and track.
//!
//! The store owns the three entity tables plus the run bookkeeping that lives
//! beside them in the same database:
//! - [`CatalogStore::check_or_create`] - the per-entity skip/resume/create gate
//! - [`CatalogStore::update_status`] - idempotent status overwrite
//! - [`propagate_min`] - child-to-parent aggregation
//! - the artist work queue, daily throughput counter and error log
//!
//! # Example
//!
//! ```ignore
//! use discography_core::store::{CatalogStore, EntityKind, SkipPolicy};
//!
//! let store = CatalogStore::new(db);
//! let presence = store
//!     .check_or_create(&EntityKind::Artist { name: "Can" }, &SkipPolicy::default())
//!     .await?;
//! if !presence.is_skip() {
//!     // ... visit albums, then aggregate ...
//! }
//! ```

mod entity;
mod error;
mod error_log;
mod queue;
mod status;
mod throughput;

pub use entity::{EntityKind, EntityTable, Presence, SkipPolicy};
pub use error::{DbErrorKind, StoreError};
pub use error_log::{ErrorLogEntry, RUN_HEADER_CODE};
pub use queue::{NO_MATCH_SUGGESTION, QueueCounts, QueueEntry};
pub use status::{StatusCode, propagate_min};

use tracing::{debug, instrument};

use crate::db::Database;

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

fn decode_status(code: i64) -> Result<StatusCode> {
    StatusCode::from_code(code).ok_or(StoreError::InvalidStatus(code))
}

fn existing_presence((id, code): (i64, i64), policy: &SkipPolicy) -> Result<Presence> {
    let status = decode_status(code)?;
    let presence = if policy.is_terminal(status) {
        Presence::Skip { status }
    } else {
        Presence::Resume { id, status }
    };
    debug!(id, %status, skip = presence.is_skip(), "entity exists");
    Ok(presence)
}

/// Persistent catalog state shared by the crawler, status report and tests.
#[derive(Debug, Clone)]
pub struct CatalogStore {
    db: Database,
}

impl CatalogStore {
    /// Creates a store over an opened database.
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Returns the underlying database handle.
    #[must_use]
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Looks up an entity by natural key, creating it at PRELOAD when missing.
    ///
    /// Existing rows whose status is terminal under `policy` come back as
    /// [`Presence::Skip`]; all other existing rows as [`Presence::Resume`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if a query fails, or
    /// [`StoreError::InvalidStatus`] if the stored status is not a known code.
    #[instrument(skip(self, policy), fields(entity = %entity))]
    pub async fn check_or_create(
        &self,
        entity: &EntityKind<'_>,
        policy: &SkipPolicy,
    ) -> Result<Presence> {
        if let Some(row) = self.find(entity).await? {
            return existing_presence(row, policy);
        }

        match self.insert(entity).await {
            Ok(id) => {
                debug!(id, "entity created");
                Ok(Presence::Created { id })
            }
            // A second process sharing the database inserted the row first.
            Err(err) if err.database_kind() == Some(DbErrorKind::ConstraintViolation) => {
                debug!(error = %err, "entity inserted concurrently; re-reading");
                match self.find(entity).await? {
                    Some(row) => existing_presence(row, policy),
                    None => Err(err),
                }
            }
            Err(err) => Err(err),
        }
    }

    /// Overwrites the status of one row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::EntityNotFound`] if no row has `id`, or
    /// [`StoreError::Database`] if the update fails.
    #[instrument(skip(self), fields(table = table.as_str(), %status))]
    pub async fn update_status(
        &self,
        table: EntityTable,
        id: i64,
        status: StatusCode,
    ) -> Result<()> {
        let sql = format!(
            "UPDATE {} SET status = ?, updated_at = datetime('now') WHERE id = ?",
            table.as_str()
        );
        let result = sqlx::query(&sql)
            .bind(status.code())
            .bind(id)
            .execute(self.db.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::EntityNotFound {
                table: table.as_str(),
                id,
            });
        }
        Ok(())
    }

    /// Returns the stored status of an entity, if it exists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    pub async fn find_status(&self, entity: &EntityKind<'_>) -> Result<Option<StatusCode>> {
        match self.find(entity).await? {
            Some((_, code)) => decode_status(code).map(Some),
            None => Ok(None),
        }
    }

    /// Counts rows of `table` per status, in completeness order.
    ///
    /// Statuses with no rows are omitted.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    pub async fn count_by_status(&self, table: EntityTable) -> Result<Vec<(StatusCode, i64)>> {
        let sql = format!(
            "SELECT status, COUNT(*) FROM {} GROUP BY status ORDER BY status",
            table.as_str()
        );
        let rows: Vec<(i64, i64)> = sqlx::query_as(&sql).fetch_all(self.db.pool()).await?;

        rows.into_iter()
            .map(|(code, count)| decode_status(code).map(|status| (status, count)))
            .collect()
    }

    async fn find(&self, entity: &EntityKind<'_>) -> Result<Option<(i64, i64)>> {
        let row: Option<(i64, i64)> = match *entity {
            EntityKind::Artist { name } => {
                sqlx::query_as("SELECT id, status FROM artists WHERE name = ?")
                    .bind(name)
                    .fetch_optional(self.db.pool())
                    .await?
            }
            EntityKind::Album { artist_id, title } => {
                sqlx::query_as("SELECT id, status FROM albums WHERE artist_id = ? AND title = ?")
                    .bind(artist_id)
                    .bind(title)
                    .fetch_optional(self.db.pool())
                    .await?
            }
            EntityKind::Track { album_id, title } => {
                sqlx::query_as("SELECT id, status FROM tracks WHERE album_id = ? AND title = ?")
                    .bind(album_id)
                    .bind(title)
                    .fetch_optional(self.db.pool())
                    .await?
            }
        };
        Ok(row)
    }

    async fn insert(&self, entity: &EntityKind<'_>) -> Result<i64> {
        let preload = StatusCode::Preload.code();
        let result = match *entity {
            EntityKind::Artist { name } => {
                sqlx::query("INSERT INTO artists (name, status) VALUES (?, ?)")
                    .bind(name)
                    .bind(preload)
                    .execute(self.db.pool())
                    .await?
            }
            EntityKind::Album { artist_id, title } => {
                sqlx::query("INSERT INTO albums (artist_id, title, status) VALUES (?, ?, ?)")
                    .bind(artist_id)
                    .bind(title)
                    .bind(preload)
                    .execute(self.db.pool())
                    .await?
            }
            EntityKind::Track { album_id, title } => {
                sqlx::query("INSERT INTO tracks (album_id, title, status) VALUES (?, ?, ?)")
                    .bind(album_id)
                    .bind(title)
                    .bind(preload)
                    .execute(self.db.pool())
                    .await?
            }
        };
        Ok(result.last_insert_rowid())
    }
}
