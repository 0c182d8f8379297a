//! Artist work queue: the resume point between runs.

use serde::Serialize;
use tracing::{debug, instrument};

use super::{CatalogStore, Result};

/// One row of the artist work queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct QueueEntry {
    pub id: i64,
    /// Artist name as entered by the operator.
    pub artist: String,
    /// Processing for this artist is final.
    pub done: bool,
    /// Alternate name recorded when matching failed (`"BAD"` for no hits).
    pub suggestion: Option<String>,
}

/// Pending/done totals for the status report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueCounts {
    pub pending: i64,
    pub done: i64,
    /// Done entries that carry a rejection suggestion.
    pub rejected: i64,
}

/// Marker recorded when a search returns no hits at all.
pub const NO_MATCH_SUGGESTION: &str = "BAD";

impl CatalogStore {
    /// Adds an artist to the work queue unless it is already there.
    ///
    /// Returns true when a new row was inserted.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the insert fails.
    #[instrument(skip(self))]
    pub async fn enqueue_artist(&self, artist: &str) -> Result<bool> {
        let result = sqlx::query("INSERT OR IGNORE INTO queue (artist) VALUES (?)")
            .bind(artist)
            .execute(self.database().pool())
            .await?;
        let inserted = result.rows_affected() > 0;
        debug!(inserted, "enqueue artist");
        Ok(inserted)
    }

    /// Returns pending entries in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    pub async fn pending_artists(&self) -> Result<Vec<QueueEntry>> {
        let rows = sqlx::query_as::<_, QueueEntry>(
            "SELECT id, artist, done, suggestion FROM queue WHERE done = 0 ORDER BY id",
        )
        .fetch_all(self.database().pool())
        .await?;
        Ok(rows)
    }

    /// Looks up one queue entry by artist name.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    pub async fn queue_entry(&self, artist: &str) -> Result<Option<QueueEntry>> {
        let row = sqlx::query_as::<_, QueueEntry>(
            "SELECT id, artist, done, suggestion FROM queue WHERE artist = ?",
        )
        .bind(artist)
        .fetch_optional(self.database().pool())
        .await?;
        Ok(row)
    }

    /// Marks an artist's processing final.
    ///
    /// Artists that were never enqueued are inserted already done, so direct
    /// runs leave the same trail as daemon runs.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the upsert fails.
    #[instrument(skip(self))]
    pub async fn mark_artist_done(&self, artist: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO queue (artist, done) VALUES (?, 1)
             ON CONFLICT(artist) DO UPDATE SET done = 1, updated_at = datetime('now')",
        )
        .bind(artist)
        .execute(self.database().pool())
        .await?;
        Ok(())
    }

    /// Marks an artist done and records why its match was rejected.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the upsert fails.
    #[instrument(skip(self))]
    pub async fn mark_artist_rejected(&self, artist: &str, suggestion: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO queue (artist, done, suggestion) VALUES (?, 1, ?)
             ON CONFLICT(artist) DO UPDATE SET
                done = 1, suggestion = excluded.suggestion, updated_at = datetime('now')",
        )
        .bind(artist)
        .bind(suggestion)
        .execute(self.database().pool())
        .await?;
        Ok(())
    }

    /// Returns pending/done/rejected totals.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    pub async fn queue_counts(&self) -> Result<QueueCounts> {
        let (pending, done, rejected): (i64, i64, i64) = sqlx::query_as(
            "SELECT
                COALESCE(SUM(CASE WHEN done = 0 THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN done = 1 THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN done = 1 AND suggestion IS NOT NULL THEN 1 ELSE 0 END), 0)
             FROM queue",
        )
        .fetch_one(self.database().pool())
        .await?;
        Ok(QueueCounts {
            pending,
            done,
            rejected,
        })
    }
}
