//! Persistent append-only error log.

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::instrument;

use super::{CatalogStore, Result};

/// Code written for the header row each run appends.
pub const RUN_HEADER_CODE: &str = "RUN";

/// One logged error, newest first when read back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct ErrorLogEntry {
    pub id: i64,
    /// Short cause code (`AGE`, `SIG`, `LOOKUP`, `RUN`, ...).
    pub code: String,
    /// Entity the error concerns, when there is one.
    pub entity: Option<String>,
    pub message: String,
    pub logged_at: NaiveDateTime,
}

impl CatalogStore {
    /// Appends one entry to the error log.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`](super::StoreError::Database) if the insert fails.
    #[instrument(skip(self, message))]
    pub async fn log_error(&self, code: &str, entity: Option<&str>, message: &str) -> Result<i64> {
        let result = sqlx::query("INSERT INTO error_log (code, entity, message) VALUES (?, ?, ?)")
            .bind(code)
            .bind(entity)
            .bind(message)
            .execute(self.database().pool())
            .await?;
        Ok(result.last_insert_rowid())
    }

    /// Appends the header row that separates one run's entries from the next.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`](super::StoreError::Database) if the insert fails.
    pub async fn log_run_header(&self, description: &str) -> Result<i64> {
        self.log_error(RUN_HEADER_CODE, None, description).await
    }

    /// Returns the `limit` most recent entries, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`](super::StoreError::Database) if the query fails.
    pub async fn recent_errors(&self, limit: u32) -> Result<Vec<ErrorLogEntry>> {
        let rows = sqlx::query_as::<_, ErrorLogEntry>(
            "SELECT id, code, entity, message, logged_at FROM error_log
             ORDER BY id DESC LIMIT ?",
        )
        .bind(i64::from(limit))
        .fetch_all(self.database().pool())
        .await?;
        Ok(rows)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::Database;

    #[tokio::test]
    async fn test_log_error_and_read_back_newest_first() {
        let store = CatalogStore::new(Database::new_in_memory().await.unwrap());

        store.log_run_header("run started").await.unwrap();
        store
            .log_error("AGE", Some("Kraftwerk / Autobahn"), "Sign in to confirm your age")
            .await
            .unwrap();

        let entries = store.recent_errors(10).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].code, "AGE");
        assert_eq!(entries[0].entity.as_deref(), Some("Kraftwerk / Autobahn"));
        assert_eq!(entries[1].code, RUN_HEADER_CODE);
        assert_eq!(entries[1].entity, None);
    }

    #[tokio::test]
    async fn test_recent_errors_respects_limit() {
        let store = CatalogStore::new(Database::new_in_memory().await.unwrap());
        for i in 0..5 {
            store
                .log_error("OTHER", None, &format!("failure {i}"))
                .await
                .unwrap();
        }

        let entries = store.recent_errors(2).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].message, "failure 4");
    }
}
