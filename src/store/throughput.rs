//! Daily throughput counter, one row per calendar day.

use chrono::NaiveDate;
use tracing::instrument;

use super::{CatalogStore, Result};

impl CatalogStore {
    /// Adds one successful fetch to `day` and returns the new total.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`](super::StoreError::Database) if the upsert fails.
    #[instrument(skip(self))]
    pub async fn record_fetch(&self, day: NaiveDate) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as(
            "INSERT INTO throughput (day, count) VALUES (?, 1)
             ON CONFLICT(day) DO UPDATE SET count = count + 1
             RETURNING count",
        )
        .bind(day)
        .fetch_one(self.database().pool())
        .await?;
        Ok(count)
    }

    /// Returns the number of successful fetches recorded on `day`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`](super::StoreError::Database) if the query fails.
    pub async fn fetches_on(&self, day: NaiveDate) -> Result<i64> {
        let count: Option<(i64,)> = sqlx::query_as("SELECT count FROM throughput WHERE day = ?")
            .bind(day)
            .fetch_optional(self.database().pool())
            .await?;
        Ok(count.map_or(0, |(count,)| count))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::Database;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    #[tokio::test]
    async fn test_fetches_on_unrecorded_day_is_zero() {
        let store = CatalogStore::new(Database::new_in_memory().await.unwrap());
        assert_eq!(store.fetches_on(day(1)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_record_fetch_increments_per_day() {
        let store = CatalogStore::new(Database::new_in_memory().await.unwrap());

        assert_eq!(store.record_fetch(day(1)).await.unwrap(), 1);
        assert_eq!(store.record_fetch(day(1)).await.unwrap(), 2);
        assert_eq!(store.record_fetch(day(2)).await.unwrap(), 1);

        assert_eq!(store.fetches_on(day(1)).await.unwrap(), 2);
        assert_eq!(store.fetches_on(day(2)).await.unwrap(), 1);
    }
}
