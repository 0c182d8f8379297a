//! Ban/identity ledger: observed public addresses, their recency and ban flag.
//!
//! Pure data store. Nothing here talks to the network.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info, instrument};

use super::IdentityError;
use crate::db::Database;

/// One observed identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct IdentityRecord {
    pub identity: String,
    pub last_seen: NaiveDate,
    pub banned: bool,
}

impl IdentityRecord {
    /// Whole days between `last_seen` and `today`.
    #[must_use]
    pub fn age_days(&self, today: NaiveDate) -> i64 {
        (today - self.last_seen).num_days()
    }

    /// True when this identity may be used: not banned and last seen at
    /// least `min_freshness_days` ago.
    #[must_use]
    pub fn is_usable(&self, today: NaiveDate, min_freshness_days: u32) -> bool {
        !self.banned && self.age_days(today) >= i64::from(min_freshness_days)
    }
}

/// Persisted identity table.
#[derive(Debug, Clone)]
pub struct IdentityLedger {
    db: Database,
}

impl IdentityLedger {
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Looks up one identity.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Store`] if the query fails.
    pub async fn lookup(&self, identity: &str) -> Result<Option<IdentityRecord>, IdentityError> {
        let record = sqlx::query_as::<_, IdentityRecord>(
            "SELECT identity, last_seen, banned FROM identities WHERE identity = ?",
        )
        .bind(identity)
        .fetch_optional(self.db.pool())
        .await
        .map_err(crate::store::StoreError::from)?;
        Ok(record)
    }

    /// Records that `identity` was seen on `today`.
    ///
    /// Existing rows get `last_seen` refreshed with the ban flag untouched;
    /// unseen identities are inserted unbanned. Returns the record as it was
    /// before this observation, so callers judge validity on prior history.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Store`] if a query fails.
    #[instrument(skip(self))]
    pub async fn observe(
        &self,
        identity: &str,
        today: NaiveDate,
    ) -> Result<Option<IdentityRecord>, IdentityError> {
        let previous = self.lookup(identity).await?;
        sqlx::query(
            "INSERT INTO identities (identity, last_seen, banned) VALUES (?, ?, 0)
             ON CONFLICT(identity) DO UPDATE SET last_seen = excluded.last_seen",
        )
        .bind(identity)
        .bind(today)
        .execute(self.db.pool())
        .await
        .map_err(crate::store::StoreError::from)?;
        debug!(known = previous.is_some(), "identity observed");
        Ok(previous)
    }

    /// Flags `identity` banned and refreshes its `last_seen`, inserting it if unseen.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Store`] if the upsert fails.
    #[instrument(skip(self))]
    pub async fn mark_banned(&self, identity: &str, today: NaiveDate) -> Result<(), IdentityError> {
        sqlx::query(
            "INSERT INTO identities (identity, last_seen, banned) VALUES (?, ?, 1)
             ON CONFLICT(identity) DO UPDATE SET last_seen = excluded.last_seen, banned = 1",
        )
        .bind(identity)
        .bind(today)
        .execute(self.db.pool())
        .await
        .map_err(crate::store::StoreError::from)?;
        info!("identity marked banned");
        Ok(())
    }

    /// Age in days of a known identity, `None` if never seen.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Store`] if the query fails.
    pub async fn age_days(
        &self,
        identity: &str,
        today: NaiveDate,
    ) -> Result<Option<i64>, IdentityError> {
        Ok(self
            .lookup(identity)
            .await?
            .map(|record| record.age_days(today)))
    }
}
