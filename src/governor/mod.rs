//! Rate and quota governor.
//!
//! Gates every network fetch against two ceilings:
//! - a daily ceiling, persisted in the throughput counter so it holds across runs
//! - a per-run batch ceiling, counted in memory
//!
//! A zero ceiling disables that check. Refusal happens before the fetch is
//! attempted, never after.

mod pacing;

pub use pacing::{RecordingSleeper, Sleeper, TokioSleeper, jittered};

use chrono::{Local, NaiveDate};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::store::{CatalogStore, StoreError};

/// Default daily ceiling on successful fetches.
pub const DEFAULT_DAILY_LIMIT: u32 = 2500;

/// Default per-run ceiling on successful fetches.
pub const DEFAULT_BATCH_LIMIT: u32 = 550;

/// Errors raised when a quota refuses further work.
#[derive(Debug, Clone, Error)]
pub enum QuotaError {
    /// Today's throughput already reached the daily ceiling.
    #[error("daily limit reached: {count} of {limit} fetches recorded today")]
    DailyLimitReached {
        /// Configured ceiling.
        limit: u32,
        /// Fetches already recorded today.
        count: i64,
    },

    /// This run already performed its allowed number of fetches.
    #[error("batch limit reached: {limit} fetches this run")]
    BatchLimitReached {
        /// Configured ceiling.
        limit: u32,
    },

    /// Reading or writing the throughput counter failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Returns today's date on the local calendar.
#[must_use]
pub fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

/// Daily and per-run throughput gate.
#[derive(Debug, Clone)]
pub struct RateGovernor {
    store: CatalogStore,
    daily_limit: u32,
    batch_limit: u32,
    run_fetches: u32,
}

impl RateGovernor {
    /// Creates a governor with the given ceilings (0 disables a ceiling).
    #[must_use]
    pub fn new(store: CatalogStore, daily_limit: u32, batch_limit: u32) -> Self {
        Self {
            store,
            daily_limit,
            batch_limit,
            run_fetches: 0,
        }
    }

    /// Successful fetches performed by this run so far.
    #[must_use]
    pub fn run_fetches(&self) -> u32 {
        self.run_fetches
    }

    /// Refuses the next fetch when either ceiling is already reached.
    ///
    /// # Errors
    ///
    /// Returns [`QuotaError::BatchLimitReached`] or
    /// [`QuotaError::DailyLimitReached`] when a ceiling is hit, or
    /// [`QuotaError::Store`] if the counter cannot be read.
    #[instrument(skip(self), fields(run_fetches = self.run_fetches))]
    pub async fn check_before_fetch(&self, today: NaiveDate) -> Result<(), QuotaError> {
        if self.batch_limit > 0 && self.run_fetches >= self.batch_limit {
            return Err(QuotaError::BatchLimitReached {
                limit: self.batch_limit,
            });
        }

        if self.daily_limit > 0 {
            let count = self.store.fetches_on(today).await?;
            if count >= i64::from(self.daily_limit) {
                return Err(QuotaError::DailyLimitReached {
                    limit: self.daily_limit,
                    count,
                });
            }
        }
        Ok(())
    }

    /// Counts one successful fetch against both ceilings.
    ///
    /// Returns today's new total.
    ///
    /// # Errors
    ///
    /// Returns [`QuotaError::Store`] if the counter cannot be written.
    pub async fn record_fetch(&mut self, today: NaiveDate) -> Result<i64, QuotaError> {
        let count = self.store.record_fetch(today).await?;
        self.run_fetches = self.run_fetches.saturating_add(1);
        debug!(today_count = count, run_fetches = self.run_fetches, "fetch recorded");
        Ok(count)
    }
}
