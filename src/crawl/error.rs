//! Typed outcome of a crawl step.

use thiserror::Error;

use super::classify::FetchFailureCause;
use super::client::CatalogError;
use crate::governor::QuotaError;
use crate::store::StoreError;

/// Errors that stop the whole run.
#[derive(Debug, Clone, Error)]
pub enum FatalError {
    /// A non-skippable fetch failure repeated after the cool-down retry.
    #[error("fetch of {track} failed again after cool-down ({cause})")]
    PersistentFetchFailure {
        track: String,
        cause: FetchFailureCause,
    },

    /// Too many non-skippable fetch failures in this run.
    #[error("{failures} fetch failures this run, giving up")]
    FailureTallyExceeded { failures: u32 },

    #[error(transparent)]
    Quota(#[from] QuotaError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("interrupted")]
    Interrupted,
}

impl FatalError {
    /// Short code written to the error log.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::PersistentFetchFailure { .. } => "FATAL",
            Self::FailureTallyExceeded { .. } => "TALLY",
            Self::Quota(_) => "QUOTA",
            Self::Store(_) => "STORE",
            Self::Interrupted => "INTERRUPT",
        }
    }
}

/// Result of one crawl step: either the entity is abandoned or the run stops.
#[derive(Debug, Clone, Error)]
pub enum CrawlError {
    /// Catalog lookup failed; the artist or album is abandoned and the run continues.
    #[error("{entity}: {source}")]
    Entity {
        entity: String,
        #[source]
        source: CatalogError,
    },

    #[error(transparent)]
    Fatal(#[from] FatalError),
}

impl From<StoreError> for CrawlError {
    fn from(err: StoreError) -> Self {
        Self::Fatal(FatalError::Store(err))
    }
}

impl From<QuotaError> for CrawlError {
    fn from(err: QuotaError) -> Self {
        Self::Fatal(FatalError::Quota(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_are_fatal() {
        let err = CrawlError::from(StoreError::InvalidStatus(42));
        assert!(matches!(err, CrawlError::Fatal(FatalError::Store(_))));
    }

    #[test]
    fn test_quota_errors_are_fatal() {
        let err = CrawlError::from(QuotaError::BatchLimitReached { limit: 1 });
        match err {
            CrawlError::Fatal(fatal) => assert_eq!(fatal.code(), "QUOTA"),
            CrawlError::Entity { .. } => panic!("quota refusal must stop the run"),
        }
    }
}
