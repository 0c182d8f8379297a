//! Discography Core Library
//!
//! Crawls an artist → album → track catalog and materializes every track as a
//! file, persisting enough state to resume after interruption and to stay
//! clear of network bans.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`db`] - Database connection and schema management
//! - [`store`] - Catalog state store, work queue, throughput counter, error log
//! - [`governor`] - Daily and per-run fetch ceilings, pacing
//! - [`identity`] - Ban ledger and network identity rotation
//! - [`crawl`] - The crawl state machine and its collaborator seams

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod crawl;
pub mod db;
pub mod governor;
pub mod identity;
pub mod store;

// Re-export commonly used types
pub use crawl::{Crawler, FatalError, RunOptions, RunSummary};
pub use db::{Database, DatabaseOptions, DbError};
pub use governor::RateGovernor;
pub use identity::{IdentityLedger, IdentityRotator};
pub use store::{CatalogStore, StatusCode};
