//! Identity rotation controller.
//!
//! Drives the router to a fresh public address when the current one is stale
//! or banned. The loop is bounded: `max_cycles` cycles of
//! `max_attempts_per_cycle` attempts, with a long cool-down between cycles.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tracing::{info, instrument, warn};

use super::{IdentityError, IdentityLedger, IdentityTransport, PublicIdentityProbe};
use super::transport::advance_hardware_id;
use crate::governor::Sleeper;

/// Default number of outer cycles.
pub const DEFAULT_MAX_CYCLES: u32 = 5;

/// Default attempts per cycle.
pub const DEFAULT_MAX_ATTEMPTS_PER_CYCLE: u32 = 5;

/// Default wait for the network to come back after a restart.
pub const DEFAULT_STABILIZE_WAIT: Duration = Duration::from_secs(10);

/// Default cool-down between cycles.
pub const DEFAULT_CYCLE_COOLDOWN: Duration = Duration::from_secs(3600);

/// Default minimum age before a previously seen identity may be reused.
pub const DEFAULT_MIN_FRESHNESS_DAYS: u32 = 30;

/// Tunables for the rotation loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationConfig {
    pub max_cycles: u32,
    pub max_attempts_per_cycle: u32,
    pub stabilize_wait: Duration,
    pub cycle_cooldown: Duration,
    pub min_freshness_days: u32,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            max_cycles: DEFAULT_MAX_CYCLES,
            max_attempts_per_cycle: DEFAULT_MAX_ATTEMPTS_PER_CYCLE,
            stabilize_wait: DEFAULT_STABILIZE_WAIT,
            cycle_cooldown: DEFAULT_CYCLE_COOLDOWN,
            min_freshness_days: DEFAULT_MIN_FRESHNESS_DAYS,
        }
    }
}

/// Outcome of one rotation attempt.
enum Attempt {
    Valid(String),
    Rejected(String),
}

/// Ensures the caller runs under a usable public identity.
pub struct IdentityRotator {
    ledger: IdentityLedger,
    transport: Box<dyn IdentityTransport>,
    probe: Box<dyn PublicIdentityProbe>,
    sleeper: Arc<dyn Sleeper>,
    config: RotationConfig,
}

impl IdentityRotator {
    #[must_use]
    pub fn new(
        ledger: IdentityLedger,
        transport: Box<dyn IdentityTransport>,
        probe: Box<dyn PublicIdentityProbe>,
        sleeper: Arc<dyn Sleeper>,
        config: RotationConfig,
    ) -> Self {
        Self {
            ledger,
            transport,
            probe,
            sleeper,
            config,
        }
    }

    /// The ledger this controller reads and updates.
    #[must_use]
    pub fn ledger(&self) -> &IdentityLedger {
        &self.ledger
    }

    /// Age in days of the current public identity.
    ///
    /// `None` when the identity was never recorded, or when the probe fails.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Store`] if the ledger cannot be read.
    #[instrument(skip(self))]
    pub async fn current_identity_age(
        &self,
        today: NaiveDate,
    ) -> Result<Option<i64>, IdentityError> {
        let identity = match self.probe.public_identity().await {
            Ok(identity) => identity,
            Err(error) => {
                warn!(error = %error, "could not determine current identity");
                return Ok(None);
            }
        };
        let age = self.ledger.age_days(&identity, today).await?;
        match age {
            Some(days) => info!(identity = %identity, days, "current identity age"),
            None => info!(identity = %identity, "current identity not in ledger"),
        }
        Ok(age)
    }

    /// Rotates until a usable identity is obtained.
    ///
    /// Transport and probe failures count as failed attempts. Rejected
    /// identities still get their `last_seen` refreshed.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Exhausted`] when every cycle fails, or
    /// [`IdentityError::Store`] if the ledger cannot be written.
    #[instrument(skip(self))]
    pub async fn rotate(&self, today: NaiveDate) -> Result<String, IdentityError> {
        let RotationConfig {
            max_cycles,
            max_attempts_per_cycle,
            ..
        } = self.config;

        for cycle in 1..=max_cycles {
            for attempt in 1..=max_attempts_per_cycle {
                info!(cycle, attempt, "identity rotation attempt");
                match self.attempt(today).await {
                    Ok(Attempt::Valid(identity)) => {
                        info!(identity = %identity, "usable identity obtained");
                        return Ok(identity);
                    }
                    Ok(Attempt::Rejected(identity)) => {
                        info!(identity = %identity, "identity banned or too recent");
                    }
                    Err(error @ IdentityError::Store(_)) => return Err(error),
                    Err(error) => warn!(error = %error, "rotation attempt failed"),
                }
            }

            if cycle < max_cycles {
                warn!(
                    cycle,
                    cooldown_secs = self.config.cycle_cooldown.as_secs(),
                    "rotation cycle exhausted; cooling down"
                );
                self.sleeper.sleep(self.config.cycle_cooldown).await;
            }
        }

        Err(IdentityError::Exhausted {
            cycles: max_cycles,
            attempts: max_attempts_per_cycle,
        })
    }

    /// Marks the current public identity banned.
    ///
    /// Returns the identity that was marked.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Probe`] when the current identity is unknown,
    /// or [`IdentityError::Store`] if the ledger cannot be written.
    pub async fn mark_current_banned(&self, today: NaiveDate) -> Result<String, IdentityError> {
        let identity = self.probe.public_identity().await?;
        self.ledger.mark_banned(&identity, today).await?;
        Ok(identity)
    }

    async fn attempt(&self, today: NaiveDate) -> Result<Attempt, IdentityError> {
        advance_hardware_id(self.transport.as_ref()).await?;
        self.sleeper.sleep(self.config.stabilize_wait).await;

        let identity = self.probe.public_identity().await?;
        let previous = self.ledger.observe(&identity, today).await?;
        let usable = previous
            .as_ref()
            .is_none_or(|record| record.is_usable(today, self.config.min_freshness_days));

        Ok(if usable {
            Attempt::Valid(identity)
        } else {
            Attempt::Rejected(identity)
        })
    }
}
