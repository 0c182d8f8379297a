//! Error types for identity ledger and rotation.

use thiserror::Error;

use crate::store::StoreError;

/// Errors raised by the identity subsystem.
#[derive(Debug, Clone, Error)]
pub enum IdentityError {
    /// Ledger read or write failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The router session or one of its commands failed.
    #[error("identity transport failed: {message}")]
    Transport {
        /// Command or session failure text.
        message: String,
    },

    /// The router reported a hardware id that is not a MAC address.
    #[error("invalid hardware id: {0:?}")]
    InvalidHardwareId(String),

    /// The hardware id read back after restart is not the one written.
    #[error("hardware id not applied: wrote {expected}, read back {actual}")]
    HardwareIdNotApplied {
        /// Id that was written.
        expected: String,
        /// Id the device reports.
        actual: String,
    },

    /// The public address could not be determined.
    #[error("public identity probe failed: {message}")]
    Probe {
        /// Probe failure text.
        message: String,
    },

    /// Every rotation cycle ran out of attempts without a usable identity.
    #[error("unable to obtain a usable identity after {cycles} cycles of {attempts} attempts")]
    Exhausted {
        /// Cycles run.
        cycles: u32,
        /// Attempts per cycle.
        attempts: u32,
    },
}

impl IdentityError {
    pub(crate) fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub(crate) fn probe(message: impl Into<String>) -> Self {
        Self::Probe {
            message: message.into(),
        }
    }
}
