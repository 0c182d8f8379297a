//! Network identity: the ban ledger and the rotation controller.
//!
//! - [`IdentityLedger`] - persisted record of observed public addresses
//! - [`IdentityRotator`] - bounded loop that forces a fresh address
//! - [`IdentityTransport`] / [`SshUciTransport`] - router session seam
//! - [`PublicIdentityProbe`] / [`HttpIdentityProbe`] - public address seam

mod error;
mod ledger;
mod probe;
mod rotation;
mod transport;

pub use error::IdentityError;
pub use ledger::{IdentityLedger, IdentityRecord};
pub use probe::{HttpIdentityProbe, PublicIdentityProbe};
pub use rotation::{
    DEFAULT_CYCLE_COOLDOWN, DEFAULT_MAX_ATTEMPTS_PER_CYCLE, DEFAULT_MAX_CYCLES,
    DEFAULT_MIN_FRESHNESS_DAYS, DEFAULT_STABILIZE_WAIT, IdentityRotator, RotationConfig,
};
pub use transport::{
    HardwareId, IdentityTransport, RouterSettings, SshUciTransport, advance_hardware_id,
};

/// Scheduled-artist count above which a run checks its identity first.
pub const PRE_RUN_CHECK_MIN_ARTISTS: usize = 5;

/// Identity age in days beyond which a run rotates before starting.
pub const DEFAULT_ROTATE_AFTER_DAYS: i64 = 2;

/// Decides whether a run of `scheduled_artists` should rotate first.
///
/// Rotates when the batch is large and the current identity is either unknown
/// or older than `rotate_after_days`.
#[must_use]
pub fn should_rotate_before_run(
    scheduled_artists: usize,
    identity_age_days: Option<i64>,
    rotate_after_days: i64,
) -> bool {
    scheduled_artists > PRE_RUN_CHECK_MIN_ARTISTS
        && identity_age_days.is_none_or(|age| age > rotate_after_days)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_batches_never_rotate() {
        assert!(!should_rotate_before_run(5, None, 2));
        assert!(!should_rotate_before_run(1, Some(100), 2));
    }

    #[test]
    fn test_large_batch_rotates_on_stale_or_unknown_identity() {
        assert!(should_rotate_before_run(6, None, 2));
        assert!(should_rotate_before_run(6, Some(3), 2));
        assert!(!should_rotate_before_run(6, Some(2), 2));
        assert!(!should_rotate_before_run(6, Some(0), 2));
    }
}
