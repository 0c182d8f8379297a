//! Blocking waits on the single worker and their jitter.
//!
//! Every suspension point of a run (stabilization wait, cycle cool-down,
//! inter-track delay, post-error cool-down) goes through a [`Sleeper`] so
//! tests can record the waits instead of performing them.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;

/// Waits for a duration.
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Suspends the caller for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Real-time sleeper backed by `tokio::time::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Sleeper that returns immediately and remembers every requested wait.
#[derive(Debug, Clone, Default)]
pub struct RecordingSleeper {
    waits: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every wait requested so far, in order.
    #[must_use]
    pub fn waits(&self) -> Vec<Duration> {
        self.waits
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of waits of exactly `duration`.
    #[must_use]
    pub fn count_of(&self, duration: Duration) -> usize {
        self.waits().iter().filter(|wait| **wait == duration).count()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.waits
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(duration);
    }
}

/// Returns a uniformly random duration in `[nominal / 2, nominal * 3 / 2]`.
#[must_use]
pub fn jittered(nominal: Duration) -> Duration {
    let millis = u64::try_from(nominal.as_millis()).unwrap_or(u64::MAX / 2);
    if millis == 0 {
        return Duration::ZERO;
    }
    let low = millis / 2;
    let high = millis.saturating_add(millis / 2);
    Duration::from_millis(rand::thread_rng().gen_range(low..=high))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jittered_stays_within_half_band() {
        let nominal = Duration::from_secs(20);
        for _ in 0..200 {
            let delay = jittered(nominal);
            assert!(delay >= Duration::from_secs(10), "{delay:?} below band");
            assert!(delay <= Duration::from_secs(30), "{delay:?} above band");
        }
    }

    #[test]
    fn test_jittered_zero_is_zero() {
        assert_eq!(jittered(Duration::ZERO), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_recording_sleeper_records_without_waiting() {
        let sleeper = RecordingSleeper::new();
        sleeper.sleep(Duration::from_secs(3600)).await;
        sleeper.sleep(Duration::from_secs(10)).await;
        sleeper.sleep(Duration::from_secs(3600)).await;

        assert_eq!(sleeper.waits().len(), 3);
        assert_eq!(sleeper.count_of(Duration::from_secs(3600)), 2);
    }
}
