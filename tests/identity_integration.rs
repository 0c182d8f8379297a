//! Integration tests for identity rotation against a file-backed ledger.

mod support;

use std::sync::Arc;
use std::time::Duration;

use chrono::{Days, NaiveDate};
use discography_core::Database;
use discography_core::governor::RecordingSleeper;
use discography_core::identity::{IdentityError, IdentityLedger, IdentityRotator, RotationConfig};
use support::fakes::{FakeRouter, ScriptedProbe};
use tempfile::TempDir;

const STABILIZE: Duration = Duration::from_secs(10);
const COOLDOWN: Duration = Duration::from_secs(3600);

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 15).unwrap()
}

fn config(max_cycles: u32, max_attempts_per_cycle: u32) -> RotationConfig {
    RotationConfig {
        max_cycles,
        max_attempts_per_cycle,
        stabilize_wait: STABILIZE,
        cycle_cooldown: COOLDOWN,
        min_freshness_days: 30,
    }
}

async fn ledger(dir: &TempDir) -> IdentityLedger {
    let db = Database::new(&dir.path().join("catalog.db")).await.unwrap();
    IdentityLedger::new(db)
}

fn rotator(
    ledger: IdentityLedger,
    router: &FakeRouter,
    probe: &ScriptedProbe,
    sleeper: &RecordingSleeper,
    config: RotationConfig,
) -> IdentityRotator {
    IdentityRotator::new(
        ledger,
        Box::new(router.clone()),
        Box::new(probe.clone()),
        Arc::new(sleeper.clone()),
        config,
    )
}

#[tokio::test]
async fn test_rotation_advances_hardware_id_and_records_identity() {
    let dir = TempDir::new().unwrap();
    let router = FakeRouter::new("00:11:22:33:44:55");
    let probe = ScriptedProbe::new(&["203.0.113.7"]);
    let sleeper = RecordingSleeper::new();

    let identity = rotator(ledger(&dir).await, &router, &probe, &sleeper, config(2, 3))
        .rotate(today())
        .await
        .unwrap();

    assert_eq!(identity, "203.0.113.7");
    assert_eq!(router.mac(), "00:11:22:34:44:55");
    assert_eq!(router.restarts(), 1);
    assert_eq!(sleeper.waits(), vec![STABILIZE]);

    let record = ledger(&dir).await.lookup("203.0.113.7").await.unwrap().unwrap();
    assert_eq!(record.last_seen, today());
    assert!(!record.banned);
}

#[tokio::test]
async fn test_recent_identity_is_refreshed_and_rotated_past() {
    let dir = TempDir::new().unwrap();
    let seen = today().checked_sub_days(Days::new(3)).unwrap();
    ledger(&dir).await.observe("198.51.100.1", seen).await.unwrap();

    let router = FakeRouter::new("00:11:22:33:44:55");
    let probe = ScriptedProbe::new(&["198.51.100.1", "198.51.100.2"]);
    let sleeper = RecordingSleeper::new();

    let identity = rotator(ledger(&dir).await, &router, &probe, &sleeper, config(1, 3))
        .rotate(today())
        .await
        .unwrap();

    assert_eq!(identity, "198.51.100.2");
    assert_eq!(router.restarts(), 2);
    let refreshed = ledger(&dir).await.lookup("198.51.100.1").await.unwrap().unwrap();
    assert_eq!(refreshed.last_seen, today());
}

#[tokio::test]
async fn test_banned_identity_exhausts_every_cycle() {
    let dir = TempDir::new().unwrap();
    let long_ago = today().checked_sub_days(Days::new(365)).unwrap();
    ledger(&dir).await.mark_banned("192.0.2.9", long_ago).await.unwrap();

    let router = FakeRouter::new("00:11:22:33:44:55");
    let probe = ScriptedProbe::new(&["192.0.2.9"]);
    let sleeper = RecordingSleeper::new();

    let err = rotator(ledger(&dir).await, &router, &probe, &sleeper, config(3, 2))
        .rotate(today())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        IdentityError::Exhausted {
            cycles: 3,
            attempts: 2
        }
    ));
    assert_eq!(router.restarts(), 6);
    assert_eq!(sleeper.count_of(COOLDOWN), 2);
    assert_eq!(sleeper.count_of(STABILIZE), 6);

    let record = ledger(&dir).await.lookup("192.0.2.9").await.unwrap().unwrap();
    assert!(record.banned);
    assert_eq!(record.last_seen, today());
}

#[tokio::test]
async fn test_mark_current_banned_then_age() {
    let dir = TempDir::new().unwrap();
    let router = FakeRouter::new("00:11:22:33:44:55");
    let probe = ScriptedProbe::new(&["203.0.113.50"]);
    let sleeper = RecordingSleeper::new();
    let rotator = rotator(ledger(&dir).await, &router, &probe, &sleeper, config(1, 1));

    assert_eq!(rotator.current_identity_age(today()).await.unwrap(), None);

    let marked = rotator.mark_current_banned(today()).await.unwrap();
    assert_eq!(marked, "203.0.113.50");
    assert_eq!(rotator.current_identity_age(today()).await.unwrap(), Some(0));
    assert!(
        rotator
            .ledger()
            .lookup("203.0.113.50")
            .await
            .unwrap()
            .unwrap()
            .banned
    );
    assert_eq!(router.restarts(), 0);
}
