//! End-to-end CLI tests for the discography binary.
//!
//! Every invocation points `XDG_CONFIG_HOME` and the working directory at a
//! temp dir so no user config or state is touched.

#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn discography(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("discography").unwrap();
    cmd.current_dir(dir.path())
        .env("XDG_CONFIG_HOME", dir.path().join("config"))
        .env_remove("ROUTER_HOST")
        .env_remove("RUST_LOG");
    cmd
}

/// Test that --help displays usage information and exits with code 0.
#[test]
fn test_binary_help_displays_usage() {
    let dir = TempDir::new().unwrap();
    discography(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Crawl artist discographies"))
        .stdout(predicate::str::contains("--preload"));
}

/// Test that --version displays version and exits with code 0.
#[test]
fn test_binary_version_displays_version() {
    let dir = TempDir::new().unwrap();
    discography(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("discography"));
}

/// Test that invalid flags cause non-zero exit.
#[test]
fn test_binary_invalid_flag_returns_error() {
    let dir = TempDir::new().unwrap();
    discography(&dir)
        .arg("--invalid-flag")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

/// Test that a run with nothing to crawl exits cleanly and creates the state database.
#[test]
fn test_no_artists_exits_zero() {
    let dir = TempDir::new().unwrap();
    discography(&dir).assert().success();
    assert!(dir.path().join(".discography").join("catalog.db").is_file());
}

/// Test that --status prints the queue summary.
#[test]
fn test_status_reports_queue() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("state.db");
    discography(&dir)
        .arg("--status")
        .arg("--db")
        .arg(&db)
        .assert()
        .success()
        .stdout(predicate::str::contains("Queue: 0 pending, 0 done (0 rejected)"))
        .stdout(predicate::str::contains("Tracks: none"));
}

/// Test that --rotate without a router fails with a hint.
#[test]
fn test_rotate_without_router_fails() {
    let dir = TempDir::new().unwrap();
    discography(&dir)
        .arg("--rotate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No router configured"));
}

/// Test that --mark-banned and --rotate cannot be combined.
#[test]
fn test_mark_banned_conflicts_with_rotate() {
    let dir = TempDir::new().unwrap();
    discography(&dir)
        .args(["--mark-banned", "--rotate"])
        .assert()
        .failure();
}

/// Test that a missing explicit config file is an error.
#[test]
fn test_missing_config_file_fails() {
    let dir = TempDir::new().unwrap();
    discography(&dir)
        .arg("--config")
        .arg(dir.path().join("missing.toml"))
        .arg("--status")
        .assert()
        .failure();
}
