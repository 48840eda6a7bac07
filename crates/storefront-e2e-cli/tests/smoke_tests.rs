//! Smoke tests for the storefront-e2e binary

#![allow(deprecated)] // Command::cargo_bin
#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn storefront_e2e() -> Command {
    let mut cmd = Command::cargo_bin("storefront-e2e").expect("storefront-e2e binary should exist");
    cmd.env_remove("STOREFRONT_URL")
        .env_remove("RUST_LOG")
        .arg("--color")
        .arg("never");
    cmd
}

// ============================================================================
// Basic CLI Tests
// ============================================================================

#[test]
fn test_help_flag() {
    storefront_e2e()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("list"));
}

#[test]
fn test_no_args_fails() {
    Command::cargo_bin("storefront-e2e")
        .expect("storefront-e2e binary should exist")
        .assert()
        .failure();
}

#[test]
fn test_list_shows_every_scenario() {
    storefront_e2e()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("full-cart-flow"))
        .stdout(predicate::str::contains("badge-updates-on-remove"));
}

// ============================================================================
// Run Tests
// ============================================================================

#[test]
fn test_fake_run_passes_and_writes_report() {
    let dir = TempDir::new().unwrap();
    let report = dir.path().join("out").join("report.json");
    storefront_e2e()
        .args(["run", "--fake", "-s", "empty-cart-state", "--report"])
        .arg(&report)
        .assert()
        .success()
        .stdout(predicate::str::contains("PASS empty-cart-state"))
        .stdout(predicate::str::contains("1 passed, 0 failed, 1 total"));

    let json = fs::read_to_string(&report).unwrap();
    assert!(json.contains("\"passed\": true"));
}

#[test]
fn test_fake_store_follows_configured_zero_badge() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("suite.yaml");
    fs::write(&config, "zero_badge: rendered-zero\ntimeouts:\n  poll_long_ms: 4000\n").unwrap();
    storefront_e2e()
        .args(["run", "--fake", "-s", "empty-cart-state", "-s", "badge-updates-on-remove", "-c"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("2 passed, 0 failed, 2 total"));
}

#[test]
fn test_quiet_run_prints_only_summary() {
    storefront_e2e()
        .args(["run", "--fake", "-q", "-s", "empty-cart-state"])
        .assert()
        .success()
        .stdout(predicate::str::contains("PASS").not())
        .stdout(predicate::str::contains("1 passed"));
}

#[test]
fn test_unknown_scenario_rejected() {
    storefront_e2e()
        .args(["run", "--fake", "-s", "checkout"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown scenario"));
}

#[cfg(not(feature = "browser"))]
#[test]
fn test_browser_run_requires_feature() {
    storefront_e2e()
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--features browser"));
}

// ============================================================================
// Config Tests
// ============================================================================

#[test]
fn test_config_prints_effective_yaml() {
    storefront_e2e()
        .args(["config", "--url", "http://store.test/", "--zero-badge", "rendered-zero"])
        .assert()
        .success()
        .stdout(predicate::str::contains("http://store.test/"))
        .stdout(predicate::str::contains("rendered-zero"));
}

#[test]
fn test_config_rejects_bad_url() {
    storefront_e2e()
        .args(["config", "--url", "ftp://store.test/"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration error"));
}
