//! Smoke tests for the mezon-e2e binary

#![allow(deprecated)] // Command::cargo_bin
#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn mezon_e2e() -> Command {
    let mut cmd = Command::cargo_bin("mezon-e2e").expect("mezon-e2e binary should exist");
    for var in ["E2E_ACCOUNTS_FILE", "E2E_WORKERS", "MEZON_BASE_URL", "CI"] {
        cmd.env_remove(var);
    }
    cmd
}

// ============================================================================
// Basic CLI Tests
// ============================================================================

#[test]
fn test_version_flag() {
    mezon_e2e()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.4.0"));
}

#[test]
fn test_help_flag() {
    mezon_e2e()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_no_args_fails() {
    mezon_e2e().assert().failure();
}

#[test]
fn test_unknown_subcommand_fails() {
    mezon_e2e().arg("deploy").assert().failure();
}

// ============================================================================
// List and Config
// ============================================================================

#[test]
fn test_list_prints_features() {
    mezon_e2e()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("messages"))
        .stdout(predicate::str::contains("direct_messages"))
        .stdout(predicate::str::contains("pin and jump to message"));
}

#[test]
fn test_list_single_feature() {
    mezon_e2e()
        .args(["list", "--feature", "file_upload"])
        .assert()
        .success()
        .stdout(predicate::str::contains("oversized emoji rejected"))
        .stdout(predicate::str::contains("send message").not());
}

#[test]
fn test_config_prints_json() {
    mezon_e2e()
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"base_url\""));
}

#[test]
fn test_config_rejects_bad_environment() {
    mezon_e2e()
        .arg("config")
        .env("E2E_WORKERS", "many")
        .assert()
        .failure()
        .stderr(predicate::str::contains("E2E_WORKERS"));
}

// ============================================================================
// Run
// ============================================================================

#[cfg(not(feature = "browser"))]
#[test]
fn test_run_without_browser_support_fails() {
    let dir = TempDir::new().unwrap();
    mezon_e2e()
        .args(["run", "-q", "--output"])
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("--features browser"));
}

#[test]
fn test_run_rejects_zero_workers() {
    mezon_e2e()
        .args(["run", "-j", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E2E_WORKERS"));
}

// ============================================================================
// Seed Session
// ============================================================================

fn accounts_file(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("accounts.json");
    fs::write(
        &path,
        r#"[{"username": "qa.alice", "session": {"token": "abc", "refresh_token": "def"}}]"#,
    )
    .unwrap();
    path
}

#[test]
fn test_seed_session_prints_storage_entries() {
    let dir = TempDir::new().unwrap();
    let path = accounts_file(&dir);
    mezon_e2e()
        .args(["seed-session", "--account", "qa.alice", "--accounts-file"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("persist:auth="))
        .stdout(predicate::str::contains("mezon_session="));
}

#[test]
fn test_seed_session_unknown_account() {
    let dir = TempDir::new().unwrap();
    let path = accounts_file(&dir);
    mezon_e2e()
        .args(["seed-session", "--account", "qa.nobody", "--accounts-file"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown account: qa.nobody"));
}

#[test]
fn test_seed_session_without_accounts_file() {
    mezon_e2e()
        .args(["seed-session", "--account", "qa.alice"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E2E_ACCOUNTS_FILE"));
}
