//! Binary-level behaviour: precondition failures and read-only commands

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn hyprsession(data_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("hyprsession").expect("binary should build");
    cmd.env("HYPRSESSION_DIR", data_dir.path())
        .env_remove("HYPRLAND_INSTANCE_SIGNATURE")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_restore_without_hyprland_exits_nonzero() {
    let dir = TempDir::new().unwrap();
    hyprsession(&dir)
        .arg("restore")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Hyprland is not running"));
}

#[test]
fn test_save_without_hyprland_writes_nothing() {
    let dir = TempDir::new().unwrap();
    hyprsession(&dir).arg("save").assert().code(1);
    assert!(!dir.path().join("session-state").exists());
}

#[test]
fn test_status_on_empty_data_dir() {
    let dir = TempDir::new().unwrap();
    hyprsession(&dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("No saved session"))
        .stdout(predicate::str::contains("Archive: none"))
        .stdout(predicate::str::contains("Restore would use: nothing"));
}

#[test]
fn test_session_dir_flag_overrides_environment() {
    let env_dir = TempDir::new().unwrap();
    let flag_dir = TempDir::new().unwrap();
    hyprsession(&env_dir)
        .args(["clean", "--session-dir"])
        .arg(flag_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing to clean"));
    assert!(flag_dir.path().join("config.toml").exists());
    assert!(!env_dir.path().join("config.toml").exists());
}

#[test]
fn test_archive_migrate_without_snapshot_fails() {
    let dir = TempDir::new().unwrap();
    hyprsession(&dir).arg("archive-migrate").assert().failure();
}

#[test]
fn test_auto_save_without_hyprland_exits_nonzero() {
    let dir = TempDir::new().unwrap();
    hyprsession(&dir)
        .args(["auto-save", "--interval", "30"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Hyprland is not running"));
}
