//! End-to-end CLI integration tests
//!
//! These tests use assert_cmd to drive the subdub binary in offline mode from
//! an empty working directory, so no local configuration leaks in.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn subdub_in(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("subdub").unwrap();
    cmd.current_dir(dir.path()).env("RUST_LOG", "warn");
    cmd
}

fn offline_run(dir: &TempDir) -> Command {
    let mut cmd = subdub_in(dir);
    cmd.args([
        "run",
        "--offline",
        "--tick-ms",
        "1",
        "--email",
        "viewer@example.com",
        "--video-url",
        "https://youtube.com/watch?v=abc",
        "--full-name",
        "Kim Viewer",
        "--password",
        "correct-horse",
    ]);
    cmd
}

#[test]
fn offline_run_prints_download_links() {
    let dir = TempDir::new().unwrap();

    offline_run(&dir)
        .args(["--code", "123456"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Intake accepted"))
        .stdout(predicate::str::contains("Verification Required"))
        .stdout(predicate::str::contains("Account Verified"))
        .stdout(predicate::str::contains("Processing Complete"))
        .stdout(predicate::str::contains("DOWNLOADS"))
        .stdout(predicate::str::contains("demo-project-"));
}

#[test]
fn verification_code_can_come_from_stdin() {
    let dir = TempDir::new().unwrap();

    offline_run(&dir)
        .write_stdin("abc\n654321\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Invalid verification code"))
        .stdout(predicate::str::contains("Processing Complete"));
}

#[test]
fn bad_intake_exits_with_field_error() {
    let dir = TempDir::new().unwrap();

    subdub_in(&dir)
        .args([
            "run",
            "--offline",
            "--email",
            "not-an-email",
            "--video-url",
            "https://youtube.com/watch?v=abc",
            "--full-name",
            "Kim Viewer",
            "--password",
            "correct-horse",
        ])
        .assert()
        .failure()
        .stdout(predicate::str::contains("email:"));
}

#[test]
fn short_password_is_rejected_before_signup() {
    let dir = TempDir::new().unwrap();

    subdub_in(&dir)
        .args([
            "run",
            "--offline",
            "--email",
            "viewer@example.com",
            "--video-url",
            "https://youtube.com/watch?v=abc",
            "--full-name",
            "Kim Viewer",
            "--password",
            "short",
            "--code",
            "123456",
        ])
        .assert()
        .failure()
        .stdout(predicate::str::contains("password:"));
}

#[test]
fn config_save_writes_toml() {
    let dir = TempDir::new().unwrap();
    let target = dir.path().join("saved.toml");

    subdub_in(&dir)
        .args(["config", "--save"])
        .arg(&target)
        .assert()
        .success();

    let saved = std::fs::read_to_string(&target).unwrap();
    assert!(saved.contains("[tracker]"));
    assert!(saved.contains("tick_interval_ms = 1000"));
}
