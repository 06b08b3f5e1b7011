// Default behavior and help output of the subdub binary

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn test_no_subcommand_shows_getting_started() {
    let mut cmd = Command::cargo_bin("subdub").unwrap();

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Subdub - subtitles and dubbing"))
        .stdout(predicate::str::contains("subdub run --email"))
        .stdout(predicate::str::contains("--offline"));
}

#[test]
fn test_run_help_lists_required_flags() {
    let mut cmd = Command::cargo_bin("subdub").unwrap();

    cmd.args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--video-url"))
        .stdout(predicate::str::contains("--full-name"))
        .stdout(predicate::str::contains("--tick-ms"));
}

#[test]
fn test_languages_lists_supported_codes() {
    let mut cmd = Command::cargo_bin("subdub").unwrap();

    cmd.arg("languages")
        .assert()
        .success()
        .stdout(predicate::str::contains("SUPPORTED LANGUAGES"))
        .stdout(predicate::str::contains("Japanese"))
        .stdout(predicate::str::contains("English (default subtitles)"));
}

#[test]
fn test_run_without_required_flags_fails() {
    let mut cmd = Command::cargo_bin("subdub").unwrap();

    cmd.args(["run", "--email", "a@b.co"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--video-url"));
}
