//! Cross-cutting CLI tests (help, version, error handling)

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

#[test]
fn test_help() {
    cargo_bin_cmd!("shard")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Shard embeds one content item"));
}

#[test]
fn test_version() {
    cargo_bin_cmd!("shard")
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_no_subcommand() {
    cargo_bin_cmd!("shard")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn test_invalid_subcommand() {
    cargo_bin_cmd!("shard")
        .arg("invalid")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

#[test]
fn test_store_help() {
    cargo_bin_cmd!("shard")
        .args(["store", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("authoring format to storage"));
}

#[test]
fn test_display_help() {
    cargo_bin_cmd!("shard")
        .args(["display", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Render stored markup"));
}

#[test]
fn test_store_requires_host_and_field() {
    cargo_bin_cmd!("shard")
        .arg("store")
        .write_stdin("<p>x</p>")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--host"));
}

#[test]
fn test_missing_site_file() {
    cargo_bin_cmd!("shard")
        .args(["display", "--site", "/nonexistent/site.json"])
        .write_stdin("<p>x</p>")
        .assert()
        .failure();
}
