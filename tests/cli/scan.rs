//! Scan subcommand tests

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_scan_lists_markers() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("body.html");
    fs::write(
        &input,
        "<p>intro</p>\n<div data-shard-type='shard' data-guest-id='42' data-view-mode='full'></div>\n\
         <div data-shard-type='unknown-xyz'></div>\n",
    )
    .unwrap();

    cargo_bin_cmd!("shard")
        .args(["scan", input.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains(":2: shard guest=42 view-mode=full"))
        .stdout(predicate::str::contains(":3: unknown-xyz (unknown type)"))
        .stdout(predicate::str::contains("Found 2 marker(s)"));
}

#[test]
fn test_scan_stdin_without_markers() {
    cargo_bin_cmd!("shard")
        .arg("scan")
        .write_stdin("<p>plain</p>")
        .assert()
        .success()
        .stdout(predicate::str::contains("No embed markers found"));
}
