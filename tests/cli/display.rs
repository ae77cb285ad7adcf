//! Display and edit subcommand tests

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

use crate::site::write_site;

const STORED: &str = "<p>intro</p><div data-shard-id=\"1\" data-shard-type=\"shard\"></div>";

#[test]
fn test_display_renders_guest_with_local_content() {
    let temp_dir = TempDir::new().unwrap();
    let site = write_site(temp_dir.path());

    cargo_bin_cmd!("shard")
        .args(["display", "--site", site.to_str().unwrap()])
        .write_stdin(STORED)
        .assert()
        .success()
        .stdout(predicate::str::contains("<p>intro</p>"))
        .stdout(predicate::str::contains(
            "<h2>Guest</h2><div class=\"local-content\"><p>mine</p></div>",
        ))
        .stdout(predicate::str::contains("data-shard-processed").not());
}

#[test]
fn test_display_unknown_record_fails() {
    let temp_dir = TempDir::new().unwrap();
    let site = write_site(temp_dir.path());

    cargo_bin_cmd!("shard")
        .args(["display", "--site", site.to_str().unwrap()])
        .write_stdin("<div data-shard-id=\"404\" data-shard-type=\"shard\"></div>")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("no embed record with id 404"));
}

#[test]
fn test_display_reports_unknown_types() {
    let temp_dir = TempDir::new().unwrap();
    let site = write_site(temp_dir.path());

    cargo_bin_cmd!("shard")
        .args(["display", "--site", site.to_str().unwrap()])
        .write_stdin("<div data-shard-type=\"unknown-xyz\"><p>keep</p></div>")
        .assert()
        .success()
        .stdout(predicate::str::contains("<p>keep</p>"))
        .stderr(predicate::str::contains("unknown-xyz"));
}

#[test]
fn test_edit_restores_authoring_attributes() {
    let temp_dir = TempDir::new().unwrap();
    let site = write_site(temp_dir.path());

    cargo_bin_cmd!("shard")
        .args(["edit", "--site", site.to_str().unwrap()])
        .write_stdin(STORED)
        .assert()
        .success()
        .stdout(predicate::str::contains("data-guest-id=\"42\""))
        .stdout(predicate::str::contains("data-view-mode=\"teaser\""))
        .stdout(predicate::str::contains("class=\"shard-shard\""))
        .stdout(predicate::str::contains("data-shard-id").not());
}
