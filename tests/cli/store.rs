//! Store subcommand tests

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

use crate::site::{read_site, write_site};

const AUTHORING: &str =
    "<p>intro</p><div data-shard-type='shard' data-guest-id='42' data-view-mode='teaser'></div>";

#[test]
fn test_store_existing_host() {
    let temp_dir = TempDir::new().unwrap();
    let site = write_site(temp_dir.path());

    cargo_bin_cmd!("shard")
        .args(["store", "--site", site.to_str().unwrap(), "--host", "7", "--field", "body"])
        .write_stdin(AUTHORING)
        .assert()
        .success()
        .stdout(predicate::str::contains("<p>intro</p>"))
        .stdout(predicate::str::contains("data-shard-id=\"2\""))
        .stdout(predicate::str::contains("data-guest-id").not());

    // Without --write the site file is left alone.
    let records = read_site(&site)["records"].as_object().unwrap().len();
    assert_eq!(records, 1);
}

#[test]
fn test_store_write_saves_records() {
    let temp_dir = TempDir::new().unwrap();
    let site = write_site(temp_dir.path());
    let input = temp_dir.path().join("body.html");
    fs::write(&input, AUTHORING).unwrap();

    cargo_bin_cmd!("shard")
        .args(["store", "--site", site.to_str().unwrap()])
        .args(["--host", "7", "--field", "body", "--index", "0", "--write"])
        .arg(input.to_str().unwrap())
        .assert()
        .success();

    let site = read_site(&site);
    let record = &site["records"]["2"];
    assert_eq!(record["guest_id"], "42");
    assert_eq!(record["host_id"], "7");
    assert_eq!(record["view_mode"], "teaser");
}

#[test]
fn test_store_new_host_prints_pending_records() {
    let temp_dir = TempDir::new().unwrap();
    let site = write_site(temp_dir.path());

    cargo_bin_cmd!("shard")
        .args(["store", "--site", site.to_str().unwrap(), "--host", "new", "--field", "body"])
        .write_stdin(AUTHORING)
        .assert()
        .success()
        .stdout(predicate::str::is_match(r#"data-shard-id="[0-9a-f]{8}-[0-9a-f]{4}-"#).unwrap())
        .stderr(predicate::str::contains("marker_placeholder"));
}

#[test]
fn test_store_missing_guest_fails() {
    let temp_dir = TempDir::new().unwrap();
    let site = write_site(temp_dir.path());

    cargo_bin_cmd!("shard")
        .args(["store", "--site", site.to_str().unwrap(), "--host", "7", "--field", "body"])
        .write_stdin("<div data-shard-type='shard' data-view-mode='teaser'></div>")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("data-guest-id"));
}

#[test]
fn test_store_ineligible_field_fails() {
    let temp_dir = TempDir::new().unwrap();
    let site = write_site(temp_dir.path());

    cargo_bin_cmd!("shard")
        .args(["store", "--site", site.to_str().unwrap(), "--host", "7", "--field", "sidebar"])
        .write_stdin(AUTHORING)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not eligible"));
}

#[test]
fn test_store_rejects_bad_host() {
    cargo_bin_cmd!("shard")
        .args(["store", "--host", "seven", "--field", "body"])
        .write_stdin(AUTHORING)
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a host id"));
}

#[test]
fn test_store_write_without_site() {
    let temp_dir = TempDir::new().unwrap();

    cargo_bin_cmd!("shard")
        .current_dir(temp_dir.path())
        .args(["store", "--host", "new", "--field", "body", "--write"])
        .write_stdin("<p>no markers</p>")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("--write needs a site file"));
}

#[test]
fn test_store_with_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let site = write_site(temp_dir.path());
    fs::write(
        temp_dir.path().join("shard.toml"),
        "embed_types = [\"note\"]\nsite = \"site.json\"\n",
    )
    .unwrap();
    let input = temp_dir.path().join("body.html");
    fs::write(
        &input,
        "<div data-shard-type='note' data-guest-id='42' data-view-mode='full'></div>",
    )
    .unwrap();

    cargo_bin_cmd!("shard")
        .args(["store", "--host", "7", "--field", "body", "--write"])
        .arg(input.to_str().unwrap())
        .assert()
        .success()
        .stdout(predicate::str::contains("data-shard-type=\"note\""));

    assert_eq!(read_site(&site)["records"]["2"]["view_mode"], "full");
}
