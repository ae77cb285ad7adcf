//! Site file fixtures shared by the subcommand tests.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Value, json};

pub const GUEST_RENDER: &str =
    "<article class=\"note\"><h2>Guest</h2><div class=\"local-content\"></div></article>";

/// A site with host article 7, guest note 42 and one stored record (id 1) embedding 42
/// in article 7's body.
pub fn write_site(dir: &Path) -> PathBuf {
    let site = json!({
        "entities": {
            "7": { "id": 7, "bundle": "article", "fields": { "body": ["<p>host</p>"] } },
            "42": { "id": 42, "bundle": "note" }
        },
        "records": {
            "1": {
                "host_id": "7",
                "guest_id": "42",
                "host_field": "body",
                "field_value_index": "0",
                "view_mode": "teaser",
                "location": "1",
                "local_content": "<p>mine</p>"
            }
        },
        "renders": {
            "42": { "teaser": GUEST_RENDER, "full": "<article><p>full guest</p></article>" }
        },
        "fields": {
            "article": { "body": "text_long" }
        }
    });
    let path = dir.join("site.json");
    fs::write(&path, serde_json::to_string_pretty(&site).unwrap()).unwrap();
    path
}

pub fn read_site(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}
