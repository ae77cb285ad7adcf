//! Host-owned local content: pulling it out of a marker and putting it back, either
//! under a bare container (storage format) or into the container of a guest's
//! rendering (display and authoring formats).

use kuchiki::NodeRef;

use crate::error::{Result, ShardError};
use crate::markup::{self, Fragment};
use crate::vocabulary::{LOCAL_CONTENT_CLASS, TYPE_ATTRIBUTE};

/// The local-content container belonging to `marker` itself, skipping containers
/// inside markers nested in it.
pub fn find_local_content_container(marker: &NodeRef) -> Option<NodeRef> {
    marker.descendants().find(|node| {
        markup::has_class(node, LOCAL_CONTENT_CLASS)
            && node
                .ancestors()
                .find(|a| markup::has_attribute(a, TYPE_ATTRIBUTE))
                .is_some_and(|owner| owner == *marker)
    })
}

/// Markup of the marker's local content, trimmed. Empty when there is none.
pub fn extract_local_content(marker: &NodeRef) -> String {
    find_local_content_container(marker)
        .map(|container| markup::inner_html(&container).trim().to_string())
        .unwrap_or_default()
}

/// Append `<div class="local-content">` holding `local_content` to `marker`.
/// Nothing is added for empty content.
pub fn insert_local_content(marker: &NodeRef, local_content: &str) -> Result<()> {
    if local_content.trim().is_empty() {
        return Ok(());
    }
    let wrapped = format!("<div class=\"{LOCAL_CONTENT_CLASS}\">{local_content}</div>");
    let parsed = Fragment::parse_fresh(&wrapped)?;
    markup::move_children_into(parsed.root(), marker);
    Ok(())
}

/// Parse a guest's rendering and place `local_content` in its local-content container.
///
/// The container is emptied first, so merging the same content twice does not
/// duplicate it.
pub fn merge_into_rendered(rendered: &str, local_content: &str) -> Result<Fragment> {
    let merged = Fragment::parse_fresh(rendered)?;
    if local_content.trim().is_empty() {
        return Ok(merged);
    }

    let container = markup::find_first_with_class(merged.root(), LOCAL_CONTENT_CLASS)
        .ok_or_else(|| {
            ShardError::missing(format!(
                "rendered guest has no '{LOCAL_CONTENT_CLASS}' container for local content"
            ))
        })?;
    let local = Fragment::parse_fresh(local_content)?;
    markup::replace_children(&container, local.root());
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker_in(html: &str) -> (Fragment, NodeRef) {
        let frag = Fragment::parse_fresh(html).unwrap();
        let marker = frag
            .root()
            .descendants()
            .find(|n| markup::has_attribute(n, TYPE_ATTRIBUTE))
            .unwrap();
        (frag, marker)
    }

    #[test]
    fn extracts_own_container_only() {
        let (_frag, marker) = marker_in(
            "<div data-shard-type='note'><article><div data-shard-type='note'>\
             <div class='local-content'>inner</div></div>\
             <div class='local-content'> <p>outer</p> </div></article></div>",
        );
        assert_eq!(extract_local_content(&marker), "<p>outer</p>");
    }

    #[test]
    fn missing_container_means_no_local_content() {
        let (_frag, marker) = marker_in("<div data-shard-type='note'><p>guest</p></div>");
        assert_eq!(extract_local_content(&marker), "");
    }

    #[test]
    fn insert_builds_container() {
        let (frag, marker) = marker_in("<div data-shard-type='note'></div>");
        insert_local_content(&marker, "<p>mine</p>").unwrap();
        assert_eq!(
            frag.serialize(),
            "<div data-shard-type=\"note\"><div class=\"local-content\"><p>mine</p></div></div>"
        );
    }

    #[test]
    fn insert_skips_blank_content() {
        let (frag, marker) = marker_in("<div data-shard-type='note'></div>");
        insert_local_content(&marker, "  \n").unwrap();
        assert_eq!(frag.serialize(), "<div data-shard-type=\"note\"></div>");
    }

    #[test]
    fn merge_fills_container_once() {
        let rendered = "<article><h2>Guest</h2><div class=\"local-content\"><p>stale</p></div></article>";
        let merged = merge_into_rendered(rendered, "<p>mine</p>").unwrap();
        let html = merged.serialize();
        assert_eq!(
            html,
            "<article><h2>Guest</h2><div class=\"local-content\"><p>mine</p></div></article>"
        );

        let again = merge_into_rendered(&html, "<p>mine</p>").unwrap();
        assert_eq!(again.serialize(), html);
    }

    #[test]
    fn merge_without_container_fails_only_with_content() {
        let rendered = "<article><h2>Guest</h2></article>";
        assert!(matches!(
            merge_into_rendered(rendered, "<p>mine</p>"),
            Err(ShardError::MissingData(_))
        ));
        assert_eq!(
            merge_into_rendered(rendered, "").unwrap().serialize(),
            rendered
        );
    }
}
