//! Attribute and class names that make up the embed marker wire format.
//!
//! These values are shared with markup already persisted by hosts, so they must not change.

/// Embed type name. Present on a marker in every format.
pub const TYPE_ATTRIBUTE: &str = "data-shard-type";

/// Storage-format record identity (numeric, or a placeholder UUID before resolution).
pub const RECORD_ID_ATTRIBUTE: &str = "data-shard-id";

/// Authoring-format guest identity.
pub const GUEST_ID_ATTRIBUTE: &str = "data-guest-id";

/// Authoring-format view mode name.
pub const VIEW_MODE_ATTRIBUTE: &str = "data-view-mode";

/// Scan sentinel. Never survives into the output of a conversion.
pub const PROCESSED_ATTRIBUTE: &str = "data-shard-processed";
pub const PROCESSED_VALUE: &str = "processed";

/// Class of the container that receives host-owned local content.
pub const LOCAL_CONTENT_CLASS: &str = "local-content";

pub const CLASS_ATTRIBUTE: &str = "class";
pub const ID_ATTRIBUTE: &str = "id";

/// Class the rich-text editor uses to recognise an embed widget of `embed_type`.
pub fn widget_class(embed_type: &str) -> String {
    format!("{embed_type}-shard")
}
