//! Finding embed markers.
//!
//! A marker is an element whose `data-shard-type` names a recognised embed type. The
//! converters drive a find, convert, mark loop over [`PendingMarkers`]: after each
//! conversion the tree is scanned again, so markers that only became reachable through
//! that conversion (for instance inside local content) are picked up next, and the
//! processed sentinel guarantees each marker is converted at most once.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::LazyLock;

use kuchiki::NodeRef;
use regex::Regex;

use crate::collaborators::{DiagnosticsSink, EmbedContext, Metadata};
use crate::diagnostics::LogSink;
use crate::error::{Result, ShardError};
use crate::markup::{self, Fragment};
use crate::vocabulary::{
    GUEST_ID_ATTRIBUTE, PROCESSED_ATTRIBUTE, PROCESSED_VALUE, RECORD_ID_ATTRIBUTE,
    TYPE_ATTRIBUTE, VIEW_MODE_ATTRIBUTE,
};

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->|<[A-Za-z][^>]*>").unwrap());

static TYPE_ATTRIBUTE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)[\s"'/]data-shard-type(?:[\s=/>]|$)"#).unwrap());

/// True when the element carries the embed type attribute, known type or not.
pub fn is_typed(node: &NodeRef) -> bool {
    markup::has_attribute(node, TYPE_ATTRIBUTE)
}

/// Whether a marker already carries the processed sentinel.
pub fn is_processed(node: &NodeRef) -> bool {
    markup::attribute(node, PROCESSED_ATTRIBUTE).as_deref() == Some(PROCESSED_VALUE)
}

pub fn mark_processed(node: &NodeRef) -> Result<()> {
    if !is_typed(node) {
        return Err(ShardError::unexpected(
            "Passed an element without an embed type to mark_processed",
        ));
    }
    markup::set_attribute(node, PROCESSED_ATTRIBUTE, PROCESSED_VALUE);
    Ok(())
}

/// Remove every processed sentinel below `root`.
pub fn strip_processed_markers(root: &NodeRef) {
    for node in root.descendants() {
        markup::remove_attribute(&node, PROCESSED_ATTRIBUTE);
    }
}

pub struct TagScanner<'a> {
    known_types: Vec<String>,
    diagnostics: &'a dyn DiagnosticsSink,
    // Unknown-type elements already reported during this call.
    reported: RefCell<Vec<NodeRef>>,
}

impl<'a> TagScanner<'a> {
    pub fn new<I, S>(known_types: I, diagnostics: &'a dyn DiagnosticsSink) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            known_types: known_types
                .into_iter()
                .map(|t| t.as_ref().to_lowercase())
                .collect(),
            diagnostics,
            reported: RefCell::new(Vec::new()),
        }
    }

    pub fn from_context(ctx: &EmbedContext<'a>) -> Self {
        Self::new(ctx.metadata.embed_type_names(), ctx.diagnostics)
    }

    pub fn is_known_type(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.known_types.iter().any(|t| *t == name)
    }

    pub fn is_marker(&self, node: &NodeRef) -> bool {
        markup::attribute(node, TYPE_ATTRIBUTE).is_some_and(|t| self.is_known_type(&t))
    }

    /// First unprocessed marker below `root`, pre-order: a parent comes before the
    /// markers nested in it.
    pub fn find_first_unprocessed(&self, root: &NodeRef) -> Option<NodeRef> {
        self.scan(root, true).pop_front()
    }

    /// All unprocessed markers below `root`, in document order.
    pub fn unprocessed_markers(&self, root: &NodeRef) -> VecDeque<NodeRef> {
        self.scan(root, false)
    }

    fn scan(&self, root: &NodeRef, first_only: bool) -> VecDeque<NodeRef> {
        let mut found = VecDeque::new();
        for node in root.descendants() {
            let Some(type_name) = markup::attribute(&node, TYPE_ATTRIBUTE) else {
                continue;
            };
            if !self.is_known_type(&type_name) {
                self.report_unknown(&node, &type_name);
                continue;
            }
            if !is_processed(&node) {
                found.push_back(node);
                if first_only {
                    break;
                }
            }
        }
        found
    }

    fn report_unknown(&self, node: &NodeRef, type_name: &str) {
        let mut reported = self.reported.borrow_mut();
        if reported.contains(node) {
            return;
        }
        reported.push(node.clone());
        self.diagnostics.report_unknown_type(type_name);
    }
}

/// Work list of markers waiting for conversion under one root.
///
/// The list is refilled by rescanning after every completed conversion, because a
/// conversion rewrites the marker's subtree.
pub struct PendingMarkers<'s, 'a> {
    scanner: &'s TagScanner<'a>,
    root: NodeRef,
    queue: VecDeque<NodeRef>,
    stale: bool,
    completed: usize,
    limit: usize,
}

impl<'s, 'a> PendingMarkers<'s, 'a> {
    pub fn new(scanner: &'s TagScanner<'a>, root: &NodeRef, limit: usize) -> Self {
        Self {
            scanner,
            root: root.clone(),
            queue: VecDeque::new(),
            stale: true,
            completed: 0,
            limit,
        }
    }

    /// The next marker to convert, or `None` once no unprocessed marker remains.
    pub fn next_marker(&mut self) -> Result<Option<NodeRef>> {
        if self.stale {
            self.queue = self.scanner.unprocessed_markers(&self.root);
            self.stale = false;
        }
        match self.queue.front() {
            Some(_) if self.completed >= self.limit => Err(ShardError::unexpected(format!(
                "More than {} embed markers in one field value; does a guest embed itself?",
                self.limit
            ))),
            front => Ok(front.cloned()),
        }
    }

    /// Mark `marker` as converted.
    pub fn complete(&mut self, marker: &NodeRef) -> Result<()> {
        mark_processed(marker)?;
        self.completed += 1;
        self.stale = true;
        Ok(())
    }

    /// Markers known to be waiting, as of the last scan.
    pub fn pending(&self) -> impl Iterator<Item = &NodeRef> {
        self.queue.iter()
    }

    pub fn completed(&self) -> usize {
        self.completed
    }
}

/// Maps typed elements back to the line of the source they were parsed from.
///
/// The n-th typed element in document order is matched with the n-th start tag in the
/// source that carries `data-shard-type`, with or without a value. Text and comments are
/// skipped. The result is approximate once the tree has been rewritten.
pub struct SourceLocator {
    lines: Vec<usize>,
}

impl SourceLocator {
    pub fn new(source: &str) -> Self {
        let line_starts: Vec<usize> = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        let lines = TAG_RE
            .find_iter(source)
            .filter(|tag| !tag.as_str().starts_with("<!--"))
            .filter(|tag| TYPE_ATTRIBUTE_RE.is_match(tag.as_str()))
            .map(|tag| line_starts.partition_point(|&start| start <= tag.start()))
            .collect();
        Self { lines }
    }

    /// 1-based line of `marker`, or 0 when it cannot be matched.
    pub fn line_of(&self, root: &NodeRef, marker: &NodeRef) -> usize {
        root.descendants()
            .filter(is_typed)
            .position(|node| node == *marker)
            .and_then(|ordinal| self.lines.get(ordinal).copied())
            .unwrap_or(0)
    }
}

/// One typed element, as reported by [`scan_markers`].
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct MarkerInfo {
    pub embed_type: String,
    pub known: bool,
    pub processed: bool,
    pub guest_id: Option<String>,
    pub record_id: Option<String>,
    pub view_mode: Option<String>,
    pub line: usize,
}

/// Describe every element carrying an embed type in `html`, known or not.
pub fn scan_markers(html: &str, metadata: &dyn Metadata) -> Result<Vec<MarkerInfo>> {
    let fragment = Fragment::parse_fresh(html)?;
    let scanner = TagScanner::new(metadata.embed_type_names(), &LogSink);
    let locator = SourceLocator::new(html);
    let root = fragment.root();

    let markers = root
        .descendants()
        .filter(is_typed)
        .map(|node| {
            let embed_type = markup::attribute(&node, TYPE_ATTRIBUTE).unwrap_or_default();
            MarkerInfo {
                known: scanner.is_known_type(&embed_type),
                processed: is_processed(&node),
                guest_id: markup::attribute(&node, GUEST_ID_ATTRIBUTE),
                record_id: markup::attribute(&node, RECORD_ID_ATTRIBUTE),
                view_mode: markup::attribute(&node, VIEW_MODE_ATTRIBUTE),
                line: locator.line_of(root, &node),
                embed_type,
            }
        })
        .collect();
    Ok(markers)
}
