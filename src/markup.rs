//! Mutable markup trees.
//!
//! A field value is a fragment, not a document, so it is parsed inside a synthetic `div`
//! carrying a freshly generated id. Conversions work on that container and
//! [`Fragment::serialize`] strips it off again by matching the generated id literally.
//! Parsing never fails: parser complaints are collected, logged and kept on the fragment.

use std::borrow::Cow;
use std::cell::RefCell;
use std::rc::Rc;

use kuchiki::traits::TendrilSink;
use kuchiki::{NodeData, NodeRef, ParseOpts};

use crate::error::{Result, ShardError};
use crate::vocabulary::{CLASS_ATTRIBUTE, ID_ATTRIBUTE};

/// How [`find_elements_by_attribute`] matches an attribute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrValue<'a> {
    /// The attribute only has to be present.
    Any,
    Exactly(&'a str),
}

impl AttrValue<'_> {
    fn matches(&self, value: &str) -> bool {
        match self {
            AttrValue::Any => true,
            AttrValue::Exactly(expected) => *expected == value,
        }
    }
}

/// A parsed fragment and the synthetic container holding it.
pub struct Fragment {
    // Keeps the tree alive; nodes only hold weak references to their parents.
    _document: NodeRef,
    container: NodeRef,
    wrapper_id: String,
    parse_errors: Vec<String>,
}

impl Fragment {
    /// Parse `fragment` inside a container identified by `wrapper_id`.
    pub fn parse(fragment: &str, wrapper_id: &str) -> Result<Self> {
        let wrapped = format!("<!DOCTYPE html><div id=\"{wrapper_id}\">{fragment}</div>");
        let (document, parse_errors) = parse_document(&wrapped);

        let container = document
            .descendants()
            .find(|node| attribute(node, ID_ATTRIBUTE).as_deref() == Some(wrapper_id))
            .ok_or_else(|| {
                ShardError::missing(format!("synthetic wrapper {wrapper_id} lost while parsing"))
            })?;

        // A stray closing tag in the fragment ends the wrapper early; pull whatever the
        // parser placed after it back inside.
        let strays: Vec<NodeRef> = container.following_siblings().collect();
        for stray in strays {
            container.append(stray);
        }

        Ok(Self {
            _document: document,
            container,
            wrapper_id: wrapper_id.to_string(),
            parse_errors,
        })
    }

    /// Parse `fragment` inside a container with a freshly generated id.
    pub fn parse_fresh(fragment: &str) -> Result<Self> {
        Self::parse(fragment, &uuid::Uuid::new_v4().to_string())
    }

    /// The synthetic container. Its children are the fragment.
    pub fn root(&self) -> &NodeRef {
        &self.container
    }

    pub fn parse_errors(&self) -> &[String] {
        &self.parse_errors
    }

    /// Serialize the fragment without the synthetic container.
    pub fn serialize(&self) -> String {
        let html = outer_html(&self.container);
        let open = format!("<div {ID_ATTRIBUTE}=\"{}\">", self.wrapper_id);
        match html
            .strip_prefix(open.as_str())
            .and_then(|rest| rest.strip_suffix("</div>"))
        {
            Some(inner) => inner.to_string(),
            None => {
                log::debug!("Wrapper {} not found verbatim, serializing children", self.wrapper_id);
                inner_html(&self.container)
            }
        }
    }
}

/// Parse a complete document, collecting parser diagnostics instead of failing.
pub fn parse_document(html: &str) -> (NodeRef, Vec<String>) {
    let errors = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&errors);
    let opts = ParseOpts {
        on_parse_error: Some(Box::new(move |message: Cow<'static, str>| {
            sink.borrow_mut().push(message.into_owned());
        })),
        ..ParseOpts::default()
    };
    let document = kuchiki::parse_html_with_options(opts).one(html);

    let errors = errors.take();
    if !errors.is_empty() {
        log::warn!(
            "Errors parsing markup ({}): {}",
            errors.len(),
            errors.join("; ")
        );
    }
    (document, errors)
}

fn serialize_node(node: &NodeRef) -> String {
    let mut out = Vec::new();
    if let Err(e) = node.serialize(&mut out) {
        log::error!("Failed to serialize markup: {e}");
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Markup of `node` itself and everything under it.
pub fn outer_html(node: &NodeRef) -> String {
    serialize_node(node)
}

/// Markup of the children of `node`.
pub fn inner_html(node: &NodeRef) -> String {
    node.children().map(|child| serialize_node(&child)).collect()
}

pub fn attribute(node: &NodeRef, name: &str) -> Option<String> {
    node.as_element()
        .and_then(|el| el.attributes.borrow().get(name).map(str::to_string))
}

pub fn has_attribute(node: &NodeRef, name: &str) -> bool {
    node.as_element()
        .is_some_and(|el| el.attributes.borrow().contains(name))
}

pub fn set_attribute(node: &NodeRef, name: &str, value: impl Into<String>) {
    if let Some(el) = node.as_element() {
        el.attributes.borrow_mut().insert(name, value.into());
    }
}

pub fn remove_attribute(node: &NodeRef, name: &str) {
    if let Some(el) = node.as_element() {
        el.attributes.borrow_mut().remove(name);
    }
}

/// Remove every attribute of an element.
pub fn strip_attributes(node: &NodeRef) {
    if let Some(el) = node.as_element() {
        el.attributes.borrow_mut().map.clear();
    }
}

/// True when the element's class list contains `class`.
pub fn has_class(node: &NodeRef, class: &str) -> bool {
    attribute(node, CLASS_ATTRIBUTE)
        .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
}

/// Elements below `root` carrying `name`, depth-first in document order.
pub fn find_elements_by_attribute(root: &NodeRef, name: &str, value: AttrValue<'_>) -> Vec<NodeRef> {
    root.descendants()
        .filter(|node| attribute(node, name).is_some_and(|v| value.matches(&v)))
        .collect()
}

/// First element below `root` whose class list contains `class`.
pub fn find_first_with_class(root: &NodeRef, class: &str) -> Option<NodeRef> {
    root.descendants().find(|node| has_class(node, class))
}

pub fn remove_children(node: &NodeRef) {
    while let Some(child) = node.first_child() {
        child.detach();
    }
}

/// Append deep copies of the children of `source` to `dest`. `source` is left intact.
pub fn copy_children_into(source: &NodeRef, dest: &NodeRef) {
    for child in source.children() {
        dest.append(deep_clone(&child));
    }
}

/// Move the children of `source` to the end of `dest`.
pub fn move_children_into(source: &NodeRef, dest: &NodeRef) {
    let children: Vec<NodeRef> = source.children().collect();
    for child in children {
        dest.append(child);
    }
}

/// Replace the children of `target` with those of `source`.
pub fn replace_children(target: &NodeRef, source: &NodeRef) {
    remove_children(target);
    move_children_into(source, target);
}

/// Rebuild `element` from `replacement`: drop its children and attributes, then copy the
/// children of `replacement` in.
pub fn replace_contents(element: &NodeRef, replacement: &NodeRef) {
    remove_children(element);
    strip_attributes(element);
    copy_children_into(replacement, element);
}

/// Copy a node and its whole subtree into a new, detached tree.
pub fn deep_clone(node: &NodeRef) -> NodeRef {
    let copy = match node.data() {
        NodeData::Element(el) => NodeRef::new_element(
            el.name.clone(),
            el.attributes
                .borrow()
                .map
                .iter()
                .map(|(name, attr)| (name.clone(), attr.clone())),
        ),
        NodeData::Text(text) => NodeRef::new_text(text.borrow().clone()),
        NodeData::Comment(text) => NodeRef::new_comment(text.borrow().clone()),
        NodeData::ProcessingInstruction(pi) => {
            let pi = pi.borrow();
            NodeRef::new_processing_instruction(pi.0.clone(), pi.1.clone())
        }
        NodeData::Doctype(doctype) => NodeRef::new_doctype(
            doctype.name.clone(),
            doctype.public_id.clone(),
            doctype.system_id.clone(),
        ),
        NodeData::Document(_) => NodeRef::new_document(),
        NodeData::DocumentFragment => NodeRef::new(NodeData::DocumentFragment),
    };

    if let (Some(source), Some(dest)) = (
        node.as_element().and_then(|el| el.template_contents.clone()),
        copy.as_element().and_then(|el| el.template_contents.clone()),
    ) {
        copy_children_into(&source, &dest);
    }
    copy_children_into(node, &copy);
    copy
}
