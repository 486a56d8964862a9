#![forbid(unsafe_code)]

//! In-memory [`Document`] for tests and headless hosts.
//!
//! Layout is whatever the caller assigns with [`MemoryDocument::set_layout`];
//! nothing is computed. Boxes are stored in document coordinates and shifted
//! by the scroll offset when read back through
//! [`Document::bounding_rect`].

use core::fmt;
use std::collections::BTreeMap;

use folio_core::geometry::{Rect, Viewport};
use scraper::selector::{CssLocalName, NonTSPseudoClass, PseudoElement, Simple};
use selectors::OpaqueElement;
use selectors::attr::{AttrSelectorOperation, CaseSensitivity, NamespaceConstraint};
use selectors::matching::{ElementSelectorFlags, MatchingContext};
use selectors::parser::SelectorImpl;

use crate::dom::{Document, HostCapabilities, NodeId};
use crate::selector::Selector;
use crate::utils::{ClipboardError, ClipboardWriter};

const BODY: NodeId = NodeId(0);

#[derive(Debug, Clone, Default)]
struct Node {
    tag: String,
    /// Includes `class`, kept as the space-separated attribute string.
    attrs: BTreeMap<String, String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    text: String,
    value: String,
    layout: Rect,
    styles: BTreeMap<String, String>,
}

/// A `scroll_to` call as observed by the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollRequest {
    pub top: f64,
    pub smooth: bool,
}

/// Arena-backed document tree.
#[derive(Debug, Clone)]
pub struct MemoryDocument {
    nodes: Vec<Node>,
    viewport: Viewport,
    capabilities: HostCapabilities,
    focused: Option<NodeId>,
    scroll_requests: Vec<ScrollRequest>,
    clipboard: Option<String>,
    copy_succeeds: bool,
}

impl MemoryDocument {
    /// A document holding only `<body>`, sized to the viewport.
    #[must_use]
    pub fn new(viewport: Viewport) -> Self {
        let body = Node {
            tag: "body".to_owned(),
            layout: Rect::from_size(viewport.width, viewport.height),
            ..Node::default()
        };
        Self {
            nodes: vec![body],
            viewport,
            capabilities: HostCapabilities::default(),
            focused: None,
            scroll_requests: Vec::new(),
            clipboard: None,
            copy_succeeds: true,
        }
    }

    #[must_use]
    pub fn with_capabilities(mut self, capabilities: HostCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn set_capabilities(&mut self, capabilities: HostCapabilities) {
        self.capabilities = capabilities;
    }

    /// Create an element and append it to `parent`.
    pub fn insert(&mut self, parent: NodeId, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        let id = self.push_node(tag);
        for (name, value) in attrs {
            self.set_attribute(id, name, value);
        }
        self.append_child(parent, id);
        id
    }

    /// Assign a box in document coordinates.
    pub fn set_layout(&mut self, node: NodeId, layout: Rect) {
        if let Some(n) = self.node_mut(node) {
            n.layout = layout;
        }
    }

    /// Move the viewport without recording a scroll request, like a user
    /// scrolling.
    pub fn set_scroll_y(&mut self, scroll_y: f64) {
        self.viewport.scroll_y = scroll_y.clamp(0.0, self.max_scroll());
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.viewport.width = width;
        self.viewport.height = height;
        self.viewport.scroll_y = self.viewport.scroll_y.clamp(0.0, self.max_scroll());
    }

    /// Make the legacy copy command fail (or succeed again).
    pub fn set_copy_succeeds(&mut self, succeeds: bool) {
        self.copy_succeeds = succeeds;
    }

    #[must_use]
    pub fn tag(&self, node: NodeId) -> Option<&str> {
        self.node(node).map(|n| n.tag.as_str())
    }

    #[must_use]
    pub fn text(&self, node: NodeId) -> &str {
        self.node(node).map_or("", |n| n.text.as_str())
    }

    #[must_use]
    pub fn value(&self, node: NodeId) -> &str {
        self.node(node).map_or("", |n| n.value.as_str())
    }

    #[must_use]
    pub fn style(&self, node: NodeId, property: &str) -> Option<&str> {
        self.node(node)?.styles.get(property).map(String::as_str)
    }

    #[must_use]
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node)?.parent
    }

    #[must_use]
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.node(node).map_or(&[], |n| n.children.as_slice())
    }

    /// Whether `node` is reachable from `<body>`.
    #[must_use]
    pub fn is_attached(&self, node: NodeId) -> bool {
        self.is_inclusive_ancestor(BODY, node)
    }

    /// `node` as a [`selectors::Element`], for matching with
    /// [`Selector::matches`].
    #[must_use]
    pub fn element(&self, node: NodeId) -> Option<MemoryElement<'_>> {
        self.node(node).map(|_| MemoryElement { doc: self, id: node })
    }

    #[must_use]
    pub fn focused(&self) -> Option<NodeId> {
        self.focused
    }

    #[must_use]
    pub fn scroll_requests(&self) -> &[ScrollRequest] {
        &self.scroll_requests
    }

    /// Text written by the last successful legacy copy.
    #[must_use]
    pub fn clipboard(&self) -> Option<&str> {
        self.clipboard.as_deref()
    }

    /// Bottom edge of the lowest attached box.
    #[must_use]
    pub fn scroll_height(&self) -> f64 {
        self.subtree(BODY)
            .into_iter()
            .map(|id| self.nodes[id.0 as usize].layout.bottom())
            .fold(0.0, f64::max)
    }

    fn max_scroll(&self) -> f64 {
        (self.scroll_height() - self.viewport.height).max(0.0)
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0 as usize)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0 as usize)
    }

    fn push_node(&mut self, tag: &str) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            tag: tag.to_ascii_lowercase(),
            ..Node::default()
        });
        id
    }

    fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    fn matches(&self, selector: &Selector, node: NodeId) -> bool {
        self.element(node).is_some_and(|e| selector.matches(&e))
    }

    fn attribute_value(&self, node: NodeId, name: &str) -> Option<&str> {
        self.node(node)?.attrs.get(name).map(String::as_str)
    }

    fn detach(&mut self, node: NodeId) {
        let Some(parent) = self.node_mut(node).and_then(|n| n.parent.take()) else {
            return;
        };
        if let Some(p) = self.node_mut(parent) {
            p.children.retain(|&c| c != node);
        }
    }

    /// `root` followed by its descendants in document order.
    fn subtree(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(node) = self.node(id) else { continue };
            out.push(id);
            stack.extend(node.children.iter().rev());
        }
        out
    }

    fn parse(selector: &str) -> Option<Selector> {
        match Selector::parse(selector) {
            Ok(sel) => Some(sel),
            Err(err) => {
                tracing::warn!(selector, %err, "invalid selector");
                None
            }
        }
    }
}

impl Document for MemoryDocument {
    fn body(&self) -> NodeId {
        BODY
    }

    fn query_selector_all(&self, selector: &str) -> Vec<NodeId> {
        let Some(sel) = Self::parse(selector) else {
            return Vec::new();
        };
        self.subtree(BODY)
            .into_iter()
            .filter(|&id| self.matches(&sel, id))
            .collect()
    }

    fn query_within(&self, root: NodeId, selector: &str) -> Vec<NodeId> {
        let Some(sel) = Self::parse(selector) else {
            return Vec::new();
        };
        self.subtree(root)
            .into_iter()
            .skip(1)
            .filter(|&id| self.matches(&sel, id))
            .collect()
    }

    fn closest(&self, node: NodeId, selector: &str) -> Option<NodeId> {
        let sel = Self::parse(selector)?;
        let mut current = self.node(node).map(|_| node);
        while let Some(id) = current {
            if self.matches(&sel, id) {
                return Some(id);
            }
            current = self.parent(id);
        }
        None
    }

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.attribute_value(node, "class")
            .is_some_and(|list| list.split_ascii_whitespace().any(|c| c == class))
    }

    fn add_class(&mut self, node: NodeId, class: &str) {
        if self.has_class(node, class) {
            return;
        }
        if let Some(n) = self.node_mut(node) {
            let list = n.attrs.entry("class".to_owned()).or_default();
            if !list.is_empty() {
                list.push(' ');
            }
            list.push_str(class);
        }
    }

    fn remove_class(&mut self, node: NodeId, class: &str) {
        if let Some(list) = self.node_mut(node).and_then(|n| n.attrs.get_mut("class")) {
            *list = list
                .split_ascii_whitespace()
                .filter(|c| *c != class)
                .collect::<Vec<_>>()
                .join(" ");
        }
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.attribute_value(node, name).map(str::to_owned)
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        if let Some(n) = self.node_mut(node) {
            n.attrs.insert(name.to_ascii_lowercase(), value.to_owned());
        }
    }

    fn set_text(&mut self, node: NodeId, text: &str) {
        if let Some(n) = self.node_mut(node) {
            text.clone_into(&mut n.text);
        }
    }

    fn set_value(&mut self, node: NodeId, value: &str) {
        if let Some(n) = self.node_mut(node) {
            value.clone_into(&mut n.value);
        }
    }

    fn set_style(&mut self, node: NodeId, property: &str, value: &str) {
        if let Some(n) = self.node_mut(node) {
            if value.is_empty() {
                n.styles.remove(property);
            } else {
                n.styles.insert(property.to_owned(), value.to_owned());
            }
        }
    }

    fn bounding_rect(&self, node: NodeId) -> Rect {
        let layout = self.node(node).map(|n| n.layout).unwrap_or_default();
        Rect::new(
            layout.x,
            layout.y - self.viewport.scroll_y,
            layout.width,
            layout.height,
        )
    }

    fn offset_top(&self, node: NodeId) -> f64 {
        self.node(node).map_or(0.0, |n| n.layout.y)
    }

    fn offset_height(&self, node: NodeId) -> f64 {
        self.node(node).map_or(0.0, |n| n.layout.height)
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn scroll_to(&mut self, top: f64, smooth: bool) {
        self.scroll_requests.push(ScrollRequest { top, smooth });
        self.viewport.scroll_y = top.clamp(0.0, self.max_scroll());
    }

    fn focus(&mut self, node: NodeId) {
        if self.is_attached(node) {
            self.focused = Some(node);
        }
    }

    fn create_element(&mut self, tag: &str, class: &str) -> Option<NodeId> {
        let id = self.push_node(tag);
        if !class.is_empty() {
            self.set_attribute(id, "class", class);
        }
        Some(id)
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if self.node(parent).is_none()
            || self.node(child).is_none()
            || self.is_inclusive_ancestor(child, parent)
        {
            tracing::debug!(parent = parent.0, child = child.0, "append_child ignored");
            return;
        }
        self.detach(child);
        self.nodes[child.0 as usize].parent = Some(parent);
        self.nodes[parent.0 as usize].children.push(child);
    }

    fn remove(&mut self, node: NodeId) {
        if node == BODY {
            return;
        }
        self.detach(node);
        if self.focused.is_some_and(|f| !self.is_attached(f)) {
            self.focused = None;
        }
    }

    fn exec_copy(&mut self, node: NodeId) -> bool {
        if !self.copy_succeeds || !self.is_attached(node) {
            return false;
        }
        self.clipboard = Some(self.value(node).to_owned());
        true
    }

    fn capabilities(&self) -> HostCapabilities {
        self.capabilities
    }
}

/// A node of a [`MemoryDocument`] seen through the `selectors` matching
/// interface. Every node is an HTML element.
#[derive(Clone, Copy)]
pub struct MemoryElement<'a> {
    doc: &'a MemoryDocument,
    id: NodeId,
}

impl MemoryElement<'_> {
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    fn node(&self) -> &Node {
        &self.doc.nodes[self.id.0 as usize]
    }

    fn at(&self, id: NodeId) -> Self {
        Self { doc: self.doc, id }
    }

    fn sibling(&self, step: isize) -> Option<Self> {
        let parent = self.node().parent?;
        let siblings = self.doc.children(parent);
        let pos = siblings.iter().position(|&c| c == self.id)?;
        let next = pos.checked_add_signed(step)?;
        siblings.get(next).map(|&id| self.at(id))
    }
}

impl fmt::Debug for MemoryElement<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} #{}>", self.node().tag, self.id.0)
    }
}

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

impl selectors::Element for MemoryElement<'_> {
    type Impl = Simple;

    fn opaque(&self) -> OpaqueElement {
        OpaqueElement::new(self.node())
    }

    fn parent_element(&self) -> Option<Self> {
        self.node().parent.map(|id| self.at(id))
    }

    fn parent_node_is_shadow_root(&self) -> bool {
        false
    }

    fn containing_shadow_host(&self) -> Option<Self> {
        None
    }

    fn is_pseudo_element(&self) -> bool {
        false
    }

    fn prev_sibling_element(&self) -> Option<Self> {
        self.sibling(-1)
    }

    fn next_sibling_element(&self) -> Option<Self> {
        self.sibling(1)
    }

    fn first_element_child(&self) -> Option<Self> {
        self.node().children.first().map(|&id| self.at(id))
    }

    fn is_html_element_in_html_document(&self) -> bool {
        true
    }

    fn has_local_name(&self, name: &<Simple as SelectorImpl>::BorrowedLocalName) -> bool {
        self.node().tag == *name.0
    }

    fn has_namespace(&self, ns: &<Simple as SelectorImpl>::BorrowedNamespaceUrl) -> bool {
        let ns: &str = ns;
        ns == HTML_NAMESPACE
    }

    fn is_same_type(&self, other: &Self) -> bool {
        self.node().tag == other.node().tag
    }

    fn attr_matches(
        &self,
        ns: &NamespaceConstraint<&<Simple as SelectorImpl>::NamespaceUrl>,
        local_name: &<Simple as SelectorImpl>::LocalName,
        operation: &AttrSelectorOperation<&<Simple as SelectorImpl>::AttrValue>,
    ) -> bool {
        if let NamespaceConstraint::Specific(url) = ns
            && !url.is_empty()
        {
            return false;
        }
        self.node()
            .attrs
            .get(&*local_name.0)
            .is_some_and(|value| operation.eval_str(value))
    }

    fn match_non_ts_pseudo_class(
        &self,
        _pc: &NonTSPseudoClass,
        _context: &mut MatchingContext<'_, Simple>,
    ) -> bool {
        false
    }

    fn match_pseudo_element(
        &self,
        _pe: &PseudoElement,
        _context: &mut MatchingContext<'_, Simple>,
    ) -> bool {
        false
    }

    fn apply_selector_flags(&self, _flags: ElementSelectorFlags) {}

    fn is_link(&self) -> bool {
        matches!(self.node().tag.as_str(), "a" | "area") && self.node().attrs.contains_key("href")
    }

    fn is_html_slot_element(&self) -> bool {
        false
    }

    fn has_id(&self, id: &CssLocalName, case_sensitivity: CaseSensitivity) -> bool {
        self.node()
            .attrs
            .get("id")
            .is_some_and(|value| case_sensitivity.eq(id.0.as_bytes(), value.as_bytes()))
    }

    fn has_class(&self, name: &CssLocalName, case_sensitivity: CaseSensitivity) -> bool {
        self.node().attrs.get("class").is_some_and(|list| {
            list.split_ascii_whitespace()
                .any(|class| case_sensitivity.eq(name.0.as_bytes(), class.as_bytes()))
        })
    }

    fn imported_part(&self, _name: &CssLocalName) -> Option<CssLocalName> {
        None
    }

    fn is_part(&self, _name: &CssLocalName) -> bool {
        false
    }

    fn is_empty(&self) -> bool {
        self.node().children.is_empty() && self.node().text.is_empty()
    }

    fn is_root(&self) -> bool {
        self.id == BODY
    }
}

/// Clipboard double that records writes and can be told to reject them.
#[derive(Debug, Clone, Default)]
pub struct MemoryClipboard {
    pub contents: Option<String>,
    pub fail: bool,
    pub attempts: usize,
}

impl ClipboardWriter for MemoryClipboard {
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        self.attempts += 1;
        if self.fail {
            return Err(ClipboardError::Rejected("write denied".to_owned()));
        }
        self.contents = Some(text.to_owned());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> (MemoryDocument, NodeId, NodeId, NodeId) {
        let mut doc = MemoryDocument::new(Viewport::new(0.0, 800.0, 600.0));
        let nav = doc.insert(BODY, "nav", &[("class", "navbar")]);
        let link = doc.insert(nav, "a", &[("href", "#about")]);
        let section = doc.insert(BODY, "section", &[("id", "about")]);
        doc.set_layout(section, Rect::new(0.0, 500.0, 800.0, 1000.0));
        (doc, nav, link, section)
    }

    #[test]
    fn queries_follow_document_order() {
        let (doc, nav, link, section) = doc();
        assert_eq!(doc.query_selector_all("*"), vec![BODY, nav, link, section]);
        assert_eq!(doc.query_selector("section[id]"), Some(section));
        assert_eq!(doc.query_within(nav, "a"), vec![link]);
        assert_eq!(doc.closest(link, ".navbar"), Some(nav));
        assert_eq!(doc.query_selector_all("a:hover"), Vec::new());
        assert_eq!(doc.query_selector_all("a:first-child"), vec![link]);
    }

    #[test]
    fn detached_nodes_are_invisible_to_queries() {
        let (mut doc, nav, link, _) = doc();
        doc.remove(nav);
        assert!(!doc.is_attached(link));
        assert_eq!(doc.query_selector("a"), None);
    }

    #[test]
    fn class_edits_keep_the_attribute_in_sync() {
        let (mut doc, nav, ..) = doc();
        doc.add_class(nav, "scrolled");
        doc.add_class(nav, "scrolled");
        assert_eq!(doc.attribute(nav, "class").as_deref(), Some("navbar scrolled"));
        doc.toggle_class(nav, "navbar", false);
        assert_eq!(doc.attribute(nav, "class").as_deref(), Some("scrolled"));
        assert!(Document::has_class(&doc, nav, "scrolled"));
    }

    #[test]
    fn bounding_rect_is_viewport_relative() {
        let (mut doc, _, _, section) = doc();
        doc.set_scroll_y(200.0);
        assert_eq!(doc.bounding_rect(section).top(), 300.0);
        assert_eq!(doc.offset_top(section), 500.0);
    }

    #[test]
    fn scroll_to_clamps_and_records() {
        let (mut doc, ..) = doc();
        doc.scroll_to(5000.0, true);
        assert_eq!(doc.viewport().scroll_y, 900.0);
        doc.scroll_to(-10.0, false);
        assert_eq!(doc.viewport().scroll_y, 0.0);
        assert_eq!(
            doc.scroll_requests(),
            &[
                ScrollRequest {
                    top: 5000.0,
                    smooth: true
                },
                ScrollRequest {
                    top: -10.0,
                    smooth: false
                },
            ]
        );
    }

    #[test]
    fn appending_an_ancestor_under_its_descendant_is_refused() {
        let (mut doc, nav, link, _) = doc();
        doc.append_child(link, nav);
        assert_eq!(doc.parent(nav), Some(BODY));
        assert_eq!(doc.children(link), &[] as &[NodeId]);
        doc.append_child(nav, nav);
        assert!(doc.is_attached(link));
        assert_eq!(doc.closest(link, "body"), Some(BODY));
    }

    #[test]
    fn exec_copy_reads_the_control_value() {
        let (mut doc, ..) = doc();
        let area = doc.create_element("textarea", "").unwrap();
        doc.set_value(area, "hello");
        assert!(!doc.exec_copy(area), "detached nodes cannot be selected");
        doc.append_child(BODY, area);
        assert!(doc.exec_copy(area));
        assert_eq!(doc.clipboard(), Some("hello"));
        doc.set_copy_succeeds(false);
        assert!(!doc.exec_copy(area));
    }
}
