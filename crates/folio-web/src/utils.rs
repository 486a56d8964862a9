#![forbid(unsafe_code)]

//! Utility surface exported to page scripts.
//!
//! Free functions over a [`Document`]; no state is kept between calls.

use core::fmt;

use folio_core::scroll::anchor_scroll_position;

use crate::dom::{Document, HostCapabilities, NodeId};

/// Offset used by `scrollToElement` when the caller passes none.
pub const DEFAULT_SCROLL_OFFSET: f64 = 80.0;

/// Clipboard write failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipboardError {
    /// The host has no clipboard API.
    Unavailable,
    /// The host refused the write (permissions, focus, ...).
    Rejected(String),
}

impl fmt::Display for ClipboardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable => write!(f, "clipboard API unavailable"),
            Self::Rejected(reason) => write!(f, "clipboard write rejected: {reason}"),
        }
    }
}

impl std::error::Error for ClipboardError {}

/// The modern asynchronous clipboard.
///
/// Implementations may only be able to report failures that happen
/// synchronously; the wasm one handles late rejections itself.
pub trait ClipboardWriter {
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError>;
}

/// Smooth-scroll so `selector`'s first match sits `offset` pixels below the
/// top of the viewport. Returns the element scrolled to.
pub fn scroll_to_element<D: Document + ?Sized>(
    doc: &mut D,
    selector: &str,
    offset: f64,
) -> Option<NodeId> {
    let Some(node) = doc.query_selector(selector) else {
        tracing::debug!(selector, "scroll target not found");
        return None;
    };
    let top = anchor_scroll_position(doc.offset_top(node), offset);
    doc.scroll_to(top, true);
    Some(node)
}

/// Add the `reveal` class to every match of `selector`.
///
/// Only marks the elements; `PortfolioApp::add_reveal_animation` also
/// registers them for reveal-on-scroll.
pub fn add_reveal_animation<D: Document + ?Sized>(doc: &mut D, selector: &str) -> Vec<NodeId> {
    let nodes = doc.query_selector_all(selector);
    for &node in &nodes {
        doc.add_class(node, "reveal");
    }
    nodes
}

/// Copy through a temporary off-screen textarea and the legacy copy
/// command. Returns whether the host reported success.
pub fn legacy_copy<D: Document + ?Sized>(doc: &mut D, text: &str) -> bool {
    let body = doc.body();
    let Some(area) = doc.create_element("textarea", "") else {
        return false;
    };
    doc.set_value(area, text);
    doc.set_style(area, "position", "fixed");
    doc.set_style(area, "left", "-999999px");
    doc.set_style(area, "top", "-999999px");
    doc.append_child(body, area);
    let copied = doc.exec_copy(area);
    doc.remove(area);
    if !copied {
        tracing::warn!("legacy copy command failed");
    }
    copied
}

/// Copy `text` to the clipboard.
///
/// Uses `clipboard` when the host advertises it and falls back to
/// [`legacy_copy`] otherwise or when the write fails. Always returns `true`:
/// callers get no signal when both paths fail.
pub fn copy_to_clipboard<D, C>(doc: &mut D, clipboard: &mut C, text: &str) -> bool
where
    D: Document + ?Sized,
    C: ClipboardWriter + ?Sized,
{
    let write = if doc.capabilities().contains(HostCapabilities::ASYNC_CLIPBOARD) {
        clipboard.write_text(text)
    } else {
        Err(ClipboardError::Unavailable)
    };
    if let Err(err) = write {
        tracing::debug!(%err, "falling back to legacy copy");
        legacy_copy(doc, text);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryClipboard, MemoryDocument};
    use folio_core::geometry::{Rect, Viewport};

    fn page() -> (MemoryDocument, NodeId) {
        let mut doc = MemoryDocument::new(Viewport::new(0.0, 1000.0, 800.0));
        let body = doc.body();
        let about = doc.insert(body, "section", &[("id", "about")]);
        doc.set_layout(about, Rect::new(0.0, 1200.0, 1000.0, 900.0));
        (doc, about)
    }

    #[test]
    fn scroll_to_element_applies_offset() {
        let (mut doc, about) = page();
        assert_eq!(scroll_to_element(&mut doc, "#about", DEFAULT_SCROLL_OFFSET), Some(about));
        let req = doc.scroll_requests()[0];
        assert_eq!(req.top, 1120.0);
        assert!(req.smooth);
    }

    #[test]
    fn scroll_to_missing_element_is_a_no_op() {
        let (mut doc, _) = page();
        assert_eq!(scroll_to_element(&mut doc, "#nope", 0.0), None);
        assert!(doc.scroll_requests().is_empty());
    }

    #[test]
    fn add_reveal_animation_marks_matches() {
        let (mut doc, about) = page();
        assert_eq!(add_reveal_animation(&mut doc, "section"), vec![about]);
        assert!(doc.has_class(about, "reveal"));
    }

    #[test]
    fn copy_prefers_async_clipboard() {
        let (mut doc, _) = page();
        let mut clip = MemoryClipboard::default();
        assert!(copy_to_clipboard(&mut doc, &mut clip, "hi"));
        assert_eq!(clip.contents.as_deref(), Some("hi"));
        assert_eq!(doc.clipboard(), None);
    }

    #[test]
    fn copy_falls_back_and_cleans_up() {
        let (mut doc, _) = page();
        let before = doc.children(doc.body()).len();
        let mut clip = MemoryClipboard {
            fail: true,
            ..MemoryClipboard::default()
        };
        assert!(copy_to_clipboard(&mut doc, &mut clip, "fallback"));
        assert_eq!(doc.clipboard(), Some("fallback"));
        assert_eq!(doc.children(doc.body()).len(), before);
    }

    #[test]
    fn copy_reports_true_even_when_everything_fails() {
        let (mut doc, _) = page();
        doc.set_capabilities(HostCapabilities::empty());
        doc.set_copy_succeeds(false);
        let mut clip = MemoryClipboard::default();
        assert!(copy_to_clipboard(&mut doc, &mut clip, "lost"));
        assert_eq!(clip.attempts, 0);
        assert_eq!(doc.clipboard(), None);
    }
}
