#![forbid(unsafe_code)]

//! The boundary to the host document.
//!
//! [`Document`] is everything the page controllers read from or write to the
//! DOM. Two implementations exist: [`MemoryDocument`](crate::memory::MemoryDocument)
//! for tests and headless replay, and the `web-sys` backed document used by
//! the wasm build.
//!
//! Nodes are addressed by [`NodeId`], a copyable handle that the document
//! owns. Selectors follow CSS syntax; hosts other than the browser can match
//! them with [`selector::Selector`](crate::selector::Selector).

use bitflags::bitflags;
use folio_core::geometry::{Rect, Viewport};
use serde::{Deserialize, Serialize};

/// Opaque handle to a node owned by a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

bitflags! {
    /// Optional platform features the page degrades without.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct HostCapabilities: u8 {
        /// `IntersectionObserver` equivalent is available.
        const VISIBILITY_OBSERVER = 0b001;
        /// Native `scroll-behavior: smooth`.
        const SMOOTH_SCROLL       = 0b010;
        /// Asynchronous clipboard API.
        const ASYNC_CLIPBOARD     = 0b100;
    }
}

impl Default for HostCapabilities {
    fn default() -> Self {
        Self::all()
    }
}

/// Host document operations used by the page controllers.
///
/// Selector-taking methods return nothing (rather than an error) for
/// selectors the host cannot parse; implementations log the failure.
pub trait Document {
    /// The `<body>` element.
    fn body(&self) -> NodeId;

    /// First element in document order matching `selector`.
    fn query_selector(&self, selector: &str) -> Option<NodeId> {
        self.query_selector_all(selector).into_iter().next()
    }

    /// Every element in document order matching `selector`.
    fn query_selector_all(&self, selector: &str) -> Vec<NodeId>;

    /// Descendants of `root` matching `selector`, in document order.
    fn query_within(&self, root: NodeId, selector: &str) -> Vec<NodeId>;

    /// `node` or its nearest ancestor matching `selector`.
    fn closest(&self, node: NodeId, selector: &str) -> Option<NodeId>;

    fn has_class(&self, node: NodeId, class: &str) -> bool;
    fn add_class(&mut self, node: NodeId, class: &str);
    fn remove_class(&mut self, node: NodeId, class: &str);

    /// Add or remove `class` depending on `on`.
    fn toggle_class(&mut self, node: NodeId, class: &str, on: bool) {
        if on {
            self.add_class(node, class);
        } else {
            self.remove_class(node, class);
        }
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String>;
    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str);

    /// Replace the text content.
    fn set_text(&mut self, node: NodeId, text: &str);

    /// Set a form control's value.
    fn set_value(&mut self, node: NodeId, value: &str);

    /// Set one inline style property; an empty value removes it.
    fn set_style(&mut self, node: NodeId, property: &str, value: &str);

    /// Viewport-relative box (`getBoundingClientRect`).
    fn bounding_rect(&self, node: NodeId) -> Rect;

    /// Document-relative top edge (`offsetTop`).
    fn offset_top(&self, node: NodeId) -> f64;

    /// Layout height (`offsetHeight`).
    fn offset_height(&self, node: NodeId) -> f64;

    /// Current scroll position and viewport size.
    fn viewport(&self) -> Viewport;

    /// Scroll the document to `top`, animated by the host when `smooth`.
    fn scroll_to(&mut self, top: f64, smooth: bool);

    fn focus(&mut self, node: NodeId);

    /// Create a detached element with the given class attribute. `None` if
    /// the host refused.
    fn create_element(&mut self, tag: &str, class: &str) -> Option<NodeId>;

    fn append_child(&mut self, parent: NodeId, child: NodeId);

    /// Detach `node` from the document.
    fn remove(&mut self, node: NodeId);

    /// Select the contents of `node` and run the legacy copy command.
    /// Returns whether the host reported success.
    fn exec_copy(&mut self, node: NodeId) -> bool;

    fn capabilities(&self) -> HostCapabilities;
}

const INDEX_BITS: u32 = 20;
const INDEX_MASK: u32 = (1 << INDEX_BITS) - 1;
const GENERATION_MASK: u32 = u32::MAX >> INDEX_BITS;

#[derive(Debug, Clone)]
struct Slot<E> {
    generation: u32,
    element: Option<E>,
}

/// Slot map from [`NodeId`] to host elements.
///
/// The low 20 bits of an id are the slot index, the high 12 bits the slot
/// generation. Releasing a slot bumps its generation, so ids of released
/// elements stop resolving even after the slot is reused.
#[derive(Debug, Clone)]
pub struct NodeRegistry<E> {
    slots: Vec<Slot<E>>,
    free_list: Vec<u32>,
}

impl<E> Default for NodeRegistry<E> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
        }
    }
}

impl<E> NodeRegistry<E> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `element`. `None` once every index is taken.
    pub fn insert(&mut self, element: E) -> Option<NodeId> {
        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.element = Some(element);
            return Some(NodeId((slot.generation << INDEX_BITS) | index));
        }
        let index = u32::try_from(self.slots.len())
            .ok()
            .filter(|&i| i <= INDEX_MASK)?;
        self.slots.push(Slot {
            generation: 0,
            element: Some(element),
        });
        Some(NodeId(index))
    }

    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&E> {
        let slot = self.slots.get((id.0 & INDEX_MASK) as usize)?;
        if slot.generation != id.0 >> INDEX_BITS {
            return None;
        }
        slot.element.as_ref()
    }

    /// Free the slot behind `id` and hand back its element.
    pub fn release(&mut self, id: NodeId) -> Option<E> {
        let index = id.0 & INDEX_MASK;
        let slot = self.slots.get_mut(index as usize)?;
        if slot.generation != id.0 >> INDEX_BITS {
            return None;
        }
        let element = slot.element.take()?;
        slot.generation = (slot.generation + 1) & GENERATION_MASK;
        self.free_list.push(index);
        Some(element)
    }

    /// Number of live elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len() - self.free_list.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn released_ids_stop_resolving() {
        let mut registry = NodeRegistry::new();
        let body = registry.insert("body").unwrap();
        let toast = registry.insert("toast").unwrap();
        assert_eq!(body, NodeId(0));
        assert_eq!(registry.release(toast), Some("toast"));
        assert_eq!(registry.get(toast), None);
        assert_eq!(registry.release(toast), None);

        let textarea = registry.insert("textarea").unwrap();
        assert_ne!(textarea, toast, "reused slot carries a new generation");
        assert_eq!(textarea.0 & INDEX_MASK, toast.0 & INDEX_MASK);
        assert_eq!(registry.get(textarea), Some(&"textarea"));
        assert_eq!(registry.get(toast), None);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn churn_does_not_grow_the_slot_table() {
        let mut registry = NodeRegistry::new();
        registry.insert(0usize);
        for i in 1..1000 {
            let id = registry.insert(i).unwrap();
            assert_eq!(registry.release(id), Some(i));
        }
        assert_eq!(registry.slots.len(), 2);
        assert_eq!(registry.len(), 1);
    }
}
