#![forbid(unsafe_code)]

//! Threshold-crossing visibility tracking.
//!
//! [`ViewportObserver`] mirrors the parts of `IntersectionObserver` the page
//! relies on: a visibility threshold, a root margin that grows or shrinks the
//! viewport box, and one report per element when it first becomes visible.
//!
//! Two modes:
//!
//! - [`ObserveMode::Reveal`]: the element is activated permanently and stays
//!   in the watch list as activated. Activation is monotonic.
//! - [`ObserveMode::LazyLoad`]: the element is unobserved as soon as it is
//!   reported.
//!
//! When the host has no visibility tracking
//! ([`VisibilityCapability::Unavailable`]), [`ViewportObserver::watch`]
//! activates every element eagerly.

use std::collections::HashSet;
use std::hash::Hash;

use crate::geometry::{Rect, Sides, Viewport};

/// What happens to an element once it has been reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserveMode {
    /// Stay activated forever.
    Reveal,
    /// Stop observing after the first report.
    LazyLoad,
}

/// Whether the host can track visibility at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VisibilityCapability {
    #[default]
    Available,
    Unavailable,
}

/// Observer configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObserverConfig {
    /// Minimum visible fraction of the element's area, in `[0, 1]`.
    pub threshold: f64,
    /// Adjustment applied to the viewport box (`rootMargin`).
    pub root_margin: Sides,
    pub mode: ObserveMode,
}

impl ObserverConfig {
    /// Reveal-on-scroll defaults: 10% visible, bottom edge pulled up 50px.
    #[must_use]
    pub const fn reveal() -> Self {
        Self {
            threshold: 0.1,
            root_margin: Sides::bottom_only(-50.0),
            mode: ObserveMode::Reveal,
        }
    }

    /// Lazy image defaults: any overlap with the unmodified viewport.
    #[must_use]
    pub const fn lazy_load() -> Self {
        Self {
            threshold: 0.0,
            root_margin: Sides::all(0.0),
            mode: ObserveMode::LazyLoad,
        }
    }

    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold.clamp(0.0, 1.0);
        self
    }

    #[must_use]
    pub const fn with_root_margin(mut self, margin: Sides) -> Self {
        self.root_margin = margin;
        self
    }

    /// Whether an element with `rect` counts as visible inside `viewport`.
    #[must_use]
    pub fn is_visible(&self, rect: &Rect, viewport: &Viewport) -> bool {
        let root = viewport.bounds().outset(self.root_margin);
        let fraction = rect.visible_fraction(&root);
        fraction > 0.0 && fraction >= self.threshold
    }
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self::reveal()
    }
}

/// Tracks a set of elements and reports each once when it becomes visible.
#[derive(Debug, Clone)]
pub struct ViewportObserver<K> {
    config: ObserverConfig,
    capability: VisibilityCapability,
    watched: Vec<K>,
    activated: HashSet<K>,
}

impl<K: Copy + Eq + Hash> ViewportObserver<K> {
    #[must_use]
    pub fn new(config: ObserverConfig, capability: VisibilityCapability) -> Self {
        Self {
            config,
            capability,
            watched: Vec::new(),
            activated: HashSet::new(),
        }
    }

    #[must_use]
    pub const fn config(&self) -> &ObserverConfig {
        &self.config
    }

    /// Start watching `elements`.
    ///
    /// Returns the elements activated right away, which is all of them when
    /// visibility tracking is unavailable and none otherwise.
    pub fn watch(&mut self, elements: impl IntoIterator<Item = K>) -> Vec<K> {
        let mut eager = Vec::new();
        for element in elements {
            if self.capability == VisibilityCapability::Unavailable {
                if self.activated.insert(element) {
                    eager.push(element);
                }
                continue;
            }
            if !self.watched.contains(&element) {
                self.watched.push(element);
            }
        }
        if !eager.is_empty() {
            crate::debug!(
                count = eager.len(),
                "visibility tracking unavailable, activating eagerly"
            );
        }
        eager
    }

    /// Stop watching `element`. Activation state is kept.
    pub fn unobserve(&mut self, element: K) {
        self.watched.retain(|k| *k != element);
    }

    /// Record an activation made outside the observer (e.g. a scroll
    /// fallback). Returns `true` if the element was not active yet.
    pub fn mark_activated(&mut self, element: K) -> bool {
        let newly = self.activated.insert(element);
        if newly && self.config.mode == ObserveMode::LazyLoad {
            self.unobserve(element);
        }
        newly
    }

    #[must_use]
    pub fn is_activated(&self, element: K) -> bool {
        self.activated.contains(&element)
    }

    #[must_use]
    pub fn is_watching(&self, element: K) -> bool {
        self.watched.contains(&element)
    }

    /// Number of elements still being watched (activated reveal elements
    /// included).
    #[must_use]
    pub fn watched_count(&self) -> usize {
        self.watched.len()
    }

    /// Watched elements not activated yet, in watch order.
    pub fn pending(&self) -> impl Iterator<Item = K> + '_ {
        self.watched
            .iter()
            .copied()
            .filter(|k| !self.activated.contains(k))
    }

    /// Run one observation pass.
    ///
    /// `rect_of` returns an element's viewport-relative box, or `None` if the
    /// element is gone (it is then skipped). Returns the newly visible
    /// elements in watch order.
    pub fn evaluate<F>(&mut self, viewport: &Viewport, mut rect_of: F) -> Vec<K>
    where
        F: FnMut(K) -> Option<Rect>,
    {
        let config = self.config;
        let newly: Vec<K> = self
            .pending()
            .filter(|&k| rect_of(k).is_some_and(|rect| config.is_visible(&rect, viewport)))
            .collect();

        for &element in &newly {
            self.activated.insert(element);
        }
        if config.mode == ObserveMode::LazyLoad && !newly.is_empty() {
            self.watched.retain(|k| !newly.contains(k));
        }
        if !newly.is_empty() {
            crate::trace!(count = newly.len(), mode = ?config.mode, "elements became visible");
        }
        newly
    }

    /// Forget every element.
    pub fn disconnect(&mut self) {
        self.watched.clear();
    }
}
