#![forbid(unsafe_code)]

//! Scroll-driven page state: navbar style, reveal fallback, active section.
//!
//! [`ScrollCoordinator::on_scroll_at`] is called for every host `scroll`
//! event. A [`Throttle`] drops all but one call per frame interval; a call
//! that passes reads a [`ScrollSnapshot`] from the host and derives three
//! independent results, each idempotent:
//!
//! 1. whether the navbar is in its "scrolled" style,
//! 2. which not-yet-revealed elements are close enough to the viewport
//!    bottom to be revealed (covers elements the observer has not seen yet),
//! 3. which section with an id contains the scroll offset, and so which
//!    navigation link is active.
//!
//! The snapshot is built lazily so a throttled call never touches layout.
//!
//! Sections are expected not to overlap. If they do, the last matching
//! section in document order wins.

use core::time::Duration;

use crate::geometry::Viewport;
use crate::rate_limit::Throttle;

/// Scroll coordinator tuning. Defaults match the page stylesheet.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrollConfig {
    /// Minimum spacing between processed scroll ticks (~60/s).
    pub throttle_interval: Duration,
    /// Scroll offset beyond which the navbar is "scrolled".
    pub navbar_threshold: f64,
    /// An unrevealed element is revealed once its top edge is this far
    /// above the viewport bottom.
    pub reveal_offset: f64,
    /// Sections become current this many pixels before their top edge.
    pub section_offset: f64,
    /// Anchor navigation stops this many pixels above the target (fixed
    /// navbar height).
    pub anchor_offset: f64,
    /// Duration of the animated scroll used when native smooth scrolling is
    /// missing.
    pub smooth_scroll_duration: Duration,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            throttle_interval: Duration::from_millis(16),
            navbar_threshold: 100.0,
            reveal_offset: 150.0,
            section_offset: 100.0,
            anchor_offset: 80.0,
            smooth_scroll_duration: Duration::from_millis(800),
        }
    }
}

/// A page section with an id, in document coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub id: String,
    /// `offsetTop`.
    pub top: f64,
    /// `offsetHeight`.
    pub height: f64,
}

impl Section {
    pub fn new(id: impl Into<String>, top: f64, height: f64) -> Self {
        Self {
            id: id.into(),
            top,
            height,
        }
    }

    /// Whether `scroll_y` falls inside `[top - offset, top - offset + height)`.
    #[must_use]
    pub fn contains(&self, scroll_y: f64, offset: f64) -> bool {
        let start = self.top - offset;
        scroll_y >= start && scroll_y < start + self.height
    }
}

/// Layout read from the host for one scroll tick.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrollSnapshot<K> {
    pub viewport: Viewport,
    /// Unrevealed reveal elements with their viewport-relative top edge.
    pub pending_reveals: Vec<(K, f64)>,
    /// Sections with ids, in document order.
    pub sections: Vec<Section>,
}

/// Result of one processed scroll tick.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrollUpdate<K> {
    pub navbar_scrolled: bool,
    /// Elements to reveal now.
    pub revealed: Vec<K>,
    /// Id of the current section, `None` when no section contains the offset.
    pub active_section: Option<String>,
}

/// Navbar style rule.
#[inline]
#[must_use]
pub fn is_navbar_scrolled(scroll_y: f64, threshold: f64) -> bool {
    scroll_y > threshold
}

/// Reveal fallback: elements whose top is above `viewport_height - offset`.
#[must_use]
pub fn reveal_fallback<K: Copy>(
    candidates: &[(K, f64)],
    viewport_height: f64,
    offset: f64,
) -> Vec<K> {
    let limit = viewport_height - offset;
    candidates
        .iter()
        .filter(|(_, top)| *top < limit)
        .map(|(key, _)| *key)
        .collect()
}

/// Current section: the last one whose shifted range contains `scroll_y`.
#[must_use]
pub fn active_section(sections: &[Section], scroll_y: f64, offset: f64) -> Option<&str> {
    sections
        .iter()
        .rev()
        .find(|section| section.contains(scroll_y, offset))
        .map(|section| section.id.as_str())
}

/// Section id targeted by an in-page link (`"#about"` → `"about"`).
#[must_use]
pub fn anchor_target(href: &str) -> Option<&str> {
    href.strip_prefix('#').filter(|id| !id.is_empty())
}

/// Scroll position that puts an element with `offset_top` just below the
/// fixed navbar.
#[inline]
#[must_use]
pub fn anchor_scroll_position(offset_top: f64, anchor_offset: f64) -> f64 {
    offset_top - anchor_offset
}

/// Throttled scroll handler state.
#[derive(Debug, Clone)]
pub struct ScrollCoordinator {
    config: ScrollConfig,
    throttle: Throttle,
    navbar_scrolled: bool,
    active_section: Option<String>,
}

impl ScrollCoordinator {
    #[must_use]
    pub fn new(config: ScrollConfig) -> Self {
        Self {
            throttle: Throttle::new(config.throttle_interval),
            config,
            navbar_scrolled: false,
            active_section: None,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &ScrollConfig {
        &self.config
    }

    #[must_use]
    pub const fn navbar_scrolled(&self) -> bool {
        self.navbar_scrolled
    }

    #[must_use]
    pub fn active_section(&self) -> Option<&str> {
        self.active_section.as_deref()
    }

    /// Handle a host scroll event.
    ///
    /// Returns `None` when the throttle dropped the call; `snapshot` is not
    /// invoked in that case.
    pub fn on_scroll_at<K, F>(&mut self, now: Duration, snapshot: F) -> Option<ScrollUpdate<K>>
    where
        K: Copy,
        F: FnOnce() -> ScrollSnapshot<K>,
    {
        if !self.throttle.try_acquire_at(now) {
            return None;
        }
        Some(self.apply(&snapshot()))
    }

    /// Process a snapshot unconditionally (initial pass, tests).
    pub fn apply<K: Copy>(&mut self, snapshot: &ScrollSnapshot<K>) -> ScrollUpdate<K> {
        let viewport = snapshot.viewport;
        let navbar_scrolled = is_navbar_scrolled(viewport.scroll_y, self.config.navbar_threshold);
        if navbar_scrolled != self.navbar_scrolled {
            crate::debug!(navbar_scrolled, scroll_y = viewport.scroll_y, "navbar style changed");
            self.navbar_scrolled = navbar_scrolled;
        }

        let revealed = reveal_fallback(
            &snapshot.pending_reveals,
            viewport.height,
            self.config.reveal_offset,
        );

        let active_section = self.refresh_sections(viewport.scroll_y, &snapshot.sections);

        ScrollUpdate {
            navbar_scrolled,
            revealed,
            active_section,
        }
    }

    /// Recompute only the active section (used after a debounced resize).
    pub fn refresh_sections(&mut self, scroll_y: f64, sections: &[Section]) -> Option<String> {
        let current =
            active_section(sections, scroll_y, self.config.section_offset).map(str::to_owned);
        if current != self.active_section {
            crate::debug!(from = ?self.active_section, to = ?current, "active section changed");
            self.active_section.clone_from(&current);
        }
        current
    }
}

impl Default for ScrollCoordinator {
    fn default() -> Self {
        Self::new(ScrollConfig::default())
    }
}

/// Ease-in-out quadratic in the classic `(t, begin, change, duration)` form.
#[must_use]
pub fn ease_in_out_quad(t: f64, begin: f64, change: f64, duration: f64) -> f64 {
    if duration <= 0.0 {
        return begin + change;
    }
    let mut t = t / (duration / 2.0);
    if t < 1.0 {
        return change / 2.0 * t * t + begin;
    }
    t -= 1.0;
    -change / 2.0 * (t * (t - 2.0) - 1.0) + begin
}

/// One animation frame of a [`SmoothScroll`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollFrame {
    pub position: f64,
    pub finished: bool,
}

/// Frame-stepped scroll animation for hosts without native smooth scrolling.
///
/// The first frame fixes the start time. Elapsed time is clamped to the
/// duration so the last frame lands exactly on the target.
#[derive(Debug, Clone, PartialEq)]
pub struct SmoothScroll {
    start: f64,
    distance: f64,
    duration: Duration,
    started_at: Option<Duration>,
}

impl SmoothScroll {
    #[must_use]
    pub fn new(start: f64, target: f64, duration: Duration) -> Self {
        Self {
            start,
            distance: target - start,
            duration,
            started_at: None,
        }
    }

    #[must_use]
    pub fn target(&self) -> f64 {
        self.start + self.distance
    }

    /// Position for the animation frame at `now`.
    pub fn frame_at(&mut self, now: Duration) -> ScrollFrame {
        let started = *self.started_at.get_or_insert(now);
        let elapsed = now.saturating_sub(started).min(self.duration);
        let position = ease_in_out_quad(
            elapsed.as_secs_f64() * 1000.0,
            self.start,
            self.distance,
            self.duration.as_secs_f64() * 1000.0,
        );
        ScrollFrame {
            position,
            finished: elapsed >= self.duration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn sections() -> Vec<Section> {
        // With the 100px offset these cover [0, 400) and [400, 900).
        vec![Section::new("a", 100.0, 400.0), Section::new("b", 500.0, 500.0)]
    }

    #[test]
    fn navbar_threshold_is_strict() {
        assert!(!is_navbar_scrolled(100.0, 100.0));
        assert!(is_navbar_scrolled(100.5, 100.0));
    }

    #[test]
    fn reveal_fallback_uses_150px_band() {
        let vh = 800.0;
        let picked = reveal_fallback(&[(1, vh - 100.0), (2, vh - 200.0)], vh, 150.0);
        assert_eq!(picked, vec![2]);
    }

    #[test]
    fn active_section_picks_containing_range() {
        let s = sections();
        assert_eq!(active_section(&s, 450.0, 100.0), Some("b"));
        assert_eq!(active_section(&s, 0.0, 100.0), Some("a"));
        assert_eq!(active_section(&s, 400.0, 100.0), Some("b"));
        assert_eq!(active_section(&s, 900.0, 100.0), None);
    }

    #[test]
    fn overlapping_sections_last_wins() {
        let s = vec![Section::new("a", 100.0, 1000.0), Section::new("b", 300.0, 100.0)];
        assert_eq!(active_section(&s, 250.0, 100.0), Some("b"));
    }

    #[test]
    fn anchor_target_strips_hash() {
        assert_eq!(anchor_target("#about"), Some("about"));
        assert_eq!(anchor_target("#"), None);
        assert_eq!(anchor_target("/contact"), None);
    }

    #[test]
    fn throttled_tick_skips_snapshot() {
        let mut coord = ScrollCoordinator::default();
        let snap = || ScrollSnapshot::<u32> {
            viewport: Viewport::new(450.0, 1024.0, 800.0),
            pending_reveals: vec![],
            sections: sections(),
        };
        let first = coord.on_scroll_at(ms(0), snap).expect("first tick passes");
        assert!(first.navbar_scrolled);
        assert_eq!(first.active_section.as_deref(), Some("b"));

        let mut read = false;
        let second = coord.on_scroll_at(ms(5), || {
            read = true;
            snap()
        });
        assert!(second.is_none());
        assert!(!read);
        assert!(coord.on_scroll_at(ms(16), snap).is_some());
    }

    #[test]
    fn ease_in_out_quad_endpoints() {
        assert_eq!(ease_in_out_quad(0.0, 10.0, 100.0, 800.0), 10.0);
        assert!((ease_in_out_quad(400.0, 10.0, 100.0, 800.0) - 60.0).abs() < 1e-9);
        assert!((ease_in_out_quad(800.0, 10.0, 100.0, 800.0) - 110.0).abs() < 1e-9);
    }

    #[test]
    fn smooth_scroll_lands_on_target() {
        let mut anim = SmoothScroll::new(0.0, 1000.0, ms(800));
        let first = anim.frame_at(ms(50));
        assert_eq!(first.position, 0.0);
        assert!(!first.finished);
        let mid = anim.frame_at(ms(450));
        assert!((mid.position - 500.0).abs() < 1e-9);
        let last = anim.frame_at(ms(900));
        assert!(last.finished);
        assert_eq!(last.position, 1000.0);
    }
}
