#![forbid(unsafe_code)]

//! The page application context.
//!
//! [`PortfolioApp`] is built once per page load. It resolves the elements it
//! drives, owns every controller, and is the only thing that mutates the
//! document. The host feeds it [`HostEvent`]s and timer callbacks, both
//! stamped with the current monotonic time, and arms a single timer for
//! [`PortfolioApp::next_deadline`].
//!
//! Features whose elements are missing are skipped; nothing here fails
//! because the markup is incomplete.

use core::time::Duration;

use folio_core::menu::{FocusTarget, MenuController, MenuFlags, MenuSync};
use folio_core::observer::{ObserverConfig, ViewportObserver, VisibilityCapability};
use folio_core::rate_limit::Debounce;
use folio_core::scroll::{
    ScrollCoordinator, ScrollSnapshot, ScrollUpdate, Section, SmoothScroll, anchor_scroll_position,
    anchor_target,
};
use folio_core::typewriter::Typewriter;

use crate::WebError;
use crate::config::AppConfig;
use crate::dom::{Document, HostCapabilities, NodeId};
use crate::event::{EventOutcome, HostEvent};
use crate::notify::{NotificationCenter, NotificationKind};
use crate::particles::inject_particles;
use crate::utils::{self, ClipboardWriter};

const NAVBAR: &str = ".navbar";
const REVEAL: &str = ".reveal";
const UNREVEALED: &str = ".reveal:not(.active)";
const NAV_LINKS: &str = r##".nav-links a[href^="#"]"##;
const NAV_CONTAINER: &str = ".nav-links";
const IN_PAGE_LINK: &str = r##"a[href^="#"]"##;
const SECTIONS: &str = "section[id]";
const TYPING_TEXT: &str = ".typing-text";
const MENU_TRIGGER: &str = ".mobile-menu-btn";
const MENU_PANEL: &str = ".mobile-menu";
const MENU_OVERLAY_CLASS: &str = "mobile-menu-overlay";
const LAZY_IMAGES: &str = "img[data-src]";
const HERO: &str = ".hero";
const CONTACT_FORM: &str = "#contact-form";
const SUBMIT_BUTTON: &str = r#"button[type="submit"]"#;

const ACTIVE: &str = "active";

/// Elements the mobile menu drives.
#[derive(Debug, Clone)]
struct MenuBinding {
    controller: MenuController,
    trigger: NodeId,
    panel: NodeId,
    overlay: NodeId,
}

#[derive(Debug)]
pub struct PortfolioApp<D: Document> {
    doc: D,
    config: AppConfig,
    navbar: Option<NodeId>,
    reveal: ViewportObserver<NodeId>,
    lazy_images: ViewportObserver<NodeId>,
    scroll: ScrollCoordinator,
    resize: Debounce<(f64, f64)>,
    typewriter: Option<(NodeId, Typewriter)>,
    menu: Option<MenuBinding>,
    contact_form: Option<NodeId>,
    smooth_scroll: Option<SmoothScroll>,
    notifications: NotificationCenter,
    loaded: bool,
    destroyed: bool,
}

impl<D: Document> PortfolioApp<D> {
    /// Bind every feature to `doc` and run the work due at `now` (the
    /// first typewriter step and the initial visibility pass).
    pub fn new(doc: D, config: AppConfig, now: Duration) -> Result<Self, WebError> {
        config.validate()?;

        let visibility = if doc
            .capabilities()
            .contains(HostCapabilities::VISIBILITY_OBSERVER)
        {
            VisibilityCapability::Available
        } else {
            VisibilityCapability::Unavailable
        };

        let mut app = Self {
            navbar: None,
            reveal: ViewportObserver::new(config.reveal_observer_config(), visibility),
            lazy_images: ViewportObserver::new(ObserverConfig::lazy_load(), visibility),
            scroll: ScrollCoordinator::new(config.scroll_config()),
            resize: Debounce::new(config.resize_debounce()),
            typewriter: None,
            menu: None,
            contact_form: None,
            smooth_scroll: None,
            notifications: NotificationCenter::new(config.notification_timings()),
            loaded: false,
            destroyed: false,
            doc,
            config,
        };

        app.init_navbar();
        app.init_scroll_reveal();
        app.init_typing_effect(now)?;
        app.init_mobile_menu();
        app.init_lazy_loading();
        app.init_contact_form();

        app.observe_visibility();
        app.advance_to(now);
        tracing::info!(
            menu = app.menu.is_some(),
            typewriter = app.typewriter.is_some(),
            reveal = app.reveal.watched_count(),
            "portfolio app initialized"
        );
        Ok(app)
    }

    // ── init ────────────────────────────────────────────────────────────

    fn init_navbar(&mut self) {
        self.navbar = self.doc.query_selector(NAVBAR);
        if self.navbar.is_none() {
            tracing::debug!("no navbar, scroll styling disabled");
        }
    }

    fn init_scroll_reveal(&mut self) {
        let nodes = self.doc.query_selector_all(REVEAL);
        for node in self.reveal.watch(nodes) {
            self.doc.add_class(node, ACTIVE);
        }
    }

    fn init_typing_effect(&mut self, now: Duration) -> Result<(), WebError> {
        let Some(node) = self.doc.query_selector(TYPING_TEXT) else {
            tracing::debug!("no typing target, typewriter disabled");
            return Ok(());
        };
        let mut typewriter = Typewriter::new(
            self.config.typing_texts.iter().cloned(),
            self.config.typewriter_config(),
        )?;
        typewriter.start_at(now);
        self.typewriter = Some((node, typewriter));
        Ok(())
    }

    fn init_mobile_menu(&mut self) {
        let (Some(trigger), Some(panel)) = (
            self.doc.query_selector(MENU_TRIGGER),
            self.doc.query_selector(MENU_PANEL),
        ) else {
            tracing::debug!("mobile menu markup missing, menu disabled");
            return;
        };

        self.doc.set_attribute(trigger, "aria-expanded", "false");
        let Some(overlay) = self.doc.create_element("div", MENU_OVERLAY_CLASS) else {
            tracing::warn!("could not create menu overlay, menu disabled");
            return;
        };
        let body = self.doc.body();
        self.doc.append_child(body, overlay);

        let has_link = !self.doc.query_within(panel, "a").is_empty();
        self.menu = Some(MenuBinding {
            controller: MenuController::new(self.config.menu_config(), has_link),
            trigger,
            panel,
            overlay,
        });
    }

    fn init_lazy_loading(&mut self) {
        let images = self.doc.query_selector_all(LAZY_IMAGES);
        for image in self.lazy_images.watch(images) {
            load_image(&mut self.doc, image);
        }
    }

    fn init_contact_form(&mut self) {
        self.contact_form = self.doc.query_selector(CONTACT_FORM);
    }

    // ── events ──────────────────────────────────────────────────────────

    /// Apply one host event. The returned outcome says whether the native
    /// event's default action must be suppressed.
    pub fn handle_event(&mut self, event: &HostEvent, now: Duration) -> EventOutcome {
        if self.destroyed {
            return EventOutcome::IGNORED;
        }
        tracing::trace!(kind = event.kind(), "host event");
        match event {
            HostEvent::Scroll => {
                self.observe_visibility();
                self.on_scroll(now);
                EventOutcome::IGNORED
            }
            HostEvent::Resize { width, height } => {
                // Visibility follows the viewport at once; section tracking
                // waits for the resize to settle.
                self.observe_visibility();
                self.resize.call_at(now, (*width, *height));
                EventOutcome::IGNORED
            }
            HostEvent::Load => {
                self.on_load();
                EventOutcome::IGNORED
            }
            HostEvent::Frame => {
                self.on_frame(now);
                EventOutcome::IGNORED
            }
            HostEvent::Click { target } => self.on_click(*target, now),
            HostEvent::KeyDown { key } => {
                if let Some(menu) = &mut self.menu
                    && let Some(sync) = menu.controller.on_key(key, now)
                {
                    apply_menu_sync(&mut self.doc, menu, sync);
                }
                EventOutcome::IGNORED
            }
            HostEvent::Submit { target } => {
                self.on_submit(*target);
                EventOutcome::IGNORED
            }
        }
    }

    /// Run every timer due at `now`.
    pub fn advance_to(&mut self, now: Duration) {
        if self.destroyed {
            return;
        }
        if let Some((node, typewriter)) = &mut self.typewriter
            && let Some(text) = typewriter.tick_at(now)
        {
            self.doc.set_text(*node, text);
        }

        if let Some(menu) = &mut self.menu
            && let Some(target) = menu.controller.tick_at(now)
        {
            focus_menu_target(&mut self.doc, menu, target);
        }

        if let Some((width, height)) = self.resize.poll_at(now) {
            tracing::debug!(width, height, "resize settled");
            self.refresh_active_section();
        }

        self.notifications.advance_to(&mut self.doc, now);
    }

    /// Earliest pending timer across every feature.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        [
            self.typewriter.as_ref().and_then(|(_, t)| t.next_deadline()),
            self.menu.as_ref().and_then(|m| m.controller.next_deadline()),
            self.resize.deadline(),
            self.notifications.next_deadline(),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    /// Whether a scroll animation wants [`HostEvent::Frame`] events.
    #[must_use]
    pub fn needs_animation_frame(&self) -> bool {
        self.smooth_scroll.is_some()
    }

    fn on_scroll(&mut self, now: Duration) {
        let doc = &self.doc;
        let Some(update) = self.scroll.on_scroll_at(now, || scroll_snapshot(doc)) else {
            return;
        };
        self.apply_scroll_update(&update);
    }

    fn apply_scroll_update(&mut self, update: &ScrollUpdate<NodeId>) {
        if let Some(navbar) = self.navbar {
            self.doc.toggle_class(navbar, "scrolled", update.navbar_scrolled);
        }
        for &node in &update.revealed {
            self.doc.add_class(node, ACTIVE);
            self.reveal.mark_activated(node);
        }
        mark_nav_links(&mut self.doc, update.active_section.as_deref());
    }

    fn refresh_active_section(&mut self) {
        let scroll_y = self.doc.viewport().scroll_y;
        let sections = read_sections(&self.doc);
        let current = self.scroll.refresh_sections(scroll_y, &sections);
        mark_nav_links(&mut self.doc, current.as_deref());
    }

    /// Intersection pass for both observers.
    fn observe_visibility(&mut self) {
        let viewport = self.doc.viewport();
        let doc = &self.doc;
        let revealed = self
            .reveal
            .evaluate(&viewport, |node| Some(doc.bounding_rect(node)));
        let images = self
            .lazy_images
            .evaluate(&viewport, |node| Some(doc.bounding_rect(node)));
        for node in revealed {
            self.doc.add_class(node, ACTIVE);
        }
        for image in images {
            load_image(&mut self.doc, image);
        }
    }

    fn on_load(&mut self) {
        if self.loaded {
            return;
        }
        self.loaded = true;
        let body = self.doc.body();
        self.doc.add_class(body, "loaded");
        if let Some(hero) = self.doc.query_selector(HERO) {
            inject_particles(
                &mut self.doc,
                hero,
                self.config.particle_count,
                self.config.particle_seed,
            );
        } else {
            tracing::debug!("no hero section, particles skipped");
        }
        // Images and fonts can move content once loading finishes.
        self.observe_visibility();
    }

    fn on_frame(&mut self, now: Duration) {
        let Some(animation) = &mut self.smooth_scroll else {
            return;
        };
        let frame = animation.frame_at(now);
        self.doc.scroll_to(frame.position, false);
        if frame.finished {
            self.smooth_scroll = None;
        }
    }

    fn on_click(&mut self, target: NodeId, now: Duration) -> EventOutcome {
        if let Some(menu) = &mut self.menu {
            let sync = if self.doc.closest(target, MENU_TRIGGER) == Some(menu.trigger) {
                Some(menu.controller.on_trigger_click(now))
            } else if target == menu.overlay {
                Some(menu.controller.on_overlay_click(now))
            } else if self
                .doc
                .closest(target, "a")
                .is_some_and(|link| self.doc.closest(link, MENU_PANEL) == Some(menu.panel))
            {
                Some(menu.controller.on_panel_link_click(now))
            } else {
                None
            };
            if let Some(sync) = sync {
                apply_menu_sync(&mut self.doc, menu, sync);
            }
        }

        let Some(link) = self.doc.closest(target, IN_PAGE_LINK) else {
            return EventOutcome::IGNORED;
        };
        let native_smooth = self
            .doc
            .capabilities()
            .contains(HostCapabilities::SMOOTH_SCROLL);
        let is_nav_link = self.doc.closest(link, NAV_CONTAINER).is_some();
        if !is_nav_link && native_smooth {
            // The stylesheet's `scroll-behavior: smooth` handles it.
            return EventOutcome::IGNORED;
        }

        let destination = self
            .doc
            .attribute(link, "href")
            .and_then(|href| anchor_target(&href).and_then(|id| find_by_id(&self.doc, id)));
        match destination {
            Some(element) => {
                let top = anchor_scroll_position(
                    self.doc.offset_top(element),
                    self.scroll.config().anchor_offset,
                );
                if native_smooth {
                    self.doc.scroll_to(top, true);
                } else {
                    self.start_smooth_scroll(top);
                }
            }
            None => tracing::debug!(link = link.0, "in-page link without target"),
        }
        EventOutcome::CONSUMED
    }

    fn start_smooth_scroll(&mut self, target: f64) {
        let start = self.doc.viewport().scroll_y;
        tracing::debug!(start, target, "animating scroll");
        self.smooth_scroll = Some(SmoothScroll::new(
            start,
            target,
            self.scroll.config().smooth_scroll_duration,
        ));
    }

    fn on_submit(&mut self, target: NodeId) {
        let Some(form) = self.contact_form else {
            return;
        };
        if self.doc.closest(target, CONTACT_FORM) != Some(form) {
            return;
        }
        if let Some(&button) = self.doc.query_within(form, SUBMIT_BUTTON).first() {
            self.doc.set_attribute(button, "aria-busy", "true");
            self.doc.set_attribute(button, "disabled", "");
        }
    }

    // ── exported surface ────────────────────────────────────────────────
    //
    // After `destroy` these leave the document untouched.

    /// Show a toast; it removes itself after the configured lifetime.
    pub fn show_notification(
        &mut self,
        message: &str,
        kind: NotificationKind,
        now: Duration,
    ) -> Option<NodeId> {
        if self.destroyed {
            return None;
        }
        self.notifications.show(&mut self.doc, message, kind, now)
    }

    pub fn scroll_to_element(&mut self, selector: &str, offset: f64) -> Option<NodeId> {
        if self.destroyed {
            return None;
        }
        utils::scroll_to_element(&mut self.doc, selector, offset)
    }

    /// Mark matches of `selector` as reveal elements and start watching
    /// them.
    pub fn add_reveal_animation(&mut self, selector: &str) -> Vec<NodeId> {
        if self.destroyed {
            return Vec::new();
        }
        let nodes = utils::add_reveal_animation(&mut self.doc, selector);
        let fresh: Vec<NodeId> = nodes
            .iter()
            .copied()
            .filter(|&n| !self.reveal.is_activated(n))
            .collect();
        for node in self.reveal.watch(fresh) {
            self.doc.add_class(node, ACTIVE);
        }
        self.observe_visibility();
        nodes
    }

    pub fn copy_to_clipboard<C: ClipboardWriter + ?Sized>(
        &mut self,
        clipboard: &mut C,
        text: &str,
    ) -> bool {
        if self.destroyed {
            return false;
        }
        utils::copy_to_clipboard(&mut self.doc, clipboard, text)
    }

    // ── accessors ───────────────────────────────────────────────────────

    #[must_use]
    pub fn document(&self) -> &D {
        &self.doc
    }

    pub fn document_mut(&mut self) -> &mut D {
        &mut self.doc
    }

    #[must_use]
    pub fn into_document(self) -> D {
        self.doc
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    #[must_use]
    pub fn menu_open(&self) -> bool {
        self.menu.as_ref().is_some_and(|m| m.controller.is_open())
    }

    #[must_use]
    pub fn menu_overlay(&self) -> Option<NodeId> {
        self.menu.as_ref().map(|m| m.overlay)
    }

    #[must_use]
    pub fn typewriter_text(&self) -> Option<&str> {
        self.typewriter.as_ref().map(|(_, t)| t.display())
    }

    #[must_use]
    pub fn active_section(&self) -> Option<&str> {
        self.scroll.active_section()
    }

    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Cancel every pending timer and animation, remove live toasts and
    /// stop reacting to events.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        if let Some((_, typewriter)) = &mut self.typewriter {
            typewriter.stop();
        }
        if let Some(menu) = &mut self.menu {
            menu.controller.cancel_pending();
        }
        self.resize.cancel();
        self.smooth_scroll = None;
        self.notifications.clear(&mut self.doc);
        self.reveal.disconnect();
        self.lazy_images.disconnect();
        tracing::info!("portfolio app destroyed");
    }
}

fn scroll_snapshot<D: Document>(doc: &D) -> ScrollSnapshot<NodeId> {
    ScrollSnapshot {
        viewport: doc.viewport(),
        pending_reveals: doc
            .query_selector_all(UNREVEALED)
            .into_iter()
            .map(|node| (node, doc.bounding_rect(node).top()))
            .collect(),
        sections: read_sections(doc),
    }
}

fn read_sections<D: Document>(doc: &D) -> Vec<Section> {
    doc.query_selector_all(SECTIONS)
        .into_iter()
        .filter_map(|node| {
            let id = doc.attribute(node, "id")?;
            Some(Section::new(id, doc.offset_top(node), doc.offset_height(node)))
        })
        .collect()
}

/// Exactly the nav link pointing at `current` is active.
fn mark_nav_links<D: Document>(doc: &mut D, current: Option<&str>) {
    for link in doc.query_selector_all(NAV_LINKS) {
        let is_current = current.is_some_and(|id| {
            doc.attribute(link, "href")
                .as_deref()
                .and_then(anchor_target)
                == Some(id)
        });
        doc.toggle_class(link, ACTIVE, is_current);
    }
}

fn find_by_id<D: Document>(doc: &D, id: &str) -> Option<NodeId> {
    if id.contains(['"', '\\']) {
        return None;
    }
    doc.query_selector(&format!(r#"[id="{id}"]"#))
}

fn load_image<D: Document>(doc: &mut D, image: NodeId) {
    if let Some(src) = doc.attribute(image, "data-src") {
        doc.set_attribute(image, "src", &src);
    }
    doc.remove_class(image, "lazy");
}

fn apply_menu_sync<D: Document>(doc: &mut D, menu: &MenuBinding, sync: MenuSync) {
    doc.toggle_class(menu.panel, ACTIVE, sync.flags.contains(MenuFlags::PANEL_ACTIVE));
    doc.toggle_class(
        menu.trigger,
        ACTIVE,
        sync.flags.contains(MenuFlags::TRIGGER_ACTIVE),
    );
    doc.toggle_class(
        menu.overlay,
        ACTIVE,
        sync.flags.contains(MenuFlags::OVERLAY_ACTIVE),
    );
    doc.set_attribute(menu.trigger, "aria-expanded", sync.aria_expanded());
    let body = doc.body();
    let overflow = if sync.flags.contains(MenuFlags::SCROLL_LOCK) {
        "hidden"
    } else {
        ""
    };
    doc.set_style(body, "overflow", overflow);
    if let Some(target) = sync.focus_now {
        focus_menu_target(doc, menu, target);
    }
}

fn focus_menu_target<D: Document>(doc: &mut D, menu: &MenuBinding, target: FocusTarget) {
    match target {
        FocusTarget::Trigger => doc.focus(menu.trigger),
        FocusTarget::FirstPanelLink => {
            if let Some(&link) = doc.query_within(menu.panel, "a").first() {
                doc.focus(link);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryDocument;
    use folio_core::geometry::{Rect, Viewport};

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn bare() -> MemoryDocument {
        MemoryDocument::new(Viewport::new(0.0, 1024.0, 768.0))
    }

    #[test]
    fn empty_page_initializes() {
        let app = PortfolioApp::new(bare(), AppConfig::default(), ms(0)).unwrap();
        assert_eq!(app.next_deadline(), None);
        assert!(!app.menu_open());
        assert_eq!(app.typewriter_text(), None);
    }

    #[test]
    fn invalid_config_is_reported() {
        let config = AppConfig::default().with_typing_texts(Vec::<String>::new());
        let err = PortfolioApp::new(bare(), config, ms(0)).unwrap_err();
        assert!(matches!(err, WebError::Config(_)));
    }

    #[test]
    fn typewriter_writes_first_grapheme_on_init() {
        let mut doc = bare();
        let body = doc.body();
        let target = doc.insert(body, "span", &[("class", "typing-text")]);
        let app = PortfolioApp::new(doc, AppConfig::default(), ms(0)).unwrap();
        assert_eq!(app.document().text(target), "C");
        assert_eq!(app.next_deadline(), Some(ms(100)));
    }

    #[test]
    fn reveal_elements_in_view_activate_on_init() {
        let mut doc = bare();
        let body = doc.body();
        let seen = doc.insert(body, "div", &[("class", "reveal")]);
        let unseen = doc.insert(body, "div", &[("class", "reveal")]);
        doc.set_layout(seen, Rect::new(0.0, 100.0, 500.0, 200.0));
        doc.set_layout(unseen, Rect::new(0.0, 2000.0, 500.0, 200.0));
        let app = PortfolioApp::new(doc, AppConfig::default(), ms(0)).unwrap();
        assert!(app.document().has_class(seen, "active"));
        assert!(!app.document().has_class(unseen, "active"));
    }

    #[test]
    fn destroy_cancels_timers_and_ignores_events() {
        let mut doc = bare();
        let body = doc.body();
        doc.insert(body, "span", &[("class", "typing-text")]);
        let mut app = PortfolioApp::new(doc, AppConfig::default(), ms(0)).unwrap();
        app.show_notification("bye", NotificationKind::Info, ms(0));
        app.destroy();
        assert!(app.is_destroyed());
        assert_eq!(app.next_deadline(), None);
        assert_eq!(
            app.handle_event(&HostEvent::Load, ms(10)),
            EventOutcome::IGNORED
        );
        assert!(!app.document().has_class(body, "loaded"));
    }
}
