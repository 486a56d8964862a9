#![forbid(unsafe_code)]

//! Mobile menu state.
//!
//! A single `open` boolean drives every visible piece of the menu. Each
//! transition returns a [`MenuSync`] that the host applies in full, so the
//! panel, trigger, overlay, `aria-expanded` and body scroll lock can never
//! disagree with the boolean.
//!
//! Every way of closing (panel link, overlay, Escape) goes through
//! [`MenuController::toggle`].

use core::time::Duration;

use bitflags::bitflags;

use crate::timer::ScheduledTask;

bitflags! {
    /// Derived presentation flags for the menu.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MenuFlags: u8 {
        /// Panel carries the `active` class.
        const PANEL_ACTIVE   = 0b0001;
        /// Trigger button carries the `active` class.
        const TRIGGER_ACTIVE = 0b0010;
        /// Overlay carries the `active` class.
        const OVERLAY_ACTIVE = 0b0100;
        /// Document scrolling is disabled.
        const SCROLL_LOCK    = 0b1000;
    }
}

impl MenuFlags {
    /// Flags implied by the open state.
    #[must_use]
    pub const fn for_state(open: bool) -> Self {
        if open { Self::all() } else { Self::empty() }
    }
}

/// What should receive keyboard focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusTarget {
    /// First interactive element inside the panel.
    FirstPanelLink,
    /// The menu trigger button.
    Trigger,
}

/// Everything the host must apply after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuSync {
    pub open: bool,
    pub flags: MenuFlags,
    /// Focus to move right away. Deferred focus comes from
    /// [`MenuController::tick_at`].
    pub focus_now: Option<FocusTarget>,
}

impl MenuSync {
    /// `aria-expanded` attribute value.
    #[must_use]
    pub const fn aria_expanded(&self) -> &'static str {
        if self.open { "true" } else { "false" }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuConfig {
    /// Delay before focusing the first panel link, so the open transition
    /// has started.
    pub focus_delay: Duration,
}

impl Default for MenuConfig {
    fn default() -> Self {
        Self {
            focus_delay: Duration::from_millis(100),
        }
    }
}

/// Open/closed state machine for the mobile menu.
#[derive(Debug, Clone)]
pub struct MenuController {
    config: MenuConfig,
    open: bool,
    has_panel_link: bool,
    pending_focus: ScheduledTask,
}

impl MenuController {
    /// Create a closed menu. `has_panel_link` says whether the panel holds a
    /// focusable link.
    #[must_use]
    pub const fn new(config: MenuConfig, has_panel_link: bool) -> Self {
        Self {
            config,
            open: false,
            has_panel_link,
            pending_focus: ScheduledTask::new(),
        }
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.open
    }

    #[must_use]
    pub const fn flags(&self) -> MenuFlags {
        MenuFlags::for_state(self.open)
    }

    /// Initial synchronisation (closed, no focus change).
    #[must_use]
    pub const fn initial_sync(&self) -> MenuSync {
        MenuSync {
            open: self.open,
            flags: MenuFlags::for_state(self.open),
            focus_now: None,
        }
    }

    /// Set the open state.
    ///
    /// Opening schedules focus of the first panel link after the configured
    /// delay. Closing focuses the trigger at once and cancels any deferred
    /// focus still pending.
    pub fn toggle(&mut self, open: bool, now: Duration) -> MenuSync {
        self.open = open;
        let focus_now = if open {
            if self.has_panel_link {
                self.pending_focus
                    .schedule_at(now.saturating_add(self.config.focus_delay));
            }
            None
        } else {
            self.pending_focus.cancel();
            Some(FocusTarget::Trigger)
        };
        crate::debug!(open, "menu toggled");
        MenuSync {
            open,
            flags: MenuFlags::for_state(open),
            focus_now,
        }
    }

    /// Trigger button click flips the state.
    pub fn on_trigger_click(&mut self, now: Duration) -> MenuSync {
        self.toggle(!self.open, now)
    }

    /// A link inside the panel was followed.
    pub fn on_panel_link_click(&mut self, now: Duration) -> MenuSync {
        self.toggle(false, now)
    }

    pub fn on_overlay_click(&mut self, now: Duration) -> MenuSync {
        self.toggle(false, now)
    }

    /// Key press anywhere in the document. Only Escape while open reacts.
    pub fn on_key(&mut self, key: &str, now: Duration) -> Option<MenuSync> {
        (key == "Escape" && self.open).then(|| self.toggle(false, now))
    }

    /// Deferred focus due at `now`.
    pub fn tick_at(&mut self, now: Duration) -> Option<FocusTarget> {
        self.pending_focus
            .take_due(now)
            .map(|_| FocusTarget::FirstPanelLink)
    }

    #[must_use]
    pub const fn next_deadline(&self) -> Option<Duration> {
        self.pending_focus.deadline()
    }

    /// Drop pending work without changing state.
    pub fn cancel_pending(&mut self) {
        self.pending_focus.cancel();
    }
}
