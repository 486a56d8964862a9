#![forbid(unsafe_code)]

//! Application options.
//!
//! [`AppConfig`] is the single options object a host hands to
//! [`PortfolioApp`](crate::app::PortfolioApp). It is plain data with
//! defaults taken from the page, and can be read from JSON (durations in
//! milliseconds, unknown keys rejected, missing keys defaulted).

use core::fmt;
use core::time::Duration;

use folio_core::geometry::Sides;
use folio_core::menu::MenuConfig;
use folio_core::observer::ObserverConfig;
use folio_core::scroll::ScrollConfig;
use folio_core::typewriter::TypewriterConfig;
use serde::{Deserialize, Serialize};

use crate::notify::NotificationTimings;

/// Phrases cycled by the hero typewriter.
pub const DEFAULT_TYPING_TEXTS: [&str; 5] = [
    "Cloud Technologies",
    "Intelligent Web Applications",
    "AI/ML Fundamentals",
    "Clean UI And Intuitive UX",
    "Real-World Problem Solving",
];

#[derive(Debug)]
pub enum ConfigError {
    Json(serde_json::Error),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(err) => write!(f, "malformed options: {err}"),
            Self::Invalid(msg) => write!(f, "invalid options: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Json(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub typing_texts: Vec<String>,
    pub type_interval_ms: u64,
    pub delete_interval_ms: u64,
    pub pause_at_full_ms: u64,

    pub scroll_throttle_ms: u64,
    pub resize_debounce_ms: u64,
    pub navbar_threshold: f64,
    pub reveal_offset: f64,
    pub section_offset: f64,
    pub anchor_offset: f64,
    pub smooth_scroll_ms: u64,

    pub reveal_threshold: f64,
    /// Bottom `rootMargin` of the reveal observer; negative shrinks.
    pub reveal_margin_bottom: f64,

    pub menu_focus_delay_ms: u64,

    pub particle_count: usize,
    pub particle_seed: u64,

    pub notification_enter_ms: u64,
    pub notification_visible_ms: u64,
    pub notification_exit_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            typing_texts: DEFAULT_TYPING_TEXTS.iter().map(|s| (*s).to_owned()).collect(),
            type_interval_ms: 100,
            delete_interval_ms: 50,
            pause_at_full_ms: 2000,
            scroll_throttle_ms: 16,
            resize_debounce_ms: 250,
            navbar_threshold: 100.0,
            reveal_offset: 150.0,
            section_offset: 100.0,
            anchor_offset: 80.0,
            smooth_scroll_ms: 800,
            reveal_threshold: 0.1,
            reveal_margin_bottom: -50.0,
            menu_focus_delay_ms: 100,
            particle_count: 50,
            particle_seed: 0x9E37_79B9_7F4A_7C15,
            notification_enter_ms: 100,
            notification_visible_ms: 5000,
            notification_exit_ms: 300,
        }
    }
}

impl AppConfig {
    /// Parse and validate JSON options.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.typing_texts.is_empty() {
            return Err(ConfigError::Invalid("typing_texts must not be empty".into()));
        }
        if self.typing_texts.iter().any(String::is_empty) {
            return Err(ConfigError::Invalid(
                "typing_texts must not contain empty strings".into(),
            ));
        }
        if self.type_interval_ms == 0 || self.delete_interval_ms == 0 {
            return Err(ConfigError::Invalid("typing intervals must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.reveal_threshold) {
            return Err(ConfigError::Invalid(format!(
                "reveal_threshold {} outside [0, 1]",
                self.reveal_threshold
            )));
        }
        let finite = [
            self.navbar_threshold,
            self.reveal_offset,
            self.section_offset,
            self.anchor_offset,
            self.reveal_margin_bottom,
        ];
        if finite.iter().any(|v| !v.is_finite()) {
            return Err(ConfigError::Invalid("pixel offsets must be finite".into()));
        }
        Ok(())
    }

    #[must_use]
    pub fn with_typing_texts<I, S>(mut self, texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.typing_texts = texts.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_particles(mut self, count: usize, seed: u64) -> Self {
        self.particle_count = count;
        self.particle_seed = seed;
        self
    }

    #[must_use]
    pub fn with_reveal_threshold(mut self, threshold: f64) -> Self {
        self.reveal_threshold = threshold;
        self
    }

    #[must_use]
    pub fn typewriter_config(&self) -> TypewriterConfig {
        TypewriterConfig {
            type_interval: Duration::from_millis(self.type_interval_ms),
            delete_interval: Duration::from_millis(self.delete_interval_ms),
            pause_at_full: Duration::from_millis(self.pause_at_full_ms),
        }
    }

    #[must_use]
    pub fn scroll_config(&self) -> ScrollConfig {
        ScrollConfig {
            throttle_interval: Duration::from_millis(self.scroll_throttle_ms),
            navbar_threshold: self.navbar_threshold,
            reveal_offset: self.reveal_offset,
            section_offset: self.section_offset,
            anchor_offset: self.anchor_offset,
            smooth_scroll_duration: Duration::from_millis(self.smooth_scroll_ms),
        }
    }

    #[must_use]
    pub fn reveal_observer_config(&self) -> ObserverConfig {
        ObserverConfig::reveal()
            .with_threshold(self.reveal_threshold)
            .with_root_margin(Sides::bottom_only(self.reveal_margin_bottom))
    }

    #[must_use]
    pub fn menu_config(&self) -> MenuConfig {
        MenuConfig {
            focus_delay: Duration::from_millis(self.menu_focus_delay_ms),
        }
    }

    #[must_use]
    pub fn resize_debounce(&self) -> Duration {
        Duration::from_millis(self.resize_debounce_ms)
    }

    #[must_use]
    pub fn notification_timings(&self) -> NotificationTimings {
        NotificationTimings {
            enter_delay: Duration::from_millis(self.notification_enter_ms),
            visible_for: Duration::from_millis(self.notification_visible_ms),
            exit_duration: Duration::from_millis(self.notification_exit_ms),
        }
    }
}
