#![forbid(unsafe_code)]

//! Transient notification toasts.
//!
//! A toast is created off-screen (`translateX(100%)`), slides in shortly
//! after, stays up for a while, slides out and is removed once the exit
//! transition is done. Each step is a timer on a [`TimerQueue`].

use core::fmt;
use core::str::FromStr;
use core::time::Duration;

use folio_core::timer::TimerQueue;
use serde::{Deserialize, Serialize};

use crate::dom::{Document, NodeId};

const TOAST_STYLE: [(&str, &str); 12] = [
    ("position", "fixed"),
    ("top", "20px"),
    ("right", "20px"),
    ("background", "var(--bg-card)"),
    ("color", "var(--text-primary)"),
    ("padding", "1rem 1.5rem"),
    ("border-radius", "8px"),
    ("border", "1px solid var(--border-primary)"),
    ("box-shadow", "0 10px 30px rgba(0, 0, 0, 0.3)"),
    ("z-index", "10000"),
    ("transform", HIDDEN),
    ("transition", "transform 0.3s ease"),
];

const HIDDEN: &str = "translateX(100%)";
const SHOWN: &str = "translateX(0)";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    #[default]
    Info,
    Success,
    Warning,
    Error,
}

impl NotificationKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognized notification kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownKind(pub String);

impl fmt::Display for UnknownKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown notification kind {:?}", self.0)
    }
}

impl std::error::Error for UnknownKind {}

impl FromStr for NotificationKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" => Ok(Self::Info),
            "success" => Ok(Self::Success),
            "warning" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            other => Err(UnknownKind(other.to_owned())),
        }
    }
}

/// Toast lifecycle timings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationTimings {
    /// Delay between insertion and the slide-in.
    pub enter_delay: Duration,
    /// Time from insertion to the slide-out.
    pub visible_for: Duration,
    /// Slide-out transition length; the node is removed after it.
    pub exit_duration: Duration,
}

impl Default for NotificationTimings {
    fn default() -> Self {
        Self {
            enter_delay: Duration::from_millis(100),
            visible_for: Duration::from_millis(5000),
            exit_duration: Duration::from_millis(300),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    SlideIn,
    SlideOut,
    Remove,
}

/// Owns every live toast and its pending lifecycle timers.
#[derive(Debug, Clone, Default)]
pub struct NotificationCenter {
    timings: NotificationTimings,
    timers: TimerQueue<(NodeId, Stage)>,
    live: Vec<NodeId>,
}

impl NotificationCenter {
    #[must_use]
    pub fn new(timings: NotificationTimings) -> Self {
        Self {
            timings,
            timers: TimerQueue::new(),
            live: Vec::new(),
        }
    }

    /// Insert a toast into `<body>` and schedule its lifecycle.
    pub fn show<D: Document + ?Sized>(
        &mut self,
        doc: &mut D,
        message: &str,
        kind: NotificationKind,
        now: Duration,
    ) -> Option<NodeId> {
        let class = format!("notification notification-{kind}");
        let toast = doc.create_element("div", &class)?;
        doc.set_text(toast, message);
        for (prop, value) in TOAST_STYLE {
            doc.set_style(toast, prop, value);
        }
        let body = doc.body();
        doc.append_child(body, toast);

        self.timers
            .schedule_after(now, self.timings.enter_delay, (toast, Stage::SlideIn));
        self.timers
            .schedule_after(now, self.timings.visible_for, (toast, Stage::SlideOut));
        self.live.push(toast);
        tracing::debug!(%kind, node = toast.0, "notification shown");
        Some(toast)
    }

    /// Run every lifecycle step due at `now`.
    pub fn advance_to<D: Document + ?Sized>(&mut self, doc: &mut D, now: Duration) {
        while let Some(deadline) = self.timers.next_deadline().filter(|d| *d <= now) {
            let Some((_, (toast, stage))) = self.timers.pop_due(now) else {
                break;
            };
            match stage {
                Stage::SlideIn => doc.set_style(toast, "transform", SHOWN),
                Stage::SlideOut => {
                    doc.set_style(toast, "transform", HIDDEN);
                    self.timers.schedule_after(
                        deadline,
                        self.timings.exit_duration,
                        (toast, Stage::Remove),
                    );
                }
                Stage::Remove => {
                    doc.remove(toast);
                    self.live.retain(|&n| n != toast);
                }
            }
        }
    }

    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.next_deadline()
    }

    /// Toasts still in the document.
    #[must_use]
    pub fn live(&self) -> &[NodeId] {
        &self.live
    }

    /// Remove every toast immediately and drop their timers.
    pub fn clear<D: Document + ?Sized>(&mut self, doc: &mut D) {
        self.timers.clear();
        for toast in self.live.drain(..) {
            doc.remove(toast);
        }
    }
}
