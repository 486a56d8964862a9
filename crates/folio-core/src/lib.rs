#![forbid(unsafe_code)]

//! Core: host-driven UI-state controllers for a single page.
//!
//! Nothing in this crate touches a document or a clock. Hosts pass the
//! current monotonic time and the layout they read, and apply the returned
//! state. That keeps every controller deterministic and testable without a
//! browser.

pub mod geometry;
pub mod logging;
pub mod menu;
pub mod observer;
pub mod rate_limit;
pub mod scroll;
pub mod timer;
pub mod typewriter;

// Re-export tracing macros at crate root for ergonomic use.
#[cfg(feature = "tracing")]
pub use logging::{
    debug, debug_span, error, error_span, info, info_span, trace, trace_span, warn, warn_span,
};
