#![forbid(unsafe_code)]

//! `folio-web` binds the `folio-core` controllers to a page.
//!
//! Design goals:
//! - **Host-driven I/O**: the embedding environment pushes [`HostEvent`]s and
//!   timer callbacks; nothing here registers listeners or timers itself.
//! - **Deterministic time**: every entry point takes the current monotonic
//!   time, so a recorded session replays identically.
//! - **No blocking / no threads**: suitable for `wasm32-unknown-unknown`.
//!
//! The document is reached through the [`Document`] trait. Tests and
//! headless hosts use [`MemoryDocument`]; the wasm build wraps `web-sys` and
//! exposes [`FolioWeb`] to JavaScript.

pub mod app;
pub mod config;
pub mod dom;
pub mod event;
pub mod memory;
pub mod notify;
pub mod particles;
pub mod selector;
pub mod utils;

#[cfg(target_arch = "wasm32")]
mod wasm;

pub use app::PortfolioApp;
pub use config::{AppConfig, ConfigError};
pub use dom::{Document, HostCapabilities, NodeId};
pub use event::{EventOutcome, HostEvent};
pub use memory::MemoryDocument;
pub use notify::NotificationKind;

#[cfg(target_arch = "wasm32")]
pub use wasm::FolioWeb;

use folio_core::typewriter::TypewriterError;

/// Errors raised while setting up the page.
#[derive(Debug)]
pub enum WebError {
    Config(ConfigError),
    Typewriter(TypewriterError),
    /// A host API the page cannot run without is missing.
    Unsupported(&'static str),
}

impl core::fmt::Display for WebError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::Typewriter(err) => write!(f, "typewriter: {err}"),
            Self::Unsupported(what) => write!(f, "unsupported: {what}"),
        }
    }
}

impl std::error::Error for WebError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Typewriter(err) => Some(err),
            Self::Unsupported(_) => None,
        }
    }
}

impl From<ConfigError> for WebError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

impl From<TypewriterError> for WebError {
    fn from(err: TypewriterError) -> Self {
        Self::Typewriter(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_chain_sources() {
        use std::error::Error as _;
        let err = WebError::from(TypewriterError::EmptyTextList);
        assert!(err.source().is_some());
        assert!(err.to_string().starts_with("typewriter: "));
        assert!(WebError::Unsupported("window").source().is_none());
    }
}
