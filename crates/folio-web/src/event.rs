#![forbid(unsafe_code)]

//! Host events and their JSON encoding.
//!
//! Every browser listener the page installs maps onto one [`HostEvent`]. The
//! JSON form (a `kind` tag plus the fields needed to act on it) is what
//! headless hosts and recorded traces use.

use serde::{Deserialize, Serialize};

use crate::dom::NodeId;

/// One event pushed by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HostEvent {
    /// The window scrolled. Position is read back from the document.
    Scroll,
    /// The window was resized to the given viewport size.
    Resize { width: f64, height: f64 },
    /// The `load` event: every resource finished loading.
    Load,
    /// An animation frame (`requestAnimationFrame`) fired.
    Frame,
    /// A click whose innermost target is `target`.
    Click { target: NodeId },
    /// A `keydown` on the document; `key` is the DOM `KeyboardEvent.key`.
    KeyDown { key: String },
    /// A form was submitted.
    Submit { target: NodeId },
}

impl HostEvent {
    /// Encode as a stable JSON string.
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode a JSON event. Errors if it does not match the schema.
    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Scroll => "scroll",
            Self::Resize { .. } => "resize",
            Self::Load => "load",
            Self::Frame => "frame",
            Self::Click { .. } => "click",
            Self::KeyDown { .. } => "key_down",
            Self::Submit { .. } => "submit",
        }
    }
}

/// What the host should do with the native event after handling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EventOutcome {
    /// Call `preventDefault()` on the native event.
    pub prevent_default: bool,
}

impl EventOutcome {
    pub const IGNORED: Self = Self {
        prevent_default: false,
    };
    pub const CONSUMED: Self = Self {
        prevent_default: true,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_tagged_events() {
        assert_eq!(HostEvent::from_json_str(r#"{"kind":"scroll"}"#).unwrap(), HostEvent::Scroll);
        assert_eq!(
            HostEvent::from_json_str(r#"{"kind":"click","target":7}"#).unwrap(),
            HostEvent::Click { target: NodeId(7) }
        );
        assert_eq!(
            HostEvent::from_json_str(r#"{"kind":"key_down","key":"Escape"}"#).unwrap(),
            HostEvent::KeyDown {
                key: "Escape".to_owned()
            }
        );
    }

    #[test]
    fn encodes_kind_tag() {
        let json = HostEvent::Resize {
            width: 390.0,
            height: 844.0,
        }
        .to_json_string()
        .unwrap();
        assert_eq!(json, r#"{"kind":"resize","width":390.0,"height":844.0}"#);
    }

    #[test]
    fn rejects_unknown_kind_and_missing_fields() {
        assert!(HostEvent::from_json_str(r#"{"kind":"wheel"}"#).is_err());
        assert!(HostEvent::from_json_str(r#"{"kind":"click"}"#).is_err());
    }

    #[test]
    fn kind_matches_json_tag() {
        let event = HostEvent::Submit { target: NodeId(3) };
        let json = event.to_json_string().unwrap();
        assert!(json.contains(&format!(r#""kind":"{}""#, event.kind())));
    }
}
