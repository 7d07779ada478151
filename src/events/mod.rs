//! Fleet lifecycle events as they arrive from the watch feed.
//!
//! # Flow
//!
//! ```text
//! LifecycleEvent { kind, payload }
//!     │
//!     ├── Envelope::from_event()   → headers["event_type"] = "fleet.events.<kind>"
//!     │
//!     └── unwrap_fleet(&payload)   → &Fleet   (Direct | Wrapped, Unknown fails)
//! ```

mod envelope;
mod payload;

pub use envelope::{Envelope, EventType, EVENT_TYPE_HEADER};
pub use payload::{unwrap_fleet, FleetMessage, Payload};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Header tag of an added fleet.
pub const ADDED_TAG: &str = "fleet.events.added";
/// Header tag of an updated fleet.
pub const UPDATED_TAG: &str = "fleet.events.updated";
/// Header tag of a deleted fleet.
pub const DELETED_TAG: &str = "fleet.events.deleted";

/// Kind of change observed on a fleet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    #[serde(rename = "added", alias = "fleet.events.added")]
    Added,
    #[serde(rename = "updated", alias = "fleet.events.updated")]
    Updated,
    #[serde(rename = "deleted", alias = "fleet.events.deleted")]
    Deleted,
}

impl EventKind {
    /// Canonical header tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Added => ADDED_TAG,
            Self::Updated => UPDATED_TAG,
            Self::Deleted => DELETED_TAG,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single notification from the watch feed. Consumed once, by the envelope adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub kind: EventKind,
    pub payload: Payload,
}

impl LifecycleEvent {
    pub fn new(kind: EventKind, payload: Payload) -> Self {
        Self { kind, payload }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fleet::Fleet;

    #[test]
    fn test_kind_tags() {
        assert_eq!(EventKind::Added.to_string(), "fleet.events.added");
        assert_eq!(EventKind::Updated.as_str(), "fleet.events.updated");
        assert_eq!(EventKind::Deleted.as_str(), "fleet.events.deleted");
    }

    #[test]
    fn test_kind_accepts_short_and_canonical_names() {
        let short: EventKind = serde_json::from_str(r#""updated""#).unwrap();
        let canonical: EventKind = serde_json::from_str(r#""fleet.events.updated""#).unwrap();
        assert_eq!(short, EventKind::Updated);
        assert_eq!(canonical, EventKind::Updated);
        assert!(serde_json::from_str::<EventKind>(r#""restarted""#).is_err());
    }

    #[test]
    fn test_event_from_json() {
        let fleet = Fleet::new("fleet-x", "gameserver:latest");
        let line = serde_json::json!({
            "kind": "added",
            "payload": fleet,
        });

        let event: LifecycleEvent = serde_json::from_value(line).unwrap();
        assert_eq!(event.kind, EventKind::Added);
        assert!(matches!(event.payload, Payload::Direct(ref f) if f.name() == "fleet-x"));
    }
}
