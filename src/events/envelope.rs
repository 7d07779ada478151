//! Envelope adapter: normalizes a lifecycle event into headers plus message.

use std::collections::HashMap;

use super::{EventKind, LifecycleEvent, Payload, ADDED_TAG, DELETED_TAG, UPDATED_TAG};

/// Header carrying the canonical event tag.
pub const EVENT_TYPE_HEADER: &str = "event_type";

/// Normalized carrier for one lifecycle notification.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub headers: HashMap<String, String>,
    pub message: Payload,
}

impl Envelope {
    pub fn new(message: Payload) -> Self {
        Self {
            headers: HashMap::new(),
            message,
        }
    }

    /// Wrap `event`, tagging it with its canonical `event_type`.
    pub fn from_event(event: LifecycleEvent) -> Self {
        let mut envelope = Self::new(event.payload);
        envelope.add_header(EVENT_TYPE_HEADER, event.kind.as_str());
        envelope
    }

    pub fn add_header(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(key.into(), value.into());
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).map(String::as_str)
    }

    /// Parsed `event_type` header. A missing header is unhandled, not an error.
    pub fn event_type(&self) -> EventType {
        EventType::from_tag(self.header(EVENT_TYPE_HEADER).unwrap_or_default())
    }
}

/// Event type as read back from the envelope headers.
///
/// Tags produced by newer feeds land in [`EventType::Unhandled`] and are
/// skipped without error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventType {
    Added,
    Updated,
    Deleted,
    Unhandled(String),
}

impl EventType {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            ADDED_TAG => Self::Added,
            UPDATED_TAG => Self::Updated,
            DELETED_TAG => Self::Deleted,
            other => Self::Unhandled(other.to_owned()),
        }
    }
}

impl From<EventKind> for EventType {
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::Added => Self::Added,
            EventKind::Updated => Self::Updated,
            EventKind::Deleted => Self::Deleted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fleet::Fleet;

    #[test]
    fn test_from_event_sets_event_type() {
        for kind in [EventKind::Added, EventKind::Updated, EventKind::Deleted] {
            let event = LifecycleEvent::new(
                kind,
                Payload::Direct(Box::new(Fleet::new("fleet-x", "gameserver:latest"))),
            );
            let envelope = Envelope::from_event(event);

            assert_eq!(envelope.header(EVENT_TYPE_HEADER), Some(kind.as_str()));
            assert_eq!(envelope.event_type(), EventType::from(kind));
        }
    }

    #[test]
    fn test_unknown_and_missing_tags_are_unhandled() {
        let mut envelope = Envelope::new(Payload::Unknown(serde_json::Value::Null));
        assert_eq!(envelope.event_type(), EventType::Unhandled(String::new()));

        envelope.add_header(EVENT_TYPE_HEADER, "fleet.events.scaled");
        assert_eq!(
            envelope.event_type(),
            EventType::Unhandled("fleet.events.scaled".to_owned())
        );
    }

    #[test]
    fn test_from_tag_literals() {
        assert_eq!(EventType::from_tag("fleet.events.added"), EventType::Added);
        assert_eq!(EventType::from_tag("fleet.events.updated"), EventType::Updated);
        assert_eq!(EventType::from_tag("fleet.events.deleted"), EventType::Deleted);
        // Only canonical tags are recognised in headers.
        assert_eq!(
            EventType::from_tag("deleted"),
            EventType::Unhandled("deleted".to_owned())
        );
    }
}
