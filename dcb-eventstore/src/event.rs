//! Events: the pre-persistence [`InputEvent`] and the persisted [`Event`] (§3).
use serde::{Deserialize, Serialize};

use crate::cursor::Cursor;
use crate::tag::Tag;

/// The pre-persistence form of an event: type, tags, data — no position or timestamps.
///
/// `InputEvent` is opaque to callers: constructed via [`InputEvent::new`], validated at
/// first use (by [`crate::validation::validate_event`]) rather than at construction, so that
/// callers may assemble large batches out-of-band before validating/appending them in one
/// shot (§3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputEvent {
    event_type: String,
    tags: Vec<Tag>,
    data: Vec<u8>,
}

impl InputEvent {
    pub fn new(event_type: impl Into<String>, tags: Vec<Tag>, data: Vec<u8>) -> Self {
        Self {
            event_type: event_type.into(),
            tags,
            data,
        }
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Tags with the `lock:` prefix stripped and the directive tags themselves removed,
    /// i.e. the tags as they will actually be persisted (§4.3.3, §9).
    pub fn storage_tags(&self) -> Vec<Tag> {
        self.tags
            .iter()
            .filter(|tag| !tag.is_lock_directive())
            .cloned()
            .collect()
    }

    /// True if any tag on this event carries the `lock:` directive prefix.
    pub fn has_lock_directive(&self) -> bool {
        self.tags.iter().any(Tag::is_lock_directive)
    }
}

/// A persisted, immutable event as returned by the read and projection surfaces.
///
/// `transaction_id` and `position` together form this event's [`Cursor`]. An event is never
/// mutated or deleted by core operations (§3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    event_type: String,
    tags: Vec<Tag>,
    data: Vec<u8>,
    transaction_id: u64,
    position: i64,
    occurred_at: chrono::DateTime<chrono::Utc>,
}

impl Event {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        event_type: impl Into<String>,
        tags: Vec<Tag>,
        data: Vec<u8>,
        transaction_id: u64,
        position: i64,
        occurred_at: chrono::DateTime<chrono::Utc>,
    ) -> Self {
        Self {
            event_type: event_type.into(),
            tags,
            data,
            transaction_id,
            position,
            occurred_at,
        }
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn transaction_id(&self) -> u64 {
        self.transaction_id
    }

    pub fn position(&self) -> i64 {
        self.position
    }

    pub fn occurred_at(&self) -> chrono::DateTime<chrono::Utc> {
        self.occurred_at
    }

    /// This event's cursor, i.e. its `(transaction_id, position)`.
    pub fn cursor(&self) -> Cursor {
        Cursor::new(self.transaction_id, self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_tags_strips_lock_directives() {
        let event = InputEvent::new(
            "OrderPlaced",
            vec![
                Tag::new("order_id", "42").unwrap(),
                Tag::new("lock:order", "42").unwrap(),
            ],
            b"{}".to_vec(),
        );
        assert!(event.has_lock_directive());
        let storage = event.storage_tags();
        assert_eq!(storage.len(), 1);
        assert_eq!(storage[0].key(), "order_id");
    }

    #[test]
    fn event_cursor_combines_transaction_and_position() {
        let event = Event::new(
            "X",
            Vec::new(),
            Vec::new(),
            7,
            3,
            chrono::Utc::now(),
        );
        assert_eq!(event.cursor(), Cursor::new(7, 3));
    }
}
