//! Event, batch, and query well-formedness checks (§4.1).
//!
//! Validation is total and runs before any transaction begins (fail early): no partial
//! writes ever occur as a result of a validation failure.
use std::collections::HashSet;

use crate::error::Error;
use crate::event::InputEvent;
use crate::query::Query;

const OP_APPEND: &str = "append";
const OP_QUERY: &str = "query";

/// Validates a single event: non-empty type, non-empty/unique tag keys, JSON-valid data.
pub fn validate_event(event: &InputEvent) -> Result<(), Error> {
    if event.event_type().is_empty() {
        return Err(Error::validation(OP_APPEND, "type"));
    }

    let mut seen_keys = HashSet::new();
    for tag in event.tags() {
        if tag.key().is_empty() {
            return Err(Error::validation(OP_APPEND, "tag.key"));
        }
        if tag.value().is_empty() {
            return Err(Error::validation(OP_APPEND, "tag.value"));
        }
        if !seen_keys.insert(tag.key()) {
            return Err(Error::validation(OP_APPEND, "tag.key"));
        }
    }

    if serde_json::from_slice::<serde_json::Value>(event.data()).is_err() {
        return Err(Error::validation(OP_APPEND, "data"));
    }

    Ok(())
}

/// Validates an entire append batch: non-empty, within `max_batch_size`, and every event
/// individually well-formed.
pub fn validate_batch(events: &[InputEvent], max_batch_size: usize) -> Result<(), Error> {
    if events.is_empty() {
        return Err(Error::validation(OP_APPEND, "events"));
    }
    if events.len() > max_batch_size {
        return Err(Error::validation_with_value(
            OP_APPEND,
            "events",
            format!("count:{}", events.len()),
        ));
    }
    for event in events {
        validate_event(event)?;
    }
    Ok(())
}

/// Validates a query: every item's event types and tag keys/values are non-empty.
///
/// An empty query (no items) is accepted here — it is the internal "match all"
/// representation (§3) — but rejected by the public read/project surfaces via
/// [`validate_non_empty_query`].
pub fn validate_query(query: &Query) -> Result<(), Error> {
    for item in query.items() {
        for event_type in item.event_types() {
            if event_type.is_empty() {
                return Err(Error::validation(OP_QUERY, "event_type"));
            }
        }
        for tag in item.required_tags() {
            if tag.key().is_empty() {
                return Err(Error::validation(OP_QUERY, "tag.key"));
            }
            if tag.value().is_empty() {
                return Err(Error::validation(OP_QUERY, "tag.value"));
            }
        }
    }
    Ok(())
}

/// Validates a query for use by `query`/`query_stream`/`project`, where an empty query is
/// rejected (§4.5).
pub fn validate_non_empty_query(query: &Query) -> Result<(), Error> {
    if query.is_empty() {
        return Err(Error::validation(OP_QUERY, "items"));
    }
    validate_query(query)
}
