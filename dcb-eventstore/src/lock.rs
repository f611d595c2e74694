//! Advisory lock key extraction (§4.3.3).
//!
//! When any event in a batch carries a `lock:`-prefixed tag, the append engine routes
//! through `append_events_with_advisory_locks` instead of the unconditional/conditional
//! paths. This module extracts the deduplicated, lexicographically sorted lock keys that
//! procedure acquires transaction-scoped advisory locks for, guaranteeing a total lock order
//! across concurrent appends touching overlapping aggregates.
use std::collections::BTreeSet;

use crate::event::InputEvent;

/// True if any event in the batch carries a `lock:` tag.
pub fn batch_has_lock_tags(events: &[InputEvent]) -> bool {
    events.iter().any(InputEvent::has_lock_directive)
}

/// Extracts the deduplicated, lexicographically sorted set of lock keys across the batch.
///
/// Sorting is what prevents deadlocks between concurrent appends: every transaction that
/// needs more than one lock key acquires them in the same global order.
pub fn extract_lock_keys(events: &[InputEvent]) -> Vec<String> {
    let mut keys: BTreeSet<String> = BTreeSet::new();
    for event in events {
        for tag in event.tags() {
            if let Some(key) = tag.lock_key() {
                keys.insert(key.to_string());
            }
        }
    }
    keys.into_iter().collect()
}
