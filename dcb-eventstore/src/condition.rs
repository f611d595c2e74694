//! The append condition: "fail if any event matches Q after cursor C" (§3, §4.4).
use serde::{Deserialize, Serialize};

use crate::cursor::Cursor;
use crate::query::Query;

/// `(fail_if_events_match, after_cursor)`.
///
/// Semantics: append fails with a concurrency error if there exists at least one event `E`
/// such that `E` matches `fail_if_events_match` AND (`after_cursor` is absent OR `E >
/// after_cursor`). Either field may be absent; if both are absent the condition is
/// trivially satisfied and the append always succeeds on that basis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppendCondition {
    fail_if_events_match: Option<Query>,
    after_cursor: Option<Cursor>,
}

impl AppendCondition {
    pub fn new(fail_if_events_match: Option<Query>, after_cursor: Option<Cursor>) -> Self {
        Self {
            fail_if_events_match,
            after_cursor,
        }
    }

    /// A condition that fails if any event matching `query` exists at all (no cursor bound).
    pub fn none_match(query: Query) -> Self {
        Self::new(Some(query), None)
    }

    /// A condition that fails if any event matching `query` has appeared strictly after
    /// `cursor` — the shape produced by projection (§4.6.2).
    pub fn none_match_since(query: Query, cursor: Cursor) -> Self {
        Self::new(Some(query), Some(cursor))
    }

    pub fn fail_if_events_match(&self) -> Option<&Query> {
        self.fail_if_events_match.as_ref()
    }

    pub fn after_cursor(&self) -> Option<Cursor> {
        self.after_cursor
    }

    /// True if this condition can never be violated (no query to check against).
    pub fn is_trivial(&self) -> bool {
        self.fail_if_events_match.is_none()
    }

    /// Evaluates the condition against a (type, tags, cursor) triple, as the server-side
    /// condition checker does inside the append transaction (§4.4). Exposed here so the
    /// same predicate can be unit-tested and reused by an in-memory fake store.
    pub fn violated_by(&self, event_type: &str, event_tags: &[crate::Tag], cursor: Cursor) -> bool {
        let Some(query) = &self.fail_if_events_match else {
            return false;
        };
        let after = self.after_cursor.map(|c| cursor > c).unwrap_or(true);
        after && query.matches(event_type, event_tags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::QueryItem;
    use crate::Tag;

    #[test]
    fn trivial_condition_is_never_violated() {
        let condition = AppendCondition::new(None, None);
        assert!(condition.is_trivial());
        assert!(!condition.violated_by("Anything", &[], Cursor::new(1, 1)));
    }

    #[test]
    fn violated_when_matching_event_is_after_cursor() {
        let query = Query::new([QueryItem::new(["UserCreated"], Vec::new())]);
        let condition = AppendCondition::none_match_since(query, Cursor::new(1, 5));
        assert!(condition.violated_by("UserCreated", &[], Cursor::new(1, 6)));
        assert!(!condition.violated_by("UserCreated", &[], Cursor::new(1, 5)));
        assert!(!condition.violated_by("UserCreated", &[], Cursor::new(1, 4)));
    }

    #[test]
    fn violated_ignores_non_matching_type() {
        let query = Query::new([QueryItem::new(["UserCreated"], Vec::new())]);
        let condition = AppendCondition::none_match_since(query, Cursor::new(1, 5));
        assert!(!condition.violated_by("OtherType", &[], Cursor::new(2, 1)));
    }

    #[test]
    fn none_match_has_no_cursor_bound() {
        let query = Query::new([QueryItem::with_tags([Tag::new("k", "v").unwrap()])]);
        let condition = AppendCondition::none_match(query);
        assert!(condition.violated_by("Any", &[Tag::new("k", "v").unwrap()], Cursor::origin()));
    }
}
