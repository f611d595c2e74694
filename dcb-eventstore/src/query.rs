//! The tag/query model (§3): [`QueryItem`], [`Query`], and the event-match predicate.
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::tag::Tag;

/// `(event_types, required_tags)`. An event matches an item iff
/// `(event_types is empty OR event.type ∈ event_types) AND (event.tags ⊇ required_tags)`.
///
/// Constructed only through [`QueryItem::new`]; fields are private so a `QueryItem` can never
/// be assembled via a struct literal that skips validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryItem {
    event_types: BTreeSet<String>,
    required_tags: BTreeSet<Tag>,
}

impl QueryItem {
    /// Creates a new query item. Validation of non-empty event type strings and non-empty
    /// tag keys/values is deferred to [`crate::validation::validate_query`], matching the
    /// "validated at first use" contract for opaque value types (§3, §9).
    pub fn new(
        event_types: impl IntoIterator<Item = impl Into<String>>,
        required_tags: impl IntoIterator<Item = Tag>,
    ) -> Self {
        Self {
            event_types: event_types.into_iter().map(Into::into).collect(),
            required_tags: required_tags.into_iter().collect(),
        }
    }

    /// A query item that matches any event carrying the given tags, regardless of type.
    pub fn with_tags(required_tags: impl IntoIterator<Item = Tag>) -> Self {
        Self::new(Vec::<String>::new(), required_tags)
    }

    /// A query item that matches any event of the given types, regardless of tags.
    pub fn with_types(event_types: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self::new(event_types, Vec::new())
    }

    pub fn event_types(&self) -> &BTreeSet<String> {
        &self.event_types
    }

    pub fn required_tags(&self) -> &BTreeSet<Tag> {
        &self.required_tags
    }

    /// Returns true if `event_type`/`event_tags` satisfy this item's predicate.
    pub fn matches(&self, event_type: &str, event_tags: &[Tag]) -> bool {
        let type_matches = self.event_types.is_empty() || self.event_types.contains(event_type);
        if !type_matches {
            return false;
        }
        self.required_tags
            .iter()
            .all(|required| event_tags.contains(required))
    }
}

/// An ordered sequence of [`QueryItem`]s combined with logical OR.
///
/// An empty query (`items.is_empty()`) is the internal "match all" representation; it is
/// rejected by the public read/project/query-stream surfaces per §4.1, but permitted as an
/// intermediate value (e.g. as the starting accumulator for combining projector queries).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    items: Vec<QueryItem>,
}

impl Query {
    pub fn new(items: impl IntoIterator<Item = QueryItem>) -> Self {
        Self {
            items: items.into_iter().collect(),
        }
    }

    /// The query matching every event (no items).
    pub fn match_all() -> Self {
        Self { items: Vec::new() }
    }

    pub fn items(&self) -> &[QueryItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns true if any item in this query matches the given event.
    pub fn matches(&self, event_type: &str, event_tags: &[Tag]) -> bool {
        self.items.iter().any(|item| item.matches(event_type, event_tags))
    }

    /// Appends another query's items to this one (OR union), used to build the combined
    /// projection query of §4.6.1.
    pub fn union(mut self, other: &Query) -> Self {
        self.items.extend(other.items.iter().cloned());
        self
    }
}

impl FromIterator<QueryItem> for Query {
    fn from_iter<T: IntoIterator<Item = QueryItem>>(iter: T) -> Self {
        Query::new(iter)
    }
}
