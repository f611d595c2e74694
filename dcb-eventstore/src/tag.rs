//! Tags are the opaque key:value pairs used to index events for tag-containment queries.
//!
//! A `Tag` is constructed through [`Tag::new`], which validates that both the key and the
//! value are non-empty. There is no public struct-literal path: the fields are private so
//! that every `Tag` in existence has passed validation at construction time.
use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

/// The reserved prefix that marks a tag as an advisory-lock directive (see §4.3.3).
///
/// A tag whose key starts with this prefix is never persisted on the event; it is
/// stripped at write time and contributes only to lock-key derivation.
pub const LOCK_TAG_PREFIX: &str = "lock:";

/// A `(key, value)` pair attached to an event for indexing and query matching.
///
/// Both `key` and `value` are guaranteed non-empty by construction.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Tag {
    key: String,
    value: String,
}

/// Error returned when attempting to construct an invalid [`Tag`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TagError {
    #[error("tag key must not be empty")]
    EmptyKey,
    #[error("tag value must not be empty")]
    EmptyValue,
}

impl Tag {
    /// Creates a new tag, validating that the key and value are non-empty.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Result<Self, TagError> {
        let key = key.into();
        let value = value.into();
        if key.is_empty() {
            return Err(TagError::EmptyKey);
        }
        if value.is_empty() {
            return Err(TagError::EmptyValue);
        }
        Ok(Self { key, value })
    }

    /// The tag's key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The tag's value.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// True if this tag's key carries the `lock:` directive prefix (§4.3.3).
    pub fn is_lock_directive(&self) -> bool {
        self.key.starts_with(LOCK_TAG_PREFIX)
    }

    /// The lock key this tag contributes, if it is a lock directive.
    ///
    /// This is the tag's `value`, not its key: `lock:order:42` encodes as a tag whose key is
    /// `lock:order` and whose value is the aggregate identifier the directive locks on, e.g.
    /// `42`. See [`crate::lock`] for the full extraction algorithm operating over a batch.
    pub fn lock_key(&self) -> Option<&str> {
        self.is_lock_directive().then_some(self.value.as_str())
    }

    /// The storage form of this tag: the same tag, with the `lock:` prefix stripped from the
    /// key if present. Lock directive tags are write-time-only and are never persisted as-is.
    pub fn storage_key(&self) -> &str {
        self.key
            .strip_prefix(LOCK_TAG_PREFIX)
            .unwrap_or(&self.key)
    }

    /// Encodes the tag in its canonical wire form `"key:value"`.
    ///
    /// Keys must not embed colons; values may, since only the first colon is split on
    /// decoding. The caller is responsible for respecting this constraint (§6).
    pub fn encode(&self) -> String {
        format!("{}:{}", self.storage_key(), self.value)
    }
}

impl Display for Tag {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.key, self.value)
    }
}

/// Encodes a set of tags into their canonical sorted wire form, as required by §4.2 for
/// containment-operator canonicality.
pub fn encode_sorted(tags: &[Tag]) -> Vec<String> {
    let mut encoded: Vec<String> = tags.iter().map(Tag::encode).collect();
    encoded.sort();
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_key_or_value() {
        assert_eq!(Tag::new("", "v").unwrap_err(), TagError::EmptyKey);
        assert_eq!(Tag::new("k", "").unwrap_err(), TagError::EmptyValue);
    }

    #[test]
    fn encodes_as_key_colon_value() {
        let tag = Tag::new("user_id", "123").unwrap();
        assert_eq!(tag.encode(), "user_id:123");
        assert_eq!(tag.to_string(), "user_id:123");
    }

    #[test]
    fn lock_directive_strips_prefix_for_storage_and_exposes_lock_key() {
        let tag = Tag::new("lock:order", "42").unwrap();
        assert!(tag.is_lock_directive());
        assert_eq!(tag.lock_key(), Some("42"));
        assert_eq!(tag.storage_key(), "order");
        assert_eq!(tag.encode(), "order:42");
    }

    #[test]
    fn plain_tag_is_not_a_lock_directive() {
        let tag = Tag::new("user_id", "123").unwrap();
        assert!(!tag.is_lock_directive());
        assert_eq!(tag.lock_key(), None);
    }

    #[test]
    fn encode_sorted_produces_canonical_order() {
        let tags = vec![
            Tag::new("b", "2").unwrap(),
            Tag::new("a", "1").unwrap(),
        ];
        assert_eq!(encode_sorted(&tags), vec!["a:1".to_string(), "b:2".to_string()]);
    }
}
