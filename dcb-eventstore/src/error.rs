//! The error taxonomy shared by every backend implementation (§4.7).
//!
//! Every error carries the operation name it occurred in (`op`) and, where applicable, an
//! underlying cause. Specializations add the fields spec.md §4.7 calls for. Classification
//! helpers (`is_*`/`as_*`) let callers pattern-match on error *kind* without depending on
//! message text, mirroring `disintegrate_postgres::Error`'s `thiserror`-derived enum but with
//! the richer taxonomy the DCB core requires.
use std::fmt;

use thiserror::Error;

/// The kind of infrastructure resource that failed (§4.7 `ResourceError`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Database,
    Json,
    Lock,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Resource::Database => "database",
            Resource::Json => "json",
            Resource::Lock => "lock",
        };
        write!(f, "{s}")
    }
}

/// The unified error type returned by core operations and backend implementations.
#[derive(Debug, Error)]
pub enum Error {
    /// Input malformed; never retriable.
    #[error("{op}: validation failed for field {field}{value}")]
    Validation {
        op: &'static str,
        field: &'static str,
        value: Option<String>,
    },

    /// Append condition violated; caller should re-read state and retry with a fresh
    /// decision model.
    #[error("{op}: append condition violated")]
    Concurrency {
        op: &'static str,
        expected_cursor: Option<crate::Cursor>,
        actual_cursor: Option<crate::Cursor>,
    },

    /// Transient infrastructure or serialization failure; may be retriable.
    #[error("{op}: {resource} error: {source}")]
    Resource {
        op: &'static str,
        resource: Resource,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    /// Schema drift detected at startup; fatal, the store must not be constructed.
    #[error("{op}: table {table} has a structural issue: {issue}")]
    TableStructure {
        op: &'static str,
        table: String,
        column: Option<String>,
        expected_type: Option<String>,
        actual_type: Option<String>,
        issue: String,
    },

    /// Backpressure: too many concurrent projections in flight; retriable.
    #[error("{op}: too many concurrent projections ({current}/{max_concurrent})")]
    TooManyProjections {
        op: &'static str,
        max_concurrent: usize,
        current: usize,
    },
}

impl Error {
    /// Shorthand for a field-level validation failure without an associated value.
    pub fn validation(op: &'static str, field: &'static str) -> Self {
        Error::Validation {
            op,
            field,
            value: None,
        }
    }

    /// Shorthand for a field-level validation failure with an associated value, e.g.
    /// `Error::validation_with_value("append", "events", format!("count:{n}"))`.
    pub fn validation_with_value(op: &'static str, field: &'static str, value: String) -> Self {
        Error::Validation {
            op,
            field,
            value: Some(value),
        }
    }

    pub fn resource(
        op: &'static str,
        resource: Resource,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Error::Resource {
            op,
            resource,
            source: Box::new(source),
        }
    }

    pub fn concurrency(op: &'static str, after_cursor: Option<crate::Cursor>) -> Self {
        Error::Concurrency {
            op,
            expected_cursor: after_cursor,
            actual_cursor: None,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation { .. })
    }

    pub fn is_concurrency(&self) -> bool {
        matches!(self, Error::Concurrency { .. })
    }

    pub fn is_resource(&self) -> bool {
        matches!(self, Error::Resource { .. })
    }

    pub fn is_table_structure(&self) -> bool {
        matches!(self, Error::TableStructure { .. })
    }

    pub fn is_too_many_projections(&self) -> bool {
        matches!(self, Error::TooManyProjections { .. })
    }

    pub fn as_concurrency(&self) -> Option<(Option<crate::Cursor>, Option<crate::Cursor>)> {
        match self {
            Error::Concurrency {
                expected_cursor,
                actual_cursor,
                ..
            } => Some((*expected_cursor, *actual_cursor)),
            _ => None,
        }
    }

    /// The operation name this error occurred in.
    pub fn op(&self) -> &'static str {
        match self {
            Error::Validation { op, .. } => op,
            Error::Concurrency { op, .. } => op,
            Error::Resource { op, .. } => op,
            Error::TableStructure { op, .. } => op,
            Error::TooManyProjections { op, .. } => op,
        }
    }
}

/// The stable message prefix used to classify a concurrency violation when a structured
/// error code from the database is unavailable (§4.4, §9 — deliberately a *single* prefix,
/// not the small-integer-suffixed family of checks the original source carried).
pub const CONCURRENCY_MESSAGE_PREFIX: &str = "append condition violated:";

/// The distinguished database error code for a condition violation (§4.4, §6).
pub const CONCURRENCY_ERROR_CODE: &str = "DCB01";

/// Classifies a raw database error code/message pair as a concurrency violation.
///
/// Code-based classification is preferred; the message-prefix fallback only applies when no
/// structured code is available. This is the single fallback spec.md §9 asks for, replacing
/// the original source's multiple inconsistent fixed-substring variants.
pub fn is_concurrency_violation(code: Option<&str>, message: &str) -> bool {
    match code {
        Some(code) => code == CONCURRENCY_ERROR_CODE,
        None => message.starts_with(CONCURRENCY_MESSAGE_PREFIX),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_by_code_first() {
        assert!(is_concurrency_violation(Some("DCB01"), "anything"));
        assert!(!is_concurrency_violation(Some("23505"), "append condition violated: x"));
    }

    #[test]
    fn falls_back_to_message_prefix_without_code() {
        assert!(is_concurrency_violation(
            None,
            "append condition violated: 7 matching events found"
        ));
        assert!(!is_concurrency_violation(None, "some other failure"));
    }

    #[test]
    fn helpers_classify_variants() {
        let err = Error::validation("append", "events");
        assert!(err.is_validation());
        assert_eq!(err.op(), "append");

        let err = Error::concurrency("append", Some(crate::Cursor::new(1, 2)));
        assert!(err.is_concurrency());
        assert_eq!(
            err.as_concurrency(),
            Some((Some(crate::Cursor::new(1, 2)), None))
        );
    }
}
