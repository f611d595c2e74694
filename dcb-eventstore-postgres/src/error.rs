//! Maps `sqlx`/Postgres failures onto the shared [`dcb_eventstore::Error`] taxonomy.
use std::fmt;

use dcb_eventstore::{is_concurrency_violation, Error, Resource};

/// Maps a raw `sqlx::Error` encountered during `op` to the shared error taxonomy.
///
/// Condition violations are classified by the distinguished `DCB01` error code (§4.4, §6)
/// rather than by parsing `sqlx`'s message text; everything else becomes a `ResourceError`
/// wrapping the underlying cause (§4.7).
pub(crate) fn map_sql_err(op: &'static str, err: sqlx::Error) -> Error {
    if let sqlx::Error::Database(ref db_err) = err {
        if is_concurrency_violation(db_err.code().as_deref(), db_err.message()) {
            return Error::concurrency(op, None);
        }
    }
    Error::resource(op, Resource::Database, err)
}

/// Maps a `serde_json` failure encountered during `op` to the shared error taxonomy.
pub(crate) fn map_json_err(op: &'static str, err: serde_json::Error) -> Error {
    Error::resource(op, Resource::Json, err)
}

/// A deadline of `op`'s own configured timeout elapsed (§5). Never a cancellation signal
/// propagated from the caller — the deadline is rooted fresh at the start of the call.
#[derive(Debug)]
pub(crate) struct DeadlineExceeded(pub &'static str);

impl fmt::Display for DeadlineExceeded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: deadline exceeded", self.0)
    }
}

impl std::error::Error for DeadlineExceeded {}

pub(crate) fn map_timeout_err(op: &'static str) -> Error {
    Error::resource(op, Resource::Database, DeadlineExceeded(op))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_generic_sql_error_to_resource() {
        let err = map_json_err("append", serde_json::from_str::<serde_json::Value>("{").unwrap_err());
        assert!(err.is_resource());
    }

    #[test]
    fn maps_timeout_to_resource() {
        assert!(map_timeout_err("append").is_resource());
    }
}
