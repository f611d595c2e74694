//! Maps a Postgres row from the `events` table onto the core [`Event`] type.
use std::fmt;

use chrono::{DateTime, Utc};
use dcb_eventstore::{Error, Event, Resource, Tag};
use sqlx::postgres::PgRow;
use sqlx::Row;

use crate::error::map_sql_err;

#[derive(Debug)]
struct MalformedStoredTag(String);

impl fmt::Display for MalformedStoredTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stored tag {:?} is missing the ':' separator", self.0)
    }
}

impl std::error::Error for MalformedStoredTag {}

fn decode_tag(op: &'static str, encoded: &str) -> Result<Tag, Error> {
    let (key, value) = encoded
        .split_once(':')
        .ok_or_else(|| Error::resource(op, Resource::Database, MalformedStoredTag(encoded.to_string())))?;
    Tag::new(key, value).map_err(|_| Error::validation(op, "tags"))
}

/// Decodes one row of `(type, tags, data, transaction_id, position, occurred_at)` into an
/// [`Event`]. `tags` is the stored `TEXT[]` of `key:value` pairs; `data` is `JSONB`,
/// round-tripped back to its canonical byte form.
pub fn row_to_event(op: &'static str, row: &PgRow) -> Result<Event, Error> {
    let event_type: String = row.try_get("type").map_err(|e| map_sql_err(op, e))?;
    let encoded_tags: Vec<String> = row.try_get("tags").map_err(|e| map_sql_err(op, e))?;
    let data: serde_json::Value = row.try_get("data").map_err(|e| map_sql_err(op, e))?;
    let transaction_id: i64 = row.try_get("transaction_id").map_err(|e| map_sql_err(op, e))?;
    let position: i64 = row.try_get("position").map_err(|e| map_sql_err(op, e))?;
    let occurred_at: DateTime<Utc> = row.try_get("occurred_at").map_err(|e| map_sql_err(op, e))?;

    let tags = encoded_tags
        .iter()
        .map(|encoded| decode_tag(op, encoded))
        .collect::<Result<Vec<_>, _>>()?;
    let data_bytes = serde_json::to_vec(&data).map_err(|e| crate::error::map_json_err(op, e))?;

    Ok(Event::new(
        event_type,
        tags,
        data_bytes,
        transaction_id as u64,
        position,
        occurred_at,
    ))
}
