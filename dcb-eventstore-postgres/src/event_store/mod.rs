//! PostgreSQL-backed [`EventStore`] implementation.
//!
//! Dispatches `append` to one of three stored procedures depending on whether the batch
//! carries `lock:` tags and/or an append condition (§4.3.3), and builds parameterized reads
//! for the materialized and streaming query surfaces (§4.2).
mod condition_json;
mod row;
mod sql_builder;

use async_stream::stream;
use async_trait::async_trait;
use dcb_eventstore::{
    lock, validation, AppendCondition, AppendResult, Cursor, Error, EventStore, EventStoreConfig,
    InputEvent, Query, Resource,
};
use futures::stream::BoxStream;
use futures::StreamExt;
use sqlx::postgres::PgPool;
use sqlx::Row;

use crate::error::{map_json_err, map_sql_err, map_timeout_err};
use condition_json::condition_to_json;
use row::row_to_event;

const OP_APPEND: &str = "append";
const OP_QUERY: &str = "query";
const OP_CHECK_CONDITION: &str = "check_condition";

/// A DCB event store backed by a PostgreSQL connection pool.
///
/// `PgEventStore` is a plain, caller-owned value: it holds a pool handle and an immutable
/// [`EventStoreConfig`], nothing else. Cloning it is cheap (the pool is itself an `Arc`).
#[derive(Clone)]
pub struct PgEventStore {
    pool: PgPool,
    config: EventStoreConfig,
}

impl PgEventStore {
    /// Wraps an already-connected pool. This constructor never touches schema: the caller is
    /// responsible for having applied the reference assets under `sql/` out of band.
    pub fn new(pool: PgPool, config: EventStoreConfig) -> Self {
        Self { pool, config }
    }

    /// Wraps a pool with the default [`EventStoreConfig`].
    pub fn with_default_config(pool: PgPool) -> Self {
        Self::new(pool, EventStoreConfig::default())
    }

    fn encode_batch(
        events: &[InputEvent],
    ) -> Result<(Vec<String>, Vec<Vec<String>>, Vec<serde_json::Value>), Error> {
        let types: Vec<String> = events.iter().map(|e| e.event_type().to_string()).collect();
        let tags: Vec<Vec<String>> = events
            .iter()
            .map(|e| dcb_eventstore::encode_sorted_tags(&e.storage_tags()))
            .collect();
        let data = events
            .iter()
            .map(|e| serde_json::from_slice(e.data()).map_err(|err| map_json_err(OP_APPEND, err)))
            .collect::<Result<Vec<serde_json::Value>, Error>>()?;
        Ok((types, tags, data))
    }

    #[tracing::instrument(skip(self, events, condition), fields(batch_len = events.len()))]
    async fn append_inner(
        &self,
        events: &[InputEvent],
        condition: Option<&AppendCondition>,
    ) -> Result<Vec<(i64, i64)>, Error> {
        let (types, tags, data) = Self::encode_batch(events)?;
        let lock_keys = lock::extract_lock_keys(events);
        let has_lock = !lock_keys.is_empty();
        let condition_json = condition.filter(|c| !c.is_trivial()).map(condition_to_json);

        let mut tx = self.pool.begin().await.map_err(|e| map_sql_err(OP_APPEND, e))?;
        sqlx::query(&format!(
            "SET TRANSACTION ISOLATION LEVEL {}",
            self.config.default_append_isolation().as_sql()
        ))
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sql_err(OP_APPEND, e))?;

        let rows = if has_lock {
            let lock_timeout_ms = self
                .config
                .lock_timeout()
                .map(|d| d.as_millis() as i32)
                .unwrap_or(5000);
            tracing::debug!(procedure = "append_events_with_advisory_locks", lock_count = lock_keys.len());
            sqlx::query(
                "SELECT transaction_id, position FROM append_events_with_advisory_locks($1, $2, $3, $4, $5, $6)",
            )
            .bind(&types)
            .bind(&tags)
            .bind(&data)
            .bind(&lock_keys)
            .bind(&condition_json)
            .bind(lock_timeout_ms)
            .fetch_all(&mut *tx)
            .await
        } else if let Some(condition_json) = &condition_json {
            tracing::debug!(procedure = "append_events_with_condition");
            sqlx::query("SELECT transaction_id, position FROM append_events_with_condition($1, $2, $3, $4)")
                .bind(&types)
                .bind(&tags)
                .bind(&data)
                .bind(condition_json)
                .fetch_all(&mut *tx)
                .await
        } else {
            tracing::debug!(procedure = "append_events_batch");
            sqlx::query("SELECT transaction_id, position FROM append_events_batch($1, $2, $3)")
                .bind(&types)
                .bind(&tags)
                .bind(&data)
                .fetch_all(&mut *tx)
                .await
        }
        .map_err(|e| map_sql_err(OP_APPEND, e))?;

        tx.commit().await.map_err(|e| map_sql_err(OP_APPEND, e))?;

        Ok(rows
            .iter()
            .map(|row| (row.get("transaction_id"), row.get("position")))
            .collect())
    }
}

#[async_trait]
impl EventStore for PgEventStore {
    type Error = Error;

    #[tracing::instrument(skip(self, events, condition), fields(batch_len = events.len()))]
    async fn append(
        &self,
        events: Vec<InputEvent>,
        condition: Option<AppendCondition>,
    ) -> Result<AppendResult, Self::Error> {
        validation::validate_batch(&events, self.config.max_batch_size())?;

        let run = self.append_inner(&events, condition.as_ref());
        let rows = match self.config.append_timeout() {
            Some(timeout) => tokio::time::timeout(timeout, run)
                .await
                .map_err(|_| map_timeout_err(OP_APPEND))??,
            None => run.await?,
        };

        let transaction_id = rows
            .first()
            .map(|(tx, _)| *tx as u64)
            .ok_or_else(|| Error::resource(OP_APPEND, Resource::Database, MissingRows))?;
        let first_position = rows.first().map(|(_, pos)| *pos).unwrap();
        let last_position = rows.last().map(|(_, pos)| *pos).unwrap();

        Ok(AppendResult::new(transaction_id, first_position, last_position))
    }

    #[tracing::instrument(skip(self, query), fields(has_cursor = cursor.is_some()))]
    async fn query(&self, query: &Query, cursor: Option<Cursor>) -> Result<Vec<dcb_eventstore::Event>, Self::Error> {
        validation::validate_non_empty_query(query)?;

        let run = async {
            let mut builder = sql_builder::build_select(query, cursor, None);
            builder
                .build()
                .fetch_all(&self.pool)
                .await
                .map_err(|e| map_sql_err(OP_QUERY, e))
        };

        let rows = match self.config.query_timeout() {
            Some(timeout) => tokio::time::timeout(timeout, run)
                .await
                .map_err(|_| map_timeout_err(OP_QUERY))??,
            None => run.await?,
        };

        rows.iter().map(|row| row_to_event(OP_QUERY, row)).collect()
    }

    fn query_stream<'a>(
        &'a self,
        query: &'a Query,
        cursor: Option<Cursor>,
    ) -> BoxStream<'a, Result<dcb_eventstore::Event, Self::Error>> {
        tracing::debug!(has_cursor = cursor.is_some(), "query_stream started");
        stream! {
            if let Err(err) = validation::validate_non_empty_query(query) {
                yield Err(err);
                return;
            }

            let mut builder = sql_builder::build_select(query, cursor, None);
            let built = builder.build();
            let mut rows = built.fetch(&self.pool);
            while let Some(row) = rows.next().await {
                match row {
                    Ok(row) => yield row_to_event(OP_QUERY, &row),
                    Err(err) => yield Err(map_sql_err(OP_QUERY, err)),
                }
            }
        }
        .boxed()
    }

    #[tracing::instrument(skip(self, condition))]
    async fn check_condition(&self, condition: &AppendCondition) -> Result<bool, Self::Error> {
        if condition.is_trivial() {
            return Ok(false);
        }
        let query = condition
            .fail_if_events_match()
            .expect("non-trivial condition carries a query");

        let run = async {
            let mut builder = sql_builder::build_exists(query, condition.after_cursor());
            builder
                .build_query_scalar::<bool>()
                .fetch_one(&self.pool)
                .await
                .map_err(|e| map_sql_err(OP_CHECK_CONDITION, e))
        };

        match self.config.query_timeout() {
            Some(timeout) => tokio::time::timeout(timeout, run)
                .await
                .map_err(|_| map_timeout_err(OP_CHECK_CONDITION))?,
            None => run.await,
        }
    }
}

#[derive(Debug)]
struct MissingRows;

impl std::fmt::Display for MissingRows {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "append procedure returned no rows for a non-empty batch")
    }
}

impl std::error::Error for MissingRows {}

#[cfg(test)]
mod tests {
    use super::*;
    use dcb_eventstore::Tag;

    // No live database is exercised here; that belongs to whatever connection-pool/schema
    // harness the caller wires up separately. These tests cover the pure batch-encoding and
    // lock-detection logic the append dispatcher relies on.

    #[test]
    fn encode_batch_strips_lock_tags_from_storage_tags() {
        let events = vec![InputEvent::new(
            "OrderPlaced",
            vec![Tag::new("order_id", "42").unwrap(), Tag::new("lock:order", "42").unwrap()],
            b"{\"amount\":10}".to_vec(),
        )];
        let (types, tags, data) = PgEventStore::encode_batch(&events).unwrap();
        assert_eq!(types, vec!["OrderPlaced".to_string()]);
        assert_eq!(tags, vec![vec!["order_id:42".to_string()]]);
        assert_eq!(data, vec![serde_json::json!({"amount": 10})]);
    }

    #[test]
    fn encode_batch_rejects_non_json_data() {
        let events = vec![InputEvent::new("E", Vec::new(), b"not json".to_vec())];
        assert!(PgEventStore::encode_batch(&events).is_err());
    }

    #[test]
    fn lock_detection_drives_advisory_lock_dispatch() {
        let with_lock = vec![InputEvent::new(
            "OrderPlaced",
            vec![Tag::new("lock:order", "42").unwrap()],
            b"{}".to_vec(),
        )];
        let without_lock = vec![InputEvent::new("OrderPlaced", Vec::new(), b"{}".to_vec())];
        assert!(!lock::extract_lock_keys(&with_lock).is_empty());
        assert!(lock::extract_lock_keys(&without_lock).is_empty());
    }
}
