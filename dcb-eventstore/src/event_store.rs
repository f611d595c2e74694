//! The storage-agnostic [`EventStore`] contract (§4.3, §4.5).
//!
//! Implementations (e.g. `dcb-eventstore-postgres::PgEventStore`) own a connection resource
//! and provide the three server-side append paths, the materialized/streaming readers, and
//! the condition check, all under the semantics described in spec.md. The core crate never
//! assumes a particular backend.
use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::condition::AppendCondition;
use crate::cursor::Cursor;
use crate::event::{Event, InputEvent};
use crate::query::Query;

/// The outcome of a successful append: the events' shared transaction id and the
/// consecutive range of positions they occupy (§4.3.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendResult {
    transaction_id: u64,
    first_position: i64,
    last_position: i64,
}

impl AppendResult {
    pub fn new(transaction_id: u64, first_position: i64, last_position: i64) -> Self {
        Self {
            transaction_id,
            first_position,
            last_position,
        }
    }

    pub fn transaction_id(&self) -> u64 {
        self.transaction_id
    }

    pub fn first_position(&self) -> i64 {
        self.first_position
    }

    pub fn last_position(&self) -> i64 {
        self.last_position
    }

    /// The cursor of the last event appended in this batch.
    pub fn cursor(&self) -> Cursor {
        Cursor::new(self.transaction_id, self.last_position)
    }
}

/// The core event store contract: append engine, reader, and condition check (§4.3-§4.5).
#[async_trait]
pub trait EventStore: Send + Sync {
    type Error: Send + Sync + 'static;

    /// Appends a batch of events, optionally conditional on [`AppendCondition`] (§4.3).
    ///
    /// All-or-nothing: either every event in the batch is durable at consecutive positions
    /// within one transaction, or no event is persisted. The server-side path chosen (plain
    /// batch, conditional, or advisory-locked) is determined automatically from the batch's
    /// tags and the presence of `condition` (§4.3.3).
    async fn append(
        &self,
        events: Vec<InputEvent>,
        condition: Option<AppendCondition>,
    ) -> Result<AppendResult, Self::Error>;

    /// Executes `query` materialized: buffers all matching rows and returns them in order.
    /// An empty query is rejected as a validation error (§4.5).
    async fn query(&self, query: &Query, cursor: Option<Cursor>) -> Result<Vec<Event>, Self::Error>;

    /// Executes `query` as a lazy, finite, cancelable stream (§4.5). Cursor filtering uses
    /// the exact strict-greater clause of §4.2, never position-only comparison.
    fn query_stream<'a>(
        &'a self,
        query: &'a Query,
        cursor: Option<Cursor>,
    ) -> BoxStream<'a, Result<Event, Self::Error>>;

    /// Standalone evaluation of "does any event match `condition` exist" (§4.4, §6
    /// `check_append_condition`), without performing an append.
    async fn check_condition(&self, condition: &AppendCondition) -> Result<bool, Self::Error>;
}
