//! # PostgreSQL DCB Event Store Backend
//!
//! Implements [`dcb_eventstore::EventStore`] against a PostgreSQL `events` table, dispatching
//! appends to one of three server-side stored procedures (§4.3.3) and building parameterized
//! reads over the tag-containment/type model (§4.2). This crate never issues DDL: the
//! `events` table, sequence, and stored procedures are reference assets under `sql/`,
//! applied out of band by whatever migration tooling the caller already uses.
mod error;
mod event_store;

pub use event_store::PgEventStore;

/// The wire representation of a cursor's `transaction_id` in Postgres: `BIGINT`.
pub type PgEventId = i64;
