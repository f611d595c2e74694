#![doc = include_str!("../README.md")]

mod condition;
mod config;
mod cursor;
mod error;
mod event;
mod event_store;
pub mod lock;
mod projector;
mod query;
mod tag;
pub mod validation;

#[doc(inline)]
pub use crate::condition::AppendCondition;
#[doc(inline)]
pub use crate::config::{EventStoreConfig, IsolationLevel};
#[doc(inline)]
pub use crate::cursor::Cursor;
#[doc(inline)]
pub use crate::error::{is_concurrency_violation, Error, Resource, CONCURRENCY_ERROR_CODE, CONCURRENCY_MESSAGE_PREFIX};
#[doc(inline)]
pub use crate::event::{Event, InputEvent};
#[doc(inline)]
pub use crate::event_store::{AppendResult, EventStore};
#[doc(inline)]
pub use crate::projector::{combine_queries, project, project_stream, ProjectionStates, ProjectorDyn, StateProjector};
#[doc(inline)]
pub use crate::query::{Query, QueryItem};
#[doc(inline)]
pub use crate::tag::{encode_sorted as encode_sorted_tags, Tag, TagError, LOCK_TAG_PREFIX};
