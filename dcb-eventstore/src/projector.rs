//! Multi-projector fan-out over a single event scan (§4.6).
//!
//! Given a set of [`StateProjector`]s, [`project`] combines their queries into one SQL-level
//! scan, streams matching events in `(transaction_id, position)` order, and folds each event
//! into every projector whose query it satisfies. On exhaustion it derives an
//! [`AppendCondition`] from the combined query and the cursor of the last event observed,
//! closing the loop for optimistic, cross-aggregate appends.
//!
//! Because projector state is heterogeneous (a balance here, a set of ids there), states are
//! type-erased behind [`std::any::Any`] for the fan-out and exposed back to the caller
//! through a typed [`ProjectionStates::get`] accessor (§9 "Dynamically-typed projector
//! state").
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use futures::StreamExt;

use crate::condition::AppendCondition;
use crate::cursor::Cursor;
use crate::error::Error;
use crate::event::Event;
use crate::event_store::EventStore;
use crate::query::Query;
use crate::validation::validate_non_empty_query;

const OP_PROJECT: &str = "project";

/// `(id, query, initial_state, transition_fn)` (§3).
///
/// `transition_fn` must be deterministic and side-effect-free: correctness of
/// [`AppendCondition`] reuse across a read-decide-write cycle depends on it, but the core
/// does not and cannot enforce this — it is a caller obligation (§9).
pub struct StateProjector<S> {
    id: String,
    query: Query,
    initial: S,
    transition: Arc<dyn Fn(S, &Event) -> S + Send + Sync>,
}

impl<S> StateProjector<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn new(
        id: impl Into<String>,
        query: Query,
        initial: S,
        transition: impl Fn(S, &Event) -> S + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            query,
            initial,
            transition: Arc::new(transition),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    /// Type-erases this projector for heterogeneous fan-out in [`project`].
    pub fn boxed(self) -> Box<dyn ProjectorDyn> {
        Box::new(self)
    }
}

/// The type-erased form of a [`StateProjector`], used internally by [`project`] to fan a
/// single event out across projectors with different state types.
pub trait ProjectorDyn: Send + Sync {
    fn id(&self) -> &str;
    fn query(&self) -> &Query;
    fn init(&self) -> Box<dyn Any + Send>;
    fn apply(&self, state: Box<dyn Any + Send>, event: &Event) -> Box<dyn Any + Send>;
}

impl<S> ProjectorDyn for StateProjector<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn id(&self) -> &str {
        &self.id
    }

    fn query(&self) -> &Query {
        &self.query
    }

    fn init(&self) -> Box<dyn Any + Send> {
        Box::new(self.initial.clone())
    }

    fn apply(&self, state: Box<dyn Any + Send>, event: &Event) -> Box<dyn Any + Send> {
        let state = *state
            .downcast::<S>()
            .expect("projector state type mismatch: StateProjector<S> was applied to a state that wasn't created by its own init()");
        Box::new((self.transition)(state, event))
    }
}

/// The per-projector states produced by [`project`], keyed by projector id.
///
/// Use [`ProjectionStates::get`] with the concrete state type to retrieve a projector's
/// final state.
#[derive(Default)]
pub struct ProjectionStates {
    states: HashMap<String, Box<dyn Any + Send>>,
}

impl ProjectionStates {
    /// Retrieves the final state for the projector with the given id, downcast to `S`.
    ///
    /// Returns `None` if no projector with that id was part of the projection, or if `S`
    /// does not match the type the projector was declared with.
    pub fn get<S: 'static>(&self, id: &str) -> Option<&S> {
        self.states.get(id).and_then(|boxed| boxed.downcast_ref::<S>())
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.states.keys().map(String::as_str)
    }
}

/// Combines N projectors' queries into a single query whose items are the union of all
/// projectors' items (§4.6.1).
///
/// Items sharing an identical required-tag set are merged by unioning their event-type
/// sets: this is purely a SQL-size optimization and never changes the set of matched
/// events, since per-event dispatch to projectors is re-checked client-side regardless
/// (§4.6.3).
pub fn combine_queries(projectors: &[Box<dyn ProjectorDyn>]) -> Query {
    use std::collections::BTreeSet;
    use crate::query::QueryItem;

    // Items whose event_types is empty already match "any type" for their tag set; merging
    // them with anything else could only narrow that down to an explicit type list, which
    // would change the matched set. So only items with a non-empty, mergeable type list
    // participate in the merge; "any type" items pass through untouched.
    let mut merged: Vec<(BTreeSet<crate::Tag>, BTreeSet<String>)> = Vec::new();
    let mut passthrough: Vec<QueryItem> = Vec::new();

    for projector in projectors {
        for item in projector.query().items() {
            if item.event_types().is_empty() {
                passthrough.push(item.clone());
                continue;
            }
            let tags: BTreeSet<crate::Tag> = item.required_tags().iter().cloned().collect();
            if let Some((_, types)) = merged.iter_mut().find(|(existing_tags, _)| existing_tags == &tags) {
                types.extend(item.event_types().iter().cloned());
            } else {
                merged.push((tags, item.event_types().iter().cloned().collect()));
            }
        }
    }

    let merged_items = merged.into_iter().map(|(tags, types)| QueryItem::new(types, tags));
    Query::new(passthrough.into_iter().chain(merged_items))
}

/// `project(projectors, cursor?) -> (states_by_id, append_condition)` (§4.6.2).
pub async fn project<Store>(
    store: &Store,
    projectors: Vec<Box<dyn ProjectorDyn>>,
    cursor: Option<Cursor>,
) -> Result<(ProjectionStates, AppendCondition), Error>
where
    Store: EventStore<Error = Error>,
{
    for projector in &projectors {
        if projector.id().is_empty() {
            return Err(Error::validation(OP_PROJECT, "id"));
        }
        validate_non_empty_query(projector.query())?;
    }

    let combined_query = combine_queries(&projectors);

    let mut states = ProjectionStates::default();
    for projector in &projectors {
        states.states.insert(projector.id().to_string(), projector.init());
    }

    let mut last_cursor: Option<Cursor> = None;
    let mut stream = store.query_stream(&combined_query, cursor);
    while let Some(event) = stream.next().await {
        let event = event?;
        last_cursor = Some(event.cursor());
        for projector in &projectors {
            if projector.query().matches(event.event_type(), event.tags()) {
                let entry = states.states.remove(projector.id()).expect("initialized above");
                states.states.insert(projector.id().to_string(), projector.apply(entry, &event));
            }
        }
    }

    let append_condition = AppendCondition::new(Some(combined_query), last_cursor);

    Ok((states, append_condition))
}

/// The streaming variant of [`project`] (§4.6.4): drives the same fan-out logic but emits
/// the final states map and the computed [`AppendCondition`] through two one-shot channels
/// after the underlying event stream is exhausted, instead of buffering the whole result in
/// the caller's stack frame. An internal bounded channel of `stream_buffer` depth pipelines
/// event delivery from the store's stream to the fold step.
pub async fn project_stream<Store>(
    store: Arc<Store>,
    projectors: Vec<Box<dyn ProjectorDyn>>,
    cursor: Option<Cursor>,
    stream_buffer: usize,
) -> Result<
    (
        tokio::sync::oneshot::Receiver<ProjectionStates>,
        tokio::sync::oneshot::Receiver<AppendCondition>,
    ),
    Error,
>
where
    Store: EventStore<Error = Error> + Send + Sync + 'static,
{
    for projector in &projectors {
        if projector.id().is_empty() {
            return Err(Error::validation(OP_PROJECT, "id"));
        }
        validate_non_empty_query(projector.query())?;
    }

    let combined_query = combine_queries(&projectors);
    let (states_tx, states_rx) = tokio::sync::oneshot::channel();
    let (condition_tx, condition_rx) = tokio::sync::oneshot::channel();
    let (event_tx, mut event_rx) = tokio::sync::mpsc::channel::<Result<Event, Error>>(stream_buffer.max(1));

    let pump_query = combined_query.clone();
    let pump_store = Arc::clone(&store);
    tokio::spawn(async move {
        let mut stream = pump_store.query_stream(&pump_query, cursor);
        while let Some(item) = stream.next().await {
            if event_tx.send(item).await.is_err() {
                break;
            }
        }
    });

    let fold_query = combined_query;
    tokio::spawn(async move {
        let mut states = ProjectionStates::default();
        for projector in &projectors {
            states.states.insert(projector.id().to_string(), projector.init());
        }
        let mut last_cursor: Option<Cursor> = None;
        let mut failed = false;
        while let Some(item) = event_rx.recv().await {
            match item {
                Ok(event) => {
                    last_cursor = Some(event.cursor());
                    for projector in &projectors {
                        if projector.query().matches(event.event_type(), event.tags()) {
                            let entry = states.states.remove(projector.id()).expect("initialized above");
                            states.states.insert(projector.id().to_string(), projector.apply(entry, &event));
                        }
                    }
                }
                Err(_) => {
                    failed = true;
                    break;
                }
            }
        }
        if !failed {
            let _ = condition_tx.send(AppendCondition::new(Some(fold_query), last_cursor));
        }
        let _ = states_tx.send(states);
    });

    Ok((states_rx, condition_rx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::QueryItem;
    use crate::Tag;
    use async_trait::async_trait;
    use futures::stream::{self, BoxStream};

    #[derive(Clone)]
    struct FakeStore {
        events: Vec<Event>,
    }

    #[async_trait]
    impl EventStore for FakeStore {
        type Error = Error;

        async fn append(
            &self,
            _events: Vec<crate::InputEvent>,
            _condition: Option<AppendCondition>,
        ) -> Result<crate::event_store::AppendResult, Self::Error> {
            unimplemented!("not exercised in projector tests")
        }

        async fn query(&self, _query: &Query, _cursor: Option<Cursor>) -> Result<Vec<Event>, Self::Error> {
            unimplemented!("not exercised in projector tests")
        }

        fn query_stream<'a>(
            &'a self,
            query: &'a Query,
            cursor: Option<Cursor>,
        ) -> BoxStream<'a, Result<Event, Self::Error>> {
            let items: Vec<Result<Event, Self::Error>> = self
                .events
                .iter()
                .filter(|e| query.matches(e.event_type(), e.tags()))
                .filter(|e| cursor.map(|c| e.cursor() > c).unwrap_or(true))
                .cloned()
                .map(Ok)
                .collect();
            stream::iter(items).boxed()
        }

        async fn check_condition(&self, condition: &AppendCondition) -> Result<bool, Self::Error> {
            Ok(self
                .events
                .iter()
                .any(|e| condition.violated_by(e.event_type(), e.tags(), e.cursor())))
        }
    }

    fn event(event_type: &str, tags: Vec<Tag>, tx: u64, pos: i64) -> Event {
        Event::new(event_type, tags, b"{}".to_vec(), tx, pos, chrono::Utc::now())
    }

    #[tokio::test]
    async fn single_projector_folds_matching_events() {
        // Mirrors the account-balance decision model: one AccountCreated(1000) followed by
        // two TransactionCompleted(+500, +300) should fold to 1800, with the condition's
        // cursor pinned to the third event.
        let account = Tag::new("account_id", "acc123").unwrap();
        let store = FakeStore {
            events: vec![
                event("AccountCreated", vec![account.clone()], 1, 1),
                event("TransactionCompleted", vec![account.clone()], 1, 2),
                event("TransactionCompleted", vec![account.clone()], 1, 3),
            ],
        };

        let projector = StateProjector::new(
            "balance",
            Query::new([QueryItem::with_tags([account.clone()])]),
            0i64,
            |state, event| match event.event_type() {
                "AccountCreated" => state + 1000,
                "TransactionCompleted" if event.position() == 2 => state + 500,
                "TransactionCompleted" => state + 300,
                _ => state,
            },
        )
        .boxed();

        let (states, condition) = project(&store, vec![projector], None).await.unwrap();
        assert_eq!(*states.get::<i64>("balance").unwrap(), 1800);
        assert_eq!(condition.after_cursor(), Some(Cursor::new(1, 3)));
    }

    #[tokio::test]
    async fn multi_projector_dispatch_is_per_projector() {
        let acc_a = Tag::new("account_id", "a").unwrap();
        let acc_b = Tag::new("account_id", "b").unwrap();
        let store = FakeStore {
            events: vec![
                event("Deposited", vec![acc_a.clone()], 1, 1),
                event("Deposited", vec![acc_b.clone()], 1, 2),
            ],
        };

        let projector_a = StateProjector::new(
            "a",
            Query::new([QueryItem::with_tags([acc_a.clone()])]),
            0i64,
            |s, _| s + 1,
        )
        .boxed();
        let projector_b = StateProjector::new(
            "b",
            Query::new([QueryItem::with_tags([acc_b.clone()])]),
            0i64,
            |s, _| s + 1,
        )
        .boxed();

        let (states, _) = project(&store, vec![projector_a, projector_b], None).await.unwrap();
        assert_eq!(*states.get::<i64>("a").unwrap(), 1);
        assert_eq!(*states.get::<i64>("b").unwrap(), 1);
    }

    #[tokio::test]
    async fn empty_stream_yields_condition_with_no_cursor() {
        let store = FakeStore { events: Vec::new() };
        let projector = StateProjector::new(
            "p",
            Query::new([QueryItem::with_types(["X"])]),
            0i64,
            |s, _| s,
        )
        .boxed();
        let (_, condition) = project(&store, vec![projector], None).await.unwrap();
        assert_eq!(condition.after_cursor(), None);
    }

    #[tokio::test]
    async fn rejects_projector_with_empty_id() {
        let projector = StateProjector::new(
            "",
            Query::new([QueryItem::with_types(["X"])]),
            0i64,
            |s, _| s,
        )
        .boxed();
        let store = FakeStore { events: Vec::new() };
        let err = project(&store, vec![projector], None).await.unwrap_err();
        assert!(err.is_validation());
    }
}
