//! Translates a [`Query`] + optional [`Cursor`] + optional limit into a parameterized
//! `SELECT` over the `events` table (§4.2).
use dcb_eventstore::{Cursor, Query};
use sqlx::{Postgres, QueryBuilder};

use crate::PgEventId;

const SELECT_COLUMNS: &str =
    "type, tags, data, transaction_id, position, occurred_at FROM events WHERE ";

/// Builds the parameterized `SELECT` for a materialized or streamed read.
///
/// The WHERE clause is `(item_1 OR item_2 OR …) AND cursor_clause?`, each item expanding to
/// `(type = ANY($k) AND tags @> $k+1)` with either conjunct omitted when empty. Tags are
/// bound as a sorted array so the containment operator sees a canonical value (§4.2). The
/// cursor clause is the exact strict-greater comparison of §3/§4.2, never position alone.
/// `ORDER BY transaction_id ASC, position ASC` with `LIMIT` applied last, when present.
pub fn build_select(query: &Query, cursor: Option<Cursor>, limit: Option<i64>) -> QueryBuilder<'static, Postgres> {
    let mut builder: QueryBuilder<'static, Postgres> = QueryBuilder::new("SELECT ");
    builder.push(SELECT_COLUMNS);
    push_match_clause(&mut builder, query);
    push_cursor_clause(&mut builder, cursor);
    builder.push(" ORDER BY transaction_id ASC, position ASC");
    if let Some(limit) = limit {
        builder.push(" LIMIT ");
        builder.push_bind(limit);
    }
    builder
}

/// Builds the `EXISTS (...)` predicate used by the condition checker (§4.4): the same
/// match + cursor clause, wrapped for a boolean existence check instead of a row fetch.
pub fn build_exists(query: &Query, cursor: Option<Cursor>) -> QueryBuilder<'static, Postgres> {
    let mut builder: QueryBuilder<'static, Postgres> = QueryBuilder::new("SELECT EXISTS (SELECT 1 FROM events WHERE ");
    push_match_clause(&mut builder, query);
    push_cursor_clause(&mut builder, cursor);
    builder.push(")");
    builder
}

fn push_match_clause(builder: &mut QueryBuilder<'static, Postgres>, query: &Query) {
    builder.push("(");
    if query.items().is_empty() {
        builder.push("TRUE");
    } else {
        let mut items = query.items().iter().peekable();
        while let Some(item) = items.next() {
            builder.push("(");
            let has_types = !item.event_types().is_empty();
            let has_tags = !item.required_tags().is_empty();

            if has_types {
                builder.push("type = ANY(");
                let types: Vec<String> = item.event_types().iter().cloned().collect();
                builder.push_bind(types);
                builder.push(")");
            }
            if has_tags {
                if has_types {
                    builder.push(" AND ");
                }
                builder.push("tags @> ");
                let tags: Vec<dcb_eventstore::Tag> = item.required_tags().iter().cloned().collect();
                builder.push_bind(dcb_eventstore::encode_sorted_tags(&tags));
            }
            if !has_types && !has_tags {
                builder.push("TRUE");
            }
            builder.push(")");
            if items.peek().is_some() {
                builder.push(" OR ");
            }
        }
    }
    builder.push(")");
}

fn push_cursor_clause(builder: &mut QueryBuilder<'static, Postgres>, cursor: Option<Cursor>) {
    let Some(cursor) = cursor else { return };
    let tx_id: PgEventId = cursor.transaction_id() as PgEventId;
    builder.push(" AND ((transaction_id = ");
    builder.push_bind(tx_id);
    builder.push(" AND position > ");
    builder.push_bind(cursor.position());
    builder.push(") OR transaction_id > ");
    builder.push_bind(tx_id);
    builder.push(")");
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcb_eventstore::QueryItem;
    use sqlx::Execute;

    #[test]
    fn builds_select_for_empty_query() {
        let query = Query::match_all();
        let mut builder = build_select(&query, None, None);
        let sql = builder.build().sql().to_string();
        assert!(sql.contains("WHERE (TRUE)"));
        assert!(sql.contains("ORDER BY transaction_id ASC, position ASC"));
    }

    #[test]
    fn builds_select_with_type_and_tag_item() {
        let tag = dcb_eventstore::Tag::new("user_id", "123").unwrap();
        let query = Query::new([QueryItem::new(["UserCreated"], [tag])]);
        let mut builder = build_select(&query, None, None);
        let sql = builder.build().sql().to_string();
        assert!(sql.contains("type = ANY($1)"));
        assert!(sql.contains("tags @> $2"));
    }

    #[test]
    fn builds_select_with_cursor_clause() {
        let query = Query::match_all();
        let mut builder = build_select(&query, Some(Cursor::new(5, 10)), None);
        let sql = builder.build().sql().to_string();
        assert!(sql.contains("(transaction_id = $1 AND position > $2) OR transaction_id > $3"));
    }

    #[test]
    fn builds_select_with_limit_applied_last() {
        let query = Query::match_all();
        let mut builder = build_select(&query, None, Some(50));
        let sql = builder.build().sql().to_string();
        assert!(sql.trim_end().ends_with("LIMIT $1"));
    }
}
