//! Serializes an [`AppendCondition`] into the canonical JSON shape the `check_append_condition`
//! family of stored procedures expects (§4.4, §6):
//! `{"items": [{"event_types": [...], "required_tags": ["key:value", ...]}], "after_cursor":
//! {"transaction_id": ..., "position": ...} | null}`.
use dcb_eventstore::{encode_sorted_tags, AppendCondition, Cursor, Query, Tag};
use serde_json::{json, Value};

pub fn condition_to_json(condition: &AppendCondition) -> Value {
    let items = condition
        .fail_if_events_match()
        .map(query_items_json)
        .unwrap_or_else(|| Value::Array(Vec::new()));
    json!({
        "items": items,
        "after_cursor": condition.after_cursor().map(cursor_json),
    })
}

fn query_items_json(query: &Query) -> Value {
    Value::Array(
        query
            .items()
            .iter()
            .map(|item| {
                let tags: Vec<Tag> = item.required_tags().iter().cloned().collect();
                json!({
                    "event_types": item.event_types().iter().cloned().collect::<Vec<String>>(),
                    "required_tags": encode_sorted_tags(&tags),
                })
            })
            .collect(),
    )
}

fn cursor_json(cursor: Cursor) -> Value {
    json!({
        "transaction_id": cursor.transaction_id(),
        "position": cursor.position(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcb_eventstore::QueryItem;

    #[test]
    fn trivial_condition_serializes_to_empty_items_and_null_cursor() {
        let condition = AppendCondition::new(None, None);
        let json = condition_to_json(&condition);
        assert_eq!(json["items"], json!([]));
        assert_eq!(json["after_cursor"], Value::Null);
    }

    #[test]
    fn condition_with_query_and_cursor_serializes_items_and_cursor() {
        let tag = Tag::new("order_id", "42").unwrap();
        let query = Query::new([QueryItem::new(["OrderPlaced"], [tag])]);
        let condition = AppendCondition::none_match_since(query, Cursor::new(5, 10));
        let json = condition_to_json(&condition);
        assert_eq!(json["items"][0]["event_types"], json!(["OrderPlaced"]));
        assert_eq!(json["items"][0]["required_tags"], json!(["order_id:42"]));
        assert_eq!(json["after_cursor"]["transaction_id"], json!(5));
        assert_eq!(json["after_cursor"]["position"], json!(10));
    }
}
