//! Event decoding: long-poll arrays and webhook objects into one [`Event`] model.

pub mod array;
pub mod derive;
pub mod flags;
pub mod object;
pub mod persist;
pub mod table;
pub mod text;
pub mod types;

use serde_json::{Map, Value};

pub use array::decode_array_event;
pub use object::decode_object_event;
pub use types::{Event, EventKind, EventType, Message};

/// Anything that can be decoded into an [`Event`].
///
/// Both raw shapes implement it; `Value` dispatches on the shape it holds.
pub trait DecodeEvent {
    fn decode_event(&self) -> Event;
}

impl DecodeEvent for [Value] {
    fn decode_event(&self) -> Event {
        decode_array_event(self)
    }
}

impl DecodeEvent for Map<String, Value> {
    fn decode_event(&self) -> Event {
        decode_object_event(self)
    }
}

impl DecodeEvent for Value {
    fn decode_event(&self) -> Event {
        match self {
            Value::Array(items) => decode_array_event(items),
            Value::Object(obj) => decode_object_event(obj),
            other => derive::finish(
                EventKind::Raw {
                    type_code: Value::Null,
                },
                other.clone(),
                None,
            ),
        }
    }
}

/// Decode one update from a long-poll batch, whatever its shape.
pub fn decode_update(raw: &Value) -> Event {
    raw.decode_event()
}

/// Decode a whole batch; one malformed update never affects its siblings.
pub fn decode_batch(updates: &[Value]) -> Vec<Event> {
    updates.iter().map(decode_update).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn batch_with_garbage_decodes_every_item() {
        let batch = vec![
            json!([4, 1, 0, 5, 1, "ok"]),
            json!("garbage"),
            json!([]),
            json!({"type": "message_new", "object": {"message": {"peer_id": 5}}}),
            json!([61, 5, 1]),
        ];
        let events = decode_batch(&batch);
        assert_eq!(events.len(), 5);
        assert!(matches!(events[0].kind, EventKind::MessageNew(_)));
        assert!(events[1].is_raw());
        assert_eq!(events[1].raw, json!("garbage"));
        assert!(events[2].is_raw());
        assert!(matches!(events[3].kind, EventKind::MessageNew(_)));
        assert!(matches!(events[4].kind, EventKind::UserTyping(_)));
    }

    #[test]
    fn trait_dispatch_matches_free_functions() {
        let arr = json!([80, 12]);
        let slice = arr.as_array().unwrap().as_slice();
        assert_eq!(slice.decode_event(), decode_array_event(slice));
        assert_eq!(
            decode_update(&arr).kind,
            EventKind::MessagesCounterUpdate { count: Some(12) }
        );
    }
}
