//! Decoder for Callback API webhooks and group long-poll updates.
//!
//! Shape: `{group_id, type, event_id, v, object: {client_info, message: {...}}}`.

use serde_json::{Map, Value};

use crate::utils::{array_or_empty, get_i64, get_string, object_or_empty};

use super::{
    derive::finish,
    text::normalize_text,
    types::{CallbackMeta, Event, EventKind, Message},
};

/// Decode one webhook-style object. Never fails; a missing or non-string
/// `type` yields [`EventKind::Raw`].
pub fn decode_object_event(raw: &Map<String, Value>) -> Event {
    let raw_value = Value::Object(raw.clone());

    let Some(tag) = raw.get("type").and_then(Value::as_str) else {
        return finish(
            EventKind::Raw {
                type_code: raw.get("type").cloned().unwrap_or(Value::Null),
            },
            raw_value,
            None,
        );
    };

    let object = raw.get("object").cloned().unwrap_or(Value::Null);
    let meta = CallbackMeta {
        event_type: tag.to_string(),
        group_id: get_i64(raw, "group_id"),
        event_id: get_string(raw, "event_id"),
        v: get_string(raw, "v"),
        client_info: object_or_empty(object.get("client_info")),
    };

    let kind = match tag {
        "message_new" => EventKind::MessageNew(message(&object, meta.group_id)),
        "message_edit" => EventKind::MessageEdit(message(&object, meta.group_id)),
        "message_reply" => EventKind::MessageReply(message(&object, meta.group_id)),
        _ => EventKind::Callback { object },
    };

    finish(kind, raw_value, Some(meta))
}

/// Since API 5.103 the message sits under `object.message`; older versions and
/// `message_edit` / `message_reply` send the message as the object itself.
fn message_payload(object: &Value) -> Map<String, Value> {
    match object.get("message") {
        Some(Value::Object(m)) => m.clone(),
        _ => match object {
            Value::Object(m) if m.contains_key("peer_id") || m.contains_key("id") => m.clone(),
            _ => Map::new(),
        },
    }
}

fn message(object: &Value, group_id: Option<i64>) -> Message {
    let msg = message_payload(object);

    let text = get_string(&msg, "text").unwrap_or_default();
    let from_id = get_i64(&msg, "from_id");
    let from_me = matches!((group_id, from_id), (Some(g), Some(f)) if f == -g);

    let attachments = array_or_empty(msg.get("attachments"));
    let attachment_ids = attachments.iter().filter_map(attachment_id).collect();

    Message {
        message_id: get_i64(&msg, "id"),
        conversation_message_id: get_i64(&msg, "conversation_message_id"),
        peer_id: get_i64(&msg, "peer_id"),
        from_id,
        timestamp: get_i64(&msg, "date"),
        message: normalize_text(&text),
        text,
        attachments: Value::Array(attachments),
        attachment_ids,
        fwd_messages: array_or_empty(msg.get("fwd_messages")),
        random_id: get_i64(&msg, "random_id"),
        from_me,
        to_me: !from_me,
        ..Message::default()
    }
}

/// `photo123_456`-style id for an attachment entry, if it is well formed.
fn attachment_id(a: &Value) -> Option<String> {
    let kind = a.get("type")?.as_str()?;
    let payload = a.get(kind)?.as_object()?;
    let owner_id = get_i64(payload, "owner_id")?;
    let media_id = get_i64(payload, "id")?;
    Some(format!("{kind}{owner_id}_{media_id}"))
}
