//! Post-processing shared by both decoders. Operates on the canonical types only.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Map, Value};

use crate::{domain::Peer, utils::get_i64, utils::lenient_i64};

use super::{
    flags::{ChatUpdateKind, MessageFlag, PeerFlag},
    types::{CallbackMeta, ChatInfo, Event, EventKind},
};

/// Author of a chat message, carried as `extra_values.from` (usually a string).
pub fn chat_author(extra_values: &Map<String, Value>) -> Option<i64> {
    get_i64(extra_values, "from")
}

pub fn classify_peer(peer_id: Option<i64>, extra_values: Option<&Map<String, Value>>) -> Peer {
    match peer_id {
        Some(p) => Peer::classify(p, extra_values.and_then(chat_author)),
        None => Peer::Unknown,
    }
}

/// `(from_me, to_me)` from a new-message flags value.
pub fn direction(flags: Option<i64>) -> (bool, bool) {
    let outbox = flags.unwrap_or(0) & MessageFlag::Outbox.bit() != 0;
    (outbox, !outbox)
}

/// Reinterpret a chat update's `info` by its sub-type.
pub fn chat_info(update: Option<ChatUpdateKind>, info: &Value) -> ChatInfo {
    let id = lenient_i64(info);
    match (update, id) {
        (Some(ChatUpdateKind::AdminAdded), Some(admin_id)) => ChatInfo::AdminAdded { admin_id },
        (Some(ChatUpdateKind::MessagePinned), Some(conversation_message_id)) => {
            ChatInfo::MessagePinned {
                conversation_message_id,
            }
        }
        (
            Some(
                ChatUpdateKind::UserJoined
                | ChatUpdateKind::UserLeft
                | ChatUpdateKind::UserKicked
                | ChatUpdateKind::AdminRemoved,
            ),
            Some(user_id),
        ) => ChatInfo::Member { user_id },
        _ => ChatInfo::Raw(info.clone()),
    }
}

pub fn datetime_of(timestamp: Option<i64>) -> Option<DateTime<Utc>> {
    timestamp.and_then(|ts| Utc.timestamp_opt(ts, 0).single())
}

/// Build the final [`Event`]: peer classification, flag sets and wall-clock time.
pub fn finish(kind: EventKind, raw: Value, callback: Option<CallbackMeta>) -> Event {
    let peer = match &kind {
        EventKind::MessageFlagsReplace(m)
        | EventKind::MessageFlagsSet(m)
        | EventKind::MessageFlagsReset(m)
        | EventKind::MessageNew(m)
        | EventKind::MessageEdit(m)
        | EventKind::MessageReply(m) => match (m.peer_id, &callback) {
            // Webhook messages name their author in `from_id`; groups are not chat users.
            (Some(peer_id), Some(_)) => Peer::classify(
                peer_id,
                chat_author(&m.extra_values).or(m.from_id.filter(|id| *id > 0)),
            ),
            _ => classify_peer(m.peer_id, Some(&m.extra_values)),
        },
        EventKind::ReadAllIncoming(r)
        | EventKind::ReadAllOutgoing(r)
        | EventKind::PeerDeleteAll(r)
        | EventKind::PeerRestoreAll(r) => classify_peer(r.peer_id, None),
        EventKind::PeerFlagsReset(p) | EventKind::PeerFlagsReplace(p) | EventKind::PeerFlagsSet(p) => {
            classify_peer(p.peer_id, None)
        }
        EventKind::ChatUpdate(c) => classify_peer(c.peer_id, None),
        EventKind::UserRecordingVoice(r) => classify_peer(r.peer_id, None),
        EventKind::NotificationSettingsUpdate(n) => classify_peer(n.peer_id, None),
        _ => Peer::Unknown,
    };

    let message_flags = match &kind {
        EventKind::MessageFlagsReplace(m)
        | EventKind::MessageFlagsSet(m)
        | EventKind::MessageFlagsReset(m)
        | EventKind::MessageNew(m)
        | EventKind::MessageEdit(m) => m
            .flags
            .or(m.mask)
            .map(MessageFlag::decompose)
            .unwrap_or_default(),
        _ => Vec::new(),
    };

    let peer_flags = match &kind {
        EventKind::PeerFlagsReset(p) | EventKind::PeerFlagsReplace(p) | EventKind::PeerFlagsSet(p) => {
            p.flags.map(PeerFlag::decompose).unwrap_or_default()
        }
        _ => Vec::new(),
    };

    let timestamp = match &kind {
        EventKind::UserOnline(s) => s.timestamp,
        EventKind::UserOffline(s) => s.timestamp,
        EventKind::UserRecordingVoice(r) => r.timestamp,
        other => other.message().and_then(|m| m.timestamp),
    };

    Event {
        kind,
        peer,
        message_flags,
        peer_flags,
        timestamp,
        datetime: datetime_of(timestamp),
        callback,
        raw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn outbox_bit_decides_direction() {
        assert_eq!(direction(Some(2 | 1)), (true, false));
        assert_eq!(direction(Some(1)), (false, true));
        assert_eq!(direction(None), (false, true));
    }

    #[test]
    fn chat_info_wraps_known_sub_types() {
        assert_eq!(
            chat_info(Some(ChatUpdateKind::AdminAdded), &json!(15)),
            ChatInfo::AdminAdded { admin_id: 15 }
        );
        assert_eq!(
            chat_info(Some(ChatUpdateKind::MessagePinned), &json!("77")),
            ChatInfo::MessagePinned {
                conversation_message_id: 77
            }
        );
        assert_eq!(
            chat_info(Some(ChatUpdateKind::UserKicked), &json!(3)),
            ChatInfo::Member { user_id: 3 }
        );
    }

    #[test]
    fn chat_info_leaves_unknown_or_non_numeric_payloads_raw() {
        assert_eq!(
            chat_info(Some(ChatUpdateKind::Other(10)), &json!(5)),
            ChatInfo::Raw(json!(5))
        );
        assert_eq!(
            chat_info(Some(ChatUpdateKind::Title), &json!("new title")),
            ChatInfo::Raw(json!("new title"))
        );
        assert_eq!(
            chat_info(Some(ChatUpdateKind::AdminAdded), &json!({"x": 1})),
            ChatInfo::Raw(json!({"x": 1}))
        );
    }

    #[test]
    fn chat_author_reads_string_or_number() {
        let m = json!({"from": "123"});
        assert_eq!(chat_author(m.as_object().unwrap()), Some(123));
        let m = json!({"title": "x"});
        assert_eq!(chat_author(m.as_object().unwrap()), None);
    }

    #[test]
    fn datetime_is_utc_seconds() {
        let dt = datetime_of(Some(0)).unwrap();
        assert_eq!(dt.to_rfc3339(), "1970-01-01T00:00:00+00:00");
        assert!(datetime_of(None).is_none());
    }
}
