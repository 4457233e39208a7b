//! Decoder for user long-poll updates: `[type_code, field1, field2, ...]`.

use serde_json::Value;

use crate::utils::{get_i64, lenient_i64};

use super::{
    derive::{chat_author, chat_info, direction, finish},
    flags::{ChatUpdateKind, OfflineReason, Platform},
    table::{EventCode, Field, Fields},
    text::normalize_text,
    types::{
        Call, ChatEdit, ChatUpdate, Event, EventKind, Message, NotificationSettings,
        OfflineStatus, OnlineStatus, PeerFlagsChange, ReadMark, RecordingVoice, Typing,
    },
};

/// Decode one positional long-poll update.
///
/// Never fails: an empty array, a non-numeric or unknown type code yields
/// [`EventKind::Raw`] with the code kept verbatim.
pub fn decode_array_event(raw: &[Value]) -> Event {
    let raw_value = Value::Array(raw.to_vec());

    let Some(type_code) = raw.first() else {
        return finish(
            EventKind::Raw {
                type_code: Value::Null,
            },
            raw_value,
            None,
        );
    };

    let Some(code) = type_code.as_i64().and_then(EventCode::from_code) else {
        return finish(
            EventKind::Raw {
                type_code: type_code.clone(),
            },
            raw_value,
            None,
        );
    };

    let f = Fields::bind(code.fields(), &raw[1..]);
    finish(decode_kind(code, &f), raw_value, None)
}

fn decode_kind(code: EventCode, f: &Fields<'_>) -> EventKind {
    match code {
        EventCode::MessageFlagsReplace => EventKind::MessageFlagsReplace(message(f)),
        EventCode::MessageFlagsSet => EventKind::MessageFlagsSet(message(f)),
        EventCode::MessageFlagsReset => EventKind::MessageFlagsReset(message(f)),
        EventCode::MessageNew => {
            let mut m = message(f);
            (m.from_me, m.to_me) = direction(m.flags);
            EventKind::MessageNew(m)
        }
        EventCode::MessageEdit => EventKind::MessageEdit(message(f)),
        EventCode::ReadAllIncoming => EventKind::ReadAllIncoming(read_mark(f)),
        EventCode::ReadAllOutgoing => EventKind::ReadAllOutgoing(read_mark(f)),
        EventCode::PeerDeleteAll => EventKind::PeerDeleteAll(read_mark(f)),
        EventCode::PeerRestoreAll => EventKind::PeerRestoreAll(read_mark(f)),
        EventCode::UserOnline => {
            let extra = f.int(Field::Extra);
            EventKind::UserOnline(OnlineStatus {
                user_id: f.int(Field::UserId).map(i64::saturating_abs),
                extra,
                timestamp: f.int(Field::Timestamp),
                platform: extra.map(Platform::from_extra),
            })
        }
        EventCode::UserOffline => {
            let flags = f.int(Field::Flags);
            EventKind::UserOffline(OfflineStatus {
                user_id: f.int(Field::UserId).map(i64::saturating_abs),
                flags,
                timestamp: f.int(Field::Timestamp),
                reason: flags.map(OfflineReason::from_flags),
            })
        }
        EventCode::PeerFlagsReset => EventKind::PeerFlagsReset(peer_flags(f, Field::Mask)),
        EventCode::PeerFlagsReplace => EventKind::PeerFlagsReplace(peer_flags(f, Field::Flags)),
        EventCode::PeerFlagsSet => EventKind::PeerFlagsSet(peer_flags(f, Field::Mask)),
        EventCode::ChatEdit => EventKind::ChatEdit(ChatEdit {
            chat_id: f.int(Field::ChatId),
            by_self: f.int(Field::SelfFlag).map(|v| v != 0),
        }),
        EventCode::ChatUpdate => {
            let type_id = f.int(Field::TypeId);
            let update = type_id.map(ChatUpdateKind::from_type_id);
            EventKind::ChatUpdate(ChatUpdate {
                type_id,
                peer_id: f.int(Field::PeerId),
                update,
                info: chat_info(update, &f.value(Field::Info)),
            })
        }
        EventCode::UserTyping => EventKind::UserTyping(Typing {
            user_id: f.int(Field::UserId),
            chat_id: None,
            flags: f.int(Field::Flags),
        }),
        EventCode::UserTypingInChat => EventKind::UserTypingInChat(Typing {
            user_id: f.int(Field::UserId),
            chat_id: f.int(Field::ChatId),
            flags: None,
        }),
        EventCode::UserRecordingVoice => {
            // Newer protocol versions send a list of user ids here.
            let user_id = match f.get(Field::UserId) {
                Some(Value::Array(ids)) => ids.first().and_then(lenient_i64),
                Some(v) => lenient_i64(v),
                None => None,
            };
            EventKind::UserRecordingVoice(RecordingVoice {
                peer_id: f.int(Field::PeerId),
                user_id,
                flags: f.int(Field::Flags),
                timestamp: f.int(Field::Timestamp),
            })
        }
        EventCode::UserCall => EventKind::UserCall(Call {
            user_id: f.int(Field::UserId),
            call_id: f.value(Field::CallId),
        }),
        EventCode::MessagesCounterUpdate => EventKind::MessagesCounterUpdate {
            count: f.int(Field::Count),
        },
        EventCode::NotificationSettingsUpdate => {
            let values = f.object(Field::Values);
            EventKind::NotificationSettingsUpdate(NotificationSettings {
                peer_id: get_i64(&values, "peer_id"),
                sound: get_i64(&values, "sound").map(|v| v != 0),
                disabled_until: get_i64(&values, "disabled_until"),
                values,
            })
        }
    }
}

fn message(f: &Fields<'_>) -> Message {
    let text = f.string(Field::Text).unwrap_or_default();
    let extra_values = f.object(Field::ExtraValues);
    Message {
        message_id: f.int(Field::MessageId),
        peer_id: f.int(Field::PeerId),
        from_id: chat_author(&extra_values),
        flags: f.int(Field::Flags),
        mask: f.int(Field::Mask),
        timestamp: f.int(Field::Timestamp),
        message: normalize_text(&text),
        text,
        extra_values,
        attachments: f.value(Field::Attachments),
        random_id: f.int(Field::RandomId),
        ..Message::default()
    }
}

fn read_mark(f: &Fields<'_>) -> ReadMark {
    ReadMark {
        peer_id: f.int(Field::PeerId),
        local_id: f.int(Field::LocalId),
    }
}

fn peer_flags(f: &Fields<'_>, field: Field) -> PeerFlagsChange {
    PeerFlagsChange {
        peer_id: f.int(Field::PeerId),
        flags: f.int(field),
    }
}
