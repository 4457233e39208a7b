use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::domain::Peer;

use super::flags::{ChatUpdateKind, MessageFlag, OfflineReason, PeerFlag, Platform};

/// One decoded update, whichever path it arrived on.
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    pub kind: EventKind,
    pub peer: Peer,
    pub message_flags: Vec<MessageFlag>,
    pub peer_flags: Vec<PeerFlag>,
    pub timestamp: Option<i64>,
    pub datetime: Option<DateTime<Utc>>,
    /// Webhook envelope; `None` for long-poll array updates.
    pub callback: Option<CallbackMeta>,
    /// The update exactly as received.
    pub raw: Value,
}

/// The discriminating `type` of an event: numeric for long-poll arrays,
/// a string tag for webhook objects.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EventType {
    Code(i64),
    Name(String),
    Unknown,
}

#[derive(Clone, Debug, PartialEq)]
pub enum EventKind {
    MessageFlagsReplace(Message),
    MessageFlagsSet(Message),
    MessageFlagsReset(Message),
    MessageNew(Message),
    MessageEdit(Message),
    /// Webhook only: a message sent by the community itself.
    MessageReply(Message),
    ReadAllIncoming(ReadMark),
    ReadAllOutgoing(ReadMark),
    UserOnline(OnlineStatus),
    UserOffline(OfflineStatus),
    PeerFlagsReset(PeerFlagsChange),
    PeerFlagsReplace(PeerFlagsChange),
    PeerFlagsSet(PeerFlagsChange),
    PeerDeleteAll(ReadMark),
    PeerRestoreAll(ReadMark),
    ChatEdit(ChatEdit),
    ChatUpdate(ChatUpdate),
    UserTyping(Typing),
    UserTypingInChat(Typing),
    UserRecordingVoice(RecordingVoice),
    UserCall(Call),
    MessagesCounterUpdate { count: Option<i64> },
    NotificationSettingsUpdate(NotificationSettings),
    /// Webhook object with a tag we do not decode further.
    Callback { object: Value },
    /// Unknown or malformed type code, kept verbatim.
    Raw { type_code: Value },
}

/// Message payload shared by long-poll codes 1-5 and webhook messages.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Message {
    pub message_id: Option<i64>,
    pub conversation_message_id: Option<i64>,
    pub peer_id: Option<i64>,
    pub from_id: Option<i64>,
    pub flags: Option<i64>,
    pub mask: Option<i64>,
    pub timestamp: Option<i64>,
    /// HTML-escaped text as delivered.
    pub text: String,
    /// Human-readable text: `<br>` turned into newlines, entities unescaped.
    pub message: String,
    pub extra_values: Map<String, Value>,
    /// Long-poll: attachment descriptor object. Webhook: attachment list.
    pub attachments: Value,
    /// `"{type}{owner_id}_{id}"` for each webhook attachment.
    pub attachment_ids: Vec<String>,
    pub fwd_messages: Vec<Value>,
    pub random_id: Option<i64>,
    pub from_me: bool,
    pub to_me: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReadMark {
    pub peer_id: Option<i64>,
    pub local_id: Option<i64>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OnlineStatus {
    pub user_id: Option<i64>,
    pub extra: Option<i64>,
    pub timestamp: Option<i64>,
    pub platform: Option<Platform>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OfflineStatus {
    pub user_id: Option<i64>,
    pub flags: Option<i64>,
    pub timestamp: Option<i64>,
    pub reason: Option<OfflineReason>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PeerFlagsChange {
    pub peer_id: Option<i64>,
    /// `flags` for replace, `mask` for set/reset.
    pub flags: Option<i64>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChatEdit {
    pub chat_id: Option<i64>,
    /// Whether the change was made by the account itself.
    pub by_self: Option<bool>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChatUpdate {
    pub type_id: Option<i64>,
    pub peer_id: Option<i64>,
    pub update: Option<ChatUpdateKind>,
    pub info: ChatInfo,
}

/// The `info` payload of a chat update, interpreted by sub-type.
#[derive(Clone, Debug, PartialEq)]
pub enum ChatInfo {
    AdminAdded { admin_id: i64 },
    MessagePinned { conversation_message_id: i64 },
    Member { user_id: i64 },
    Raw(Value),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Typing {
    pub user_id: Option<i64>,
    pub chat_id: Option<i64>,
    pub flags: Option<i64>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecordingVoice {
    pub peer_id: Option<i64>,
    pub user_id: Option<i64>,
    pub flags: Option<i64>,
    pub timestamp: Option<i64>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Call {
    pub user_id: Option<i64>,
    pub call_id: Value,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct NotificationSettings {
    pub peer_id: Option<i64>,
    pub sound: Option<bool>,
    pub disabled_until: Option<i64>,
    pub values: Map<String, Value>,
}

/// Envelope fields of a webhook / group long-poll object.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CallbackMeta {
    pub event_type: String,
    pub group_id: Option<i64>,
    pub event_id: Option<String>,
    pub v: Option<String>,
    pub client_info: Map<String, Value>,
}

impl EventKind {
    pub fn message(&self) -> Option<&Message> {
        match self {
            EventKind::MessageFlagsReplace(m)
            | EventKind::MessageFlagsSet(m)
            | EventKind::MessageFlagsReset(m)
            | EventKind::MessageNew(m)
            | EventKind::MessageEdit(m)
            | EventKind::MessageReply(m) => Some(m),
            _ => None,
        }
    }

    /// Long-poll type code for this kind, if it has one.
    pub fn code(&self) -> Option<i64> {
        let code = match self {
            EventKind::MessageFlagsReplace(_) => 1,
            EventKind::MessageFlagsSet(_) => 2,
            EventKind::MessageFlagsReset(_) => 3,
            EventKind::MessageNew(_) => 4,
            EventKind::MessageEdit(_) => 5,
            EventKind::ReadAllIncoming(_) => 6,
            EventKind::ReadAllOutgoing(_) => 7,
            EventKind::UserOnline(_) => 8,
            EventKind::UserOffline(_) => 9,
            EventKind::PeerFlagsReset(_) => 10,
            EventKind::PeerFlagsReplace(_) => 11,
            EventKind::PeerFlagsSet(_) => 12,
            EventKind::PeerDeleteAll(_) => 13,
            EventKind::PeerRestoreAll(_) => 14,
            EventKind::ChatEdit(_) => 51,
            EventKind::ChatUpdate(_) => 52,
            EventKind::UserTyping(_) => 61,
            EventKind::UserTypingInChat(_) => 62,
            EventKind::UserRecordingVoice(_) => 64,
            EventKind::UserCall(_) => 70,
            EventKind::MessagesCounterUpdate { .. } => 80,
            EventKind::NotificationSettingsUpdate(_) => 114,
            EventKind::MessageReply(_) | EventKind::Callback { .. } | EventKind::Raw { .. } => {
                return None
            }
        };
        Some(code)
    }
}

impl Event {
    pub fn event_type(&self) -> EventType {
        if let Some(cb) = &self.callback {
            return EventType::Name(cb.event_type.clone());
        }
        if let Some(code) = self.kind.code() {
            return EventType::Code(code);
        }
        match &self.kind {
            EventKind::Raw { type_code } => match type_code {
                Value::Number(n) => n.as_i64().map(EventType::Code).unwrap_or(EventType::Unknown),
                Value::String(s) => EventType::Name(s.clone()),
                _ => EventType::Unknown,
            },
            _ => EventType::Unknown,
        }
    }

    pub fn message(&self) -> Option<&Message> {
        self.kind.message()
    }

    pub fn is_raw(&self) -> bool {
        matches!(self.kind, EventKind::Raw { .. })
    }

    pub fn from_me(&self) -> bool {
        self.message().is_some_and(|m| m.from_me)
    }

    pub fn to_me(&self) -> bool {
        self.message().is_some_and(|m| m.to_me)
    }

    /// Community scope used for message lookups.
    pub fn group_id(&self) -> Option<i64> {
        self.callback
            .as_ref()
            .and_then(|cb| cb.group_id)
            .or_else(|| self.peer.group_id().map(|g| g.0))
    }
}
