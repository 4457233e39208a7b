//! Flat serialized form of an [`Event`] for storage or hand-off to other processes.
//!
//! Only `raw` is authoritative: loading re-runs the decoder on it and ignores
//! the stored derived fields, which exist for readers that do not link this
//! crate.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::Result;

use super::{
    decode_update,
    flags::{MessageFlag, PeerFlag},
    types::{Event, EventType},
};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedEvent {
    /// Numeric long-poll code or webhook tag. Sole source of truth for the type.
    #[serde(rename = "type")]
    pub event_type: Value,
    pub raw: Value,

    pub from_user: bool,
    pub from_chat: bool,
    pub from_group: bool,
    pub from_me: bool,
    pub to_me: bool,

    pub message_id: Option<i64>,
    pub peer_id: Option<i64>,
    pub user_id: Option<i64>,
    pub chat_id: Option<i64>,
    pub group_id: Option<i64>,
    pub flags: Option<i64>,
    pub timestamp: Option<i64>,
    pub datetime: Option<String>,

    pub text: Option<String>,
    pub message: Option<String>,
    pub message_flags: Vec<MessageFlag>,
    pub peer_flags: Vec<PeerFlag>,
    pub extra_values: Map<String, Value>,
    pub attachments: Value,
    pub attachment_ids: Vec<String>,
    pub fwd_messages: Vec<Value>,
}

impl Event {
    pub fn to_persisted(&self) -> PersistedEvent {
        let event_type = match self.event_type() {
            EventType::Code(c) => Value::from(c),
            EventType::Name(n) => Value::String(n),
            EventType::Unknown => Value::Null,
        };
        let msg = self.message();

        PersistedEvent {
            event_type,
            raw: self.raw.clone(),
            from_user: self.peer.is_user(),
            from_chat: self.peer.is_chat(),
            from_group: self.peer.is_group(),
            from_me: self.from_me(),
            to_me: self.to_me(),
            message_id: msg.and_then(|m| m.message_id),
            peer_id: self.peer.peer_id(),
            user_id: self.peer.user_id().map(|u| u.0),
            chat_id: match self.peer {
                crate::domain::Peer::Chat { chat_id, .. } => Some(chat_id.0),
                _ => None,
            },
            group_id: self.group_id(),
            flags: msg.and_then(|m| m.flags.or(m.mask)),
            timestamp: self.timestamp,
            datetime: self.datetime.map(|d| d.to_rfc3339()),
            text: msg.map(|m| m.text.clone()),
            message: msg.map(|m| m.message.clone()),
            message_flags: self.message_flags.clone(),
            peer_flags: self.peer_flags.clone(),
            extra_values: msg.map(|m| m.extra_values.clone()).unwrap_or_default(),
            attachments: msg.map(|m| m.attachments.clone()).unwrap_or(Value::Null),
            attachment_ids: msg.map(|m| m.attachment_ids.clone()).unwrap_or_default(),
            fwd_messages: msg.map(|m| m.fwd_messages.clone()).unwrap_or_default(),
        }
    }

    /// Rebuild an event from its persisted form by decoding `raw` again.
    pub fn from_persisted(p: &PersistedEvent) -> Event {
        decode_update(&p.raw)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_persisted())?)
    }

    pub fn from_json(s: &str) -> Result<Event> {
        let p: PersistedEvent = serde_json::from_str(s)?;
        Ok(Event::from_persisted(&p))
    }
}
