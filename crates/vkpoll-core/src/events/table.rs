//! Static dispatch table for long-poll array updates: type code -> ordered fields.

use serde_json::{Map, Value};

use crate::utils::{lenient_i64, lenient_string};

/// A named position in a long-poll update array.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Field {
    MessageId,
    Flags,
    Mask,
    PeerId,
    Timestamp,
    Text,
    ExtraValues,
    Attachments,
    RandomId,
    LocalId,
    UserId,
    Extra,
    ChatId,
    SelfFlag,
    TypeId,
    Info,
    CallId,
    Count,
    Values,
}

use Field::*;

const MESSAGE_WITH_FLAGS: &[Field] = &[
    MessageId,
    Flags,
    PeerId,
    Timestamp,
    Text,
    ExtraValues,
    Attachments,
    RandomId,
];
const MESSAGE_WITH_MASK: &[Field] = &[
    MessageId,
    Mask,
    PeerId,
    Timestamp,
    Text,
    ExtraValues,
    Attachments,
    RandomId,
];

/// Known long-poll type codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventCode {
    MessageFlagsReplace,
    MessageFlagsSet,
    MessageFlagsReset,
    MessageNew,
    MessageEdit,
    ReadAllIncoming,
    ReadAllOutgoing,
    UserOnline,
    UserOffline,
    PeerFlagsReset,
    PeerFlagsReplace,
    PeerFlagsSet,
    PeerDeleteAll,
    PeerRestoreAll,
    ChatEdit,
    ChatUpdate,
    UserTyping,
    UserTypingInChat,
    UserRecordingVoice,
    UserCall,
    MessagesCounterUpdate,
    NotificationSettingsUpdate,
}

impl EventCode {
    pub fn from_code(code: i64) -> Option<Self> {
        let c = match code {
            1 => EventCode::MessageFlagsReplace,
            2 => EventCode::MessageFlagsSet,
            3 => EventCode::MessageFlagsReset,
            4 => EventCode::MessageNew,
            5 => EventCode::MessageEdit,
            6 => EventCode::ReadAllIncoming,
            7 => EventCode::ReadAllOutgoing,
            8 => EventCode::UserOnline,
            9 => EventCode::UserOffline,
            10 => EventCode::PeerFlagsReset,
            11 => EventCode::PeerFlagsReplace,
            12 => EventCode::PeerFlagsSet,
            13 => EventCode::PeerDeleteAll,
            14 => EventCode::PeerRestoreAll,
            51 => EventCode::ChatEdit,
            52 => EventCode::ChatUpdate,
            61 => EventCode::UserTyping,
            62 => EventCode::UserTypingInChat,
            64 => EventCode::UserRecordingVoice,
            70 => EventCode::UserCall,
            80 => EventCode::MessagesCounterUpdate,
            114 => EventCode::NotificationSettingsUpdate,
            _ => return None,
        };
        Some(c)
    }

    /// Field names for `raw[1..]`, in order.
    pub fn fields(self) -> &'static [Field] {
        match self {
            EventCode::MessageFlagsReplace | EventCode::MessageNew => MESSAGE_WITH_FLAGS,
            EventCode::MessageFlagsSet | EventCode::MessageFlagsReset | EventCode::MessageEdit => {
                MESSAGE_WITH_MASK
            }
            EventCode::ReadAllIncoming
            | EventCode::ReadAllOutgoing
            | EventCode::PeerDeleteAll
            | EventCode::PeerRestoreAll => &[PeerId, LocalId],
            EventCode::UserOnline => &[UserId, Extra, Timestamp],
            EventCode::UserOffline => &[UserId, Flags, Timestamp],
            EventCode::PeerFlagsReset | EventCode::PeerFlagsSet => &[PeerId, Mask],
            EventCode::PeerFlagsReplace => &[PeerId, Flags],
            EventCode::ChatEdit => &[ChatId, SelfFlag],
            EventCode::ChatUpdate => &[TypeId, PeerId, Info],
            EventCode::UserTyping => &[UserId, Flags],
            EventCode::UserTypingInChat => &[UserId, ChatId],
            EventCode::UserRecordingVoice => &[PeerId, UserId, Flags, Timestamp],
            EventCode::UserCall => &[UserId, CallId],
            EventCode::MessagesCounterUpdate => &[Count],
            EventCode::NotificationSettingsUpdate => &[Values],
        }
    }
}

/// Positional values bound to field names.
///
/// Binding stops at the shorter of the two lists; surplus values or names are
/// ignored.
#[derive(Debug)]
pub struct Fields<'a> {
    bound: Vec<(Field, &'a Value)>,
}

impl<'a> Fields<'a> {
    pub fn bind(names: &'static [Field], values: &'a [Value]) -> Self {
        Self {
            bound: names.iter().copied().zip(values.iter()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.bound.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bound.is_empty()
    }

    pub fn get(&self, field: Field) -> Option<&'a Value> {
        self.bound
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, v)| *v)
    }

    pub fn int(&self, field: Field) -> Option<i64> {
        self.get(field).and_then(lenient_i64)
    }

    pub fn string(&self, field: Field) -> Option<String> {
        self.get(field).and_then(lenient_string)
    }

    pub fn object(&self, field: Field) -> Map<String, Value> {
        match self.get(field) {
            Some(Value::Object(m)) => m.clone(),
            _ => Map::new(),
        }
    }

    pub fn value(&self, field: Field) -> Value {
        self.get(field).cloned().unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn every_known_code_round_trips_through_the_table() {
        for code in [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 51, 52, 61, 62, 64, 70, 80, 114] {
            let c = EventCode::from_code(code).expect("known code");
            assert!(!c.fields().is_empty(), "code {code} has fields");
        }
        assert_eq!(EventCode::from_code(63), None);
        assert_eq!(EventCode::from_code(0), None);
    }

    #[test]
    fn bind_truncates_to_the_shorter_side() {
        let values = vec![json!(5), json!(1)];
        let f = Fields::bind(EventCode::MessageNew.fields(), &values);
        assert_eq!(f.len(), 2);
        assert_eq!(f.int(MessageId), Some(5));
        assert_eq!(f.int(Flags), Some(1));
        assert_eq!(f.get(PeerId), None);

        let values = vec![json!(1), json!(2), json!(3), json!(4)];
        let f = Fields::bind(EventCode::UserTyping.fields(), &values);
        assert_eq!(f.len(), 2);
    }
}
