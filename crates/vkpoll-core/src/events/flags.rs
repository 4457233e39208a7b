//! Protocol constants: flag bits, platform ids, offline reasons, chat sub-types.

use serde::{Deserialize, Serialize};

/// Message flag bits carried by message events (codes 1-5).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageFlag {
    Unread,
    Outbox,
    Replied,
    Important,
    Chat,
    Friends,
    Spam,
    Deleted,
    Fixed,
    Media,
    Hidden,
    DeletedAll,
}

impl MessageFlag {
    pub const ALL: [MessageFlag; 12] = [
        MessageFlag::Unread,
        MessageFlag::Outbox,
        MessageFlag::Replied,
        MessageFlag::Important,
        MessageFlag::Chat,
        MessageFlag::Friends,
        MessageFlag::Spam,
        MessageFlag::Deleted,
        MessageFlag::Fixed,
        MessageFlag::Media,
        MessageFlag::Hidden,
        MessageFlag::DeletedAll,
    ];

    pub const fn bit(self) -> i64 {
        match self {
            MessageFlag::Unread => 1,
            MessageFlag::Outbox => 1 << 1,
            MessageFlag::Replied => 1 << 2,
            MessageFlag::Important => 1 << 3,
            MessageFlag::Chat => 1 << 4,
            MessageFlag::Friends => 1 << 5,
            MessageFlag::Spam => 1 << 6,
            MessageFlag::Deleted => 1 << 7,
            MessageFlag::Fixed => 1 << 8,
            MessageFlag::Media => 1 << 9,
            MessageFlag::Hidden => 1 << 16,
            MessageFlag::DeletedAll => 1 << 17,
        }
    }

    /// Known bits set in `flags`, in ascending bit order. Unknown bits are ignored.
    pub fn decompose(flags: i64) -> Vec<MessageFlag> {
        Self::ALL
            .into_iter()
            .filter(|f| flags & f.bit() != 0)
            .collect()
    }

    pub fn compose(flags: &[MessageFlag]) -> i64 {
        flags.iter().fold(0, |acc, f| acc | f.bit())
    }
}

/// Dialog flag bits carried by peer-flag events (codes 10-12).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeerFlag {
    Important,
    Unanswered,
}

impl PeerFlag {
    pub const ALL: [PeerFlag; 2] = [PeerFlag::Important, PeerFlag::Unanswered];

    pub const fn bit(self) -> i64 {
        match self {
            PeerFlag::Important => 1,
            PeerFlag::Unanswered => 1 << 1,
        }
    }

    pub fn decompose(flags: i64) -> Vec<PeerFlag> {
        Self::ALL
            .into_iter()
            .filter(|f| flags & f.bit() != 0)
            .collect()
    }

    pub fn compose(flags: &[PeerFlag]) -> i64 {
        flags.iter().fold(0, |acc, f| acc | f.bit())
    }
}

/// Platform a friend came online from (low byte of `extra` in code 8).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Platform {
    Mobile,
    Iphone,
    Ipad,
    Android,
    WindowsPhone,
    Windows,
    Web,
    Other(i64),
}

impl Platform {
    pub fn from_extra(extra: i64) -> Self {
        match extra & 0xFF {
            1 => Platform::Mobile,
            2 => Platform::Iphone,
            3 => Platform::Ipad,
            4 => Platform::Android,
            5 => Platform::WindowsPhone,
            6 => Platform::Windows,
            7 => Platform::Web,
            other => Platform::Other(other),
        }
    }
}

/// Why a friend went offline (code 9 `flags`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OfflineReason {
    /// Left the site.
    Exit,
    /// Timed out.
    Away,
    Other(i64),
}

impl OfflineReason {
    pub fn from_flags(flags: i64) -> Self {
        match flags {
            0 => OfflineReason::Exit,
            1 => OfflineReason::Away,
            other => OfflineReason::Other(other),
        }
    }
}

/// Sub-type of a chat update (code 52 `type_id`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChatUpdateKind {
    Title,
    Photo,
    AdminAdded,
    SettingsChanged,
    MessagePinned,
    UserJoined,
    UserLeft,
    UserKicked,
    AdminRemoved,
    KeyboardReceived,
    Other(i64),
}

impl ChatUpdateKind {
    pub fn from_type_id(type_id: i64) -> Self {
        match type_id {
            1 => ChatUpdateKind::Title,
            2 => ChatUpdateKind::Photo,
            3 => ChatUpdateKind::AdminAdded,
            4 => ChatUpdateKind::SettingsChanged,
            5 => ChatUpdateKind::MessagePinned,
            6 => ChatUpdateKind::UserJoined,
            7 => ChatUpdateKind::UserLeft,
            8 => ChatUpdateKind::UserKicked,
            9 => ChatUpdateKind::AdminRemoved,
            11 => ChatUpdateKind::KeyboardReceived,
            other => ChatUpdateKind::Other(other),
        }
    }
}

/// Extra answer options for the user long-poll (`mode` parameter).
pub struct LongPollMode;

impl LongPollMode {
    pub const GET_ATTACHMENTS: u32 = 2;
    pub const GET_EXTENDED: u32 = 1 << 3;
    pub const GET_PTS: u32 = 1 << 5;
    /// Platform id in `extra` of code 8.
    pub const GET_EXTRA_ONLINE: u32 = 1 << 6;
    pub const GET_RANDOM_ID: u32 = 1 << 7;

    pub const DEFAULT: u32 = Self::GET_ATTACHMENTS
        | Self::GET_EXTENDED
        | Self::GET_PTS
        | Self::GET_EXTRA_ONLINE
        | Self::GET_RANDOM_ID;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decompose_keeps_only_known_bits() {
        let flags = 1 | 2 | 512 | (1 << 12) | (1 << 17);
        assert_eq!(
            MessageFlag::decompose(flags),
            vec![
                MessageFlag::Unread,
                MessageFlag::Outbox,
                MessageFlag::Media,
                MessageFlag::DeletedAll
            ]
        );
    }

    #[test]
    fn compose_restores_known_bits() {
        let known = MessageFlag::compose(&MessageFlag::ALL);
        for f in [0_i64, 3, 531, 0x3_03FF, 0x7FFF_FFFF, -1] {
            assert_eq!(
                MessageFlag::compose(&MessageFlag::decompose(f)),
                f & known,
                "flags {f:#x}"
            );
        }
        assert_eq!(PeerFlag::compose(&PeerFlag::decompose(7)), 3);
    }

    #[test]
    fn platform_reads_low_byte_and_keeps_unknowns() {
        assert_eq!(Platform::from_extra(0x0104), Platform::Android);
        assert_eq!(Platform::from_extra(7), Platform::Web);
        assert_eq!(Platform::from_extra(0x20), Platform::Other(0x20));
    }

    #[test]
    fn offline_reason_and_chat_kind_degrade_to_other() {
        assert_eq!(OfflineReason::from_flags(1), OfflineReason::Away);
        assert_eq!(OfflineReason::from_flags(9), OfflineReason::Other(9));
        assert_eq!(ChatUpdateKind::from_type_id(10), ChatUpdateKind::Other(10));
        assert_eq!(ChatUpdateKind::from_type_id(5), ChatUpdateKind::MessagePinned);
    }

    #[test]
    fn default_mode_matches_protocol_sum() {
        assert_eq!(LongPollMode::DEFAULT, 234);
    }
}
