/// Peer ids above this value address multi-user chats (`peer_id = offset + chat_id`).
pub const CHAT_PEER_OFFSET: i64 = 2_000_000_000;

/// VK user id (numeric, positive).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UserId(pub i64);

/// VK chat id (local to the account, without the peer offset).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

/// VK community id (positive; the matching peer id is negative).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GroupId(pub i64);

/// Who a conversation is with, derived from a `peer_id`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Peer {
    User {
        user_id: UserId,
    },
    Chat {
        chat_id: ChatId,
        /// Author inside the chat, when the event carries it (`extra_values.from`).
        user_id: Option<UserId>,
    },
    Group {
        group_id: GroupId,
    },
    #[default]
    Unknown,
}

impl Peer {
    /// Negative ids are communities, ids above [`CHAT_PEER_OFFSET`] are chats,
    /// everything else is a direct dialog with a user.
    pub fn classify(peer_id: i64, chat_author: Option<i64>) -> Self {
        if peer_id < 0 {
            Peer::Group {
                group_id: GroupId(peer_id.saturating_abs()),
            }
        } else if peer_id > CHAT_PEER_OFFSET {
            Peer::Chat {
                chat_id: ChatId(peer_id - CHAT_PEER_OFFSET),
                user_id: chat_author.map(UserId),
            }
        } else {
            Peer::User {
                user_id: UserId(peer_id),
            }
        }
    }

    /// Inverse of [`Peer::classify`].
    pub fn peer_id(&self) -> Option<i64> {
        match self {
            Peer::User { user_id } => Some(user_id.0),
            Peer::Chat { chat_id, .. } => Some(chat_id.0 + CHAT_PEER_OFFSET),
            Peer::Group { group_id } => Some(-group_id.0),
            Peer::Unknown => None,
        }
    }

    pub fn is_user(&self) -> bool {
        matches!(self, Peer::User { .. })
    }

    pub fn is_chat(&self) -> bool {
        matches!(self, Peer::Chat { .. })
    }

    pub fn is_group(&self) -> bool {
        matches!(self, Peer::Group { .. })
    }

    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Peer::User { user_id } => Some(*user_id),
            Peer::Chat { user_id, .. } => *user_id,
            _ => None,
        }
    }

    pub fn group_id(&self) -> Option<GroupId> {
        match self {
            Peer::Group { group_id } => Some(*group_id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_peer_is_group() {
        assert_eq!(
            Peer::classify(-123, None),
            Peer::Group {
                group_id: GroupId(123)
            }
        );
    }

    #[test]
    fn large_peer_is_chat_with_optional_author() {
        assert_eq!(
            Peer::classify(CHAT_PEER_OFFSET + 7, Some(42)),
            Peer::Chat {
                chat_id: ChatId(7),
                user_id: Some(UserId(42)),
            }
        );
        assert_eq!(Peer::classify(CHAT_PEER_OFFSET + 7, None).user_id(), None);
    }

    #[test]
    fn offset_itself_is_still_a_user() {
        assert!(Peer::classify(CHAT_PEER_OFFSET, None).is_user());
        assert!(Peer::classify(0, None).is_user());
    }

    #[test]
    fn classify_then_peer_id_round_trips() {
        for p in [-5_i64, -1, 0, 1, 99_999, CHAT_PEER_OFFSET, CHAT_PEER_OFFSET + 1] {
            assert_eq!(Peer::classify(p, None).peer_id(), Some(p), "peer {p}");
        }
    }
}
