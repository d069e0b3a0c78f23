use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::profile::ValidationError;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Message {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

impl Message {
    /// Whether the message belongs to the conversation between `a` and `b`,
    /// in either direction.
    pub fn is_between(&self, a: Uuid, b: Uuid) -> bool {
        (self.sender_id == a && self.receiver_id == b)
            || (self.sender_id == b && self.receiver_id == a)
    }

    pub fn is_unread_by(&self, reader: Uuid) -> bool {
        self.receiver_id == reader && self.read_at.is_none()
    }

    /// The other participant, from the point of view of `user`.
    pub fn counterpart(&self, user: Uuid) -> Uuid {
        if self.sender_id == user {
            self.receiver_id
        } else {
            self.sender_id
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    sender_id: Uuid,
    receiver_id: Uuid,
    content: String,
}

impl NewMessage {
    pub fn new(sender_id: Uuid, receiver_id: Uuid, content: &str) -> Result<Self, ValidationError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ValidationError::Missing { field: "content" });
        }
        Ok(Self {
            sender_id,
            receiver_id,
            content: content.to_owned(),
        })
    }

    pub fn into_message(self) -> Message {
        Message {
            id: Uuid::new_v4(),
            sender_id: self.sender_id,
            receiver_id: self.receiver_id,
            content: self.content,
            created_at: Utc::now(),
            read_at: None,
        }
    }
}

/// One row of the admin inbox: a user and the last message exchanged with them.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InboxEntry {
    pub user_id: Uuid,
    pub display_name: String,
    pub last_message: Option<Message>,
    pub unread: u32,
}
