use std::fmt;

use serde::{Deserialize, Serialize};

use kinship_shared::{Error, Result, Timestamp, UserId};

use crate::conversation::ConversationMessage;

/// A direct message between two users.
///
/// Messages have no id of their own; two messages are equal when sender,
/// receiver, content and timestamp match. The read flag is not part of
/// equality.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "MessageFields")]
pub struct Message {
    sender_id: UserId,
    receiver_id: UserId,
    content: String,
    timestamp: Timestamp,
    read: bool,
}

impl Message {
    pub fn new(
        sender_id: UserId,
        receiver_id: UserId,
        content: impl Into<String>,
        timestamp: Timestamp,
    ) -> Result<Self> {
        let content = content.into();
        if content.is_empty() {
            return Err(Error::validation("Message content cannot be empty"));
        }
        if !timestamp.is_valid() {
            return Err(Error::validation(format!("Invalid timestamp: {timestamp}")));
        }
        if !sender_id.is_valid() || !receiver_id.is_valid() {
            return Err(Error::validation("Invalid user ID"));
        }
        Ok(Self {
            sender_id,
            receiver_id,
            content,
            timestamp,
            read: false,
        })
    }

    pub fn sender_id(&self) -> UserId {
        self.sender_id
    }

    pub fn receiver_id(&self) -> UserId {
        self.receiver_id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn is_read(&self) -> bool {
        self.read
    }

    /// Once read, a message stays read.
    pub fn mark_as_read(&mut self) {
        self.read = true;
    }
}

impl ConversationMessage for Message {
    fn sender_id(&self) -> UserId {
        self.sender_id
    }

    fn receiver_id(&self) -> UserId {
        self.receiver_id
    }

    fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    fn is_read(&self) -> bool {
        self.read
    }

    fn mark_as_read(&mut self) {
        self.read = true;
    }
}

impl PartialEq for Message {
    fn eq(&self, other: &Self) -> bool {
        self.timestamp == other.timestamp
            && self.sender_id == other.sender_id
            && self.receiver_id == other.receiver_id
            && self.content == other.content
    }
}

impl Eq for Message {}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "From: User #{}", self.sender_id)?;
        writeln!(f, "To: User #{}", self.receiver_id)?;
        writeln!(f, "Content: {}", self.content)?;
        writeln!(f, "Time: {}", self.timestamp)?;
        write!(f, "Status: {}", if self.read { "Read" } else { "Unread" })
    }
}

#[derive(Deserialize)]
struct MessageFields {
    sender_id: UserId,
    receiver_id: UserId,
    content: String,
    timestamp: Timestamp,
    read: bool,
}

impl TryFrom<MessageFields> for Message {
    type Error = Error;

    fn try_from(fields: MessageFields) -> Result<Self> {
        let mut message = Message::new(
            fields.sender_id,
            fields.receiver_id,
            fields.content,
            fields.timestamp,
        )?;
        if fields.read {
            message.mark_as_read();
        }
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts() -> Timestamp {
        Timestamp::with_time(2, 1, 2025, 1, 22, 52)
    }

    #[test]
    fn test_new_message_is_unread() {
        let msg = Message::new(UserId(1), UserId(2), "Hello!", ts()).unwrap();
        assert_eq!(msg.sender_id(), UserId(1));
        assert_eq!(msg.receiver_id(), UserId(2));
        assert!(!msg.is_read());
    }

    #[test]
    fn test_invalid_message() {
        assert!(Message::new(UserId(1), UserId(2), "", ts()).is_err());
        assert!(Message::new(UserId(0), UserId(2), "x", ts()).is_err());
        assert!(Message::new(UserId(1), UserId(-2), "x", ts()).is_err());
        let bad = Timestamp::new(31, 4, 2025);
        assert!(Message::new(UserId(1), UserId(2), "x", bad).is_err());
    }

    #[test]
    fn test_read_flag_is_sticky() {
        let mut msg = Message::new(UserId(1), UserId(2), "Hello!", ts()).unwrap();
        msg.mark_as_read();
        msg.mark_as_read();
        assert!(msg.is_read());
        assert!(msg.to_string().ends_with("Status: Read"));
    }

    #[test]
    fn test_equality_ignores_read_flag() {
        let a = Message::new(UserId(1), UserId(2), "Hello!", ts()).unwrap();
        let mut b = a.clone();
        b.mark_as_read();
        assert_eq!(a, b);
        let c = Message::new(UserId(2), UserId(1), "Hello!", ts()).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn test_deserialize_keeps_read_flag() {
        let mut msg = Message::new(UserId(1), UserId(2), "Hello!", ts()).unwrap();
        msg.mark_as_read();
        let json = serde_json::to_string(&msg).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert!(back.is_read());
        assert_eq!(back, msg);

        let anonymous = json.replace("\"sender_id\":1", "\"sender_id\":0");
        assert!(serde_json::from_str::<Message>(&anonymous).is_err());
    }
}
