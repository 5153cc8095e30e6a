//! Direct-message conversations.
//!
//! A [`Conversation`] gates message insertion on its *current* participant
//! list and keeps messages ordered by timestamp. Removing a participant never
//! rewrites history; it only blocks future messages involving that user.

use serde::{Deserialize, Serialize};
use tracing::debug;

use kinship_shared::{ConversationId, Error, Result, Timestamp, UserId};

/// What a conversation needs to know about the messages it holds.
pub trait ConversationMessage {
    fn sender_id(&self) -> UserId;
    fn receiver_id(&self) -> UserId;
    fn timestamp(&self) -> Timestamp;
    fn is_read(&self) -> bool;
    fn mark_as_read(&mut self);
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(
    try_from = "ConversationFields<M>",
    bound(deserialize = "M: Deserialize<'de> + ConversationMessage")
)]
pub struct Conversation<M> {
    id: ConversationId,
    participants: Vec<UserId>,
    messages: Vec<M>,
}

impl<M: ConversationMessage> Conversation<M> {
    /// Start a conversation. Participants must be non-empty, positive and
    /// distinct.
    pub fn new(id: ConversationId, participants: Vec<UserId>) -> Result<Self> {
        if participants.is_empty() {
            return Err(Error::validation("Conversation needs at least one participant"));
        }
        Self::from_parts(id, participants, Vec::new())
    }

    /// Rebuild a conversation from stored state. Messages are taken as-is:
    /// their senders may have left since they were sent.
    pub(crate) fn from_parts(
        id: ConversationId,
        participants: Vec<UserId>,
        messages: Vec<M>,
    ) -> Result<Self> {
        if !id.is_valid() {
            return Err(Error::validation("Invalid conversation ID"));
        }
        if participants.iter().any(|p| !p.is_valid()) {
            return Err(Error::validation("Invalid participant ID"));
        }
        let mut seen = participants.clone();
        seen.sort_unstable();
        seen.dedup();
        if seen.len() != participants.len() {
            return Err(Error::validation("Duplicate participant"));
        }
        let mut conversation = Self {
            id,
            participants,
            messages,
        };
        conversation.sort_messages();
        Ok(conversation)
    }

    pub fn id(&self) -> ConversationId {
        self.id
    }

    pub fn participants(&self) -> &[UserId] {
        &self.participants
    }

    pub fn messages(&self) -> &[M] {
        &self.messages
    }

    // ------------------------------------------------------------------
    // Messages
    // ------------------------------------------------------------------

    /// Insert a message whose sender and receiver are both current
    /// participants, then restore timestamp order.
    pub fn add_message(&mut self, message: M) -> Result<()> {
        if !self.is_participant(message.sender_id()) || !self.is_participant(message.receiver_id()) {
            return Err(Error::validation(
                "Message sender or receiver is not a participant",
            ));
        }
        debug!(
            conversation = %self.id,
            sender = %message.sender_id(),
            receiver = %message.receiver_id(),
            "adding message"
        );
        self.messages.push(message);
        self.sort_messages();
        Ok(())
    }

    /// Messages sent by `user`, in conversation order.
    pub fn messages_by_user(&self, user: UserId) -> Vec<&M> {
        self.messages
            .iter()
            .filter(|m| m.sender_id() == user)
            .collect()
    }

    /// Messages addressed to `user` that are still unread.
    pub fn unread_messages(&self, user: UserId) -> Vec<&M> {
        self.messages
            .iter()
            .filter(|m| m.receiver_id() == user && !m.is_read())
            .collect()
    }

    /// Mark everything addressed to `user` as read. Returns how many messages
    /// changed state.
    pub fn mark_read_for(&mut self, user: UserId) -> usize {
        let mut marked = 0;
        for message in self
            .messages
            .iter_mut()
            .filter(|m| m.receiver_id() == user && !m.is_read())
        {
            message.mark_as_read();
            marked += 1;
        }
        marked
    }

    // ------------------------------------------------------------------
    // Participants
    // ------------------------------------------------------------------

    pub fn add_participant(&mut self, user: UserId) -> Result<()> {
        if !user.is_valid() {
            return Err(Error::validation("Invalid user ID"));
        }
        if self.is_participant(user) {
            return Err(Error::validation("User is already a participant"));
        }
        self.participants.push(user);
        Ok(())
    }

    /// Remove `user` if present. Earlier messages are kept.
    pub fn remove_participant(&mut self, user: UserId) {
        self.participants.retain(|p| *p != user);
    }

    pub fn is_participant(&self, user: UserId) -> bool {
        self.participants.contains(&user)
    }

    // `sort_by_key` is stable, so equal timestamps keep insertion order.
    fn sort_messages(&mut self) {
        self.messages.sort_by_key(|m| m.timestamp());
    }
}

/// Wire shape of a [`Conversation`]; rebuilt like a stored record, so
/// participants are re-validated and messages re-sorted.
#[derive(Deserialize)]
struct ConversationFields<M> {
    id: ConversationId,
    participants: Vec<UserId>,
    messages: Vec<M>,
}

impl<M: ConversationMessage> TryFrom<ConversationFields<M>> for Conversation<M> {
    type Error = Error;

    fn try_from(fields: ConversationFields<M>) -> Result<Self> {
        Self::from_parts(fields.id, fields.participants, fields.messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;
    use kinship_shared::ErrorKind;

    fn at(second: i32) -> Timestamp {
        Timestamp::with_time(2, 1, 2025, 1, 22, second)
    }

    fn msg(from: i64, to: i64, text: &str, second: i32) -> Message {
        Message::new(UserId(from), UserId(to), text, at(second)).unwrap()
    }

    fn conversation() -> Conversation<Message> {
        Conversation::new(ConversationId(1), vec![UserId(1), UserId(2)]).unwrap()
    }

    #[test]
    fn test_invalid_participants() {
        assert!(Conversation::<Message>::new(ConversationId(1), vec![]).is_err());
        assert!(Conversation::<Message>::new(ConversationId(1), vec![UserId(1), UserId(0)]).is_err());
        assert!(Conversation::<Message>::new(ConversationId(1), vec![UserId(1), UserId(1)]).is_err());
        assert!(Conversation::<Message>::new(ConversationId(0), vec![UserId(1)]).is_err());
    }

    #[test]
    fn test_messages_sorted_by_timestamp() {
        let mut conv = conversation();
        conv.add_message(msg(1, 2, "t3", 3)).unwrap();
        conv.add_message(msg(2, 1, "t1", 1)).unwrap();
        conv.add_message(msg(1, 2, "t2", 2)).unwrap();
        let order: Vec<&str> = conv.messages().iter().map(|m| m.content()).collect();
        assert_eq!(order, ["t1", "t2", "t3"]);
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let mut conv = conversation();
        conv.add_message(msg(1, 2, "first", 5)).unwrap();
        conv.add_message(msg(2, 1, "second", 5)).unwrap();
        conv.add_message(msg(1, 2, "early", 1)).unwrap();
        let order: Vec<&str> = conv.messages().iter().map(|m| m.content()).collect();
        assert_eq!(order, ["early", "first", "second"]);
    }

    #[test]
    fn test_non_participant_rejected() {
        let mut conv = conversation();
        let err = conv.add_message(msg(1, 3, "hi", 0)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(conv.add_message(msg(3, 1, "hi", 0)).is_err());
        assert!(conv.messages().is_empty());
    }

    #[test]
    fn test_removed_participant_keeps_history() {
        let mut conv = conversation();
        conv.add_message(msg(1, 2, "hi", 0)).unwrap();
        conv.remove_participant(UserId(2));
        assert!(conv.add_message(msg(1, 2, "again", 1)).is_err());
        assert_eq!(conv.messages().len(), 1);
        assert_eq!(conv.messages()[0].content(), "hi");
    }

    #[test]
    fn test_participant_management() {
        let mut conv = conversation();
        conv.add_participant(UserId(3)).unwrap();
        assert!(conv.is_participant(UserId(3)));
        assert!(conv.add_participant(UserId(3)).is_err());
        assert!(conv.add_participant(UserId(0)).is_err());
        conv.remove_participant(UserId(42));
        assert_eq!(conv.participants(), &[UserId(1), UserId(2), UserId(3)]);
    }

    #[test]
    fn test_messages_by_user_and_unread() {
        let mut conv = conversation();
        conv.add_message(msg(1, 2, "a", 1)).unwrap();
        conv.add_message(msg(2, 1, "b", 2)).unwrap();
        conv.add_message(msg(1, 2, "c", 3)).unwrap();

        let from_one: Vec<&str> = conv.messages_by_user(UserId(1)).into_iter().map(|m| m.content()).collect();
        assert_eq!(from_one, ["a", "c"]);
        assert_eq!(conv.unread_messages(UserId(2)).len(), 2);
        assert_eq!(conv.unread_messages(UserId(1)).len(), 1);

        assert_eq!(conv.mark_read_for(UserId(2)), 2);
        assert!(conv.unread_messages(UserId(2)).is_empty());
        assert_eq!(conv.mark_read_for(UserId(2)), 0);
        assert_eq!(conv.unread_messages(UserId(1)).len(), 1);
    }

    #[test]
    fn test_deserialize_revalidates_participants() {
        let mut conv = conversation();
        conv.add_message(msg(1, 2, "later", 9)).unwrap();
        conv.add_message(msg(2, 1, "sooner", 3)).unwrap();
        let json = serde_json::to_string(&conv).unwrap();
        let back: Conversation<Message> = serde_json::from_str(&json).unwrap();
        assert_eq!(back.messages()[0].content(), "sooner");

        let twice = json.replace("\"participants\":[1,2]", "\"participants\":[1,1]");
        assert_ne!(twice, json);
        assert!(serde_json::from_str::<Conversation<Message>>(&twice).is_err());
    }
}
