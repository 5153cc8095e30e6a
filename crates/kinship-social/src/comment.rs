use std::fmt;

use serde::{Deserialize, Serialize};

use kinship_shared::{CommentId, Error, ReplyId, Result, Timestamp, UserId};

use crate::likes::LikeSet;
use crate::reply::Reply;

/// A comment on a post. Owns its replies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "CommentFields")]
pub struct Comment {
    id: CommentId,
    author_id: UserId,
    content: String,
    timestamp: Timestamp,
    replies: Vec<Reply>,
    likes: LikeSet,
}

impl Comment {
    pub fn new(
        id: CommentId,
        author_id: UserId,
        content: impl Into<String>,
        timestamp: Timestamp,
    ) -> Result<Self> {
        let content = content.into();
        if !id.is_valid() {
            return Err(Error::validation("Invalid comment ID"));
        }
        if !author_id.is_valid() {
            return Err(Error::validation("Invalid author ID"));
        }
        if content.is_empty() {
            return Err(Error::validation("Comment content cannot be empty"));
        }
        if !timestamp.is_valid() {
            return Err(Error::validation(format!("Invalid timestamp: {timestamp}")));
        }
        Ok(Self {
            id,
            author_id,
            content,
            timestamp,
            replies: Vec::new(),
            likes: LikeSet::new(),
        })
    }

    pub fn id(&self) -> CommentId {
        self.id
    }

    pub fn author_id(&self) -> UserId {
        self.author_id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    // ------------------------------------------------------------------
    // Replies
    // ------------------------------------------------------------------

    /// Attach a reply. The reply must name this comment as its parent.
    pub fn add_reply(&mut self, reply: Reply) -> Result<()> {
        if reply.comment_id() != self.id {
            return Err(Error::validation("Reply belongs to a different comment"));
        }
        if self.reply(reply.id()).is_some() {
            return Err(Error::validation(format!(
                "Reply #{} is already attached",
                reply.id()
            )));
        }
        self.replies.push(reply);
        Ok(())
    }

    /// Detach a reply, returning it. Missing ids are ignored.
    pub fn remove_reply(&mut self, id: ReplyId) -> Option<Reply> {
        let index = self.replies.iter().position(|r| r.id() == id)?;
        Some(self.replies.remove(index))
    }

    pub fn reply(&self, id: ReplyId) -> Option<&Reply> {
        self.replies.iter().find(|r| r.id() == id)
    }

    pub fn reply_mut(&mut self, id: ReplyId) -> Option<&mut Reply> {
        self.replies.iter_mut().find(|r| r.id() == id)
    }

    pub fn replies(&self) -> &[Reply] {
        &self.replies
    }

    // ------------------------------------------------------------------
    // Likes
    // ------------------------------------------------------------------

    pub fn add_like(&mut self, user: UserId) -> Result<()> {
        self.likes.add(user).map(|_| ())
    }

    pub fn remove_like(&mut self, user: UserId) {
        self.likes.remove(user);
    }

    pub fn is_liked_by(&self, user: UserId) -> bool {
        self.likes.contains(user)
    }

    pub fn likes_count(&self) -> usize {
        self.likes.len()
    }

    pub fn likes(&self) -> &LikeSet {
        &self.likes
    }
}

impl PartialEq for Comment {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Comment {}

impl fmt::Display for Comment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Comment #{} by User #{}", self.id, self.author_id)?;
        writeln!(f, "Content: {}", self.content)?;
        writeln!(f, "Time: {}", self.timestamp)?;
        writeln!(f, "Likes: {}", self.likes_count())?;
        write!(f, "Replies: {}", self.replies.len())
    }
}

/// Wire shape of a [`Comment`]. Replies are re-attached one by one so
/// their parent ids are checked.
#[derive(Deserialize)]
struct CommentFields {
    id: CommentId,
    author_id: UserId,
    content: String,
    timestamp: Timestamp,
    replies: Vec<Reply>,
    likes: LikeSet,
}

impl TryFrom<CommentFields> for Comment {
    type Error = Error;

    fn try_from(fields: CommentFields) -> Result<Self> {
        let mut comment = Comment::new(fields.id, fields.author_id, fields.content, fields.timestamp)?;
        for reply in fields.replies {
            comment.add_reply(reply)?;
        }
        comment.likes = fields.likes;
        Ok(comment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kinship_shared::ErrorKind;

    fn ts() -> Timestamp {
        Timestamp::with_time(2, 1, 2025, 0, 47, 41)
    }

    fn comment() -> Comment {
        Comment::new(CommentId(10), UserId(5), "Great post!", ts()).unwrap()
    }

    #[test]
    fn test_invalid_comment() {
        assert!(Comment::new(CommentId(1), UserId(0), "x", ts()).is_err());
        assert!(Comment::new(CommentId(1), UserId(-4), "x", ts()).is_err());
        assert!(Comment::new(CommentId(1), UserId(1), "", ts()).is_err());
        let leap = Timestamp::new(30, 2, 2024);
        assert!(Comment::new(CommentId(1), UserId(1), "x", leap).is_err());
    }

    #[test]
    fn test_add_and_get_reply() {
        let mut c = comment();
        let reply = Reply::new(ReplyId(1), UserId(6), c.id(), "Agreed", ts()).unwrap();
        c.add_reply(reply).unwrap();
        assert_eq!(c.replies().len(), 1);
        assert_eq!(c.reply(ReplyId(1)).unwrap().content(), "Agreed");
        assert!(c.reply(ReplyId(2)).is_none());
    }

    #[test]
    fn test_reply_for_other_comment_rejected() {
        let mut c = comment();
        let stray = Reply::new(ReplyId(1), UserId(6), CommentId(c.id().get() + 1), "Hi", ts()).unwrap();
        let err = c.add_reply(stray).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(c.replies().is_empty());
    }

    #[test]
    fn test_duplicate_reply_rejected() {
        let mut c = comment();
        c.add_reply(Reply::new(ReplyId(1), UserId(6), c.id(), "a", ts()).unwrap())
            .unwrap();
        assert!(c
            .add_reply(Reply::new(ReplyId(1), UserId(7), c.id(), "b", ts()).unwrap())
            .is_err());
        assert_eq!(c.replies().len(), 1);
    }

    #[test]
    fn test_remove_reply() {
        let mut c = comment();
        c.add_reply(Reply::new(ReplyId(1), UserId(6), c.id(), "a", ts()).unwrap())
            .unwrap();
        assert!(c.remove_reply(ReplyId(99)).is_none());
        assert_eq!(c.replies().len(), 1);
        assert_eq!(c.remove_reply(ReplyId(1)).unwrap().id(), ReplyId(1));
        assert!(c.replies().is_empty());
    }

    #[test]
    fn test_like_reply_through_comment() {
        let mut c = comment();
        c.add_reply(Reply::new(ReplyId(1), UserId(6), c.id(), "a", ts()).unwrap())
            .unwrap();
        c.reply_mut(ReplyId(1)).unwrap().add_like(UserId(5)).unwrap();
        assert!(c.reply(ReplyId(1)).unwrap().is_liked_by(UserId(5)));
    }

    #[test]
    fn test_comment_likes_idempotent() {
        let mut c = comment();
        c.add_like(UserId(2)).unwrap();
        c.add_like(UserId(2)).unwrap();
        c.add_like(UserId(3)).unwrap();
        assert_eq!(c.likes_count(), 2);
        c.remove_like(UserId(2));
        assert!(!c.is_liked_by(UserId(2)));
        assert!(c.add_like(UserId(0)).is_err());
    }

    #[test]
    fn test_deserialize_checks_replies() {
        let mut c = comment();
        c.add_reply(Reply::new(ReplyId(1), UserId(6), c.id(), "a", ts()).unwrap())
            .unwrap();
        let json = serde_json::to_string(&c).unwrap();
        let back: Comment = serde_json::from_str(&json).unwrap();
        assert_eq!(back.replies().len(), 1);

        let foreign = json.replace(
            &format!("\"comment_id\":{}", c.id()),
            "\"comment_id\":99",
        );
        assert_ne!(foreign, json);
        let err = serde_json::from_str::<Comment>(&foreign).unwrap_err();
        assert!(err.to_string().contains("Reply belongs to a different comment"));

        let nameless = json.replace("\"author_id\":6", "\"author_id\":0");
        assert!(serde_json::from_str::<Comment>(&nameless).is_err());
    }
}
