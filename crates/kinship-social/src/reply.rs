use std::fmt;

use serde::{Deserialize, Serialize};

use kinship_shared::{CommentId, Error, ReplyId, Result, Timestamp, UserId};

use crate::likes::LikeSet;

/// A reply to a comment.
///
/// The parent comment id is fixed at construction; whether it actually
/// matches is checked when the reply is attached with
/// [`Comment::add_reply`](crate::Comment::add_reply).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "ReplyFields")]
pub struct Reply {
    id: ReplyId,
    author_id: UserId,
    comment_id: CommentId,
    content: String,
    timestamp: Timestamp,
    likes: LikeSet,
}

impl Reply {
    pub fn new(
        id: ReplyId,
        author_id: UserId,
        comment_id: CommentId,
        content: impl Into<String>,
        timestamp: Timestamp,
    ) -> Result<Self> {
        let content = content.into();
        if !id.is_valid() {
            return Err(Error::validation("Invalid reply ID"));
        }
        if !author_id.is_valid() {
            return Err(Error::validation("Invalid author ID"));
        }
        if !comment_id.is_valid() {
            return Err(Error::validation("Invalid comment ID"));
        }
        if content.is_empty() {
            return Err(Error::validation("Reply content cannot be empty"));
        }
        if !timestamp.is_valid() {
            return Err(Error::validation(format!("Invalid timestamp: {timestamp}")));
        }
        Ok(Self {
            id,
            author_id,
            comment_id,
            content,
            timestamp,
            likes: LikeSet::new(),
        })
    }

    pub fn id(&self) -> ReplyId {
        self.id
    }

    pub fn author_id(&self) -> UserId {
        self.author_id
    }

    pub fn comment_id(&self) -> CommentId {
        self.comment_id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

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

impl PartialEq for Reply {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Reply {}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Reply #{} by User #{}", self.id, self.author_id)?;
        writeln!(f, "On Comment #{}", self.comment_id)?;
        writeln!(f, "Content: {}", self.content)?;
        writeln!(f, "Time: {}", self.timestamp)?;
        write!(f, "Likes: {}", self.likes_count())
    }
}

/// Wire shape of a [`Reply`]; deserialization goes through [`Reply::new`].
#[derive(Deserialize)]
struct ReplyFields {
    id: ReplyId,
    author_id: UserId,
    comment_id: CommentId,
    content: String,
    timestamp: Timestamp,
    likes: LikeSet,
}

impl TryFrom<ReplyFields> for Reply {
    type Error = Error;

    fn try_from(fields: ReplyFields) -> Result<Self> {
        let mut reply = Reply::new(
            fields.id,
            fields.author_id,
            fields.comment_id,
            fields.content,
            fields.timestamp,
        )?;
        reply.likes = fields.likes;
        Ok(reply)
    }
}
