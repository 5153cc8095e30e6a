//! Posts, their privacy setting, and the visibility rule.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use kinship_shared::{CommentId, Error, PostId, Result, Timestamp, UserId};

use crate::comment::Comment;
use crate::likes::LikeSet;

/// Who may see a post.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Privacy {
    #[default]
    Public,
    FriendsOnly,
}

impl Privacy {
    pub fn code(&self) -> u8 {
        match self {
            Self::Public => 0,
            Self::FriendsOnly => 1,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Public),
            1 => Some(Self::FriendsOnly),
            _ => None,
        }
    }
}

/// Kind of reaction a user left on a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ReactionKind {
    Like = 1,
    Love = 2,
    Haha = 3,
    Wow = 4,
    Sad = 5,
    Angry = 6,
}

impl ReactionKind {
    pub fn code(&self) -> u8 {
        *self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Like),
            2 => Some(Self::Love),
            3 => Some(Self::Haha),
            4 => Some(Self::Wow),
            5 => Some(Self::Sad),
            6 => Some(Self::Angry),
            _ => None,
        }
    }
}

/// Read access to one user's friendship map.
///
/// Visibility checks take this as a parameter instead of holding a pointer
/// back to the author.
pub trait FriendLookup {
    /// `Some(restricted)` when `other` is a friend, `None` otherwise.
    fn friendship(&self, other: UserId) -> Option<bool>;
}

impl FriendLookup for BTreeMap<UserId, bool> {
    fn friendship(&self, other: UserId) -> Option<bool> {
        self.get(&other).copied()
    }
}

impl FriendLookup for HashMap<UserId, bool> {
    fn friendship(&self, other: UserId) -> Option<bool> {
        self.get(&other).copied()
    }
}

/// Whether content owned by `owner` with `privacy` is visible to `viewer`.
///
/// Public content is visible to everyone. Friends-only content is visible to
/// the owner and to friends whose friendship is not restricted.
pub fn is_visible<F>(privacy: Privacy, owner: UserId, viewer: UserId, owner_friends: &F) -> bool
where
    F: FriendLookup + ?Sized,
{
    match privacy {
        Privacy::Public => true,
        Privacy::FriendsOnly => viewer == owner || owner_friends.friendship(viewer) == Some(false),
    }
}

/// A post. Owns its comments.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "PostFields")]
pub struct Post {
    id: PostId,
    author_id: UserId,
    content: String,
    timestamp: Timestamp,
    privacy: Privacy,
    comments: Vec<Comment>,
    tagged: BTreeSet<UserId>,
    likes: LikeSet,
    reactions: BTreeMap<UserId, ReactionKind>,
}

impl Post {
    pub fn new(
        id: PostId,
        author_id: UserId,
        content: impl Into<String>,
        timestamp: Timestamp,
        privacy: Privacy,
    ) -> Result<Self> {
        let content = content.into();
        if !id.is_valid() {
            return Err(Error::validation("Invalid post ID"));
        }
        if !author_id.is_valid() {
            return Err(Error::validation("Invalid author ID"));
        }
        if content.is_empty() {
            return Err(Error::validation("Post content cannot be empty"));
        }
        if !timestamp.is_valid() {
            return Err(Error::validation(format!("Invalid timestamp: {timestamp}")));
        }
        Ok(Self {
            id,
            author_id,
            content,
            timestamp,
            privacy,
            comments: Vec::new(),
            tagged: BTreeSet::new(),
            likes: LikeSet::new(),
            reactions: BTreeMap::new(),
        })
    }

    pub fn id(&self) -> PostId {
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

    pub fn privacy(&self) -> Privacy {
        self.privacy
    }

    pub fn set_privacy(&mut self, privacy: Privacy) {
        self.privacy = privacy;
    }

    /// Visibility of this post to `viewer`, given the author's friendships.
    pub fn is_visible_to<F>(&self, viewer: UserId, author_friends: &F) -> bool
    where
        F: FriendLookup + ?Sized,
    {
        is_visible(self.privacy, self.author_id, viewer, author_friends)
    }

    // ------------------------------------------------------------------
    // Comments
    // ------------------------------------------------------------------

    pub fn add_comment(&mut self, comment: Comment) -> Result<()> {
        if self.comment(comment.id()).is_some() {
            return Err(Error::validation(format!(
                "Comment #{} is already attached",
                comment.id()
            )));
        }
        self.comments.push(comment);
        Ok(())
    }

    /// Detach a comment together with its replies. Missing ids are ignored.
    pub fn remove_comment(&mut self, id: CommentId) -> Option<Comment> {
        let index = self.comments.iter().position(|c| c.id() == id)?;
        Some(self.comments.remove(index))
    }

    pub fn comment(&self, id: CommentId) -> Option<&Comment> {
        self.comments.iter().find(|c| c.id() == id)
    }

    pub fn comment_mut(&mut self, id: CommentId) -> Option<&mut Comment> {
        self.comments.iter_mut().find(|c| c.id() == id)
    }

    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    // ------------------------------------------------------------------
    // Tags
    // ------------------------------------------------------------------

    pub fn tag_user(&mut self, user: UserId) -> Result<()> {
        if !user.is_valid() {
            return Err(Error::validation("Invalid user ID"));
        }
        self.tagged.insert(user);
        Ok(())
    }

    pub fn remove_tag(&mut self, user: UserId) -> Result<()> {
        if !user.is_valid() {
            return Err(Error::validation("Invalid user ID"));
        }
        self.tagged.remove(&user);
        Ok(())
    }

    pub fn is_user_tagged(&self, user: UserId) -> bool {
        self.tagged.contains(&user)
    }

    pub fn tagged_users(&self) -> impl Iterator<Item = UserId> + '_ {
        self.tagged.iter().copied()
    }

    // ------------------------------------------------------------------
    // Likes & reactions
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

    /// Set `user`'s reaction, replacing any earlier one.
    pub fn react(&mut self, user: UserId, kind: ReactionKind) -> Result<()> {
        if !user.is_valid() {
            return Err(Error::validation("Invalid user ID"));
        }
        self.reactions.insert(user, kind);
        Ok(())
    }

    pub fn remove_reaction(&mut self, user: UserId) -> Option<ReactionKind> {
        self.reactions.remove(&user)
    }

    pub fn reaction_of(&self, user: UserId) -> Option<ReactionKind> {
        self.reactions.get(&user).copied()
    }

    pub fn reactions(&self) -> impl Iterator<Item = (UserId, ReactionKind)> + '_ {
        self.reactions.iter().map(|(user, kind)| (*user, *kind))
    }
}

impl PartialEq for Post {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Post {}

impl fmt::Display for Post {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Post #{} by User #{}", self.id, self.author_id)?;
        writeln!(f, "Content: {}", self.content)?;
        writeln!(f, "Time: {}", self.timestamp)?;
        writeln!(f, "Privacy: {:?}", self.privacy)?;
        writeln!(f, "Likes: {}", self.likes_count())?;
        write!(f, "Comments: {}", self.comments.len())
    }
}

/// Wire shape of a [`Post`]; every part is re-validated on the way in.
#[derive(Deserialize)]
struct PostFields {
    id: PostId,
    author_id: UserId,
    content: String,
    timestamp: Timestamp,
    privacy: Privacy,
    comments: Vec<Comment>,
    tagged: BTreeSet<UserId>,
    likes: LikeSet,
    reactions: BTreeMap<UserId, ReactionKind>,
}

impl TryFrom<PostFields> for Post {
    type Error = Error;

    fn try_from(fields: PostFields) -> Result<Self> {
        let mut post = Post::new(
            fields.id,
            fields.author_id,
            fields.content,
            fields.timestamp,
            fields.privacy,
        )?;
        for comment in fields.comments {
            post.add_comment(comment)?;
        }
        for user in fields.tagged {
            post.tag_user(user)?;
        }
        for (user, kind) in fields.reactions {
            post.react(user, kind)?;
        }
        post.likes = fields.likes;
        Ok(post)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kinship_shared::ErrorKind;

    fn ts() -> Timestamp {
        Timestamp::with_time(2, 1, 2025, 2, 37, 2)
    }

    fn post(privacy: Privacy) -> Post {
        Post::new(PostId(1), UserId(1), "Hello world", ts(), privacy).unwrap()
    }

    #[test]
    fn test_invalid_post() {
        assert!(Post::new(PostId(1), UserId(0), "x", ts(), Privacy::Public).is_err());
        let err = Post::new(PostId(1), UserId(1), "x", Timestamp::new(30, 2, 2024), Privacy::Public)
            .unwrap_err();
        assert_eq!(err.message(), "Invalid timestamp: 2024-02-30");
        let err = Post::new(PostId(1), UserId(1), "", ts(), Privacy::Public).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_public_visible_to_everyone() {
        let p = post(Privacy::Public);
        let friends = BTreeMap::<UserId, bool>::new();
        assert!(p.is_visible_to(UserId(99), &friends));
    }

    #[test]
    fn test_friends_only_visibility() {
        let p = post(Privacy::FriendsOnly);
        let mut friends = BTreeMap::new();
        friends.insert(UserId(2), true);
        friends.insert(UserId(3), false);

        assert!(p.is_visible_to(UserId(1), &friends), "author sees own post");
        assert!(!p.is_visible_to(UserId(2), &friends), "restricted friend");
        assert!(p.is_visible_to(UserId(3), &friends), "regular friend");
        assert!(!p.is_visible_to(UserId(4), &friends), "stranger");
    }

    #[test]
    fn test_privacy_can_change() {
        let mut p = post(Privacy::FriendsOnly);
        let friends = HashMap::<UserId, bool>::new();
        assert!(!p.is_visible_to(UserId(4), &friends));
        p.set_privacy(Privacy::Public);
        assert!(p.is_visible_to(UserId(4), &friends));
    }

    #[test]
    fn test_tags_idempotent() {
        let mut p = post(Privacy::Public);
        p.tag_user(UserId(2)).unwrap();
        p.tag_user(UserId(2)).unwrap();
        assert_eq!(p.tagged_users().count(), 1);
        assert!(p.is_user_tagged(UserId(2)));
        p.remove_tag(UserId(3)).unwrap();
        p.remove_tag(UserId(2)).unwrap();
        assert!(!p.is_user_tagged(UserId(2)));
        assert!(p.tag_user(UserId(0)).is_err());
        assert!(p.remove_tag(UserId(-1)).is_err());
    }

    #[test]
    fn test_comments() {
        let mut p = post(Privacy::Public);
        let c = Comment::new(CommentId(3), UserId(2), "Nice", ts()).unwrap();
        p.add_comment(c.clone()).unwrap();
        assert!(p.add_comment(c).is_err());
        assert_eq!(p.comments().len(), 1);
        assert!(p.comment(CommentId(3)).is_some());
        assert!(p.remove_comment(CommentId(4)).is_none());
        assert!(p.remove_comment(CommentId(3)).is_some());
        assert!(p.comment(CommentId(3)).is_none());
    }

    #[test]
    fn test_likes_and_reactions() {
        let mut p = post(Privacy::Public);
        p.add_like(UserId(2)).unwrap();
        p.add_like(UserId(2)).unwrap();
        assert_eq!(p.likes_count(), 1);

        p.react(UserId(2), ReactionKind::Like).unwrap();
        p.react(UserId(2), ReactionKind::Haha).unwrap();
        assert_eq!(p.reaction_of(UserId(2)), Some(ReactionKind::Haha));
        assert_eq!(p.reactions().count(), 1);
        assert_eq!(p.remove_reaction(UserId(2)), Some(ReactionKind::Haha));
        assert_eq!(p.reaction_of(UserId(2)), None);
        assert!(p.react(UserId(0), ReactionKind::Sad).is_err());
    }

    #[test]
    fn test_codes_round_trip() {
        for kind in [
            ReactionKind::Like,
            ReactionKind::Love,
            ReactionKind::Haha,
            ReactionKind::Wow,
            ReactionKind::Sad,
            ReactionKind::Angry,
        ] {
            assert_eq!(ReactionKind::from_code(kind.code()), Some(kind));
        }
        assert_eq!(ReactionKind::from_code(0), None);
        assert_eq!(Privacy::from_code(1), Some(Privacy::FriendsOnly));
        assert_eq!(Privacy::from_code(2), None);
    }

    #[test]
    fn test_serde_json_keeps_thread() {
        let mut p = post(Privacy::FriendsOnly);
        p.react(UserId(4), ReactionKind::Wow).unwrap();
        p.add_comment(Comment::new(CommentId(1), UserId(2), "hi", ts()).unwrap())
            .unwrap();

        let json = serde_json::to_string(&p).unwrap();
        let back: Post = serde_json::from_str(&json).unwrap();
        assert_eq!(back.privacy(), Privacy::FriendsOnly);
        assert_eq!(back.reaction_of(UserId(4)), Some(ReactionKind::Wow));
        assert_eq!(back.comments().len(), 1);
        assert_eq!(back.timestamp(), p.timestamp());

        let ghost = json.replace("\"4\":\"Wow\"", "\"0\":\"Wow\"");
        assert_ne!(ghost, json);
        assert!(serde_json::from_str::<Post>(&ghost).is_err());
        let blank = json.replace("\"content\":\"Hello world\"", "\"content\":\"\"");
        assert_ne!(blank, json);
        assert!(serde_json::from_str::<Post>(&blank).is_err());
    }
}
