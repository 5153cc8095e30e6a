//! The arena that owns every user, post and conversation.
//!
//! Entities reference each other by id. `SocialGraph` resolves those ids,
//! hands out new ones through injected [`IdAllocator`]s and stamps new
//! content with an injected [`Clock`].

use std::collections::{BTreeMap, HashMap};

use kinship_shared::{
    Blake3Hasher, Clock, CommentId, ConversationId, Error, IdAllocator, PasswordHasher, PostId,
    ReplyId, Result, Sequence, SystemClock, UserId,
};
use tracing::debug;

use crate::comment::Comment;
use crate::conversation::Conversation;
use crate::message::Message;
use crate::post::{Post, Privacy};
use crate::reply::Reply;
use crate::user::{search_users, NewUser, User};

/// The next value of every allocator, as recorded in a saved graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextIds {
    pub users: i64,
    pub posts: i64,
    pub comments: i64,
    pub replies: i64,
    pub conversations: i64,
}

/// One allocator per entity kind.
pub struct IdAllocators {
    pub users: Box<dyn IdAllocator>,
    pub posts: Box<dyn IdAllocator>,
    pub comments: Box<dyn IdAllocator>,
    pub replies: Box<dyn IdAllocator>,
    pub conversations: Box<dyn IdAllocator>,
}

impl IdAllocators {
    /// Sequences that continue from `next`.
    pub fn resume(next: NextIds) -> Self {
        Self {
            users: Box::new(Sequence::starting_at(next.users)),
            posts: Box::new(Sequence::starting_at(next.posts)),
            comments: Box::new(Sequence::starting_at(next.comments)),
            replies: Box::new(Sequence::starting_at(next.replies)),
            conversations: Box::new(Sequence::starting_at(next.conversations)),
        }
    }

    pub fn next_ids(&self) -> NextIds {
        NextIds {
            users: self.users.peek(),
            posts: self.posts.peek(),
            comments: self.comments.peek(),
            replies: self.replies.peek(),
            conversations: self.conversations.peek(),
        }
    }
}

impl Default for IdAllocators {
    fn default() -> Self {
        Self {
            users: Box::new(Sequence::new()),
            posts: Box::new(Sequence::new()),
            comments: Box::new(Sequence::new()),
            replies: Box::new(Sequence::new()),
            conversations: Box::new(Sequence::new()),
        }
    }
}

pub struct SocialGraph {
    users: BTreeMap<UserId, User>,
    /// Lowercased email -> owner.
    emails: HashMap<String, UserId>,
    posts: BTreeMap<PostId, Post>,
    conversations: BTreeMap<ConversationId, Conversation<Message>>,
    ids: IdAllocators,
    hasher: Box<dyn PasswordHasher>,
    clock: Box<dyn Clock>,
}

impl Default for SocialGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SocialGraph {
    /// Empty graph with BLAKE3 password hashing and the system clock.
    pub fn new() -> Self {
        Self {
            users: BTreeMap::new(),
            emails: HashMap::new(),
            posts: BTreeMap::new(),
            conversations: BTreeMap::new(),
            ids: IdAllocators::default(),
            hasher: Box::new(Blake3Hasher),
            clock: Box::new(SystemClock),
        }
    }

    pub fn with_hasher(mut self, hasher: impl PasswordHasher + 'static) -> Self {
        self.hasher = Box::new(hasher);
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_allocators(mut self, ids: IdAllocators) -> Self {
        self.ids = ids;
        self
    }

    pub fn next_ids(&self) -> NextIds {
        self.ids.next_ids()
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    /// Register a new account. Emails are unique, ignoring case.
    pub fn register_user(&mut self, profile: NewUser) -> Result<UserId> {
        let key = profile.email.to_lowercase();
        if self.emails.contains_key(&key) {
            return Err(Error::validation("Email is already registered"));
        }
        let id = UserId(self.ids.users.peek());
        let user = User::new(id, profile, self.hasher.as_ref())?;
        self.ids.users.next_id();

        debug!(user = %id, "registered user");
        self.emails.insert(key, id);
        self.users.insert(id, user);
        Ok(id)
    }

    /// The user owning `email` if `password` matches.
    pub fn authenticate(&self, email: &str, password: &str) -> Result<UserId> {
        let user = self
            .user_by_email(email)
            .ok_or_else(|| Error::authentication("Invalid email or password"))?;
        if !user.validate_password(password, self.hasher.as_ref()) {
            return Err(Error::authentication("Invalid email or password"));
        }
        Ok(user.id())
    }

    pub fn change_password(&mut self, user: UserId, old_password: &str, new_password: &str) -> Result<()> {
        let hasher = self.hasher.as_ref();
        let user = self
            .users
            .get_mut(&user)
            .ok_or_else(|| unknown("user", user))?;
        user.change_password(old_password, new_password, hasher)
    }

    pub fn user(&self, id: UserId) -> Option<&User> {
        self.users.get(&id)
    }

    pub fn user_by_email(&self, email: &str) -> Option<&User> {
        self.emails
            .get(&email.to_lowercase())
            .and_then(|id| self.users.get(id))
    }

    pub fn users(&self) -> impl Iterator<Item = &User> + '_ {
        self.users.values()
    }

    /// Drop a user and every friendship pointing at them. Their posts and
    /// conversation history stay in the graph.
    pub fn remove_user(&mut self, id: UserId) -> Option<User> {
        let user = self.users.remove(&id)?;
        self.emails.remove(&user.email().to_lowercase());
        for other in self.users.values_mut() {
            other.remove_friend(id);
        }
        debug!(user = %id, "removed user");
        Some(user)
    }

    /// Befriend `friend` from `user`'s side. Friendship is directed: the
    /// restricted flag belongs to `user`.
    pub fn add_friend(&mut self, user: UserId, friend: UserId, restricted: bool) -> Result<()> {
        if !self.users.contains_key(&friend) {
            if !self.users.contains_key(&user) {
                return Err(unknown("user", user));
            }
            return Ok(());
        }
        let owner = self.users.get_mut(&user).ok_or_else(|| unknown("user", user))?;
        owner.add_friend(friend, restricted);
        debug!(%user, %friend, restricted, "friendship updated");
        Ok(())
    }

    pub fn remove_friend(&mut self, user: UserId, friend: UserId) -> Result<bool> {
        let owner = self.users.get_mut(&user).ok_or_else(|| unknown("user", user))?;
        Ok(owner.remove_friend(friend))
    }

    pub fn mutual_friends(&self, a: UserId, b: UserId) -> Result<Vec<UserId>> {
        Ok(self.require_user(a)?.mutual_friends(self.require_user(b)?))
    }

    pub fn search_users(&self, query: &str) -> Vec<&User> {
        search_users(self.users.values(), query)
    }

    // ------------------------------------------------------------------
    // Posts
    // ------------------------------------------------------------------

    pub fn create_post(&mut self, author: UserId, content: &str, privacy: Privacy) -> Result<PostId> {
        self.require_user(author)?;
        let id = PostId(self.ids.posts.peek());
        let post = Post::new(id, author, content, self.clock.now(), privacy)?;
        self.ids.posts.next_id();

        if let Some(user) = self.users.get_mut(&author) {
            user.add_post(id);
        }
        self.posts.insert(id, post);
        debug!(post = %id, %author, ?privacy, "created post");
        Ok(id)
    }

    /// Put an existing post on another user's timeline.
    pub fn share_post(&mut self, user: UserId, post: PostId) -> Result<()> {
        if !self.posts.contains_key(&post) {
            return Err(unknown("post", post));
        }
        let owner = self.users.get_mut(&user).ok_or_else(|| unknown("user", user))?;
        owner.add_post(post);
        Ok(())
    }

    /// Delete a post and take it off every timeline.
    pub fn remove_post(&mut self, id: PostId) -> Option<Post> {
        let post = self.posts.remove(&id)?;
        for user in self.users.values_mut() {
            user.remove_post(id);
        }
        debug!(post = %id, "removed post");
        Some(post)
    }

    pub fn tag_user(&mut self, post: PostId, user: UserId) -> Result<()> {
        self.require_user(user)?;
        self.require_post_mut(post)?.tag_user(user)
    }

    pub fn post(&self, id: PostId) -> Option<&Post> {
        self.posts.get(&id)
    }

    pub fn post_mut(&mut self, id: PostId) -> Option<&mut Post> {
        self.posts.get_mut(&id)
    }

    pub fn posts(&self) -> impl Iterator<Item = &Post> + '_ {
        self.posts.values()
    }

    pub fn add_comment(&mut self, post: PostId, author: UserId, content: &str) -> Result<CommentId> {
        self.require_user(author)?;
        let now = self.clock.now();
        let id = CommentId(self.ids.comments.peek());
        let comment = Comment::new(id, author, content, now)?;
        self.require_post_mut(post)?.add_comment(comment)?;
        self.ids.comments.next_id();
        debug!(%post, comment = %id, %author, "added comment");
        Ok(id)
    }

    pub fn add_reply(
        &mut self,
        post: PostId,
        comment: CommentId,
        author: UserId,
        content: &str,
    ) -> Result<ReplyId> {
        self.require_user(author)?;
        let now = self.clock.now();
        let id = ReplyId(self.ids.replies.peek());
        let reply = Reply::new(id, author, comment, content, now)?;
        self.require_post_mut(post)?
            .comment_mut(comment)
            .ok_or_else(|| unknown("comment", comment))?
            .add_reply(reply)?;
        self.ids.replies.next_id();
        debug!(%post, %comment, reply = %id, %author, "added reply");
        Ok(id)
    }

    /// Posts on `owner`'s timeline that `viewer` may see. Shared posts are
    /// checked against their author's friendships, not the sharer's. A
    /// friends-only post whose author was removed is hidden.
    pub fn visible_posts(&self, owner: UserId, viewer: UserId) -> Result<Vec<&Post>> {
        let owner = self.require_user(owner)?;
        let no_friends = BTreeMap::<UserId, bool>::new();
        Ok(owner
            .posts()
            .iter()
            .filter_map(|id| self.posts.get(id))
            .filter(|post| match self.users.get(&post.author_id()) {
                Some(author) => post.is_visible_to(viewer, author),
                None => post.is_visible_to(viewer, &no_friends),
            })
            .collect())
    }

    pub fn common_posts(&self, a: UserId, b: UserId) -> Result<Vec<PostId>> {
        Ok(self.require_user(a)?.common_posts(self.require_user(b)?))
    }

    // ------------------------------------------------------------------
    // Conversations
    // ------------------------------------------------------------------

    pub fn start_conversation(&mut self, participants: Vec<UserId>) -> Result<ConversationId> {
        for participant in &participants {
            self.require_user(*participant)?;
        }
        let id = ConversationId(self.ids.conversations.peek());
        let conversation = Conversation::new(id, participants)?;
        self.ids.conversations.next_id();
        debug!(conversation = %id, participants = conversation.participants().len(), "started conversation");
        self.conversations.insert(id, conversation);
        Ok(id)
    }

    pub fn send_message(
        &mut self,
        conversation: ConversationId,
        sender: UserId,
        receiver: UserId,
        content: &str,
    ) -> Result<()> {
        let message = Message::new(sender, receiver, content, self.clock.now())?;
        self.conversations
            .get_mut(&conversation)
            .ok_or_else(|| unknown("conversation", conversation))?
            .add_message(message)
    }

    /// Mark every message addressed to `reader` as read. Returns how many
    /// changed.
    pub fn mark_read(&mut self, conversation: ConversationId, reader: UserId) -> Result<usize> {
        Ok(self
            .conversations
            .get_mut(&conversation)
            .ok_or_else(|| unknown("conversation", conversation))?
            .mark_read_for(reader))
    }

    pub fn conversation(&self, id: ConversationId) -> Option<&Conversation<Message>> {
        self.conversations.get(&id)
    }

    pub fn conversation_mut(&mut self, id: ConversationId) -> Option<&mut Conversation<Message>> {
        self.conversations.get_mut(&id)
    }

    pub fn conversations(&self) -> impl Iterator<Item = &Conversation<Message>> + '_ {
        self.conversations.values()
    }

    // ------------------------------------------------------------------
    // Restore
    // ------------------------------------------------------------------

    /// Insert an already-built user, e.g. one decoded from storage.
    pub fn insert_user(&mut self, user: User) -> Result<()> {
        let key = user.email().to_lowercase();
        if self.users.contains_key(&user.id()) {
            return Err(Error::validation(format!("Duplicate user ID {}", user.id())));
        }
        if self.emails.contains_key(&key) {
            return Err(Error::validation("Email is already registered"));
        }
        self.emails.insert(key, user.id());
        self.users.insert(user.id(), user);
        Ok(())
    }

    pub fn insert_post(&mut self, post: Post) -> Result<()> {
        if self.posts.contains_key(&post.id()) {
            return Err(Error::validation(format!("Duplicate post ID {}", post.id())));
        }
        self.posts.insert(post.id(), post);
        Ok(())
    }

    pub fn insert_conversation(&mut self, conversation: Conversation<Message>) -> Result<()> {
        if self.conversations.contains_key(&conversation.id()) {
            return Err(Error::validation(format!(
                "Duplicate conversation ID {}",
                conversation.id()
            )));
        }
        self.conversations.insert(conversation.id(), conversation);
        Ok(())
    }

    fn require_user(&self, id: UserId) -> Result<&User> {
        self.users.get(&id).ok_or_else(|| unknown("user", id))
    }

    fn require_post_mut(&mut self, id: PostId) -> Result<&mut Post> {
        self.posts.get_mut(&id).ok_or_else(|| unknown("post", id))
    }
}

fn unknown(kind: &str, id: impl std::fmt::Display) -> Error {
    Error::validation(format!("Unknown {kind} {id}"))
}
