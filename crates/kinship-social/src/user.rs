//! Users, credentials and the friendship graph.
//!
//! A [`User`] references its posts and friends by id only. Resolving those
//! ids to values is the job of whoever owns the entities, normally
//! [`SocialGraph`](crate::SocialGraph).

use std::collections::BTreeMap;
use std::fmt;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use kinship_shared::{Error, PasswordHasher, PostId, Result, Timestamp, UserId};

use crate::post::{FriendLookup, Post};

/// `local@domain.tld`, where the local part may contain one `.` or `_`.
const EMAIL_PATTERN: &str = r"^(\w+)(\.|_)?(\w*)@(\w+)(\.(\w+))+$";

pub fn is_valid_email(email: &str) -> bool {
    static RE: Lazy<Regex> = Lazy::new(|| Regex::new(EMAIL_PATTERN).expect("valid regex"));
    RE.is_match(email)
}

/// Registration details for a new user. The password is plaintext here and
/// is hashed before it is stored.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password: String,
    pub gender: String,
    pub birthdate: Timestamp,
}

impl NewUser {
    pub fn new(
        email: impl Into<String>,
        name: impl Into<String>,
        password: impl Into<String>,
        gender: impl Into<String>,
        birthdate: Timestamp,
    ) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
            password: password.into(),
            gender: gender.into(),
            birthdate,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "UserFields")]
pub struct User {
    id: UserId,
    email: String,
    name: String,
    password_hash: String,
    gender: String,
    birthdate: Timestamp,
    posts: Vec<PostId>,
    /// Friend id -> restricted flag.
    friends: BTreeMap<UserId, bool>,
}

impl User {
    /// Validate `profile` and hash its password.
    ///
    /// Every violated rule is reported in a single comma-joined
    /// validation error.
    pub fn new(id: UserId, profile: NewUser, hasher: &dyn PasswordHasher) -> Result<Self> {
        let NewUser {
            email,
            name,
            password,
            gender,
            birthdate,
        } = profile;

        let problems = profile_problems(id, &email, &name, !password.is_empty(), &gender, &birthdate);
        if !problems.is_empty() {
            return Err(Error::validation(problems.join(", ")));
        }

        Ok(Self {
            id,
            email,
            name,
            password_hash: hasher.hash(&password),
            gender,
            birthdate,
            posts: Vec::new(),
            friends: BTreeMap::new(),
        })
    }

    /// Rebuild a user from a stored record, keeping the stored hash.
    pub(crate) fn from_stored(
        id: UserId,
        email: String,
        name: String,
        password_hash: String,
        gender: String,
        birthdate: Timestamp,
    ) -> Result<Self> {
        let problems =
            profile_problems(id, &email, &name, !password_hash.is_empty(), &gender, &birthdate);
        if !problems.is_empty() {
            return Err(Error::validation(problems.join(", ")));
        }
        Ok(Self {
            id,
            email,
            name,
            password_hash,
            gender,
            birthdate,
            posts: Vec::new(),
            friends: BTreeMap::new(),
        })
    }

    /// Stored friendships must name another, positive user id.
    pub(crate) fn restore_friend(&mut self, other: UserId, restricted: bool) -> Result<()> {
        if other == self.id || !other.is_valid() {
            return Err(Error::validation(format!("Invalid friend ID {other}")));
        }
        self.friends.insert(other, restricted);
        Ok(())
    }

    /// Stored post lists hold each positive id once.
    pub(crate) fn restore_post(&mut self, post: PostId) -> Result<()> {
        if !post.is_valid() || self.owns_post(post) {
            return Err(Error::validation(format!("Invalid post reference {post}")));
        }
        self.posts.push(post);
        Ok(())
    }

    pub fn id(&self) -> UserId {
        self.id
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn gender(&self) -> &str {
        &self.gender
    }

    pub fn birthdate(&self) -> Timestamp {
        self.birthdate
    }

    pub fn password_hash(&self) -> &str {
        &self.password_hash
    }

    // ------------------------------------------------------------------
    // Credentials
    // ------------------------------------------------------------------

    pub fn validate_password(&self, password: &str, hasher: &dyn PasswordHasher) -> bool {
        hasher.hash(password) == self.password_hash
    }

    pub fn change_password(
        &mut self,
        old_password: &str,
        new_password: &str,
        hasher: &dyn PasswordHasher,
    ) -> Result<()> {
        if !self.validate_password(old_password, hasher) {
            return Err(Error::authentication("Invalid old password"));
        }
        if new_password.is_empty() {
            return Err(Error::validation("Password is required"));
        }
        self.password_hash = hasher.hash(new_password);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Friends
    // ------------------------------------------------------------------

    /// Befriend `other`, or update the restricted flag of an existing
    /// friendship. Self and non-positive ids are ignored.
    pub fn add_friend(&mut self, other: UserId, restricted: bool) {
        if other == self.id || !other.is_valid() {
            return;
        }
        self.friends.insert(other, restricted);
    }

    pub fn remove_friend(&mut self, other: UserId) -> bool {
        self.friends.remove(&other).is_some()
    }

    pub fn is_friend(&self, other: UserId) -> bool {
        self.friends.contains_key(&other)
    }

    pub fn is_restricted_friend(&self, other: UserId) -> bool {
        self.friends.get(&other).copied().unwrap_or(false)
    }

    /// Friends whose restricted flag equals `restricted`. Calling this with
    /// `true` and with `false` partitions the friend set.
    pub fn friends(&self, restricted: bool) -> Vec<UserId> {
        self.friends
            .iter()
            .filter(|(_, flag)| **flag == restricted)
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn all_friends(&self) -> Vec<UserId> {
        self.friends.keys().copied().collect()
    }

    /// Every friendship as `(friend, restricted)`.
    pub fn friendships(&self) -> impl Iterator<Item = (UserId, bool)> + '_ {
        self.friends.iter().map(|(id, flag)| (*id, *flag))
    }

    /// Friends that `other` also has, excluding both users themselves.
    pub fn mutual_friends(&self, other: &User) -> Vec<UserId> {
        self.friends
            .keys()
            .copied()
            .filter(|id| *id != self.id && *id != other.id && other.is_friend(*id))
            .collect()
    }

    // ------------------------------------------------------------------
    // Posts
    // ------------------------------------------------------------------

    /// Reference a post from this user's timeline. Adding twice is a no-op.
    pub fn add_post(&mut self, post: PostId) {
        if !self.owns_post(post) {
            self.posts.push(post);
        }
    }

    pub fn remove_post(&mut self, post: PostId) -> bool {
        let before = self.posts.len();
        self.posts.retain(|id| *id != post);
        self.posts.len() != before
    }

    pub fn owns_post(&self, post: PostId) -> bool {
        self.posts.contains(&post)
    }

    pub fn posts(&self) -> &[PostId] {
        &self.posts
    }

    /// Posts in both timelines, matched by id, in this user's order.
    pub fn common_posts(&self, other: &User) -> Vec<PostId> {
        self.posts
            .iter()
            .copied()
            .filter(|id| other.owns_post(*id))
            .collect()
    }

    /// Posts on this user's timeline that `viewer` may see. `resolve` maps
    /// ids to posts; ids it cannot resolve are skipped.
    ///
    /// Own posts are checked against this user's friendships. A shared
    /// friends-only post is only shown to its author, since the author's
    /// friendships are not known here; [`SocialGraph::visible_posts`]
    /// resolves them.
    ///
    /// [`SocialGraph::visible_posts`]: crate::SocialGraph::visible_posts
    pub fn visible_posts<'a, F>(&self, viewer: UserId, resolve: F) -> Vec<&'a Post>
    where
        F: Fn(PostId) -> Option<&'a Post>,
    {
        let unknown_friends = BTreeMap::<UserId, bool>::new();
        self.posts
            .iter()
            .filter_map(|id| resolve(*id))
            .filter(|post| {
                if post.author_id() == self.id {
                    post.is_visible_to(viewer, self)
                } else {
                    post.is_visible_to(viewer, &unknown_friends)
                }
            })
            .collect()
    }
}

impl FriendLookup for User {
    fn friendship(&self, other: UserId) -> Option<bool> {
        self.friends.get(&other).copied()
    }
}

impl PartialEq for User {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for User {}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}

/// Wire shape of a [`User`]. The stored hash is kept; the profile and every
/// reference are re-validated.
#[derive(Deserialize)]
struct UserFields {
    id: UserId,
    email: String,
    name: String,
    password_hash: String,
    gender: String,
    birthdate: Timestamp,
    posts: Vec<PostId>,
    friends: BTreeMap<UserId, bool>,
}

impl TryFrom<UserFields> for User {
    type Error = Error;

    fn try_from(fields: UserFields) -> Result<Self> {
        let mut user = User::from_stored(
            fields.id,
            fields.email,
            fields.name,
            fields.password_hash,
            fields.gender,
            fields.birthdate,
        )?;
        for (friend, restricted) in fields.friends {
            user.restore_friend(friend, restricted)?;
        }
        for post in fields.posts {
            user.restore_post(post)?;
        }
        Ok(user)
    }
}

/// Case-insensitive substring search over names and emails, in corpus order.
pub fn search_users<'a, I>(corpus: I, query: &str) -> Vec<&'a User>
where
    I: IntoIterator<Item = &'a User>,
{
    let query = query.to_lowercase();
    corpus
        .into_iter()
        .filter(|user| {
            user.name.to_lowercase().contains(&query) || user.email.to_lowercase().contains(&query)
        })
        .collect()
}

fn profile_problems(
    id: UserId,
    email: &str,
    name: &str,
    has_password: bool,
    gender: &str,
    birthdate: &Timestamp,
) -> Vec<&'static str> {
    let mut problems = Vec::new();
    if !id.is_valid() {
        problems.push("Invalid user ID");
    }
    if email.is_empty() {
        problems.push("Email is required");
    } else if !is_valid_email(email) {
        problems.push("Invalid email format");
    }
    if name.is_empty() {
        problems.push("Name is required");
    }
    if !has_password {
        problems.push("Password is required");
    }
    if gender.is_empty() {
        problems.push("Gender is required");
    }
    if !birthdate.is_valid() {
        problems.push("Invalid birthdate");
    }
    problems
}
