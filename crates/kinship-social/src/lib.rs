//! # kinship-social
//!
//! The social model: users and their friendships, posts with comment and
//! reply threads, likes and reactions, and direct-message conversations.
//! [`SocialGraph`] owns every entity and resolves the ids they use to refer
//! to each other. [`codec`] gives each entity a line-oriented text record.

pub mod codec;
pub mod comment;
pub mod conversation;
pub mod graph;
pub mod likes;
pub mod message;
pub mod post;
pub mod reply;
pub mod user;

pub use codec::Record;
pub use comment::Comment;
pub use conversation::{Conversation, ConversationMessage};
pub use graph::{IdAllocators, NextIds, SocialGraph};
pub use likes::LikeSet;
pub use message::Message;
pub use post::{is_visible, FriendLookup, Post, Privacy, ReactionKind};
pub use reply::Reply;
pub use user::{is_valid_email, search_users, NewUser, User};
