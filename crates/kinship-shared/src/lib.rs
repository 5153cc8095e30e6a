//! # kinship-shared
//!
//! Leaf types shared by every Kinship crate: the calendar [`Timestamp`], the
//! error taxonomy, typed ids with their allocators, and the password hashing
//! and clock collaborators.

pub mod clock;
pub mod constants;
pub mod error;
pub mod hash;
pub mod ids;
pub mod timestamp;

pub use clock::{Clock, FixedClock, SteppingClock, SystemClock};
pub use error::{Error, ErrorKind, Result};
pub use hash::{Blake3Hasher, PasswordHasher};
pub use ids::{CommentId, ConversationId, IdAllocator, PostId, ReplyId, Sequence, UserId};
pub use timestamp::Timestamp;
