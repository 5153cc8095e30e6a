//! Typed integer identifiers and the allocators that hand them out.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Ids are only meaningful when strictly positive.
            pub fn is_valid(&self) -> bool {
                self.0 > 0
            }

            pub fn get(&self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }
    };
}

entity_id!(
    /// Identifier of a registered user.
    UserId
);
entity_id!(PostId);
entity_id!(CommentId);
entity_id!(ReplyId);
entity_id!(ConversationId);

/// Source of fresh identifiers for one entity kind.
///
/// Implementations must never return the same value twice and must never
/// return a value `<= 0`.
pub trait IdAllocator {
    fn next_id(&mut self) -> i64;

    /// The value the next call to [`IdAllocator::next_id`] will return.
    fn peek(&self) -> i64;
}

/// Monotonic counter seeded at 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    next: i64,
}

impl Sequence {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Resume a sequence, e.g. after loading a saved graph. Values below 1 are
    /// clamped so the allocator never yields a non-positive id.
    pub fn starting_at(next: i64) -> Self {
        Self { next: next.max(1) }
    }
}

impl Default for Sequence {
    fn default() -> Self {
        Self::new()
    }
}

impl IdAllocator for Sequence {
    fn next_id(&mut self) -> i64 {
        let id = self.next;
        self.next += 1;
        id
    }

    fn peek(&self) -> i64 {
        self.next
    }
}
