//! Idempotent set of user ids that liked a piece of content.

use serde::{Deserialize, Serialize};

use kinship_shared::{Error, Result, UserId};

/// Insertion-ordered set of likers. Each id appears at most once.
///
/// Serialized as a plain list. Deserializing rejects non-positive and
/// repeated ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<UserId>", into = "Vec<UserId>")]
pub struct LikeSet {
    likers: Vec<UserId>,
}

impl LikeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a like. Liking twice is a no-op; returns whether the set changed.
    pub fn add(&mut self, user: UserId) -> Result<bool> {
        if !user.is_valid() {
            return Err(Error::validation("Invalid user ID"));
        }
        if self.contains(user) {
            return Ok(false);
        }
        self.likers.push(user);
        Ok(true)
    }

    /// Withdraw a like. Removing an absent id is a no-op.
    pub fn remove(&mut self, user: UserId) -> bool {
        let before = self.likers.len();
        self.likers.retain(|id| *id != user);
        self.likers.len() != before
    }

    pub fn contains(&self, user: UserId) -> bool {
        self.likers.contains(&user)
    }

    pub fn len(&self) -> usize {
        self.likers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.likers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = UserId> + '_ {
        self.likers.iter().copied()
    }

    pub fn as_slice(&self) -> &[UserId] {
        &self.likers
    }
}

impl TryFrom<Vec<UserId>> for LikeSet {
    type Error = Error;

    fn try_from(likers: Vec<UserId>) -> Result<Self> {
        let mut set = Self::new();
        for user in likers {
            if !set.add(user)? {
                return Err(Error::validation(format!("Duplicate liker {user}")));
            }
        }
        Ok(set)
    }
}

impl From<LikeSet> for Vec<UserId> {
    fn from(set: LikeSet) -> Self {
        set.likers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_is_idempotent() {
        let mut likes = LikeSet::new();
        assert!(likes.add(UserId(3)).unwrap());
        assert!(!likes.add(UserId(3)).unwrap());
        assert_eq!(likes.len(), 1);
        assert!(likes.contains(UserId(3)));
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut likes = LikeSet::new();
        likes.add(UserId(1)).unwrap();
        assert!(!likes.remove(UserId(2)));
        assert!(likes.remove(UserId(1)));
        assert!(likes.is_empty());
    }

    #[test]
    fn test_rejects_non_positive_id() {
        let mut likes = LikeSet::new();
        assert!(likes.add(UserId(0)).is_err());
        assert!(likes.add(UserId(-1)).is_err());
        assert!(likes.is_empty());
    }

    #[test]
    fn test_preserves_insertion_order() {
        let mut likes = LikeSet::new();
        for id in [5, 2, 9] {
            likes.add(UserId(id)).unwrap();
        }
        assert_eq!(likes.as_slice(), &[UserId(5), UserId(2), UserId(9)]);
    }

    #[test]
    fn test_deserialize_rejects_bad_likers() {
        let set: LikeSet = serde_json::from_str("[3,1]").unwrap();
        assert_eq!(set.as_slice(), &[UserId(3), UserId(1)]);
        assert_eq!(serde_json::to_string(&set).unwrap(), "[3,1]");
        assert!(serde_json::from_str::<LikeSet>("[3,3]").is_err());
        assert!(serde_json::from_str::<LikeSet>("[0]").is_err());
    }
}
