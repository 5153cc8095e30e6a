//! The persistence seam: a flat namespace of text blobs.

use std::collections::BTreeMap;

use kinship_shared::{Error, Result};

/// Stores text blobs under string keys.
///
/// Keys are made of `/`-separated segments of ASCII letters, digits, `-`
/// and `_` (see [`validate_key`]).
pub trait KeyValueStore {
    fn save(&mut self, key: &str, blob: &str) -> Result<()>;

    /// Fails with a file error when `key` has never been saved.
    fn load(&self, key: &str) -> Result<String>;

    fn exists(&self, key: &str) -> Result<bool>;

    /// Returns whether anything was removed.
    fn delete(&mut self, key: &str) -> Result<bool>;
}

/// Reject keys that could escape a namespace or a data directory.
pub fn validate_key(key: &str) -> Result<()> {
    let well_formed = !key.is_empty()
        && key.split('/').all(|segment| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        });
    if well_formed {
        Ok(())
    } else {
        Err(Error::file(format!("Invalid storage key {key:?}")))
    }
}

/// In-process store, mostly for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    blobs: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.blobs.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn save(&mut self, key: &str, blob: &str) -> Result<()> {
        validate_key(key)?;
        self.blobs.insert(key.to_string(), blob.to_string());
        Ok(())
    }

    fn load(&self, key: &str) -> Result<String> {
        validate_key(key)?;
        self.blobs
            .get(key)
            .cloned()
            .ok_or_else(|| Error::file(format!("No blob stored under {key:?}")))
    }

    fn exists(&self, key: &str) -> Result<bool> {
        validate_key(key)?;
        Ok(self.blobs.contains_key(key))
    }

    fn delete(&mut self, key: &str) -> Result<bool> {
        validate_key(key)?;
        Ok(self.blobs.remove(key).is_some())
    }
}
