//! One file per key under a data directory.

use std::fs;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Component, Path, PathBuf};

use kinship_shared::{Error, Result};
use tracing::{debug, info};

use crate::config::StoreConfig;
use crate::kv::{validate_key, KeyValueStore};

/// Verify that a resolved path stays within the expected base directory.
fn ensure_within(base: &Path, target: &Path) -> Result<PathBuf> {
    let canonical_base = base.canonicalize().unwrap_or_else(|_| base.to_path_buf());
    let mut resolved = canonical_base.clone();
    let relative = target.strip_prefix(base).unwrap_or(target);
    for component in relative.components() {
        match component {
            Component::Normal(c) => resolved.push(c),
            Component::ParentDir => return Err(Error::file("Path traversal detected")),
            _ => {}
        }
    }
    if !resolved.starts_with(&canonical_base) {
        return Err(Error::file("Path traversal detected"));
    }
    Ok(resolved)
}

#[derive(Debug, Clone)]
pub struct FileStore {
    base_path: PathBuf,
    max_size: usize,
}

impl FileStore {
    /// Open a store rooted at `base_path`, creating the directory if needed.
    pub fn open(base_path: impl Into<PathBuf>, max_size: usize) -> Result<Self> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path).map_err(|e| {
            Error::file(format!(
                "Failed to create data directory '{}': {}",
                base_path.display(),
                e
            ))
        })?;

        info!(path = %base_path.display(), max_size, "file store opened");

        Ok(Self {
            base_path,
            max_size,
        })
    }

    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        Self::open(config.data_dir.clone(), config.max_blob_size)
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        ensure_within(&self.base_path, &self.base_path.join(key))
    }
}

impl KeyValueStore for FileStore {
    fn save(&mut self, key: &str, blob: &str) -> Result<()> {
        if blob.len() > self.max_size {
            return Err(Error::file(format!(
                "Blob {key} is too large: {} bytes (max {})",
                blob.len(),
                self.max_size
            )));
        }
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::file(format!("Failed to create directory for {key}: {e}"))
            })?;
        }
        fs::write(&path, blob).map_err(|e| Error::file(format!("Failed to write {key}: {e}")))?;

        debug!(key, size = blob.len(), "saved blob");
        Ok(())
    }

    fn load(&self, key: &str) -> Result<String> {
        let path = self.path_for(key)?;
        let blob = fs::read_to_string(&path).map_err(|e| match e.kind() {
            IoErrorKind::NotFound => Error::file(format!("No blob stored under {key:?}")),
            _ => Error::file(format!("Failed to read {key}: {e}")),
        })?;

        debug!(key, size = blob.len(), "loaded blob");
        Ok(blob)
    }

    fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.path_for(key)?.is_file())
    }

    fn delete(&mut self, key: &str) -> Result<bool> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(key, "deleted blob");
                Ok(true)
            }
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::file(format!("Failed to delete {key}: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kinship_shared::ErrorKind;
    use tempfile::TempDir;

    fn test_store() -> (FileStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path().join("data"), 1024).unwrap();
        (store, dir)
    }

    #[test]
    fn test_save_and_load() {
        let (mut store, _dir) = test_store();
        store.save("post/1", "post|1|1|0|2025-01-01|hi|||").unwrap();
        assert!(store.exists("post/1").unwrap());
        assert!(store.base_path().join("post").join("1").is_file());
        assert_eq!(store.load("post/1").unwrap(), "post|1|1|0|2025-01-01|hi|||");
    }

    #[test]
    fn test_missing_key_is_file_error() {
        let (store, _dir) = test_store();
        let err = store.load("user/404").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::File);
        assert!(!store.exists("user/404").unwrap());
    }

    #[test]
    fn test_delete() {
        let (mut store, _dir) = test_store();
        store.save("manifest", "x").unwrap();
        assert!(store.delete("manifest").unwrap());
        assert!(!store.delete("manifest").unwrap());
        assert!(store.load("manifest").is_err());
    }

    #[test]
    fn test_unsafe_keys_rejected() {
        let (mut store, dir) = test_store();
        for key in ["../escape", "/etc/passwd", "a/../../b", "dot.file"] {
            let err = store.save(key, "x").unwrap_err();
            assert_eq!(err.kind(), ErrorKind::File, "{key}");
        }
        assert!(!dir.path().join("escape").exists());
    }

    #[test]
    fn test_blob_size_limit() {
        let (mut store, _dir) = test_store();
        let big = "x".repeat(1025);
        assert!(store.save("user/1", &big).is_err());
        assert!(!store.exists("user/1").unwrap());
        store.save("user/1", &big[..1024]).unwrap();
    }

    #[test]
    fn test_ensure_within_rejects_parent_dir() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("..").join("outside");
        assert!(ensure_within(dir.path(), &target).is_err());
        let inside = ensure_within(dir.path(), &dir.path().join("a").join("b")).unwrap();
        assert!(inside.ends_with("a/b"));
    }
}
