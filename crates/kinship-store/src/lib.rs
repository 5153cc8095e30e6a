//! # kinship-store
//!
//! Persistence for the social graph. [`KeyValueStore`] is the storage seam,
//! with an in-memory and a one-file-per-key implementation.
//! [`GraphRepository`] saves and restores a whole
//! [`SocialGraph`](kinship_social::SocialGraph) through any of them.

pub mod config;
pub mod file_store;
pub mod kv;
pub mod repository;

pub use config::StoreConfig;
pub use file_store::FileStore;
pub use kv::{validate_key, KeyValueStore, MemoryStore};
pub use repository::{GraphRepository, MANIFEST_KEY};
