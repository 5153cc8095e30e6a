//! Storage configuration loaded from environment variables.
//!
//! Every setting has a default so a store can be opened with zero
//! configuration.

use std::path::PathBuf;

use directories::ProjectDirs;
use tracing::warn;

use kinship_shared::constants::DEFAULT_MAX_BLOB_SIZE;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Directory holding one file per stored key.
    /// Env: `KINSHIP_DATA_DIR`
    /// Default: the platform data directory, e.g.
    /// `~/.local/share/kinship` on Linux, or `./kinship-data` when the
    /// platform has none.
    pub data_dir: PathBuf,

    /// Largest blob a file store accepts, in bytes.
    /// Env: `KINSHIP_MAX_BLOB_SIZE`
    /// Default: 4 MiB
    pub max_blob_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            max_blob_size: DEFAULT_MAX_BLOB_SIZE,
        }
    }
}

impl StoreConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`StoreConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(dir) = lookup("KINSHIP_DATA_DIR") {
            if !dir.is_empty() {
                config.data_dir = PathBuf::from(dir);
            }
        }

        if let Some(val) = lookup("KINSHIP_MAX_BLOB_SIZE") {
            match val.parse::<usize>() {
                Ok(n) if n > 0 => config.max_blob_size = n,
                _ => {
                    warn!(
                        value = %val,
                        "Invalid KINSHIP_MAX_BLOB_SIZE, using default"
                    );
                }
            }
        }

        config
    }
}

fn default_data_dir() -> PathBuf {
    ProjectDirs::from("com", "kinship", "kinship")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("./kinship-data"))
}
