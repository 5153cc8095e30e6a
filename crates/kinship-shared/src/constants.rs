/// Key derivation context for password hashes (BLAKE3)
pub const KDF_CONTEXT_PASSWORD: &str = "kinship-password-hash-v1";

/// Field separator of persisted records
pub const FIELD_SEPARATOR: char = '|';

/// Item separator for list-valued record fields
pub const LIST_SEPARATOR: char = ',';

/// Separator between a friend id and its restricted flag
pub const PAIR_SEPARATOR: char = ':';

/// Maximum persisted blob size in bytes (4 MiB)
pub const DEFAULT_MAX_BLOB_SIZE: usize = 4 * 1024 * 1024;
