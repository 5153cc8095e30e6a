//! Password hashing collaborator.
//!
//! The social model never sees plaintext after construction: it stores the
//! output of a [`PasswordHasher`] and compares hashes on verification.

use crate::constants::KDF_CONTEXT_PASSWORD;

/// Deterministic one-way function from plaintext to an opaque string.
pub trait PasswordHasher {
    fn hash(&self, plaintext: &str) -> String;
}

/// BLAKE3 in derive-key mode with a fixed context, hex encoded.
#[derive(Debug, Clone, Copy, Default)]
pub struct Blake3Hasher;

impl PasswordHasher for Blake3Hasher {
    fn hash(&self, plaintext: &str) -> String {
        let mut hasher = blake3::Hasher::new_derive_key(KDF_CONTEXT_PASSWORD);
        hasher.update(plaintext.as_bytes());
        hex::encode(hasher.finalize().as_bytes())
    }
}

impl<F> PasswordHasher for F
where
    F: Fn(&str) -> String,
{
    fn hash(&self, plaintext: &str) -> String {
        self(plaintext)
    }
}
