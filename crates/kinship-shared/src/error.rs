use std::fmt;

use thiserror::Error;

/// Errors produced anywhere in the social model.
///
/// Every variant carries a human-readable message; [`Error::kind`] exposes the
/// tag so callers can branch without matching on the message text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Malformed or referentially inconsistent input. Always raised before
    /// any state is mutated.
    #[error("ValidationError: {0}")]
    Validation(String),

    /// Credential mismatch.
    #[error("AuthenticationError: {0}")]
    Authentication(String),

    /// Failure at the persistence boundary.
    #[error("FileError: {0}")]
    File(String),
}

/// Tag of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Authentication,
    File,
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication(message.into())
    }

    pub fn file(message: impl Into<String>) -> Self {
        Self::File(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Authentication(_) => ErrorKind::Authentication,
            Self::File(_) => ErrorKind::File,
        }
    }

    /// The message without the kind prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::Validation(m) | Self::Authentication(m) | Self::File(m) => m,
        }
    }
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "ValidationError",
            Self::Authentication => "AuthenticationError",
            Self::File => "FileError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, Error>;
