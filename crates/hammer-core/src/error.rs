//! Error types for archive operations.

use crate::formats::ArchiveFormat;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using `ArchiveError`.
pub type Result<T> = std::result::Result<T, ArchiveError>;

/// Errors that can occur while reading, writing or rebuilding archives.
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Archive or source path does not exist.
    #[error("path not found: {path}")]
    NotFound {
        /// The missing path.
        path: PathBuf,
    },

    /// The archive format could not be determined.
    #[error("unknown archive format: {path}")]
    UnknownFormat {
        /// The path whose format is unknown.
        path: PathBuf,
    },

    /// The format does not support the requested operation.
    #[error("{format} does not support {operation}")]
    UnsupportedOperation {
        /// Format the operation was attempted on.
        format: ArchiveFormat,
        /// Short description of the operation.
        operation: &'static str,
    },

    /// Archive is corrupted or invalid.
    #[error("invalid archive: {0}")]
    InvalidArchive(String),

    /// The archive is encrypted and no password was supplied.
    #[error("archive is encrypted and requires a password")]
    PasswordRequired,

    /// The supplied password does not decrypt the archive.
    #[error("invalid password")]
    InvalidPassword,

    /// The operation observed a cancellation request.
    #[error("operation cancelled")]
    Cancelled,

    /// Compression level outside 0-9.
    #[error("invalid compression level {level}, must be 0-9")]
    InvalidCompressionLevel {
        /// The rejected level.
        level: u8,
    },

    /// Entry path escapes the output directory.
    #[error("path traversal detected: {path}")]
    PathTraversal {
        /// The offending entry path.
        path: PathBuf,
    },

    /// Configuration is internally inconsistent.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Why the configuration was rejected.
        reason: String,
    },
}

impl ArchiveError {
    /// Returns `true` if this error only affects a single entry.
    ///
    /// Recoverable errors are recorded in the operation result and the
    /// operation continues with the next entry.
    ///
    /// # Examples
    ///
    /// ```
    /// use hammer_core::ArchiveError;
    /// use std::path::PathBuf;
    ///
    /// let err = ArchiveError::PathTraversal {
    ///     path: PathBuf::from("../etc/passwd"),
    /// };
    /// assert!(err.is_recoverable());
    ///
    /// assert!(!ArchiveError::Cancelled.is_recoverable());
    /// ```
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Io(_) | Self::NotFound { .. } | Self::PathTraversal { .. }
        )
    }

    /// Returns `true` for missing or wrong password errors.
    #[must_use]
    pub const fn is_password_error(&self) -> bool {
        matches!(self, Self::PasswordRequired | Self::InvalidPassword)
    }

    /// Returns `true` if the error is a cancellation.
    #[must_use]
    pub const fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Adds context to the error message.
    ///
    /// Variants without a free-form message are returned unchanged.
    #[must_use]
    pub fn context(self, context: &str) -> Self {
        match self {
            Self::InvalidArchive(msg) => Self::InvalidArchive(format!("{context}: {msg}")),
            Self::InvalidConfig { reason } => Self::InvalidConfig {
                reason: format!("{context}: {reason}"),
            },
            Self::Io(err) => Self::Io(std::io::Error::new(
                err.kind(),
                format!("{context}: {err}"),
            )),
            other => other,
        }
    }
}

impl From<zip::result::ZipError> for ArchiveError {
    fn from(err: zip::result::ZipError) -> Self {
        use zip::result::ZipError;

        match err {
            ZipError::Io(e) => Self::Io(e),
            ZipError::InvalidPassword => Self::InvalidPassword,
            ZipError::UnsupportedArchive(detail) if detail == ZipError::PASSWORD_REQUIRED => {
                Self::PasswordRequired
            }
            other => Self::InvalidArchive(other.to_string()),
        }
    }
}

impl From<sevenz_rust2::Error> for ArchiveError {
    fn from(err: sevenz_rust2::Error) -> Self {
        match err {
            sevenz_rust2::Error::PasswordRequired => Self::PasswordRequired,
            sevenz_rust2::Error::MaybeBadPassword(_) => Self::InvalidPassword,
            other => Self::InvalidArchive(other.to_string()),
        }
    }
}

impl From<xz2::stream::Error> for ArchiveError {
    fn from(err: xz2::stream::Error) -> Self {
        Self::InvalidArchive(format!("lzma stream: {err}"))
    }
}

impl From<walkdir::Error> for ArchiveError {
    fn from(err: walkdir::Error) -> Self {
        match err.path().map(std::path::Path::to_path_buf) {
            Some(path) if err.io_error().is_some_and(|e| {
                e.kind() == std::io::ErrorKind::NotFound
            }) =>
            {
                Self::NotFound { path }
            }
            _ => Self::Io(std::io::Error::other(err.to_string())),
        }
    }
}
