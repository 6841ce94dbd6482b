//! Cooperative cancellation.

use crate::ArchiveError;
use crate::Result;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

/// Shared cancellation flag polled by running operations.
///
/// Clones share the same flag. Cancelling is sticky: once set it stays set.
///
/// # Examples
///
/// ```
/// use hammer_core::CancellationToken;
///
/// let token = CancellationToken::new();
/// let worker_view = token.clone();
/// assert!(worker_view.check().is_ok());
///
/// token.cancel();
/// assert!(worker_view.is_cancelled());
/// assert!(worker_view.check().is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Returns `true` once cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Returns [`ArchiveError::Cancelled`] if cancellation was requested.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(ArchiveError::Cancelled)
        } else {
            Ok(())
        }
    }
}
