//! Run cancellation
//!
//! Thin wrapper over `tokio_util`'s token. Only the synchronous side
//! (`cancel` / `is_cancelled`) is used, so no async runtime is needed.

use crate::error::AnalysisError;

/// Caller-held liveness token for an analysis run
///
/// Clones share the same state. Once cancelled it stays cancelled.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    inner: tokio_util::sync::CancellationToken,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token that is cancelled together with `self`, but can also be
    /// cancelled on its own
    pub fn child_token(&self) -> Self {
        Self {
            inner: self.inner.child_token(),
        }
    }

    /// Revoke the token
    pub fn cancel(&self) {
        self.inner.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.is_cancelled()
    }

    /// `Err(Cancelled)` once the token has been revoked
    pub fn check(&self) -> Result<(), AnalysisError> {
        if self.is_cancelled() {
            Err(AnalysisError::Cancelled)
        } else {
            Ok(())
        }
    }
}

impl From<tokio_util::sync::CancellationToken> for CancellationToken {
    fn from(inner: tokio_util::sync::CancellationToken) -> Self {
        Self { inner }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let token = CancellationToken::new();
        let held_by_run = token.clone();
        assert!(held_by_run.check().is_ok());

        token.cancel();
        assert!(held_by_run.is_cancelled());
        assert!(matches!(held_by_run.check(), Err(AnalysisError::Cancelled)));
    }

    #[test]
    fn test_child_follows_parent_only() {
        let batch = CancellationToken::new();
        let first = batch.child_token();
        let second = batch.child_token();

        first.cancel();
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
        assert!(!batch.is_cancelled());

        batch.cancel();
        assert!(second.check().is_err());
    }

    #[test]
    fn test_wraps_existing_token() {
        let shared = tokio_util::sync::CancellationToken::new();
        let token = CancellationToken::from(shared.clone());
        shared.cancel();
        assert!(token.is_cancelled());
    }
}
