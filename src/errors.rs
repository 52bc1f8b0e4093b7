use thiserror::Error;

/// Typed error hierarchy for sentinel.
///
/// Use at module boundaries (constitution loading, auditor plumbing, gateway
/// startup). Internal/leaf functions can continue using `anyhow::Result` — the
/// `Internal` variant allows seamless conversion via the `?` operator.
///
/// The audit pipeline itself never surfaces errors: every fault inside it is
/// converted to a rejecting `Decision` (fail-closed), so these variants only
/// describe conditions outside a request's decision path.
#[derive(Debug, Error)]
pub enum SentinelError {
    #[error("Constitution error: {0}")]
    Constitution(String),

    #[error("Auditor error: {0}")]
    Auditor(String),

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Convenience alias for results using SentinelError.
pub type SentinelResult<T> = std::result::Result<T, SentinelError>;

impl SentinelError {
    /// Whether this error should abort process startup (non-zero exit) rather
    /// than being absorbed into a rejecting decision.
    pub fn is_startup_fatal(&self) -> bool {
        matches!(
            self,
            SentinelError::Constitution(_) | SentinelError::Transport(_)
        )
    }
}
