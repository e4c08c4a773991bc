pub(crate) mod attempts;
pub(crate) mod integrity;
pub(crate) mod reporting;

/// Engine-level failures. API handlers map these onto HTTP statuses; the
/// `Store` variant carries context chains from the persistence layer.
#[derive(Debug, thiserror::Error)]
pub(crate) enum EngineError {
    #[error("Assessment not found")]
    AssessmentNotFound,
    #[error("Assessment is not active")]
    AssessmentInactive,
    #[error("Attempt not found")]
    AttemptNotFound,
    #[error("An attempt is already in progress")]
    AttemptAlreadyActive,
    #[error("No attempts remaining")]
    AttemptLimitExceeded,
    #[error("Attempt is no longer active")]
    AttemptNotActive,
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}
