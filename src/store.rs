//! Persistence contract for the attempt engine. The service layer talks to
//! this trait only; the Postgres backend lives in `store::postgres` and an
//! in-process backend backs the test suite.

#[cfg(test)]
pub(crate) mod memory;
pub(crate) mod postgres;

use async_trait::async_trait;
use time::PrimitiveDateTime;

use crate::db::models::{AnswerRecord, AssessmentAttempt, AssessmentSnapshot, SecurityLogEntry};
use crate::db::types::AttemptStatus;

/// Result of writing one answer into an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SaveAnswerOutcome {
    Saved,
    /// Attempt exists but is no longer `in_progress`.
    NotActive,
    NotFound,
}

/// Terminal transition applied with compare-and-set semantics: the store
/// only applies it while the attempt is still `in_progress`.
#[derive(Debug, Clone)]
pub(crate) struct FinalizeAttempt {
    pub(crate) status: AttemptStatus,
    pub(crate) submitted_at: Option<PrimitiveDateTime>,
    pub(crate) score: f64,
    pub(crate) percentage: f64,
    pub(crate) is_passed: bool,
    pub(crate) answers: Vec<AnswerRecord>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct SecurityLogFilter {
    pub(crate) assessment_id: Option<String>,
    pub(crate) trainee_id: Option<String>,
    pub(crate) attempt_id: Option<String>,
    pub(crate) from: Option<PrimitiveDateTime>,
    pub(crate) to: Option<PrimitiveDateTime>,
}

#[async_trait]
pub(crate) trait EngineStore: Send + Sync {
    async fn health(&self) -> anyhow::Result<()>;

    async fn assessment_snapshot(
        &self,
        assessment_id: &str,
    ) -> anyhow::Result<Option<AssessmentSnapshot>>;

    async fn attempts_for_trainee(
        &self,
        assessment_id: &str,
        trainee_id: &str,
    ) -> anyhow::Result<Vec<AssessmentAttempt>>;

    async fn attempts_for_assessment(
        &self,
        assessment_id: &str,
    ) -> anyhow::Result<Vec<AssessmentAttempt>>;

    async fn attempt_by_id(&self, attempt_id: &str) -> anyhow::Result<Option<AssessmentAttempt>>;

    /// Inserts a new attempt. Returns `false` when another open attempt for
    /// the same trainee and assessment already holds the slot.
    async fn create_attempt(&self, attempt: &AssessmentAttempt) -> anyhow::Result<bool>;

    async fn save_answer(
        &self,
        attempt_id: &str,
        record: AnswerRecord,
        now: PrimitiveDateTime,
    ) -> anyhow::Result<SaveAnswerOutcome>;

    /// Applies a terminal transition. Returns the updated row, or `None`
    /// when the attempt was missing or already terminal.
    async fn finalize_attempt(
        &self,
        attempt_id: &str,
        update: FinalizeAttempt,
        now: PrimitiveDateTime,
    ) -> anyhow::Result<Option<AssessmentAttempt>>;

    /// Open attempts whose deadline has passed, oldest first.
    async fn overdue_attempts(
        &self,
        now: PrimitiveDateTime,
        limit: i64,
    ) -> anyhow::Result<Vec<AssessmentAttempt>>;

    async fn append_security_event(&self, entry: &SecurityLogEntry) -> anyhow::Result<()>;

    async fn security_events(
        &self,
        filter: &SecurityLogFilter,
    ) -> anyhow::Result<Vec<SecurityLogEntry>>;
}
