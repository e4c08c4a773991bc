//! In-process store used by the test suite. Mirrors the Postgres backend's
//! conditional-write semantics so service tests exercise the same races.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use time::PrimitiveDateTime;
use tokio::sync::RwLock;

use crate::db::models::{
    upsert_answer, AnswerRecord, AssessmentAttempt, AssessmentSnapshot, SecurityLogEntry,
};
use crate::db::types::AttemptStatus;
use crate::store::{EngineStore, FinalizeAttempt, SaveAnswerOutcome, SecurityLogFilter};

#[derive(Default)]
struct Inner {
    assessments: HashMap<String, AssessmentSnapshot>,
    attempts: HashMap<String, AssessmentAttempt>,
    events: Vec<SecurityLogEntry>,
}

#[derive(Default)]
pub(crate) struct MemoryStore {
    inner: RwLock<Inner>,
    fail_security_writes: AtomicBool,
}

impl MemoryStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn put_assessment(&self, snapshot: AssessmentSnapshot) {
        let mut inner = self.inner.write().await;
        inner.assessments.insert(snapshot.assessment.id.clone(), snapshot);
    }

    /// Bypasses the single-active-attempt guard; for seeding test fixtures.
    pub(crate) async fn insert_attempt_unchecked(&self, attempt: AssessmentAttempt) {
        let mut inner = self.inner.write().await;
        inner.attempts.insert(attempt.id.clone(), attempt);
    }

    pub(crate) fn set_security_write_failure(&self, fail: bool) {
        self.fail_security_writes.store(fail, Ordering::SeqCst);
    }

    pub(crate) async fn security_event_count(&self) -> usize {
        self.inner.read().await.events.len()
    }
}

#[async_trait]
impl EngineStore for MemoryStore {
    async fn health(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn assessment_snapshot(
        &self,
        assessment_id: &str,
    ) -> anyhow::Result<Option<AssessmentSnapshot>> {
        Ok(self.inner.read().await.assessments.get(assessment_id).cloned())
    }

    async fn attempts_for_trainee(
        &self,
        assessment_id: &str,
        trainee_id: &str,
    ) -> anyhow::Result<Vec<AssessmentAttempt>> {
        let inner = self.inner.read().await;
        let mut attempts: Vec<AssessmentAttempt> = inner
            .attempts
            .values()
            .filter(|attempt| {
                attempt.assessment_id == assessment_id && attempt.trainee_id == trainee_id
            })
            .cloned()
            .collect();
        attempts.sort_by_key(|attempt| attempt.attempt_number);
        Ok(attempts)
    }

    async fn attempts_for_assessment(
        &self,
        assessment_id: &str,
    ) -> anyhow::Result<Vec<AssessmentAttempt>> {
        let inner = self.inner.read().await;
        let mut attempts: Vec<AssessmentAttempt> = inner
            .attempts
            .values()
            .filter(|attempt| attempt.assessment_id == assessment_id)
            .cloned()
            .collect();
        attempts.sort_by(|a, b| {
            (&a.trainee_id, a.attempt_number).cmp(&(&b.trainee_id, b.attempt_number))
        });
        Ok(attempts)
    }

    async fn attempt_by_id(&self, attempt_id: &str) -> anyhow::Result<Option<AssessmentAttempt>> {
        Ok(self.inner.read().await.attempts.get(attempt_id).cloned())
    }

    async fn create_attempt(&self, attempt: &AssessmentAttempt) -> anyhow::Result<bool> {
        let mut inner = self.inner.write().await;
        let slot_taken = inner.attempts.values().any(|existing| {
            existing.assessment_id == attempt.assessment_id
                && existing.trainee_id == attempt.trainee_id
                && existing.status == AttemptStatus::InProgress
        });
        if slot_taken || inner.attempts.contains_key(&attempt.id) {
            return Ok(false);
        }
        inner.attempts.insert(attempt.id.clone(), attempt.clone());
        Ok(true)
    }

    async fn save_answer(
        &self,
        attempt_id: &str,
        record: AnswerRecord,
        now: PrimitiveDateTime,
    ) -> anyhow::Result<SaveAnswerOutcome> {
        let mut inner = self.inner.write().await;
        let Some(attempt) = inner.attempts.get_mut(attempt_id) else {
            return Ok(SaveAnswerOutcome::NotFound);
        };
        if attempt.status.is_terminal() {
            return Ok(SaveAnswerOutcome::NotActive);
        }
        upsert_answer(&mut attempt.answers.0, record);
        attempt.updated_at = now;
        Ok(SaveAnswerOutcome::Saved)
    }

    async fn finalize_attempt(
        &self,
        attempt_id: &str,
        update: FinalizeAttempt,
        now: PrimitiveDateTime,
    ) -> anyhow::Result<Option<AssessmentAttempt>> {
        let mut inner = self.inner.write().await;
        let Some(attempt) = inner.attempts.get_mut(attempt_id) else {
            return Ok(None);
        };
        if attempt.status.is_terminal() {
            return Ok(None);
        }
        attempt.status = update.status;
        attempt.submitted_at = update.submitted_at;
        attempt.score = Some(update.score);
        attempt.percentage = Some(update.percentage);
        attempt.is_passed = Some(update.is_passed);
        attempt.answers.0 = update.answers;
        attempt.updated_at = now;
        Ok(Some(attempt.clone()))
    }

    async fn overdue_attempts(
        &self,
        now: PrimitiveDateTime,
        limit: i64,
    ) -> anyhow::Result<Vec<AssessmentAttempt>> {
        let inner = self.inner.read().await;
        let mut overdue: Vec<AssessmentAttempt> = inner
            .attempts
            .values()
            .filter(|attempt| {
                attempt.status == AttemptStatus::InProgress
                    && attempt.expires_at.is_some_and(|deadline| deadline <= now)
            })
            .cloned()
            .collect();
        overdue.sort_by_key(|attempt| attempt.expires_at);
        overdue.truncate(limit.max(0) as usize);
        Ok(overdue)
    }

    async fn append_security_event(&self, entry: &SecurityLogEntry) -> anyhow::Result<()> {
        if self.fail_security_writes.load(Ordering::SeqCst) {
            anyhow::bail!("security log write rejected");
        }
        self.inner.write().await.events.push(entry.clone());
        Ok(())
    }

    async fn security_events(
        &self,
        filter: &SecurityLogFilter,
    ) -> anyhow::Result<Vec<SecurityLogEntry>> {
        let inner = self.inner.read().await;
        let events = inner
            .events
            .iter()
            .filter(|event| {
                filter
                    .assessment_id
                    .as_ref()
                    .is_none_or(|id| event.assessment_id == *id)
                    && filter.trainee_id.as_ref().is_none_or(|id| event.trainee_id == *id)
                    && filter
                        .attempt_id
                        .as_ref()
                        .is_none_or(|id| event.attempt_id.as_deref() == Some(id.as_str()))
                    && filter.from.is_none_or(|from| event.event_timestamp >= from)
                    && filter.to.is_none_or(|to| event.event_timestamp <= to)
            })
            .cloned()
            .collect();
        Ok(events)
    }
}
