use std::collections::HashMap;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::{
    AnswerRecord, AssessmentAttempt, AssessmentSnapshot, QuestionOption, QuestionWithOptions,
    SecurityLogEntry,
};
use crate::repositories;
use crate::store::{EngineStore, FinalizeAttempt, SaveAnswerOutcome, SecurityLogFilter};

pub(crate) struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub(crate) fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EngineStore for PgStore {
    async fn health(&self) -> anyhow::Result<()> {
        repositories::health::ping(&self.pool).await.context("database ping failed")
    }

    async fn assessment_snapshot(
        &self,
        assessment_id: &str,
    ) -> anyhow::Result<Option<AssessmentSnapshot>> {
        let Some(assessment) = repositories::assessments::find_by_id(&self.pool, assessment_id)
            .await
            .context("failed to load assessment")?
        else {
            return Ok(None);
        };

        let questions = repositories::assessments::list_questions(&self.pool, assessment_id)
            .await
            .context("failed to load questions")?;
        let question_ids: Vec<String> =
            questions.iter().map(|question| question.id.clone()).collect();
        let options = repositories::assessments::list_options(&self.pool, &question_ids)
            .await
            .context("failed to load question options")?;

        let mut grouped: HashMap<String, Vec<QuestionOption>> = HashMap::new();
        for option in options {
            grouped.entry(option.question_id.clone()).or_default().push(option);
        }

        let questions = questions
            .into_iter()
            .map(|question| {
                let options = grouped.remove(&question.id).unwrap_or_default();
                QuestionWithOptions { question, options }
            })
            .collect();

        Ok(Some(AssessmentSnapshot { assessment, questions }))
    }

    async fn attempts_for_trainee(
        &self,
        assessment_id: &str,
        trainee_id: &str,
    ) -> anyhow::Result<Vec<AssessmentAttempt>> {
        repositories::attempts::list_by_trainee(&self.pool, assessment_id, trainee_id)
            .await
            .context("failed to list attempts for trainee")
    }

    async fn attempts_for_assessment(
        &self,
        assessment_id: &str,
    ) -> anyhow::Result<Vec<AssessmentAttempt>> {
        repositories::attempts::list_by_assessment(&self.pool, assessment_id)
            .await
            .context("failed to list attempts for assessment")
    }

    async fn attempt_by_id(&self, attempt_id: &str) -> anyhow::Result<Option<AssessmentAttempt>> {
        repositories::attempts::find_by_id(&self.pool, attempt_id)
            .await
            .context("failed to load attempt")
    }

    async fn create_attempt(&self, attempt: &AssessmentAttempt) -> anyhow::Result<bool> {
        repositories::attempts::create(&self.pool, attempt)
            .await
            .context("failed to create attempt")
    }

    async fn save_answer(
        &self,
        attempt_id: &str,
        record: AnswerRecord,
        now: PrimitiveDateTime,
    ) -> anyhow::Result<SaveAnswerOutcome> {
        repositories::attempts::save_answer(&self.pool, attempt_id, record, now)
            .await
            .context("failed to save answer")
    }

    async fn finalize_attempt(
        &self,
        attempt_id: &str,
        update: FinalizeAttempt,
        now: PrimitiveDateTime,
    ) -> anyhow::Result<Option<AssessmentAttempt>> {
        repositories::attempts::finalize(&self.pool, attempt_id, update, now)
            .await
            .context("failed to finalize attempt")
    }

    async fn overdue_attempts(
        &self,
        now: PrimitiveDateTime,
        limit: i64,
    ) -> anyhow::Result<Vec<AssessmentAttempt>> {
        repositories::attempts::list_overdue(&self.pool, now, limit)
            .await
            .context("failed to list overdue attempts")
    }

    async fn append_security_event(&self, entry: &SecurityLogEntry) -> anyhow::Result<()> {
        repositories::security_logs::insert(&self.pool, entry)
            .await
            .context("failed to append security log entry")
    }

    async fn security_events(
        &self,
        filter: &SecurityLogFilter,
    ) -> anyhow::Result<Vec<SecurityLogEntry>> {
        repositories::security_logs::list(&self.pool, filter)
            .await
            .context("failed to list security log entries")
    }
}
