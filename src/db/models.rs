use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::{AttemptStatus, EventSeverity, QuestionType, SecurityEventType};
use crate::domain::scoring::AnswerValue;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Assessment {
    pub(crate) id: String,
    pub(crate) course_id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) time_limit_minutes: Option<i32>,
    pub(crate) passing_score: f64,
    pub(crate) max_attempts: i32,
    pub(crate) is_active: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Question {
    pub(crate) id: String,
    pub(crate) assessment_id: String,
    pub(crate) question_type: QuestionType,
    pub(crate) prompt: String,
    pub(crate) points: f64,
    pub(crate) order_index: i32,
    /// Stored reference answer; only meaningful for identification questions.
    pub(crate) correct_answer: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct QuestionOption {
    pub(crate) id: String,
    pub(crate) question_id: String,
    pub(crate) text: String,
    pub(crate) is_correct: bool,
    pub(crate) order_index: i32,
}

/// One submitted (or autosaved) answer. Grading fields stay unset until the
/// attempt reaches a terminal status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct AnswerRecord {
    pub(crate) question_id: String,
    pub(crate) answer: AnswerValue,
    #[serde(default)]
    pub(crate) is_correct: Option<bool>,
    #[serde(default)]
    pub(crate) points_earned: Option<f64>,
    #[serde(default)]
    pub(crate) answered_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct AssessmentAttempt {
    pub(crate) id: String,
    pub(crate) assessment_id: String,
    pub(crate) trainee_id: String,
    pub(crate) attempt_number: i32,
    pub(crate) status: AttemptStatus,
    pub(crate) started_at: PrimitiveDateTime,
    pub(crate) submitted_at: Option<PrimitiveDateTime>,
    /// Materialized deadline for time-boxed assessments; the watchdog sweep
    /// keys on this.
    pub(crate) expires_at: Option<PrimitiveDateTime>,
    pub(crate) score: Option<f64>,
    pub(crate) percentage: Option<f64>,
    pub(crate) is_passed: Option<bool>,
    pub(crate) answers: Json<Vec<AnswerRecord>>,
    pub(crate) ip_address: Option<String>,
    pub(crate) user_agent: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct SecurityLogEntry {
    pub(crate) id: String,
    pub(crate) trainee_id: String,
    pub(crate) assessment_id: String,
    pub(crate) attempt_id: Option<String>,
    pub(crate) event_type: SecurityEventType,
    pub(crate) severity: EventSeverity,
    pub(crate) activity: String,
    pub(crate) ip_address: Option<String>,
    pub(crate) user_agent: Option<String>,
    pub(crate) event_timestamp: PrimitiveDateTime,
    pub(crate) additional_data: Option<Json<serde_json::Value>>,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone)]
pub(crate) struct QuestionWithOptions {
    pub(crate) question: Question,
    pub(crate) options: Vec<QuestionOption>,
}

/// Read-only view of an assessment and its question set, as seen by the
/// engine for the duration of one operation.
#[derive(Debug, Clone)]
pub(crate) struct AssessmentSnapshot {
    pub(crate) assessment: Assessment,
    pub(crate) questions: Vec<QuestionWithOptions>,
}

/// Replaces an existing answer for the same question or appends a new one.
pub(crate) fn upsert_answer(records: &mut Vec<AnswerRecord>, record: AnswerRecord) {
    match records.iter_mut().find(|existing| existing.question_id == record.question_id) {
        Some(existing) => *existing = record,
        None => records.push(record),
    }
}
