use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::{AnswerRecord, AssessmentAttempt};
use crate::db::types::AttemptStatus;
use crate::domain::scoring::AnswerValue;
use crate::services::reporting::TraineeAssessmentSummary;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct StartAttemptRequest {
    #[serde(alias = "traineeId")]
    #[validate(length(min = 1, message = "trainee_id must not be empty"))]
    pub(crate) trainee_id: String,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SaveAnswerRequest {
    #[serde(alias = "questionId")]
    #[validate(length(min = 1, message = "question_id must not be empty"))]
    pub(crate) question_id: String,
    pub(crate) answer: AnswerValue,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AnswerInput {
    #[serde(alias = "questionId")]
    pub(crate) question_id: String,
    pub(crate) answer: AnswerValue,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmitAttemptRequest {
    #[serde(default)]
    pub(crate) answers: Vec<AnswerInput>,
}

#[derive(Debug, Serialize)]
pub(crate) struct AnswerRecordResponse {
    pub(crate) question_id: String,
    pub(crate) answer: AnswerValue,
    pub(crate) is_correct: Option<bool>,
    pub(crate) points_earned: Option<f64>,
    pub(crate) answered_at: Option<String>,
}

impl AnswerRecordResponse {
    fn from_record(record: AnswerRecord) -> Self {
        Self {
            question_id: record.question_id,
            answer: record.answer,
            is_correct: record.is_correct,
            points_earned: record.points_earned,
            answered_at: record.answered_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AttemptResponse {
    pub(crate) id: String,
    pub(crate) assessment_id: String,
    pub(crate) trainee_id: String,
    pub(crate) attempt_number: i32,
    pub(crate) status: AttemptStatus,
    pub(crate) started_at: String,
    pub(crate) submitted_at: Option<String>,
    pub(crate) expires_at: Option<String>,
    pub(crate) score: Option<f64>,
    pub(crate) percentage: Option<f64>,
    pub(crate) is_passed: Option<bool>,
    pub(crate) answers: Vec<AnswerRecordResponse>,
}

impl AttemptResponse {
    pub(crate) fn from_model(attempt: AssessmentAttempt) -> Self {
        Self {
            id: attempt.id,
            assessment_id: attempt.assessment_id,
            trainee_id: attempt.trainee_id,
            attempt_number: attempt.attempt_number,
            status: attempt.status,
            started_at: format_primitive(attempt.started_at),
            submitted_at: attempt.submitted_at.map(format_primitive),
            expires_at: attempt.expires_at.map(format_primitive),
            score: attempt.score,
            percentage: attempt.percentage,
            is_passed: attempt.is_passed,
            answers: attempt.answers.0.into_iter().map(AnswerRecordResponse::from_record).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct StartAttemptResponse {
    pub(crate) resumed: bool,
    #[serde(flatten)]
    pub(crate) attempt: AttemptResponse,
}

#[derive(Debug, Serialize)]
pub(crate) struct TraineeSummaryResponse {
    pub(crate) assessment_id: String,
    pub(crate) trainee_id: String,
    pub(crate) attempts_count: usize,
    pub(crate) max_attempts: i32,
    pub(crate) best_score: Option<f64>,
    pub(crate) best_percentage: Option<f64>,
    pub(crate) has_passed: bool,
    pub(crate) has_active_attempt: bool,
    pub(crate) can_attempt: bool,
    pub(crate) deny_reason: Option<String>,
    pub(crate) last_attempt: Option<AttemptResponse>,
}

impl TraineeSummaryResponse {
    pub(crate) fn from_summary(summary: TraineeAssessmentSummary) -> Self {
        Self {
            assessment_id: summary.assessment_id,
            trainee_id: summary.trainee_id,
            attempts_count: summary.attempts_count,
            max_attempts: summary.max_attempts,
            best_score: summary.best_score,
            best_percentage: summary.best_percentage,
            has_passed: summary.has_passed,
            has_active_attempt: summary.has_active_attempt,
            can_attempt: summary.can_attempt,
            deny_reason: summary.deny_reason.map(|denial| denial.as_str().to_string()),
            last_attempt: summary.last_attempt.map(AttemptResponse::from_model),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AssessmentResultsResponse {
    pub(crate) assessment_id: String,
    pub(crate) trainees: Vec<TraineeSummaryResponse>,
}
