//! Attempt lifecycle: start or resume, answer autosave, submission and
//! deadline expiry. All terminal transitions go through the store's
//! compare-and-set update, so concurrent submits and sweeps converge on a
//! single grading.

use std::collections::HashMap;

use sqlx::types::Json;
use time::Duration;

use crate::core::time::{format_primitive, primitive_now_utc};
use crate::db::models::{
    AnswerRecord, AssessmentAttempt, AssessmentSnapshot, QuestionWithOptions,
};
use crate::db::types::{AttemptStatus, QuestionType, SecurityEventType};
use crate::domain::eligibility::{self, StartDenial};
use crate::domain::scoring::{
    self, AnswerValue, OptionDef, QuestionBody, QuestionDef, ScoreOutcome,
};
use crate::services::integrity::{IntegrityRecorder, RecordEvent};
use crate::services::EngineError;
use crate::store::{EngineStore, FinalizeAttempt, SaveAnswerOutcome};

#[derive(Debug, Clone, Default)]
pub(crate) struct ClientMeta {
    pub(crate) ip_address: Option<String>,
    pub(crate) user_agent: Option<String>,
}

#[derive(Debug)]
pub(crate) struct StartOutcome {
    pub(crate) attempt: AssessmentAttempt,
    pub(crate) resumed: bool,
}

/// Opens a new attempt, or hands back the trainee's open one. An open
/// attempt whose deadline already passed is expired first and does not
/// block a fresh start (subject to the attempt limit).
pub(crate) async fn start_or_resume(
    store: &dyn EngineStore,
    recorder: &IntegrityRecorder,
    assessment_id: &str,
    trainee_id: &str,
    meta: ClientMeta,
) -> Result<StartOutcome, EngineError> {
    let snapshot = store
        .assessment_snapshot(assessment_id)
        .await?
        .ok_or(EngineError::AssessmentNotFound)?;
    if !snapshot.assessment.is_active {
        return Err(EngineError::AssessmentInactive);
    }

    let mut attempts = store.attempts_for_trainee(assessment_id, trainee_id).await?;

    if let Some(open) = eligibility::resumable(&attempts) {
        let now = primitive_now_utc();
        if open.expires_at.is_some_and(|deadline| deadline < now) {
            // Watchdog has not swept this one yet; settle it inline.
            expire(store, &snapshot, open.clone()).await?;
            attempts = store.attempts_for_trainee(assessment_id, trainee_id).await?;
        } else {
            return Ok(StartOutcome { attempt: open.clone(), resumed: true });
        }
    }

    match eligibility::can_start(&snapshot.assessment, &attempts) {
        Ok(()) => {}
        Err(StartDenial::ActiveAttemptExists) => return Err(EngineError::AttemptAlreadyActive),
        Err(StartDenial::AttemptLimitReached) => return Err(EngineError::AttemptLimitExceeded),
    }

    let now = primitive_now_utc();
    let attempt_number =
        attempts.iter().map(|attempt| attempt.attempt_number).max().unwrap_or(0) + 1;
    let expires_at = snapshot
        .assessment
        .time_limit_minutes
        .map(|minutes| now + Duration::minutes(minutes as i64));

    let attempt = AssessmentAttempt {
        id: uuid::Uuid::new_v4().to_string(),
        assessment_id: assessment_id.to_string(),
        trainee_id: trainee_id.to_string(),
        attempt_number,
        status: AttemptStatus::InProgress,
        started_at: now,
        submitted_at: None,
        expires_at,
        score: None,
        percentage: None,
        is_passed: None,
        answers: Json(Vec::new()),
        ip_address: meta.ip_address.clone(),
        user_agent: meta.user_agent.clone(),
        created_at: now,
        updated_at: now,
    };

    if !store.create_attempt(&attempt).await? {
        // Lost the insert race; the winner's attempt is the one to resume.
        let attempts = store.attempts_for_trainee(assessment_id, trainee_id).await?;
        return match eligibility::resumable(&attempts) {
            Some(open) => Ok(StartOutcome { attempt: open.clone(), resumed: true }),
            None => Err(EngineError::AttemptAlreadyActive),
        };
    }

    recorder.record(RecordEvent {
        trainee_id: trainee_id.to_string(),
        assessment_id: assessment_id.to_string(),
        attempt_id: Some(attempt.id.clone()),
        event_type: SecurityEventType::AssessmentStarted,
        severity: None,
        activity: format!("Attempt {attempt_number} started"),
        ip_address: meta.ip_address,
        user_agent: meta.user_agent,
        event_timestamp: Some(now),
        additional_data: None,
    });

    Ok(StartOutcome { attempt, resumed: false })
}

/// Autosaves one answer into an open attempt. An attempt past its deadline
/// is expired instead, and the save is rejected.
pub(crate) async fn save_answer(
    store: &dyn EngineStore,
    attempt_id: &str,
    question_id: &str,
    answer: AnswerValue,
) -> Result<AssessmentAttempt, EngineError> {
    let attempt = store.attempt_by_id(attempt_id).await?.ok_or(EngineError::AttemptNotFound)?;
    if attempt.status.is_terminal() {
        return Err(EngineError::AttemptNotActive);
    }

    let now = primitive_now_utc();
    if attempt.expires_at.is_some_and(|deadline| deadline < now) {
        let snapshot = store
            .assessment_snapshot(&attempt.assessment_id)
            .await?
            .ok_or(EngineError::AssessmentNotFound)?;
        expire(store, &snapshot, attempt).await?;
        return Err(EngineError::AttemptNotActive);
    }

    let record = AnswerRecord {
        question_id: question_id.to_string(),
        answer,
        is_correct: None,
        points_earned: None,
        answered_at: Some(format_primitive(now)),
    };

    match store.save_answer(attempt_id, record, now).await? {
        SaveAnswerOutcome::Saved => {
            store.attempt_by_id(attempt_id).await?.ok_or(EngineError::AttemptNotFound)
        }
        SaveAnswerOutcome::NotActive => Err(EngineError::AttemptNotActive),
        SaveAnswerOutcome::NotFound => Err(EngineError::AttemptNotFound),
    }
}

/// Submits an attempt and grades it against the assessment's current
/// question set. Submitting a terminal attempt returns the recorded result
/// unchanged.
pub(crate) async fn submit(
    store: &dyn EngineStore,
    recorder: &IntegrityRecorder,
    attempt_id: &str,
    submitted: Vec<(String, AnswerValue)>,
    meta: ClientMeta,
) -> Result<AssessmentAttempt, EngineError> {
    let attempt = store.attempt_by_id(attempt_id).await?.ok_or(EngineError::AttemptNotFound)?;
    if attempt.status.is_terminal() {
        return Ok(attempt);
    }

    let snapshot = store
        .assessment_snapshot(&attempt.assessment_id)
        .await?
        .ok_or(EngineError::AssessmentNotFound)?;

    // Submitted answers take precedence over earlier autosaves.
    let mut merged: HashMap<String, AnswerValue> = HashMap::new();
    let mut answered_at: HashMap<String, String> = HashMap::new();
    for record in &attempt.answers.0 {
        merged.insert(record.question_id.clone(), record.answer.clone());
        if let Some(at) = &record.answered_at {
            answered_at.insert(record.question_id.clone(), at.clone());
        }
    }
    let now = primitive_now_utc();
    for (question_id, answer) in submitted {
        answered_at.insert(question_id.clone(), format_primitive(now));
        merged.insert(question_id, answer);
    }

    let questions = question_defs(&snapshot);
    let outcome = scoring::score(&questions, &merged);

    // A submit that arrives after the deadline still grades what was
    // provided, but the attempt is recorded as expired.
    let status = if attempt.expires_at.is_some_and(|deadline| deadline < now) {
        AttemptStatus::Expired
    } else {
        AttemptStatus::Submitted
    };

    let update = FinalizeAttempt {
        status,
        submitted_at: Some(now),
        score: outcome.score,
        percentage: outcome.percentage,
        is_passed: outcome.percentage >= snapshot.assessment.passing_score,
        answers: graded_records(&questions, &outcome, &merged, &answered_at),
    };

    let finalized = match store.finalize_attempt(attempt_id, update, now).await? {
        Some(finalized) => finalized,
        // Lost the race against a concurrent submit or the expiry sweep.
        None => {
            return store.attempt_by_id(attempt_id).await?.ok_or(EngineError::AttemptNotFound)
        }
    };

    recorder.record(RecordEvent {
        trainee_id: finalized.trainee_id.clone(),
        assessment_id: finalized.assessment_id.clone(),
        attempt_id: Some(finalized.id.clone()),
        event_type: SecurityEventType::AssessmentCompleted,
        severity: None,
        activity: format!("Attempt {} submitted", finalized.attempt_number),
        ip_address: meta.ip_address,
        user_agent: meta.user_agent,
        event_timestamp: Some(now),
        additional_data: None,
    });

    Ok(finalized)
}

/// Closes an overdue attempt, grading whatever answers were autosaved.
/// Returns `None` when a concurrent submit settled it first.
pub(crate) async fn expire(
    store: &dyn EngineStore,
    snapshot: &AssessmentSnapshot,
    attempt: AssessmentAttempt,
) -> Result<Option<AssessmentAttempt>, EngineError> {
    let mut merged: HashMap<String, AnswerValue> = HashMap::new();
    let mut answered_at: HashMap<String, String> = HashMap::new();
    for record in &attempt.answers.0 {
        merged.insert(record.question_id.clone(), record.answer.clone());
        if let Some(at) = &record.answered_at {
            answered_at.insert(record.question_id.clone(), at.clone());
        }
    }

    let questions = question_defs(snapshot);
    let outcome = scoring::score(&questions, &merged);
    let now = primitive_now_utc();

    let update = FinalizeAttempt {
        status: AttemptStatus::Expired,
        submitted_at: Some(now),
        score: outcome.score,
        percentage: outcome.percentage,
        is_passed: outcome.percentage >= snapshot.assessment.passing_score,
        answers: graded_records(&questions, &outcome, &merged, &answered_at),
    };

    Ok(store.finalize_attempt(&attempt.id, update, now).await?)
}

pub(crate) fn question_defs(snapshot: &AssessmentSnapshot) -> Vec<QuestionDef> {
    snapshot.questions.iter().map(question_def).collect()
}

fn question_def(question: &QuestionWithOptions) -> QuestionDef {
    let options = || {
        question
            .options
            .iter()
            .map(|option| OptionDef { id: option.id.clone(), is_correct: option.is_correct })
            .collect()
    };
    let body = match question.question.question_type {
        QuestionType::MultipleChoice => QuestionBody::MultipleChoice { options: options() },
        QuestionType::Checkbox => QuestionBody::Checkbox { options: options() },
        QuestionType::Identification => QuestionBody::Identification {
            accepted_answer: question.question.correct_answer.clone().unwrap_or_default(),
        },
    };
    QuestionDef { id: question.question.id.clone(), points: question.question.points, body }
}

/// Stamps grading results onto the answer records that get persisted with
/// the terminal attempt. Answers for questions no longer in the assessment
/// are kept but earn nothing.
fn graded_records(
    questions: &[QuestionDef],
    outcome: &ScoreOutcome,
    merged: &HashMap<String, AnswerValue>,
    answered_at: &HashMap<String, String>,
) -> Vec<AnswerRecord> {
    let mut records = Vec::with_capacity(merged.len());

    for question_score in &outcome.per_question {
        if !question_score.answered {
            continue;
        }
        let Some(answer) = merged.get(&question_score.question_id) else {
            continue;
        };
        records.push(AnswerRecord {
            question_id: question_score.question_id.clone(),
            answer: answer.clone(),
            is_correct: Some(question_score.is_correct),
            points_earned: Some(question_score.points_earned),
            answered_at: answered_at.get(&question_score.question_id).cloned(),
        });
    }

    for (question_id, answer) in merged {
        if questions.iter().any(|question| question.id == *question_id) {
            continue;
        }
        records.push(AnswerRecord {
            question_id: question_id.clone(),
            answer: answer.clone(),
            is_correct: Some(false),
            points_earned: Some(0.0),
            answered_at: answered_at.get(question_id).cloned(),
        });
    }

    records
}
