use sqlx::types::Json;
use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::{upsert_answer, AnswerRecord, AssessmentAttempt};
use crate::db::types::AttemptStatus;
use crate::store::{FinalizeAttempt, SaveAnswerOutcome};

pub(crate) const COLUMNS: &str = "\
    id, assessment_id, trainee_id, attempt_number, status, started_at, \
    submitted_at, expires_at, score, percentage, is_passed, answers, \
    ip_address, user_agent, created_at, updated_at";

pub(crate) async fn find_by_id(
    pool: &PgPool,
    id: &str,
) -> Result<Option<AssessmentAttempt>, sqlx::Error> {
    sqlx::query_as::<_, AssessmentAttempt>(&format!(
        "SELECT {COLUMNS} FROM assessment_attempts WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn list_by_trainee(
    pool: &PgPool,
    assessment_id: &str,
    trainee_id: &str,
) -> Result<Vec<AssessmentAttempt>, sqlx::Error> {
    sqlx::query_as::<_, AssessmentAttempt>(&format!(
        "SELECT {COLUMNS} FROM assessment_attempts \
         WHERE assessment_id = $1 AND trainee_id = $2 ORDER BY attempt_number"
    ))
    .bind(assessment_id)
    .bind(trainee_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_by_assessment(
    pool: &PgPool,
    assessment_id: &str,
) -> Result<Vec<AssessmentAttempt>, sqlx::Error> {
    sqlx::query_as::<_, AssessmentAttempt>(&format!(
        "SELECT {COLUMNS} FROM assessment_attempts \
         WHERE assessment_id = $1 ORDER BY trainee_id, attempt_number"
    ))
    .bind(assessment_id)
    .fetch_all(pool)
    .await
}

/// Conditional insert. The partial unique index on open attempts and the
/// attempt-number constraint turn concurrent duplicates into a no-op, so a
/// `false` return means another request holds the slot.
pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    attempt: &AssessmentAttempt,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO assessment_attempts (
            id, assessment_id, trainee_id, attempt_number, status, started_at,
            expires_at, answers, ip_address, user_agent, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12)
        ON CONFLICT DO NOTHING",
    )
    .bind(&attempt.id)
    .bind(&attempt.assessment_id)
    .bind(&attempt.trainee_id)
    .bind(attempt.attempt_number)
    .bind(attempt.status)
    .bind(attempt.started_at)
    .bind(attempt.expires_at)
    .bind(&attempt.answers)
    .bind(&attempt.ip_address)
    .bind(&attempt.user_agent)
    .bind(attempt.created_at)
    .bind(attempt.updated_at)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Reads the answer array under a row lock, merges the new answer in and
/// writes it back, so concurrent autosaves cannot drop each other.
pub(crate) async fn save_answer(
    pool: &PgPool,
    attempt_id: &str,
    record: AnswerRecord,
    now: PrimitiveDateTime,
) -> Result<SaveAnswerOutcome, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let row: Option<(AttemptStatus, Json<Vec<AnswerRecord>>)> = sqlx::query_as(
        "SELECT status, answers FROM assessment_attempts WHERE id = $1 FOR UPDATE",
    )
    .bind(attempt_id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some((status, Json(mut answers))) = row else {
        return Ok(SaveAnswerOutcome::NotFound);
    };
    if status.is_terminal() {
        return Ok(SaveAnswerOutcome::NotActive);
    }

    upsert_answer(&mut answers, record);

    sqlx::query("UPDATE assessment_attempts SET answers = $1, updated_at = $2 WHERE id = $3")
        .bind(Json(answers))
        .bind(now)
        .bind(attempt_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(SaveAnswerOutcome::Saved)
}

/// Compare-and-set terminal transition. Loses gracefully: when the attempt
/// is already terminal the update matches no row and `None` comes back.
pub(crate) async fn finalize(
    pool: &PgPool,
    attempt_id: &str,
    update: FinalizeAttempt,
    now: PrimitiveDateTime,
) -> Result<Option<AssessmentAttempt>, sqlx::Error> {
    sqlx::query_as::<_, AssessmentAttempt>(&format!(
        "UPDATE assessment_attempts SET
            status = $1, submitted_at = $2, score = $3, percentage = $4,
            is_passed = $5, answers = $6, updated_at = $7
         WHERE id = $8 AND status = $9
         RETURNING {COLUMNS}"
    ))
    .bind(update.status)
    .bind(update.submitted_at)
    .bind(update.score)
    .bind(update.percentage)
    .bind(update.is_passed)
    .bind(Json(update.answers))
    .bind(now)
    .bind(attempt_id)
    .bind(AttemptStatus::InProgress)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn list_overdue(
    pool: &PgPool,
    now: PrimitiveDateTime,
    limit: i64,
) -> Result<Vec<AssessmentAttempt>, sqlx::Error> {
    sqlx::query_as::<_, AssessmentAttempt>(&format!(
        "SELECT {COLUMNS} FROM assessment_attempts \
         WHERE status = $1 AND expires_at IS NOT NULL AND expires_at <= $2 \
         ORDER BY expires_at LIMIT $3"
    ))
    .bind(AttemptStatus::InProgress)
    .bind(now)
    .bind(limit.clamp(1, 1000))
    .fetch_all(pool)
    .await
}
