use sqlx::PgPool;

use crate::db::models::{Assessment, Question, QuestionOption};

pub(crate) const COLUMNS: &str = "\
    id, course_id, title, description, time_limit_minutes, passing_score, \
    max_attempts, is_active, created_at, updated_at";

const QUESTION_COLUMNS: &str = "\
    id, assessment_id, question_type, prompt, points, order_index, \
    correct_answer, created_at";

const OPTION_COLUMNS: &str = "id, question_id, text, is_correct, order_index";

pub(crate) async fn find_by_id(
    pool: &PgPool,
    id: &str,
) -> Result<Option<Assessment>, sqlx::Error> {
    sqlx::query_as::<_, Assessment>(&format!("SELECT {COLUMNS} FROM assessments WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn list_questions(
    pool: &PgPool,
    assessment_id: &str,
) -> Result<Vec<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "SELECT {QUESTION_COLUMNS} FROM questions \
         WHERE assessment_id = $1 ORDER BY order_index"
    ))
    .bind(assessment_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_options(
    pool: &PgPool,
    question_ids: &[String],
) -> Result<Vec<QuestionOption>, sqlx::Error> {
    sqlx::query_as::<_, QuestionOption>(&format!(
        "SELECT {OPTION_COLUMNS} FROM question_options \
         WHERE question_id = ANY($1) ORDER BY question_id, order_index"
    ))
    .bind(question_ids)
    .fetch_all(pool)
    .await
}
