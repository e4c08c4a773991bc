use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use validator::Validate;

use crate::api::client_meta;
use crate::api::errors::ApiError;
use crate::core::state::AppState;
use crate::schemas::attempt::{AttemptResponse, SaveAnswerRequest, SubmitAttemptRequest};
use crate::services::attempts;


pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/:attempt_id", get(get_attempt))
        .route("/:attempt_id/answers", post(save_answer))
        .route("/:attempt_id/submit", post(submit_attempt))
}

async fn get_attempt(
    State(state): State<AppState>,
    Path(attempt_id): Path<String>,
) -> Result<Json<AttemptResponse>, ApiError> {
    let attempt = state
        .store()
        .attempt_by_id(&attempt_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load attempt"))?
        .ok_or_else(|| ApiError::NotFound("Attempt not found".to_string()))?;

    Ok(Json(AttemptResponse::from_model(attempt)))
}

async fn save_answer(
    State(state): State<AppState>,
    Path(attempt_id): Path<String>,
    Json(payload): Json<SaveAnswerRequest>,
) -> Result<Json<AttemptResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let attempt =
        attempts::save_answer(state.store(), &attempt_id, &payload.question_id, payload.answer)
            .await?;

    Ok(Json(AttemptResponse::from_model(attempt)))
}

async fn submit_attempt(
    State(state): State<AppState>,
    Path(attempt_id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<SubmitAttemptRequest>,
) -> Result<Json<AttemptResponse>, ApiError> {
    let submitted = payload
        .answers
        .into_iter()
        .map(|input| (input.question_id, input.answer))
        .collect();

    let attempt = attempts::submit(
        state.store(),
        state.recorder(),
        &attempt_id,
        submitted,
        client_meta(&headers),
    )
    .await?;

    Ok(Json(AttemptResponse::from_model(attempt)))
}
