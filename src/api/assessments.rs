use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use validator::Validate;

use crate::api::client_meta;
use crate::api::errors::ApiError;
use crate::core::state::AppState;
use crate::schemas::attempt::{
    AssessmentResultsResponse, AttemptResponse, StartAttemptRequest, StartAttemptResponse,
    TraineeSummaryResponse,
};
use crate::services::attempts;
use crate::services::reporting;

#[cfg(test)]
mod tests;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/:assessment_id/attempts", post(start_attempt))
        .route("/:assessment_id/summary", get(trainee_summary))
        .route("/:assessment_id/results", get(assessment_results))
}

async fn start_attempt(
    State(state): State<AppState>,
    Path(assessment_id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<StartAttemptRequest>,
) -> Result<(StatusCode, Json<StartAttemptResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let outcome = attempts::start_or_resume(
        state.store(),
        state.recorder(),
        &assessment_id,
        &payload.trainee_id,
        client_meta(&headers),
    )
    .await?;

    let status = if outcome.resumed { StatusCode::OK } else { StatusCode::CREATED };
    let response = StartAttemptResponse {
        resumed: outcome.resumed,
        attempt: AttemptResponse::from_model(outcome.attempt),
    };
    Ok((status, Json(response)))
}

#[derive(Debug, Deserialize)]
struct SummaryQuery {
    #[serde(alias = "traineeId")]
    trainee_id: String,
}

async fn trainee_summary(
    State(state): State<AppState>,
    Path(assessment_id): Path<String>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<TraineeSummaryResponse>, ApiError> {
    if query.trainee_id.trim().is_empty() {
        return Err(ApiError::BadRequest("trainee_id must not be empty".to_string()));
    }

    let snapshot = state
        .store()
        .assessment_snapshot(&assessment_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load assessment"))?
        .ok_or_else(|| ApiError::NotFound("Assessment not found".to_string()))?;

    let attempts = state
        .store()
        .attempts_for_trainee(&assessment_id, &query.trainee_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list attempts"))?;

    let summary = reporting::trainee_summary(&snapshot.assessment, &query.trainee_id, &attempts);
    Ok(Json(TraineeSummaryResponse::from_summary(summary)))
}

async fn assessment_results(
    State(state): State<AppState>,
    Path(assessment_id): Path<String>,
) -> Result<Json<AssessmentResultsResponse>, ApiError> {
    let snapshot = state
        .store()
        .assessment_snapshot(&assessment_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load assessment"))?
        .ok_or_else(|| ApiError::NotFound("Assessment not found".to_string()))?;

    let attempts = state
        .store()
        .attempts_for_assessment(&assessment_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list attempts"))?;

    let trainees = reporting::assessment_overview(&snapshot.assessment, &attempts)
        .into_iter()
        .map(TraineeSummaryResponse::from_summary)
        .collect();

    Ok(Json(AssessmentResultsResponse { assessment_id, trainees }))
}
