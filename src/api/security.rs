use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use validator::Validate;

use crate::api::client_meta;
use crate::api::errors::ApiError;
use crate::core::state::AppState;
use crate::core::time::parse_rfc3339;
use crate::schemas::security::{RecordEventRequest, RecordEventResponse, SecuritySummaryResponse};
use crate::services::integrity::RecordEvent;
use crate::services::reporting;
use crate::store::SecurityLogFilter;


pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/", post(record_event)).route("/summary", get(security_summary))
}

async fn record_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<RecordEventRequest>,
) -> Result<(StatusCode, Json<RecordEventResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let event_timestamp = match payload.event_timestamp.as_deref() {
        Some(raw) => Some(parse_rfc3339(raw).ok_or_else(|| {
            ApiError::BadRequest("event_timestamp must be an RFC 3339 timestamp".to_string())
        })?),
        None => None,
    };

    let meta = client_meta(&headers);
    state.recorder().record(RecordEvent {
        trainee_id: payload.trainee_id,
        assessment_id: payload.assessment_id,
        attempt_id: payload.attempt_id,
        event_type: payload.event_type,
        severity: payload.severity,
        activity: payload.activity,
        ip_address: meta.ip_address,
        user_agent: meta.user_agent,
        event_timestamp,
        additional_data: payload.additional_data,
    });

    // Accepted for asynchronous persistence; never blocks on the store.
    Ok((StatusCode::ACCEPTED, Json(RecordEventResponse { accepted: true })))
}

#[derive(Debug, Deserialize)]
struct SummaryQuery {
    #[serde(default)]
    #[serde(alias = "assessmentId")]
    assessment_id: Option<String>,
    #[serde(default)]
    #[serde(alias = "traineeId")]
    trainee_id: Option<String>,
    #[serde(default)]
    #[serde(alias = "attemptId")]
    attempt_id: Option<String>,
    #[serde(default)]
    from: Option<String>,
    #[serde(default)]
    to: Option<String>,
}

async fn security_summary(
    State(state): State<AppState>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<SecuritySummaryResponse>, ApiError> {
    let parse_bound = |raw: Option<&str>, field: &str| match raw {
        Some(raw) => parse_rfc3339(raw)
            .map(Some)
            .ok_or_else(|| ApiError::BadRequest(format!("{field} must be an RFC 3339 timestamp"))),
        None => Ok(None),
    };

    let filter = SecurityLogFilter {
        assessment_id: query.assessment_id,
        trainee_id: query.trainee_id,
        attempt_id: query.attempt_id,
        from: parse_bound(query.from.as_deref(), "from")?,
        to: parse_bound(query.to.as_deref(), "to")?,
    };

    let events = state
        .store()
        .security_events(&filter)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list security log entries"))?;

    let summary = reporting::security_summary(&events);
    Ok(Json(SecuritySummaryResponse::from_summary(summary)))
}
