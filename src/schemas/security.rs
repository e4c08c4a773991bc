use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::db::types::{EventSeverity, SecurityEventType};
use crate::services::reporting::SecuritySummary;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct RecordEventRequest {
    #[serde(alias = "traineeId")]
    #[validate(length(min = 1, message = "trainee_id must not be empty"))]
    pub(crate) trainee_id: String,
    #[serde(alias = "assessmentId")]
    #[validate(length(min = 1, message = "assessment_id must not be empty"))]
    pub(crate) assessment_id: String,
    #[serde(default)]
    #[serde(alias = "attemptId")]
    pub(crate) attempt_id: Option<String>,
    #[serde(alias = "eventType")]
    pub(crate) event_type: SecurityEventType,
    /// Only honored for suspicious_activity events.
    #[serde(default)]
    pub(crate) severity: Option<EventSeverity>,
    #[validate(length(min = 1, message = "activity must not be empty"))]
    pub(crate) activity: String,
    #[serde(default)]
    #[serde(alias = "eventTimestamp")]
    pub(crate) event_timestamp: Option<String>,
    #[serde(default)]
    #[serde(alias = "additionalData")]
    pub(crate) additional_data: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RecordEventResponse {
    pub(crate) accepted: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct SecuritySummaryResponse {
    pub(crate) total_events: usize,
    pub(crate) suspicious_events: usize,
    pub(crate) unique_trainees: usize,
    pub(crate) unique_assessments: usize,
    pub(crate) activity_frequency: BTreeMap<String, usize>,
    pub(crate) event_type_breakdown: BTreeMap<String, usize>,
    pub(crate) severity_breakdown: BTreeMap<String, usize>,
}

impl SecuritySummaryResponse {
    pub(crate) fn from_summary(summary: SecuritySummary) -> Self {
        Self {
            total_events: summary.total_events,
            suspicious_events: summary.suspicious_events,
            unique_trainees: summary.unique_trainees,
            unique_assessments: summary.unique_assessments,
            activity_frequency: summary.activity_frequency,
            event_type_breakdown: summary.event_type_breakdown,
            severity_breakdown: summary.severity_breakdown,
        }
    }
}
