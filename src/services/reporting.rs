//! Read-side aggregation: per-trainee assessment summaries and the
//! security log rollup. Pure folds over store reads, computed on demand.

use std::collections::{BTreeMap, BTreeSet};

use crate::db::models::{Assessment, AssessmentAttempt, SecurityLogEntry};
use crate::domain::eligibility::{self, StartDenial};
use crate::domain::security;

#[derive(Debug, Clone)]
pub(crate) struct TraineeAssessmentSummary {
    pub(crate) assessment_id: String,
    pub(crate) trainee_id: String,
    pub(crate) attempts_count: usize,
    pub(crate) max_attempts: i32,
    pub(crate) best_score: Option<f64>,
    pub(crate) best_percentage: Option<f64>,
    pub(crate) has_passed: bool,
    pub(crate) has_active_attempt: bool,
    pub(crate) can_attempt: bool,
    pub(crate) deny_reason: Option<StartDenial>,
    pub(crate) last_attempt: Option<AssessmentAttempt>,
}

pub(crate) fn trainee_summary(
    assessment: &Assessment,
    trainee_id: &str,
    attempts: &[AssessmentAttempt],
) -> TraineeAssessmentSummary {
    let terminal: Vec<&AssessmentAttempt> =
        attempts.iter().filter(|attempt| attempt.status.is_terminal()).collect();

    let best_percentage = terminal
        .iter()
        .filter_map(|attempt| attempt.percentage)
        .max_by(|a, b| a.total_cmp(b));
    let best_score =
        terminal.iter().filter_map(|attempt| attempt.score).max_by(|a, b| a.total_cmp(b));
    let has_passed = terminal.iter().any(|attempt| attempt.is_passed == Some(true));
    let has_active_attempt = eligibility::resumable(attempts).is_some();

    let (can_attempt, deny_reason) = match eligibility::can_start(assessment, attempts) {
        Ok(()) => (true, None),
        Err(denial) => (false, Some(denial)),
    };

    let last_attempt =
        attempts.iter().max_by_key(|attempt| attempt.attempt_number).cloned();

    TraineeAssessmentSummary {
        assessment_id: assessment.id.clone(),
        trainee_id: trainee_id.to_string(),
        attempts_count: attempts.len(),
        max_attempts: assessment.max_attempts,
        best_score,
        best_percentage,
        has_passed,
        has_active_attempt,
        can_attempt,
        deny_reason,
        last_attempt,
    }
}

/// Instructor view: one summary per trainee who has touched the assessment,
/// ordered by trainee id.
pub(crate) fn assessment_overview(
    assessment: &Assessment,
    attempts: &[AssessmentAttempt],
) -> Vec<TraineeAssessmentSummary> {
    let mut by_trainee: BTreeMap<&str, Vec<AssessmentAttempt>> = BTreeMap::new();
    for attempt in attempts {
        by_trainee.entry(attempt.trainee_id.as_str()).or_default().push(attempt.clone());
    }

    by_trainee
        .into_iter()
        .map(|(trainee_id, attempts)| trainee_summary(assessment, trainee_id, &attempts))
        .collect()
}

#[derive(Debug, Clone, Default)]
pub(crate) struct SecuritySummary {
    pub(crate) total_events: usize,
    pub(crate) suspicious_events: usize,
    pub(crate) unique_trainees: usize,
    pub(crate) unique_assessments: usize,
    /// Event counts keyed by the free-text activity description.
    pub(crate) activity_frequency: BTreeMap<String, usize>,
    /// Event counts keyed by event type.
    pub(crate) event_type_breakdown: BTreeMap<String, usize>,
    /// Event counts keyed by severity.
    pub(crate) severity_breakdown: BTreeMap<String, usize>,
}

pub(crate) fn security_summary(events: &[SecurityLogEntry]) -> SecuritySummary {
    let mut summary = SecuritySummary::default();
    let mut trainees: BTreeSet<&str> = BTreeSet::new();
    let mut assessments: BTreeSet<&str> = BTreeSet::new();

    for event in events {
        summary.total_events += 1;
        if security::is_suspicious(event.event_type) {
            summary.suspicious_events += 1;
        }
        trainees.insert(&event.trainee_id);
        assessments.insert(&event.assessment_id);
        *summary.activity_frequency.entry(event.activity.clone()).or_default() += 1;
        *summary.event_type_breakdown.entry(event.event_type.as_str().to_string()).or_default() +=
            1;
        *summary.severity_breakdown.entry(event.severity.as_str().to_string()).or_default() += 1;
    }

    summary.unique_trainees = trainees.len();
    summary.unique_assessments = assessments.len();
    summary
}
