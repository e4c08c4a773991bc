//! Attempt eligibility: decides whether a trainee may open a new attempt
//! against an assessment, given their attempt history.

use crate::db::models::{Assessment, AssessmentAttempt};
use crate::db::types::AttemptStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StartDenial {
    ActiveAttemptExists,
    AttemptLimitReached,
}

impl StartDenial {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            StartDenial::ActiveAttemptExists => "active_attempt",
            StartDenial::AttemptLimitReached => "attempt_limit_reached",
        }
    }
}

/// Returns the trainee's open attempt, if any. At most one can exist.
pub(crate) fn resumable(attempts: &[AssessmentAttempt]) -> Option<&AssessmentAttempt> {
    attempts.iter().find(|attempt| attempt.status == AttemptStatus::InProgress)
}

/// Gate for opening a fresh attempt. An open attempt takes precedence over
/// the limit check since it is resumable, not a denial of service.
pub(crate) fn can_start(
    assessment: &Assessment,
    attempts: &[AssessmentAttempt],
) -> Result<(), StartDenial> {
    if resumable(attempts).is_some() {
        return Err(StartDenial::ActiveAttemptExists);
    }
    let used = attempts.iter().filter(|attempt| attempt.status.is_terminal()).count();
    if used >= assessment.max_attempts as usize {
        return Err(StartDenial::AttemptLimitReached);
    }
    Ok(())
}
