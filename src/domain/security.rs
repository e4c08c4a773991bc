//! Severity policy for integrity events. Severity is assigned server side
//! from the event type; client-provided severity is only honored for the
//! generic suspicious_activity kind.

use crate::db::types::{EventSeverity, SecurityEventType};

pub(crate) fn severity_for(
    kind: SecurityEventType,
    requested: Option<EventSeverity>,
) -> EventSeverity {
    match kind {
        SecurityEventType::AssessmentStarted
        | SecurityEventType::AssessmentCompleted
        | SecurityEventType::RightClickBlocked
        | SecurityEventType::ShortcutBlocked => EventSeverity::Low,
        SecurityEventType::CopyAttempt
        | SecurityEventType::PasteAttempt
        | SecurityEventType::TabSwitch
        | SecurityEventType::WindowFocusLost
        | SecurityEventType::FullscreenDenied => EventSeverity::Medium,
        SecurityEventType::DeveloperTools | SecurityEventType::MultipleTabs => {
            EventSeverity::High
        }
        SecurityEventType::SuspiciousActivity => requested.unwrap_or(EventSeverity::High),
    }
}

/// Lifecycle markers are bookkeeping; everything else counts against the
/// trainee in the aggregated view.
pub(crate) fn is_suspicious(kind: SecurityEventType) -> bool {
    !matches!(
        kind,
        SecurityEventType::AssessmentStarted | SecurityEventType::AssessmentCompleted
    )
}
