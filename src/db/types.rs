use serde::{Deserialize, Serialize};
use sqlx::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "questiontype", rename_all = "snake_case")]
pub(crate) enum QuestionType {
    MultipleChoice,
    Checkbox,
    Identification,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "attemptstatus", rename_all = "snake_case")]
pub(crate) enum AttemptStatus {
    InProgress,
    Submitted,
    Expired,
}

impl AttemptStatus {
    /// `submitted` and `expired` are terminal; no further mutation.
    pub(crate) fn is_terminal(self) -> bool {
        !matches!(self, AttemptStatus::InProgress)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "securityeventtype", rename_all = "snake_case")]
pub(crate) enum SecurityEventType {
    AssessmentStarted,
    AssessmentCompleted,
    TabSwitch,
    WindowFocusLost,
    RightClickBlocked,
    ShortcutBlocked,
    FullscreenDenied,
    CopyAttempt,
    PasteAttempt,
    DeveloperTools,
    MultipleTabs,
    SuspiciousActivity,
}

impl SecurityEventType {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            SecurityEventType::AssessmentStarted => "assessment_started",
            SecurityEventType::AssessmentCompleted => "assessment_completed",
            SecurityEventType::TabSwitch => "tab_switch",
            SecurityEventType::WindowFocusLost => "window_focus_lost",
            SecurityEventType::RightClickBlocked => "right_click_blocked",
            SecurityEventType::ShortcutBlocked => "shortcut_blocked",
            SecurityEventType::FullscreenDenied => "fullscreen_denied",
            SecurityEventType::CopyAttempt => "copy_attempt",
            SecurityEventType::PasteAttempt => "paste_attempt",
            SecurityEventType::DeveloperTools => "developer_tools",
            SecurityEventType::MultipleTabs => "multiple_tabs",
            SecurityEventType::SuspiciousActivity => "suspicious_activity",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "eventseverity", rename_all = "snake_case")]
pub(crate) enum EventSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EventSeverity {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            EventSeverity::Low => "low",
            EventSeverity::Medium => "medium",
            EventSeverity::High => "high",
            EventSeverity::Critical => "critical",
        }
    }
}
