use chrono::{DateTime, Utc};

use super::domain::{ApplicationId, Group, InterviewId, InterviewKind};
use super::steps::Step;

/// Malformed input. Raised before anything is committed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("recruitment name '{0}' is invalid, expected a year followed by S, C or A (e.g. 2024S)")]
    InvalidRecruitmentName(String),
    #[error("recruitment schedule must satisfy beginning <= deadline <= end")]
    ScheduleOutOfOrder,
    #[error("stress test window must start before it ends")]
    StressTestOutOfOrder,
    #[error("unknown group '{0}'")]
    UnknownGroup(String),
    #[error("unknown interview kind '{0}', expected group or team")]
    UnknownInterviewKind(String),
    #[error("unknown step '{0}'")]
    UnknownStep(String),
    #[error("applications cannot be filed for the team-wide group")]
    SentinelGroup,
    #[error("interview slot must start before it ends (start {start}, end {end})")]
    SlotTimesOutOfOrder {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    #[error("interview {interview} serves '{found}', expected '{expected}'")]
    AllocationTarget {
        interview: InterviewId,
        expected: Group,
        found: Group,
    },
    #[error("interview {0} belongs to another recruitment")]
    ForeignInterview(InterviewId),
    #[error("comment needs an evaluation or some content")]
    EmptyComment,
    #[error("{field} is required for {candidate}")]
    MissingNotificationField {
        field: &'static str,
        candidate: String,
    },
    #[error("{kind} interview time is not allocated for {candidate}")]
    InterviewNotAllocated {
        kind: InterviewKind,
        candidate: String,
    },
    #[error("next step {0} has no candidate message")]
    UnsupportedNextStep(Step),
    #[error("notification request names no applications")]
    NoRecipients,
}

/// The operation was refused because of the current persisted state. Nothing was changed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateConflict {
    #[error("application {application} is at {actual}, not {expected}")]
    StepMismatch {
        application: ApplicationId,
        expected: Step,
        actual: Step,
    },
    #[error("application {application} has already been abandoned or rejected")]
    Terminated { application: ApplicationId },
    #[error("interview {interview} has been selected or allocated and cannot be changed")]
    SlotLocked { interview: InterviewId },
    #[error("application {application}: {detail}")]
    StateInconsistent {
        application: ApplicationId,
        detail: String,
    },
    #[error("application {application} is at {step}; {kind} interview times cannot be selected now")]
    SelectionClosed {
        application: ApplicationId,
        kind: InterviewKind,
        step: Step,
    },
}
