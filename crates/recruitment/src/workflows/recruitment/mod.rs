//! Recruitment pipeline: application steps, time windows, interview slots and candidate
//! notifications.

pub mod bulk;
pub mod domain;
pub mod errors;
pub mod memory;
pub mod notification;
pub mod repository;
pub mod router;
pub mod service;
pub mod slots;
pub mod steps;
pub mod window;

#[cfg(test)]
mod tests;

pub use bulk::{BulkOutcome, ItemFailure, SlotRef, SlotReport};
pub use domain::{
    Application, ApplicationForm, ApplicationId, ApplicationPatch, Comment, CommentDraft,
    CommentId, DesiredSlot, Evaluation, Group, Interview, InterviewId, InterviewKind, Period,
    Recruitment, RecruitmentDraft, RecruitmentId, Role, ScheduleUpdate, SlotFields, UserId,
};
pub use errors::{StateConflict, ValidationError};
pub use memory::{InMemoryDirectory, InMemoryRecruitmentRepository};
pub use notification::{
    resolve_notification, MessagePlan, NotificationError, NotificationKind, NotificationRequest,
    Recipient, SmsTemplate,
};
pub use repository::{
    IdentityError, IdentityResolver, NotificationTransport, OutboundMessage,
    RecruitmentRepository, RepositoryError, RepositoryTransaction, TransportError, UserDetail,
};
pub use router::recruitment_router;
pub use service::{
    ApplicationView, DispatchReport, RecruitmentService, RecruitmentServiceError,
    RecruitmentStatistics, ResolvedNotification,
};
pub use slots::{diff_selection, SelectionDiff, SlotError, SlotLocks};
pub use steps::{Channel, Step};
pub use window::WindowError;
