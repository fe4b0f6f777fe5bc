use serde::{Deserialize, Serialize};

use super::domain::{
    Application, ApplicationId, Comment, CommentId, Group, Interview, InterviewId, InterviewKind,
    Recruitment, RecruitmentId, Role, UserId,
};

/// Transactional storage gateway. `transaction` runs `work` against a consistent view and
/// commits only when it returns `Ok`; an `Err` discards every write made through the handle.
pub trait RecruitmentRepository: Send + Sync {
    fn transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn RepositoryTransaction) -> Result<T, E>,
        E: From<RepositoryError>;
}

/// Operations available inside one repository transaction.
pub trait RepositoryTransaction {
    fn recruitment(&self, id: &RecruitmentId) -> Result<Option<Recruitment>, RepositoryError>;
    fn recruitment_by_name(&self, name: &str) -> Result<Option<Recruitment>, RepositoryError>;
    fn recruitments(&self) -> Result<Vec<Recruitment>, RepositoryError>;
    /// `Conflict` when the name is taken.
    fn insert_recruitment(&mut self, recruitment: Recruitment) -> Result<(), RepositoryError>;
    fn update_recruitment(&mut self, recruitment: Recruitment) -> Result<(), RepositoryError>;

    fn application(&self, id: &ApplicationId) -> Result<Option<Application>, RepositoryError>;
    fn application_for(
        &self,
        candidate: &UserId,
        recruitment: &RecruitmentId,
    ) -> Result<Option<Application>, RepositoryError>;
    fn applications_in(&self, recruitment: &RecruitmentId)
        -> Result<Vec<Application>, RepositoryError>;
    /// `Conflict` when the candidate already applied to the recruitment.
    fn insert_application(&mut self, application: Application) -> Result<(), RepositoryError>;
    fn update_application(&mut self, application: Application) -> Result<(), RepositoryError>;

    fn interview(&self, id: &InterviewId) -> Result<Option<Interview>, RepositoryError>;
    fn interviews_named(
        &self,
        recruitment: &RecruitmentId,
        name: Group,
    ) -> Result<Vec<Interview>, RepositoryError>;
    /// `Conflict` when another slot has the same schedule key.
    fn insert_interview(&mut self, interview: Interview) -> Result<(), RepositoryError>;
    /// `Conflict` when the new fields collide with another slot's schedule key.
    fn update_interview(&mut self, interview: Interview) -> Result<(), RepositoryError>;
    fn delete_interview(&mut self, id: &InterviewId) -> Result<(), RepositoryError>;

    fn selections(&self, application: &ApplicationId) -> Result<Vec<InterviewId>, RepositoryError>;
    /// Removes the application's selections among `scope`.
    fn clear_selections(
        &mut self,
        application: &ApplicationId,
        scope: &[InterviewId],
    ) -> Result<(), RepositoryError>;
    fn add_selections(
        &mut self,
        application: &ApplicationId,
        interviews: &[InterviewId],
    ) -> Result<(), RepositoryError>;
    /// Ids among `candidates` that any application has selected.
    fn selected_among(&self, candidates: &[InterviewId]) -> Result<Vec<InterviewId>, RepositoryError>;
    /// Ids among `candidates` referenced by an allocation of `kind`.
    fn allocated_among(
        &self,
        kind: InterviewKind,
        candidates: &[InterviewId],
    ) -> Result<Vec<InterviewId>, RepositoryError>;

    fn comments_for(&self, application: &ApplicationId) -> Result<Vec<Comment>, RepositoryError>;
    fn comment(&self, id: &CommentId) -> Result<Option<Comment>, RepositoryError>;
    fn insert_comment(&mut self, comment: Comment) -> Result<(), RepositoryError>;
    fn delete_comment(&mut self, id: &CommentId) -> Result<(), RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Profile returned by the identity service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDetail {
    pub uid: UserId,
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub groups: Vec<Group>,
    #[serde(default)]
    pub roles: Vec<Role>,
}

impl UserDetail {
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn is_member(&self) -> bool {
        self.has_role(Role::Member) || self.has_role(Role::Admin)
    }

    pub fn in_group(&self, group: Group) -> bool {
        self.groups.contains(&group)
    }
}

/// Lookup against the external identity service.
pub trait IdentityResolver: Send + Sync {
    fn user(&self, uid: &UserId) -> Result<UserDetail, IdentityError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    #[error("user {0} is unknown to the identity service")]
    UnknownUser(UserId),
    #[error("identity service unavailable: {0}")]
    Unavailable(String),
}

/// Payload handed to the SMS vendor: template id plus positional parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub template_id: u32,
    pub phone: String,
    pub params: Vec<String>,
}

/// Outbound SMS hook.
pub trait NotificationTransport: Send + Sync {
    fn send(&self, message: &OutboundMessage) -> Result<(), TransportError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("sms transport unavailable: {0}")]
    Unavailable(String),
    #[error("sms vendor rejected the message: {0}")]
    Rejected(String),
}
