//! Service composing the repository gateway, the identity resolver and the SMS transport.
//!
//! Every public operation runs in one repository transaction; identity lookups happen before
//! the transaction opens. `now` is always passed in by the caller.

mod catalog;
mod intake;
mod notify;
mod slots;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::config::NotificationConfig;

use super::domain::{Application, ApplicationId, Group, Recruitment, RecruitmentId, Role, UserId};
use super::errors::{StateConflict, ValidationError};
use super::notification::NotificationError;
use super::repository::{
    IdentityError, IdentityResolver, NotificationTransport, RecruitmentRepository, RepositoryError,
    RepositoryTransaction, UserDetail,
};
use super::slots::SlotError;
use super::window::WindowError;

pub use catalog::RecruitmentStatistics;
pub use intake::ApplicationView;
pub use notify::{DispatchReport, ResolvedNotification};

pub struct RecruitmentService<R, I, N> {
    repository: Arc<R>,
    identity: Arc<I>,
    transport: Arc<N>,
    notification: NotificationConfig,
    sequence: AtomicU64,
}

impl<R, I, N> RecruitmentService<R, I, N>
where
    R: RecruitmentRepository + 'static,
    I: IdentityResolver + 'static,
    N: NotificationTransport + 'static,
{
    pub fn new(
        repository: Arc<R>,
        identity: Arc<I>,
        transport: Arc<N>,
        notification: NotificationConfig,
    ) -> Self {
        Self {
            repository,
            identity,
            transport,
            notification,
            sequence: AtomicU64::new(1),
        }
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    fn next_id(&self, prefix: &str) -> String {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed);
        format!("{prefix}-{id:06}")
    }

    fn user(&self, uid: &UserId) -> Result<UserDetail, RecruitmentServiceError> {
        Ok(self.identity.user(uid)?)
    }

    fn member(&self, uid: &UserId) -> Result<UserDetail, RecruitmentServiceError> {
        let user = self.user(uid)?;
        if !user.is_member() {
            return Err(RecruitmentServiceError::Forbidden(format!(
                "user {uid} is not a member"
            )));
        }
        Ok(user)
    }

    fn admin(&self, uid: &UserId) -> Result<UserDetail, RecruitmentServiceError> {
        let user = self.user(uid)?;
        if !user.has_role(Role::Admin) {
            return Err(RecruitmentServiceError::Forbidden(format!(
                "user {uid} is not an admin"
            )));
        }
        Ok(user)
    }
}

/// Members may only act on applications and slots of their own groups. Team-wide slots are
/// open to every member.
fn ensure_in_group(member: &UserDetail, group: Group) -> Result<(), RecruitmentServiceError> {
    if group.is_team_sentinel() || member.in_group(group) {
        return Ok(());
    }
    Err(RecruitmentServiceError::Forbidden(format!(
        "{} is not a member of group {group}",
        member.name
    )))
}

fn ensure_owner(application: &Application, uid: &UserId) -> Result<(), RecruitmentServiceError> {
    if &application.candidate_id != uid {
        return Err(RecruitmentServiceError::Forbidden(format!(
            "application {} belongs to another candidate",
            application.id
        )));
    }
    Ok(())
}

fn load_recruitment(
    tx: &dyn RepositoryTransaction,
    id: &RecruitmentId,
) -> Result<Recruitment, RecruitmentServiceError> {
    tx.recruitment(id)?
        .ok_or_else(|| RecruitmentServiceError::not_found("recruitment", id))
}

fn load_application(
    tx: &dyn RepositoryTransaction,
    id: &ApplicationId,
) -> Result<Application, RecruitmentServiceError> {
    tx.application(id)?
        .ok_or_else(|| RecruitmentServiceError::not_found("application", id))
}

/// Error raised by the recruitment service.
#[derive(Debug, thiserror::Error)]
pub enum RecruitmentServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Window(#[from] WindowError),
    #[error(transparent)]
    Conflict(#[from] StateConflict),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
}

impl RecruitmentServiceError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl From<SlotError> for RecruitmentServiceError {
    fn from(value: SlotError) -> Self {
        match value {
            SlotError::Validation(err) => Self::Validation(err),
            SlotError::Conflict(err) => Self::Conflict(err),
            SlotError::Repository(err) => Self::Repository(err),
        }
    }
}

impl From<NotificationError> for RecruitmentServiceError {
    fn from(value: NotificationError) -> Self {
        match value {
            NotificationError::Validation(err) => Self::Validation(err),
            NotificationError::Conflict(err) => Self::Conflict(err),
        }
    }
}
