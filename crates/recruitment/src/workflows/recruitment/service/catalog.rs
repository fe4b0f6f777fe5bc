use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use super::super::domain::{
    Group, Recruitment, RecruitmentDraft, RecruitmentId, ScheduleUpdate, UserId,
};
use super::super::errors::ValidationError;
use super::super::repository::{
    IdentityResolver, NotificationTransport, RecruitmentRepository, RepositoryError,
};
use super::super::window::{validate_name, validate_schedule};
use super::{load_recruitment, RecruitmentService, RecruitmentServiceError};

/// Application counts for one recruitment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecruitmentStatistics {
    pub recruitment_id: RecruitmentId,
    pub total: usize,
    pub per_group: BTreeMap<Group, usize>,
}

impl<R, I, N> RecruitmentService<R, I, N>
where
    R: RecruitmentRepository + 'static,
    I: IdentityResolver + 'static,
    N: NotificationTransport + 'static,
{
    pub fn create_recruitment(
        &self,
        actor: &UserId,
        draft: RecruitmentDraft,
    ) -> Result<Recruitment, RecruitmentServiceError> {
        self.admin(actor)?;
        validate_name(&draft.name)?;
        validate_schedule(draft.beginning, draft.deadline, draft.end)?;

        let recruitment = Recruitment {
            id: RecruitmentId(self.next_id("rec")),
            name: draft.name,
            beginning: draft.beginning,
            deadline: draft.deadline,
            end: draft.end,
            stress_test_start: None,
            stress_test_end: None,
        };

        self.repository.transaction(|tx| {
            if tx.recruitment_by_name(&recruitment.name)?.is_some() {
                return Err(RecruitmentServiceError::from(RepositoryError::Conflict));
            }
            tx.insert_recruitment(recruitment.clone())?;
            Ok(())
        })?;

        info!(recruitment = %recruitment.id, name = %recruitment.name, "recruitment created");
        Ok(recruitment)
    }

    /// Applies a partial schedule edit. The merged schedule must still be ordered.
    pub fn update_schedule(
        &self,
        actor: &UserId,
        id: &RecruitmentId,
        update: ScheduleUpdate,
    ) -> Result<Recruitment, RecruitmentServiceError> {
        self.admin(actor)?;
        if let Some(name) = &update.name {
            validate_name(name)?;
        }

        self.repository.transaction(|tx| {
            let mut recruitment = load_recruitment(&*tx, id)?;
            if let Some(name) = update.name {
                recruitment.name = name;
            }
            recruitment.beginning = update.beginning.unwrap_or(recruitment.beginning);
            recruitment.deadline = update.deadline.unwrap_or(recruitment.deadline);
            recruitment.end = update.end.unwrap_or(recruitment.end);
            validate_schedule(recruitment.beginning, recruitment.deadline, recruitment.end)?;

            tx.update_recruitment(recruitment.clone())?;
            Ok(recruitment)
        })
    }

    pub fn set_stress_test_window(
        &self,
        actor: &UserId,
        id: &RecruitmentId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Recruitment, RecruitmentServiceError> {
        self.admin(actor)?;
        if start > end {
            return Err(ValidationError::StressTestOutOfOrder.into());
        }

        self.repository.transaction(|tx| {
            let mut recruitment = load_recruitment(&*tx, id)?;
            recruitment.stress_test_start = Some(start);
            recruitment.stress_test_end = Some(end);
            tx.update_recruitment(recruitment.clone())?;
            Ok(recruitment)
        })
    }

    pub fn recruitment(&self, id: &RecruitmentId) -> Result<Recruitment, RecruitmentServiceError> {
        self.repository.transaction(|tx| load_recruitment(&*tx, id))
    }

    /// Newest first.
    pub fn recruitments(&self) -> Result<Vec<Recruitment>, RecruitmentServiceError> {
        let mut recruitments = self
            .repository
            .transaction(|tx| tx.recruitments().map_err(RecruitmentServiceError::from))?;
        recruitments.sort_by(|a, b| b.beginning.cmp(&a.beginning));
        Ok(recruitments)
    }

    /// The recruitment that began most recently.
    pub fn pending_recruitment(&self) -> Result<Recruitment, RecruitmentServiceError> {
        self.recruitments()?
            .into_iter()
            .next()
            .ok_or_else(|| RecruitmentServiceError::not_found("recruitment", "pending"))
    }

    pub fn statistics(
        &self,
        actor: &UserId,
        id: &RecruitmentId,
    ) -> Result<RecruitmentStatistics, RecruitmentServiceError> {
        self.member(actor)?;
        self.repository.transaction(|tx| {
            load_recruitment(&*tx, id)?;
            let applications = tx.applications_in(id)?;

            let mut per_group = BTreeMap::new();
            for application in &applications {
                *per_group.entry(application.group).or_insert(0) += 1;
            }

            Ok(RecruitmentStatistics {
                recruitment_id: id.clone(),
                total: applications.len(),
                per_group,
            })
        })
    }
}
