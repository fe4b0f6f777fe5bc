use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::super::bulk::SlotReport;
use super::super::domain::{
    Application, ApplicationId, DesiredSlot, Group, Interview, InterviewId, InterviewKind,
    RecruitmentId, SlotFields, UserId,
};
use super::super::errors::ValidationError;
use super::super::repository::{IdentityResolver, NotificationTransport, RecruitmentRepository};
use super::super::slots::{self, SelectionDiff};
use super::super::steps::ensure_mutable;
use super::{
    ensure_in_group, ensure_owner, load_application, load_recruitment, RecruitmentService,
    RecruitmentServiceError,
};

impl<R, I, N> RecruitmentService<R, I, N>
where
    R: RecruitmentRepository + 'static,
    I: IdentityResolver + 'static,
    N: NotificationTransport + 'static,
{
    fn next_interview_id(&self) -> InterviewId {
        InterviewId(self.next_id("int"))
    }

    /// Checks membership and that the cycle is still running before a slot batch.
    fn prepare_slot_batch(
        &self,
        actor: &UserId,
        recruitment: &RecruitmentId,
        name: Group,
        now: DateTime<Utc>,
    ) -> Result<(), RecruitmentServiceError> {
        let member = self.member(actor)?;
        ensure_in_group(&member, name)?;
        self.repository.transaction(|tx| {
            load_recruitment(&*tx, recruitment)?.not_ended(now)?;
            Ok(())
        })
    }

    pub fn interviews(
        &self,
        actor: &UserId,
        recruitment: &RecruitmentId,
        name: Group,
    ) -> Result<Vec<Interview>, RecruitmentServiceError> {
        self.member(actor)?;
        self.repository.transaction(|tx| {
            load_recruitment(&*tx, recruitment)?;
            Ok(tx.interviews_named(recruitment, name)?)
        })
    }

    pub fn create_interviews(
        &self,
        actor: &UserId,
        recruitment: &RecruitmentId,
        name: Group,
        fields: &[SlotFields],
        now: DateTime<Utc>,
    ) -> Result<SlotReport, RecruitmentServiceError> {
        self.prepare_slot_batch(actor, recruitment, name, now)?;
        let report = slots::create_interviews(&*self.repository, recruitment, name, fields, || {
            self.next_interview_id()
        });
        info!(recruitment = %recruitment, group = %name, created = report.created.len(), "interview slots created");
        Ok(report)
    }

    pub fn delete_interviews(
        &self,
        actor: &UserId,
        recruitment: &RecruitmentId,
        name: Group,
        ids: &[InterviewId],
        now: DateTime<Utc>,
    ) -> Result<SlotReport, RecruitmentServiceError> {
        self.prepare_slot_batch(actor, recruitment, name, now)?;
        let report = slots::delete_interviews(&*self.repository, recruitment, name, ids);
        info!(recruitment = %recruitment, group = %name, deleted = report.deleted.len(), "interview slots deleted");
        Ok(report)
    }

    pub fn reconcile_interviews(
        &self,
        actor: &UserId,
        recruitment: &RecruitmentId,
        name: Group,
        desired: &[DesiredSlot],
        now: DateTime<Utc>,
    ) -> Result<SlotReport, RecruitmentServiceError> {
        self.prepare_slot_batch(actor, recruitment, name, now)?;
        let report =
            slots::reconcile_interviews(&*self.repository, recruitment, name, desired, || {
                self.next_interview_id()
            })?;
        info!(
            recruitment = %recruitment,
            group = %name,
            created = report.created.len(),
            updated = report.updated.len(),
            deleted = report.deleted.len(),
            failed = report.failed.len(),
            "interview slots reconciled"
        );
        Ok(report)
    }

    /// Rewrites one slot's timing. Locked slots only accept identical fields.
    pub fn update_interview(
        &self,
        actor: &UserId,
        id: &InterviewId,
        fields: SlotFields,
        now: DateTime<Utc>,
    ) -> Result<Interview, RecruitmentServiceError> {
        let member = self.member(actor)?;
        self.repository.transaction(|tx| {
            let interview = tx
                .interview(id)?
                .ok_or_else(|| RecruitmentServiceError::not_found("interview", id))?;
            ensure_in_group(&member, interview.name)?;
            load_recruitment(&*tx, &interview.recruitment_id)?.not_ended(now)?;
            Ok(slots::update_interview(tx, id, fields)?)
        })
    }

    /// Slots the application may be given for `kind`: its group's slots, or the team-wide ones.
    pub fn available_slots(
        &self,
        actor: &UserId,
        application: &ApplicationId,
        kind: InterviewKind,
    ) -> Result<Vec<Interview>, RecruitmentServiceError> {
        let viewer = self.user(actor)?;
        self.repository.transaction(|tx| {
            let application = load_application(&*tx, application)?;
            if !viewer.is_member() {
                ensure_owner(&application, actor)?;
            }
            Ok(tx.interviews_named(&application.recruitment_id, kind.slot_name(application.group))?)
        })
    }

    /// Candidate self-selection during the matching time-selection step.
    pub fn select_slots(
        &self,
        actor: &UserId,
        application: &ApplicationId,
        kind: InterviewKind,
        requested: &[InterviewId],
        now: DateTime<Utc>,
    ) -> Result<SelectionDiff, RecruitmentServiceError> {
        let diff = self.repository.transaction(|tx| {
            let application = load_application(&*tx, application)?;
            ensure_owner(&application, actor)?;
            ensure_mutable(&application)?;
            load_recruitment(&*tx, &application.recruitment_id)?.active_window(now)?;
            Ok::<_, RecruitmentServiceError>(slots::apply_selection(tx, &application, kind, requested)?)
        })?;

        info!(
            application = %application,
            kind = %kind,
            added = diff.to_add.len(),
            removed = diff.to_del.len(),
            "interview selection updated"
        );
        Ok(diff)
    }

    /// Member assigns the slot an application will attend.
    pub fn allocate_interview(
        &self,
        actor: &UserId,
        application: &ApplicationId,
        kind: InterviewKind,
        interview: &InterviewId,
        now: DateTime<Utc>,
    ) -> Result<Application, RecruitmentServiceError> {
        let member = self.member(actor)?;
        self.repository.transaction(|tx| {
            let mut application = load_application(&*tx, application)?;
            ensure_in_group(&member, application.group)?;
            ensure_mutable(&application)?;
            load_recruitment(&*tx, &application.recruitment_id)?.active_window(now)?;

            let slot = tx
                .interview(interview)?
                .ok_or_else(|| RecruitmentServiceError::not_found("interview", interview))?;
            if slot.recruitment_id != application.recruitment_id {
                return Err(ValidationError::ForeignInterview(slot.id).into());
            }
            let expected = kind.slot_name(application.group);
            if slot.name != expected {
                warn!(application = %application.id, interview = %slot.id, "allocation target serves another group");
                return Err(ValidationError::AllocationTarget {
                    interview: slot.id,
                    expected,
                    found: slot.name,
                }
                .into());
            }

            *application.allocation_mut(kind) = Some(slot.id.clone());
            application.updated_at = now;
            tx.update_application(application.clone())?;

            info!(application = %application.id, interview = %slot.id, kind = %kind, "interview allocated");
            Ok(application)
        })
    }
}
