use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use super::super::domain::{
    Application, ApplicationForm, ApplicationId, ApplicationPatch, Comment, CommentDraft,
    CommentId, Interview, InterviewId, RecruitmentId, UserId,
};
use super::super::errors::ValidationError;
use super::super::repository::{
    IdentityResolver, NotificationTransport, RecruitmentRepository, RepositoryError,
    RepositoryTransaction,
};
use super::super::steps::{self, ensure_mutable, Step};
use super::{
    ensure_in_group, ensure_owner, load_application, load_recruitment, RecruitmentService,
    RecruitmentServiceError,
};

/// An application with its slot relations. Comments are only filled in for members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplicationView {
    #[serde(flatten)]
    pub application: Application,
    pub selections: Vec<InterviewId>,
    pub group_interview: Option<Interview>,
    pub team_interview: Option<Interview>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<Vec<Comment>>,
}

impl<R, I, N> RecruitmentService<R, I, N>
where
    R: RecruitmentRepository + 'static,
    I: IdentityResolver + 'static,
    N: NotificationTransport + 'static,
{
    pub fn submit_application(
        &self,
        actor: &UserId,
        form: ApplicationForm,
        now: DateTime<Utc>,
    ) -> Result<Application, RecruitmentServiceError> {
        self.user(actor)?;
        if form.group.is_team_sentinel() {
            return Err(ValidationError::SentinelGroup.into());
        }
        let id = ApplicationId(self.next_id("app"));

        let application = self.repository.transaction(|tx| {
            let recruitment = load_recruitment(&*tx, &form.recruitment_id)?;
            recruitment.submission_window(now)?;
            if tx.application_for(actor, &recruitment.id)?.is_some() {
                return Err(RecruitmentServiceError::from(RepositoryError::Conflict));
            }

            let application = Application {
                id,
                recruitment_id: recruitment.id,
                candidate_id: actor.clone(),
                group: form.group,
                step: Step::SignUp,
                abandoned: false,
                rejected: false,
                grade: form.grade,
                institute: form.institute,
                major: form.major,
                rank: form.rank,
                intro: form.intro,
                is_quick: form.is_quick,
                referrer: form.referrer,
                resume: form.resume,
                answer: None,
                group_allocation: None,
                team_allocation: None,
                created_at: now,
                updated_at: now,
            };
            tx.insert_application(application.clone())?;
            Ok(application)
        })?;

        info!(
            application = %application.id,
            recruitment = %application.recruitment_id,
            group = %application.group,
            "application submitted"
        );
        Ok(application)
    }

    pub fn update_application(
        &self,
        actor: &UserId,
        id: &ApplicationId,
        patch: ApplicationPatch,
        now: DateTime<Utc>,
    ) -> Result<Application, RecruitmentServiceError> {
        if patch.group.is_some_and(|group| group.is_team_sentinel()) {
            return Err(ValidationError::SentinelGroup.into());
        }

        self.repository.transaction(|tx| {
            let mut application = load_application(&*tx, id)?;
            ensure_owner(&application, actor)?;
            ensure_mutable(&application)?;
            load_recruitment(&*tx, &application.recruitment_id)?.submission_window(now)?;

            if let Some(group) = patch.group.filter(|group| *group != application.group) {
                release_group_slots(tx, &mut application)?;
                info!(
                    application = %application.id,
                    from = %application.group,
                    to = %group,
                    "application moved to another group"
                );
            }
            apply_patch(&mut application, patch);
            application.updated_at = now;
            tx.update_application(application.clone())?;
            Ok(application)
        })
    }

    /// Candidates may only read their own application and never see comments.
    pub fn application(
        &self,
        actor: &UserId,
        id: &ApplicationId,
    ) -> Result<ApplicationView, RecruitmentServiceError> {
        let viewer = self.user(actor)?;
        let is_member = viewer.is_member();

        self.repository.transaction(|tx| {
            let application = load_application(&*tx, id)?;
            if !is_member {
                ensure_owner(&application, actor)?;
            }
            view_of(&*tx, application, is_member)
        })
    }

    pub fn applications_in(
        &self,
        actor: &UserId,
        recruitment: &RecruitmentId,
    ) -> Result<Vec<Application>, RecruitmentServiceError> {
        self.member(actor)?;
        self.repository.transaction(|tx| {
            load_recruitment(&*tx, recruitment)?;
            Ok(tx.applications_in(recruitment)?)
        })
    }

    pub fn abandon_application(
        &self,
        actor: &UserId,
        id: &ApplicationId,
    ) -> Result<Application, RecruitmentServiceError> {
        self.repository.transaction(|tx| {
            let mut application = load_application(&*tx, id)?;
            ensure_owner(&application, actor)?;
            if steps::abandon(&mut application) {
                tx.update_application(application.clone())?;
                info!(application = %application.id, "application abandoned");
            }
            Ok(application)
        })
    }

    pub fn reject_application(
        &self,
        actor: &UserId,
        id: &ApplicationId,
    ) -> Result<Application, RecruitmentServiceError> {
        let member = self.member(actor)?;
        self.repository.transaction(|tx| {
            let mut application = load_application(&*tx, id)?;
            ensure_in_group(&member, application.group)?;
            if steps::reject(&mut application) {
                tx.update_application(application.clone())?;
                info!(application = %application.id, member = %actor, "application rejected");
            }
            Ok(application)
        })
    }

    /// Moves an application from `from` to `to` on behalf of a member of its group.
    pub fn transition_step(
        &self,
        actor: &UserId,
        id: &ApplicationId,
        from: Step,
        to: Step,
        now: DateTime<Utc>,
    ) -> Result<Application, RecruitmentServiceError> {
        let member = self.member(actor)?;
        self.repository.transaction(|tx| {
            let mut application = load_application(&*tx, id)?;
            ensure_in_group(&member, application.group)?;
            load_recruitment(&*tx, &application.recruitment_id)?.active_window(now)?;

            steps::transition(&mut application, from, to)?;
            application.updated_at = now;
            tx.update_application(application.clone())?;

            info!(application = %application.id, from = %from, to = %to, "application step changed");
            Ok(application)
        })
    }

    pub fn add_comment(
        &self,
        actor: &UserId,
        draft: CommentDraft,
        now: DateTime<Utc>,
    ) -> Result<Comment, RecruitmentServiceError> {
        let member = self.member(actor)?;
        draft.validate()?;
        let id = CommentId(self.next_id("cmt"));

        self.repository.transaction(|tx| {
            load_application(&*tx, &draft.application_id)?;
            let comment = Comment {
                id,
                application_id: draft.application_id,
                member_id: member.uid,
                member_name: member.name,
                content: draft.content,
                evaluation: draft.evaluation,
                created_at: now,
            };
            tx.insert_comment(comment.clone())?;
            Ok(comment)
        })
    }

    /// Only the author may delete a comment.
    pub fn delete_comment(
        &self,
        actor: &UserId,
        id: &CommentId,
    ) -> Result<(), RecruitmentServiceError> {
        self.member(actor)?;
        self.repository.transaction(|tx| {
            let comment = tx
                .comment(id)?
                .ok_or_else(|| RecruitmentServiceError::not_found("comment", id))?;
            if &comment.member_id != actor {
                return Err(RecruitmentServiceError::Forbidden(format!(
                    "comment {id} was written by another member"
                )));
            }
            tx.delete_comment(id)?;
            Ok(())
        })
    }
}

/// Drops the group allocation and the group-round selections, which only hold for the
/// group the application is leaving. Team-wide slots are kept.
fn release_group_slots(
    tx: &mut dyn RepositoryTransaction,
    application: &mut Application,
) -> Result<(), RepositoryError> {
    application.group_allocation = None;

    let mut held = Vec::new();
    for id in tx.selections(&application.id)? {
        if let Some(interview) = tx.interview(&id)? {
            if interview.name == application.group {
                held.push(id);
            }
        }
    }
    if !held.is_empty() {
        tx.clear_selections(&application.id, &held)?;
    }
    Ok(())
}

fn apply_patch(application: &mut Application, patch: ApplicationPatch) {
    fn keep_or_replace(field: &mut String, value: String) {
        if !value.is_empty() {
            *field = value;
        }
    }

    keep_or_replace(&mut application.grade, patch.grade);
    keep_or_replace(&mut application.institute, patch.institute);
    keep_or_replace(&mut application.major, patch.major);
    keep_or_replace(&mut application.rank, patch.rank);
    keep_or_replace(&mut application.intro, patch.intro);
    application.referrer = patch.referrer;
    if let Some(group) = patch.group {
        application.group = group;
    }
    if let Some(is_quick) = patch.is_quick {
        application.is_quick = is_quick;
    }
    if let Some(resume) = patch.resume.filter(|key| !key.is_empty()) {
        application.resume = Some(resume);
    }
    if let Some(answer) = patch.answer.filter(|key| !key.is_empty()) {
        application.answer = Some(answer);
    }
}

fn view_of(
    tx: &dyn RepositoryTransaction,
    application: Application,
    with_comments: bool,
) -> Result<ApplicationView, RecruitmentServiceError> {
    let selections = tx.selections(&application.id)?;
    let group_interview = match &application.group_allocation {
        Some(id) => tx.interview(id)?,
        None => None,
    };
    let team_interview = match &application.team_allocation {
        Some(id) => tx.interview(id)?,
        None => None,
    };
    let comments = if with_comments {
        Some(tx.comments_for(&application.id)?)
    } else {
        None
    };

    Ok(ApplicationView {
        application,
        selections,
        group_interview,
        team_interview,
        comments,
    })
}
