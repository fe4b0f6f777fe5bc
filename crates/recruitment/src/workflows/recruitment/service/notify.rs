use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::super::bulk::BulkOutcome;
use super::super::domain::{
    Application, ApplicationId, InterviewId, InterviewKind, Recruitment, UserId,
};
use super::super::errors::ValidationError;
use super::super::notification::{
    resolve_notification, NotificationKind, NotificationRequest, Recipient,
};
use super::super::repository::{
    IdentityResolver, NotificationTransport, OutboundMessage, RecruitmentRepository,
    RepositoryTransaction,
};
use super::{load_application, load_recruitment, RecruitmentService, RecruitmentServiceError};

/// A message ready for the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedNotification {
    pub application: ApplicationId,
    pub candidate: String,
    pub message: OutboundMessage,
}

/// Ids whose message went out, and per-id failures.
pub type DispatchReport = BulkOutcome<ApplicationId, ApplicationId>;

/// Stored state one addressee's message depends on.
struct Addressee {
    application: Application,
    group_start: Option<DateTime<Utc>>,
    team_start: Option<DateTime<Utc>>,
    slots_scheduled: bool,
}

impl<R, I, N> RecruitmentService<R, I, N>
where
    R: RecruitmentRepository + 'static,
    I: IdentityResolver + 'static,
    N: NotificationTransport + 'static,
{
    /// Resolves a message for every listed application. Failures are attributed to the id
    /// they concern; nothing is sent.
    pub fn resolve_notifications(
        &self,
        actor: &UserId,
        request: &NotificationRequest,
        now: DateTime<Utc>,
    ) -> Result<BulkOutcome<ResolvedNotification, ApplicationId>, RecruitmentServiceError> {
        let member = self.member(actor)?;
        let first = request
            .applications
            .first()
            .ok_or(ValidationError::NoRecipients)?;
        let next = request.next_step();

        let (recruitment, addressees) = self.repository.transaction(|tx| {
            let recruitment =
                load_recruitment(&*tx, &load_application(&*tx, first)?.recruitment_id)?;
            recruitment.not_ended(now)?;

            let addressees: Vec<Result<Addressee, String>> = request
                .applications
                .iter()
                .map(|id| addressee(&*tx, &recruitment, id, next.interview().map(|(kind, _)| kind)))
                .collect::<Result<_, _>>()?;
            Ok::<_, RecruitmentServiceError>((recruitment, addressees))
        })?;

        let mut outcome = BulkOutcome::default();
        for (id, prepared) in request.applications.iter().zip(addressees) {
            let addressee = match prepared {
                Ok(addressee) => addressee,
                Err(reason) => {
                    outcome.fail(id.clone(), reason);
                    continue;
                }
            };
            let application = &addressee.application;

            let candidate = match self.identity.user(&application.candidate_id) {
                Ok(candidate) => candidate,
                Err(error) => {
                    outcome.fail(id.clone(), error);
                    continue;
                }
            };
            if !member.in_group(application.group) {
                outcome.fail(
                    id.clone(),
                    format!("{} is not in the same group as {}", member.name, candidate.name),
                );
                continue;
            }
            if application.abandoned {
                outcome.fail(
                    id.clone(),
                    format!("application of {} has already been abandoned", candidate.name),
                );
                continue;
            }
            if request.kind == NotificationKind::Accept && !addressee.slots_scheduled {
                outcome.fail(
                    id.clone(),
                    format!("no interviews are scheduled for {}", application.group),
                );
                continue;
            }

            let recipient = Recipient {
                name: &candidate.name,
                application,
                recruitment: &recruitment,
                group_start: addressee.group_start,
                team_start: addressee.team_start,
            };
            match resolve_notification(request, &recipient, self.notification.utc_offset) {
                Ok(plan) => outcome.succeeded.push(ResolvedNotification {
                    application: id.clone(),
                    candidate: candidate.name.clone(),
                    message: plan.addressed_to(candidate.phone.clone()),
                }),
                Err(error) => outcome.fail(id.clone(), error),
            }
        }

        Ok(outcome)
    }

    /// Resolves then sends. If any message fails to resolve, none is sent and the resolution
    /// failures are returned; otherwise transport failures are reported per id.
    pub fn send_notifications(
        &self,
        actor: &UserId,
        request: &NotificationRequest,
        now: DateTime<Utc>,
    ) -> Result<DispatchReport, RecruitmentServiceError> {
        let resolved = self.resolve_notifications(actor, request, now)?;
        let mut report = DispatchReport::default();

        if !resolved.is_complete() {
            warn!(
                failed = resolved.failed.len(),
                "invalid notifications found, no message was sent"
            );
            report.failed = resolved.failed;
            return Ok(report);
        }

        for notification in resolved.succeeded {
            match self.transport.send(&notification.message) {
                Ok(()) => report.succeeded.push(notification.application),
                Err(error) => {
                    warn!(application = %notification.application, error = %error, "sms dispatch failed");
                    report.fail(notification.application, error);
                }
            }
        }

        info!(
            sent = report.succeeded.len(),
            failed = report.failed.len(),
            "notifications dispatched"
        );
        Ok(report)
    }
}

/// Loads what one message needs. The outer error aborts the request; the inner one is a
/// per-item failure.
fn addressee(
    tx: &dyn RepositoryTransaction,
    recruitment: &Recruitment,
    id: &ApplicationId,
    interview: Option<InterviewKind>,
) -> Result<Result<Addressee, String>, RecruitmentServiceError> {
    let application = match tx.application(id)? {
        Some(application) => application,
        None => return Ok(Err(format!("application {id} not found"))),
    };
    if application.recruitment_id != recruitment.id {
        return Ok(Err(format!(
            "application {id} belongs to another recruitment"
        )));
    }

    let start_of = |slot: Option<&InterviewId>| -> Result<_, RecruitmentServiceError> {
        Ok(match slot {
            Some(slot) => tx.interview(slot)?.map(|interview| interview.slot.start),
            None => None,
        })
    };
    let group_start = start_of(application.group_allocation.as_ref())?;
    let team_start = start_of(application.team_allocation.as_ref())?;

    let slots_scheduled = match interview {
        Some(kind) => !tx
            .interviews_named(&recruitment.id, kind.slot_name(application.group))?
            .is_empty(),
        None => true,
    };

    Ok(Ok(Addressee {
        application,
        group_start,
        team_start,
        slots_scheduled,
    }))
}
