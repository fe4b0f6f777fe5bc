use chrono::{DateTime, FixedOffset, Utc};

use super::super::domain::{Application, InterviewKind, Recruitment};
use super::super::errors::{StateConflict, ValidationError};
use super::super::steps::{Channel, Step};
use super::templates::{self, SmsTemplate};
use super::{MessagePlan, NotificationError, NotificationKind, NotificationRequest};

/// Everything the resolver needs to know about one addressee.
#[derive(Debug, Clone)]
pub struct Recipient<'a> {
    pub name: &'a str,
    pub application: &'a Application,
    pub recruitment: &'a Recruitment,
    pub group_start: Option<DateTime<Utc>>,
    pub team_start: Option<DateTime<Utc>>,
}

impl Recipient<'_> {
    fn allocated_start(&self, kind: InterviewKind) -> Option<DateTime<Utc>> {
        match kind {
            InterviewKind::Group => self.group_start,
            InterviewKind::Team => self.team_start,
        }
    }

    fn missing(&self, field: &'static str) -> ValidationError {
        ValidationError::MissingNotificationField {
            field,
            candidate: self.name.to_string(),
        }
    }
}

/// Picks the template and ordered parameters for one candidate. Pure; interview times are
/// rendered in `offset`.
pub fn resolve_notification(
    request: &NotificationRequest,
    recipient: &Recipient<'_>,
    offset: FixedOffset,
) -> Result<MessagePlan, NotificationError> {
    let application = recipient.application;
    let title = recipient.recruitment.title();
    let group = application.group.to_string();

    match request.kind {
        NotificationKind::Reject => {
            if !application.rejected {
                return Err(inconsistent(application, "application has not been rejected"));
            }
            Ok(MessagePlan {
                template: SmsTemplate::Delay,
                params: vec![
                    recipient.name.to_string(),
                    title,
                    group,
                    request.current.localized().to_string(),
                    templates::closing(&request.rest, templates::DEFAULT_REJECT_REST),
                ],
            })
        }
        NotificationKind::Accept => {
            if application.rejected {
                return Err(inconsistent(application, "application has been rejected"));
            }
            let next = request.next_step();

            if let Some((kind, channel)) = next.interview() {
                return interview_plan(request, recipient, next, kind, channel, title, offset);
            }

            let default_rest = match next {
                Step::WrittenTest | Step::StressTest => {
                    if request.place.is_empty() {
                        return Err(recipient.missing("place").into());
                    }
                    if request.time.is_empty() {
                        return Err(recipient.missing("time").into());
                    }
                    templates::attend_rest(&request.time, &request.place, next)
                }
                Step::Pass => templates::joined_rest(application.group),
                Step::GroupTimeSelection | Step::TeamTimeSelection => {
                    templates::TIME_SELECTION_REST.to_string()
                }
                other => return Err(ValidationError::UnsupportedNextStep(other).into()),
            };

            Ok(MessagePlan {
                template: SmsTemplate::Pass,
                params: vec![
                    recipient.name.to_string(),
                    title,
                    group,
                    request.current.localized().to_string(),
                    templates::closing(&request.rest, &default_rest),
                ],
            })
        }
    }
}

fn interview_plan(
    request: &NotificationRequest,
    recipient: &Recipient<'_>,
    next: Step,
    kind: InterviewKind,
    channel: Channel,
    title: String,
    offset: FixedOffset,
) -> Result<MessagePlan, NotificationError> {
    let not_allocated = || ValidationError::InterviewNotAllocated {
        kind,
        candidate: recipient.name.to_string(),
    };

    match channel {
        Channel::InPerson => {
            if request.place.is_empty() {
                return Err(recipient.missing("place").into());
            }
            let start = recipient.allocated_start(kind).ok_or_else(not_allocated)?;
            Ok(MessagePlan {
                template: SmsTemplate::Interviews,
                params: vec![
                    recipient.name.to_string(),
                    templates::interview_time(start, offset),
                    request.place.clone(),
                    next.localized().to_string(),
                ],
            })
        }
        Channel::Online => {
            let start = recipient.allocated_start(kind).ok_or_else(not_allocated)?;
            if request.meeting_id.is_empty() {
                return Err(recipient.missing("meeting_id").into());
            }
            let template = match kind {
                InterviewKind::Group => SmsTemplate::OnlineGroupInterview,
                InterviewKind::Team => SmsTemplate::OnlineTeamInterview,
            };
            Ok(MessagePlan {
                template,
                params: vec![
                    recipient.name.to_string(),
                    title,
                    recipient.application.group.to_string(),
                    templates::interview_time(start, offset),
                    request.meeting_id.clone(),
                ],
            })
        }
    }
}

fn inconsistent(application: &Application, detail: &str) -> NotificationError {
    StateConflict::StateInconsistent {
        application: application.id.clone(),
        detail: detail.to_string(),
    }
    .into()
}
