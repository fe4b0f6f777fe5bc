use chrono::{DateTime, FixedOffset, Utc};

use super::common::*;
use crate::workflows::recruitment::domain::{Application, ApplicationId, Group, InterviewKind, Recruitment};
use crate::workflows::recruitment::errors::{StateConflict, ValidationError};
use crate::workflows::recruitment::notification::templates::{DEFAULT_REJECT_REST, MESSAGE_SUFFIX};
use crate::workflows::recruitment::notification::{
    resolve_notification, NotificationError, NotificationKind, NotificationRequest, Recipient,
    SmsTemplate,
};
use crate::workflows::recruitment::steps::Step;
use crate::workflows::recruitment::window::WindowError;
use crate::workflows::recruitment::RecruitmentServiceError;

fn beijing() -> FixedOffset {
    FixedOffset::east_opt(8 * 3600).expect("valid offset")
}

fn request(kind: NotificationKind, current: Step, next: Option<Step>, ids: &[&Application]) -> NotificationRequest {
    NotificationRequest {
        kind,
        current,
        next,
        place: String::new(),
        time: String::new(),
        meeting_id: String::new(),
        rest: String::new(),
        applications: ids.iter().map(|application| application.id.clone()).collect(),
    }
}

fn recipient<'a>(
    application: &'a Application,
    recruitment: &'a Recruitment,
    group_start: Option<DateTime<Utc>>,
    team_start: Option<DateTime<Utc>>,
) -> Recipient<'a> {
    Recipient {
        name: "张三",
        application,
        recruitment,
        group_start,
        team_start,
    }
}

fn fixture() -> (TestService, Recruitment, Application) {
    let (service, _, _) = build_service();
    let recruitment = seed_recruitment(&service);
    let application = submit(&service, &recruitment, CANDIDATE);
    (service, recruitment, application)
}

#[test]
fn rejection_uses_the_delay_template() {
    let (service, recruitment, application) = fixture();
    let rejected = service
        .reject_application(&uid(WEB_MEMBER), &application.id)
        .expect("rejected");

    let plan = resolve_notification(
        &request(NotificationKind::Reject, Step::WrittenTest, None, &[&rejected]),
        &recipient(&rejected, &recruitment, None, None),
        beijing(),
    )
    .expect("plan resolves");

    assert_eq!(plan.template, SmsTemplate::Delay);
    assert_eq!(plan.template.id(), 1_092_765);
    assert_eq!(
        plan.params,
        vec![
            "张三".to_string(),
            "2024春季招新".to_string(),
            "web".to_string(),
            "笔试".to_string(),
            format!("{DEFAULT_REJECT_REST}{MESSAGE_SUFFIX}"),
        ]
    );
}

#[test]
fn rejection_of_a_live_application_is_inconsistent() {
    let (_, recruitment, application) = fixture();
    let result = resolve_notification(
        &request(NotificationKind::Reject, Step::SignUp, None, &[&application]),
        &recipient(&application, &recruitment, None, None),
        beijing(),
    );
    assert!(matches!(
        result,
        Err(NotificationError::Conflict(StateConflict::StateInconsistent { .. }))
    ));
}

#[test]
fn written_test_needs_place_and_time() {
    let (_, recruitment, application) = fixture();
    let mut accept = request(NotificationKind::Accept, Step::SignUp, Some(Step::WrittenTest), &[&application]);
    let target = recipient(&application, &recruitment, None, None);

    match resolve_notification(&accept, &target, beijing()) {
        Err(NotificationError::Validation(ValidationError::MissingNotificationField { field, candidate })) => {
            assert_eq!(field, "place");
            assert_eq!(candidate, "张三");
        }
        other => panic!("expected missing place, got {other:?}"),
    }

    accept.place = "东九 A101".to_string();
    assert!(matches!(
        resolve_notification(&accept, &target, beijing()),
        Err(NotificationError::Validation(ValidationError::MissingNotificationField { field: "time", .. }))
    ));

    accept.time = "5月12日 19:00".to_string();
    let plan = resolve_notification(&accept, &target, beijing()).expect("plan resolves");
    assert_eq!(plan.template, SmsTemplate::Pass);
    assert_eq!(plan.params[3], "报名");
    assert_eq!(
        plan.params[4],
        format!("，请于5月12日 19:00在东九 A101参加笔试，请务必准时到场{MESSAGE_SUFFIX}")
    );
}

#[test]
fn caller_rest_replaces_the_default_text() {
    let (_, recruitment, application) = fixture();
    let mut accept = request(NotificationKind::Accept, Step::TeamInterview, Some(Step::Pass), &[&application]);
    let target = recipient(&application, &recruitment, None, None);

    let plan = resolve_notification(&accept, &target, beijing()).expect("plan resolves");
    assert_eq!(plan.params[4], format!("，你已成功加入web组{MESSAGE_SUFFIX}"));

    accept.rest = "，欢迎加入".to_string();
    let plan = resolve_notification(&accept, &target, beijing()).expect("plan resolves");
    assert_eq!(plan.params[4], format!("，欢迎加入{MESSAGE_SUFFIX}"));
}

#[test]
fn in_person_interview_renders_the_local_start() {
    let (_, recruitment, application) = fixture();
    let mut accept = request(
        NotificationKind::Accept,
        Step::GroupTimeSelection,
        Some(Step::GroupInterview),
        &[&application],
    );
    accept.place = "启明学院".to_string();

    let plan = resolve_notification(
        &accept,
        &recipient(&application, &recruitment, Some(at(5, 20, 6)), None),
        beijing(),
    )
    .expect("plan resolves");

    assert_eq!(plan.template, SmsTemplate::Interviews);
    assert_eq!(
        plan.params,
        vec![
            "张三".to_string(),
            "2024年5月20日 Monday 14时00分00秒".to_string(),
            "启明学院".to_string(),
            "组面".to_string(),
        ]
    );
}

#[test]
fn in_person_interview_checks_place_before_allocation() {
    let (_, recruitment, application) = fixture();
    let mut accept = request(NotificationKind::Accept, Step::GroupTimeSelection, Some(Step::GroupInterview), &[&application]);
    let unallocated = recipient(&application, &recruitment, None, None);

    assert!(matches!(
        resolve_notification(&accept, &unallocated, beijing()),
        Err(NotificationError::Validation(ValidationError::MissingNotificationField { field: "place", .. }))
    ));

    accept.place = "启明学院".to_string();
    assert!(matches!(
        resolve_notification(&accept, &unallocated, beijing()),
        Err(NotificationError::Validation(ValidationError::InterviewNotAllocated {
            kind: InterviewKind::Group,
            ..
        }))
    ));
}

#[test]
fn online_team_interview_needs_allocation_then_meeting_id() {
    let (_, recruitment, application) = fixture();
    let mut accept = request(
        NotificationKind::Accept,
        Step::TeamTimeSelection,
        Some(Step::OnlineTeamInterview),
        &[&application],
    );

    assert!(matches!(
        resolve_notification(&accept, &recipient(&application, &recruitment, None, None), beijing()),
        Err(NotificationError::Validation(ValidationError::InterviewNotAllocated {
            kind: InterviewKind::Team,
            ..
        }))
    ));

    let allocated = recipient(&application, &recruitment, None, Some(at(5, 25, 1)));
    assert!(matches!(
        resolve_notification(&accept, &allocated, beijing()),
        Err(NotificationError::Validation(ValidationError::MissingNotificationField {
            field: "meeting_id",
            ..
        }))
    ));

    accept.meeting_id = "123-456-789".to_string();
    let plan = resolve_notification(&accept, &allocated, beijing()).expect("plan resolves");
    assert_eq!(plan.template, SmsTemplate::OnlineTeamInterview);
    assert_eq!(plan.template.id(), 1_533_302);
    assert_eq!(
        plan.params,
        vec![
            "张三".to_string(),
            "2024春季招新".to_string(),
            "web".to_string(),
            "2024年5月25日 Saturday 09时00分00秒".to_string(),
            "123-456-789".to_string(),
        ]
    );
}

#[test]
fn sign_up_has_no_candidate_message() {
    let (_, recruitment, application) = fixture();
    let accept = request(NotificationKind::Accept, Step::SignUp, None, &[&application]);
    assert_eq!(
        resolve_notification(&accept, &recipient(&application, &recruitment, None, None), beijing()),
        Err(NotificationError::Validation(ValidationError::UnsupportedNextStep(Step::SignUp)))
    );
}

#[test]
fn dispatch_sends_every_resolved_message() {
    let (service, _, transport) = build_service();
    let recruitment = seed_recruitment(&service);
    let first = submit(&service, &recruitment, CANDIDATE);
    let second = submit(&service, &recruitment, OTHER_CANDIDATE);

    let report = service
        .send_notifications(
            &uid(WEB_MEMBER),
            &request(NotificationKind::Accept, Step::SignUp, Some(Step::GroupTimeSelection), &[&first, &second]),
            after_deadline(),
        )
        .expect("dispatch runs");

    assert!(report.is_complete());
    assert_eq!(report.succeeded, vec![first.id.clone(), second.id.clone()]);
    let sent = transport.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].phone, "13900000001");
    assert_eq!(sent[1].phone, "13900000002");
    assert!(sent.iter().all(|message| message.template_id == SmsTemplate::Pass.id()));
    assert_eq!(sent[1].params[0], "李四");
}

#[test]
fn one_invalid_recipient_blocks_the_whole_batch() {
    let (service, _, transport) = build_service();
    let recruitment = seed_recruitment(&service);
    let first = submit(&service, &recruitment, CANDIDATE);
    let second = submit(&service, &recruitment, OTHER_CANDIDATE);
    service
        .abandon_application(&uid(OTHER_CANDIDATE), &second.id)
        .expect("abandoned");
    let missing = ApplicationId::new("app-missing");

    let mut accept = request(NotificationKind::Accept, Step::SignUp, Some(Step::GroupTimeSelection), &[&first, &second]);
    accept.applications.push(missing.clone());
    let report = service
        .send_notifications(&uid(WEB_MEMBER), &accept, after_deadline())
        .expect("dispatch runs");

    assert!(report.succeeded.is_empty());
    let failed: Vec<&ApplicationId> = report.failed.iter().map(|failure| &failure.id).collect();
    assert_eq!(failed, vec![&second.id, &missing]);
    assert!(report.failed[0].reason.contains("abandoned"));
    assert!(transport.sent().is_empty());
}

#[test]
fn transport_failures_are_reported_per_application() {
    let (service, _, transport) = build_service();
    let recruitment = seed_recruitment(&service);
    let first = submit(&service, &recruitment, CANDIDATE);
    let second = submit(&service, &recruitment, OTHER_CANDIDATE);
    transport.fail_for("13900000002");

    let report = service
        .send_notifications(
            &uid(WEB_MEMBER),
            &request(NotificationKind::Accept, Step::SignUp, Some(Step::GroupTimeSelection), &[&first, &second]),
            after_deadline(),
        )
        .expect("dispatch runs");

    assert_eq!(report.succeeded, vec![first.id.clone()]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].id, second.id);
    assert_eq!(transport.sent().len(), 1);
}

#[test]
fn interview_notice_needs_scheduled_slots() {
    let (service, repository, _) = build_service();
    let recruitment = seed_recruitment(&service);
    let application = submit(&service, &recruitment, CANDIDATE);
    let mut accept = request(
        NotificationKind::Accept,
        Step::GroupTimeSelection,
        Some(Step::GroupInterview),
        &[&application],
    );
    accept.place = "启明学院".to_string();

    let resolved = service
        .resolve_notifications(&uid(WEB_MEMBER), &accept, after_deadline())
        .expect("resolution runs");
    assert!(resolved.succeeded.is_empty());
    assert!(resolved.failed[0].reason.contains("no interviews are scheduled"));

    let ids = service
        .create_interviews(&uid(WEB_MEMBER), &recruitment.id, Group::Web, &[slot(20, 6)], after_deadline())
        .expect("slot created")
        .created;
    force_step(&repository, &application, Step::GroupTimeSelection);
    service
        .allocate_interview(&uid(WEB_MEMBER), &application.id, InterviewKind::Group, &ids[0], after_deadline())
        .expect("allocated");

    let resolved = service
        .resolve_notifications(&uid(WEB_MEMBER), &accept, after_deadline())
        .expect("resolution runs");
    assert!(resolved.is_complete());
    let message = &resolved.succeeded[0].message;
    assert_eq!(message.template_id, SmsTemplate::Interviews.id());
    assert_eq!(message.params[1], "2024年5月20日 Monday 14时00分00秒");
}

#[test]
fn members_only_notify_their_own_groups() {
    let (service, _, transport) = build_service();
    let recruitment = seed_recruitment(&service);
    let application = submit(&service, &recruitment, CANDIDATE);

    let report = service
        .send_notifications(
            &uid(AI_MEMBER),
            &request(NotificationKind::Accept, Step::SignUp, Some(Step::WrittenTest), &[&application]),
            after_deadline(),
        )
        .expect("dispatch runs");
    assert_eq!(report.failed.len(), 1);
    assert!(report.failed[0].reason.contains("not in the same group"));
    assert!(transport.sent().is_empty());
}

#[test]
fn dispatch_refuses_empty_and_finished_batches() {
    let (service, recruitment, application) = fixture();

    assert!(matches!(
        service.send_notifications(
            &uid(WEB_MEMBER),
            &request(NotificationKind::Accept, Step::SignUp, Some(Step::Pass), &[]),
            after_deadline(),
        ),
        Err(RecruitmentServiceError::Validation(ValidationError::NoRecipients))
    ));
    assert!(matches!(
        service.send_notifications(
            &uid(WEB_MEMBER),
            &request(NotificationKind::Accept, Step::SignUp, Some(Step::Pass), &[&application]),
            after_end(),
        ),
        Err(RecruitmentServiceError::Window(WindowError::CycleEnded { end })) if end == recruitment.end
    ));
}

#[test]
fn request_reads_the_wire_shape() {
    let request: NotificationRequest = serde_json::from_value(serde_json::json!({
        "type": "accept",
        "current": "组面",
        "next": "StressTest",
        "time": "5月18日 20:00",
        "place": "东九",
        "aids": ["app-000001"],
    }))
    .expect("request parses");

    assert_eq!(request.kind, NotificationKind::Accept);
    assert_eq!(request.current, Step::GroupInterview);
    assert_eq!(request.next_step(), Step::StressTest);
    assert_eq!(request.applications, vec![ApplicationId::new("app-000001")]);
    assert!(request.meeting_id.is_empty());
}
