use std::sync::{Arc, Mutex};

use axum::http::StatusCode;
use axum::response::Response;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::Value;

use crate::config::NotificationConfig;
use crate::workflows::recruitment::domain::{
    Application, ApplicationForm, Group, InterviewKind, Period, Recruitment, RecruitmentDraft,
    Role, SlotFields, UserId,
};
use crate::workflows::recruitment::repository::{
    NotificationTransport, OutboundMessage, RecruitmentRepository, RepositoryError,
    RepositoryTransaction, TransportError, UserDetail,
};
use crate::workflows::recruitment::steps::Step;
use crate::workflows::recruitment::{
    recruitment_router, InMemoryDirectory, InMemoryRecruitmentRepository, RecruitmentService,
};

pub(super) type TestService =
    RecruitmentService<InMemoryRecruitmentRepository, InMemoryDirectory, RecordingTransport>;

pub(super) const ADMIN: &str = "admin-1";
pub(super) const WEB_MEMBER: &str = "member-web";
pub(super) const AI_MEMBER: &str = "member-ai";
pub(super) const CANDIDATE: &str = "cand-1";
pub(super) const OTHER_CANDIDATE: &str = "cand-2";

pub(super) fn uid(raw: &str) -> UserId {
    UserId::new(raw)
}

pub(super) fn at(month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, month, day, hour, 0, 0)
        .single()
        .expect("valid timestamp")
}

/// Inside the submission window.
pub(super) fn during_intake() -> DateTime<Utc> {
    at(5, 5, 12)
}

/// After the deadline, before the end.
pub(super) fn after_deadline() -> DateTime<Utc> {
    at(5, 15, 12)
}

pub(super) fn after_end() -> DateTime<Utc> {
    at(6, 2, 12)
}

pub(super) fn draft(name: &str) -> RecruitmentDraft {
    RecruitmentDraft {
        name: name.to_string(),
        beginning: at(5, 1, 0),
        deadline: at(5, 10, 0),
        end: at(6, 1, 0),
    }
}

fn user(raw: &str, name: &str, phone: &str, groups: Vec<Group>, roles: Vec<Role>) -> UserDetail {
    UserDetail {
        uid: uid(raw),
        name: name.to_string(),
        phone: phone.to_string(),
        email: format!("{raw}@example.org"),
        groups,
        roles,
    }
}

pub(super) fn directory() -> InMemoryDirectory {
    InMemoryDirectory::new(vec![
        user(ADMIN, "Admin", "13800000000", vec![Group::Web], vec![Role::Admin]),
        user(WEB_MEMBER, "Web Member", "13800000001", vec![Group::Web], vec![Role::Member]),
        user(AI_MEMBER, "AI Member", "13800000002", vec![Group::Ai], vec![Role::Member]),
        user(CANDIDATE, "张三", "13900000001", Vec::new(), vec![Role::Candidate]),
        user(OTHER_CANDIDATE, "李四", "13900000002", Vec::new(), vec![Role::Candidate]),
    ])
}

pub(super) fn build_service() -> (
    TestService,
    Arc<InMemoryRecruitmentRepository>,
    Arc<RecordingTransport>,
) {
    let repository = Arc::new(InMemoryRecruitmentRepository::new());
    let transport = Arc::new(RecordingTransport::default());
    let service = RecruitmentService::new(
        repository.clone(),
        Arc::new(directory()),
        transport.clone(),
        NotificationConfig::default(),
    );
    (service, repository, transport)
}

pub(super) fn seed_recruitment(service: &TestService) -> Recruitment {
    service
        .create_recruitment(&uid(ADMIN), draft("2024S"))
        .expect("recruitment created")
}

pub(super) fn form(recruitment: &Recruitment, group: Group) -> ApplicationForm {
    ApplicationForm {
        recruitment_id: recruitment.id.clone(),
        group,
        grade: "大二".to_string(),
        institute: "计算机学院".to_string(),
        major: "软件工程".to_string(),
        rank: "10%".to_string(),
        intro: "喜欢写 Rust".to_string(),
        is_quick: false,
        referrer: String::new(),
        resume: Some("resumes/cand-1.pdf".to_string()),
    }
}

pub(super) fn submit(service: &TestService, recruitment: &Recruitment, candidate: &str) -> Application {
    service
        .submit_application(&uid(candidate), form(recruitment, Group::Web), during_intake())
        .expect("application submitted")
}

pub(super) fn slot(day: u32, hour: u32) -> SlotFields {
    SlotFields {
        date: NaiveDate::from_ymd_opt(2024, 5, day).expect("valid date"),
        period: if hour < 12 {
            Period::Morning
        } else if hour < 18 {
            Period::Afternoon
        } else {
            Period::Evening
        },
        start: at(5, day, hour),
        end: at(5, day, hour + 1),
    }
}

/// Moves an application straight to `step` through the repository.
pub(super) fn force_step(repository: &InMemoryRecruitmentRepository, application: &Application, step: Step) {
    let mut updated = application.clone();
    updated.step = step;
    repository
        .transaction(|tx| tx.update_application(updated))
        .expect("step forced");
}

pub(super) fn allocation_of(
    repository: &InMemoryRecruitmentRepository,
    application: &Application,
    kind: InterviewKind,
) -> Option<crate::workflows::recruitment::domain::InterviewId> {
    repository
        .transaction(|tx| tx.application(&application.id))
        .expect("read succeeds")
        .and_then(|stored| stored.allocation(kind).cloned())
}

#[derive(Default)]
pub(super) struct RecordingTransport {
    sent: Mutex<Vec<OutboundMessage>>,
    failing_phone: Mutex<Option<String>>,
}

impl RecordingTransport {
    pub(super) fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().expect("transport mutex poisoned").clone()
    }

    pub(super) fn fail_for(&self, phone: &str) {
        *self.failing_phone.lock().expect("transport mutex poisoned") = Some(phone.to_string());
    }
}

impl NotificationTransport for RecordingTransport {
    fn send(&self, message: &OutboundMessage) -> Result<(), TransportError> {
        let failing = self.failing_phone.lock().expect("transport mutex poisoned");
        if failing.as_deref() == Some(message.phone.as_str()) {
            return Err(TransportError::Unavailable("vendor timeout".to_string()));
        }
        self.sent
            .lock()
            .expect("transport mutex poisoned")
            .push(message.clone());
        Ok(())
    }
}

pub(super) struct UnavailableRepository;

impl RecruitmentRepository for UnavailableRepository {
    fn transaction<T, E, F>(&self, _work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn RepositoryTransaction) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        Err(RepositoryError::Unavailable("database offline".to_string()).into())
    }
}

pub(super) fn unavailable_service(
) -> RecruitmentService<UnavailableRepository, InMemoryDirectory, RecordingTransport> {
    RecruitmentService::new(
        Arc::new(UnavailableRepository),
        Arc::new(directory()),
        Arc::new(RecordingTransport::default()),
        NotificationConfig::default(),
    )
}

pub(super) fn router_for(service: TestService) -> axum::Router {
    recruitment_router(Arc::new(service))
}

pub(super) fn assert_status(response: &Response, status: StatusCode) {
    assert_eq!(response.status(), status);
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
