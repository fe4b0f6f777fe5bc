use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::domain::{
    ApplicationForm, ApplicationId, ApplicationPatch, CommentDraft, CommentId, DesiredSlot, Group,
    InterviewId, InterviewKind, RecruitmentDraft, RecruitmentId, ScheduleUpdate, SlotFields,
    UserId,
};
use super::errors::ValidationError;
use super::notification::NotificationRequest;
use super::repository::{
    IdentityResolver, NotificationTransport, RecruitmentRepository, RepositoryError,
};
use super::service::{RecruitmentService, RecruitmentServiceError};
use super::steps::Step;

/// Header carrying the authenticated user id, set by the SSO gateway.
pub const ACTOR_HEADER: &str = "x-uniquesso-uid";

type Shared<R, I, N> = State<Arc<RecruitmentService<R, I, N>>>;

/// Router builder exposing the recruitment, application, interview, comment and SMS endpoints.
pub fn recruitment_router<R, I, N>(service: Arc<RecruitmentService<R, I, N>>) -> Router
where
    R: RecruitmentRepository + 'static,
    I: IdentityResolver + 'static,
    N: NotificationTransport + 'static,
{
    Router::new()
        .route(
            "/api/v1/recruitments",
            post(create_recruitment::<R, I, N>).get(list_recruitments::<R, I, N>),
        )
        .route(
            "/api/v1/recruitments/pending",
            get(pending_recruitment::<R, I, N>),
        )
        .route("/api/v1/recruitments/:rid", get(get_recruitment::<R, I, N>))
        .route(
            "/api/v1/recruitments/:rid/schedule",
            put(update_schedule::<R, I, N>),
        )
        .route(
            "/api/v1/recruitments/:rid/stress-test",
            put(set_stress_test::<R, I, N>),
        )
        .route(
            "/api/v1/recruitments/:rid/statistics",
            get(statistics::<R, I, N>),
        )
        .route(
            "/api/v1/recruitments/:rid/applications",
            get(list_applications::<R, I, N>),
        )
        .route(
            "/api/v1/recruitments/:rid/interviews/:group",
            get(list_interviews::<R, I, N>)
                .post(create_interviews::<R, I, N>)
                .put(reconcile_interviews::<R, I, N>)
                .delete(delete_interviews::<R, I, N>),
        )
        .route("/api/v1/interviews/:iid", put(update_interview::<R, I, N>))
        .route("/api/v1/applications", post(submit_application::<R, I, N>))
        .route(
            "/api/v1/applications/:aid",
            get(get_application::<R, I, N>).put(update_application::<R, I, N>),
        )
        .route(
            "/api/v1/applications/:aid/step",
            put(transition_step::<R, I, N>),
        )
        .route(
            "/api/v1/applications/:aid/abandoned",
            put(abandon_application::<R, I, N>),
        )
        .route(
            "/api/v1/applications/:aid/rejected",
            put(reject_application::<R, I, N>),
        )
        .route(
            "/api/v1/applications/:aid/slots/:kind",
            get(available_slots::<R, I, N>).put(select_slots::<R, I, N>),
        )
        .route(
            "/api/v1/applications/:aid/interviews/:kind",
            put(allocate_interview::<R, I, N>),
        )
        .route("/api/v1/comments", post(add_comment::<R, I, N>))
        .route("/api/v1/comments/:cid", delete(delete_comment::<R, I, N>))
        .route("/api/v1/sms", post(send_sms::<R, I, N>))
        .with_state(service)
}

/// Failure of a request before or inside the service call.
#[derive(Debug)]
pub enum ApiError {
    MissingActor,
    BadPath(ValidationError),
    Service(RecruitmentServiceError),
}

impl From<RecruitmentServiceError> for ApiError {
    fn from(value: RecruitmentServiceError) -> Self {
        Self::Service(value)
    }
}

impl From<ValidationError> for ApiError {
    fn from(value: ValidationError) -> Self {
        Self::BadPath(value)
    }
}

pub fn status_for(error: &RecruitmentServiceError) -> StatusCode {
    match error {
        RecruitmentServiceError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        RecruitmentServiceError::Window(_) | RecruitmentServiceError::Forbidden(_) => {
            StatusCode::FORBIDDEN
        }
        RecruitmentServiceError::Conflict(_)
        | RecruitmentServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        RecruitmentServiceError::NotFound { .. }
        | RecruitmentServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        RecruitmentServiceError::Repository(RepositoryError::Unavailable(_))
        | RecruitmentServiceError::Identity(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::MissingActor => (
                StatusCode::UNAUTHORIZED,
                format!("missing {ACTOR_HEADER} header"),
            ),
            ApiError::BadPath(error) => (StatusCode::UNPROCESSABLE_ENTITY, error.to_string()),
            ApiError::Service(error) => (status_for(error), error.to_string()),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

fn actor(headers: &HeaderMap) -> Result<UserId, ApiError> {
    headers
        .get(ACTOR_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(UserId::new)
        .ok_or(ApiError::MissingActor)
}

fn reply<T: Serialize>(status: StatusCode, result: Result<T, ApiError>) -> Response {
    match result {
        Ok(value) => (status, Json(value)).into_response(),
        Err(error) => error.into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct StressTestWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct StepMove {
    pub from: Step,
    pub to: Step,
}

#[derive(Debug, Deserialize)]
pub struct SlotSelection {
    #[serde(default)]
    pub iids: Vec<InterviewId>,
}

#[derive(Debug, Deserialize)]
pub struct Allocation {
    pub iid: InterviewId,
}

pub(crate) async fn create_recruitment<R, I, N>(
    State(service): Shared<R, I, N>,
    headers: HeaderMap,
    Json(draft): Json<RecruitmentDraft>,
) -> Response
where
    R: RecruitmentRepository + 'static,
    I: IdentityResolver + 'static,
    N: NotificationTransport + 'static,
{
    let result = actor(&headers)
        .and_then(|uid| Ok(service.create_recruitment(&uid, draft)?));
    reply(StatusCode::CREATED, result)
}

pub(crate) async fn list_recruitments<R, I, N>(State(service): Shared<R, I, N>) -> Response
where
    R: RecruitmentRepository + 'static,
    I: IdentityResolver + 'static,
    N: NotificationTransport + 'static,
{
    reply(StatusCode::OK, service.recruitments().map_err(ApiError::from))
}

pub(crate) async fn pending_recruitment<R, I, N>(State(service): Shared<R, I, N>) -> Response
where
    R: RecruitmentRepository + 'static,
    I: IdentityResolver + 'static,
    N: NotificationTransport + 'static,
{
    reply(StatusCode::OK, service.pending_recruitment().map_err(ApiError::from))
}

pub(crate) async fn get_recruitment<R, I, N>(
    State(service): Shared<R, I, N>,
    Path(rid): Path<String>,
) -> Response
where
    R: RecruitmentRepository + 'static,
    I: IdentityResolver + 'static,
    N: NotificationTransport + 'static,
{
    reply(
        StatusCode::OK,
        service
            .recruitment(&RecruitmentId(rid))
            .map_err(ApiError::from),
    )
}

pub(crate) async fn update_schedule<R, I, N>(
    State(service): Shared<R, I, N>,
    headers: HeaderMap,
    Path(rid): Path<String>,
    Json(update): Json<ScheduleUpdate>,
) -> Response
where
    R: RecruitmentRepository + 'static,
    I: IdentityResolver + 'static,
    N: NotificationTransport + 'static,
{
    let result = actor(&headers)
        .and_then(|uid| Ok(service.update_schedule(&uid, &RecruitmentId(rid), update)?));
    reply(StatusCode::OK, result)
}

pub(crate) async fn set_stress_test<R, I, N>(
    State(service): Shared<R, I, N>,
    headers: HeaderMap,
    Path(rid): Path<String>,
    Json(window): Json<StressTestWindow>,
) -> Response
where
    R: RecruitmentRepository + 'static,
    I: IdentityResolver + 'static,
    N: NotificationTransport + 'static,
{
    let result = actor(&headers).and_then(|uid| {
        Ok(service.set_stress_test_window(&uid, &RecruitmentId(rid), window.start, window.end)?)
    });
    reply(StatusCode::OK, result)
}

pub(crate) async fn statistics<R, I, N>(
    State(service): Shared<R, I, N>,
    headers: HeaderMap,
    Path(rid): Path<String>,
) -> Response
where
    R: RecruitmentRepository + 'static,
    I: IdentityResolver + 'static,
    N: NotificationTransport + 'static,
{
    let result =
        actor(&headers).and_then(|uid| Ok(service.statistics(&uid, &RecruitmentId(rid))?));
    reply(StatusCode::OK, result)
}

pub(crate) async fn list_applications<R, I, N>(
    State(service): Shared<R, I, N>,
    headers: HeaderMap,
    Path(rid): Path<String>,
) -> Response
where
    R: RecruitmentRepository + 'static,
    I: IdentityResolver + 'static,
    N: NotificationTransport + 'static,
{
    let result =
        actor(&headers).and_then(|uid| Ok(service.applications_in(&uid, &RecruitmentId(rid))?));
    reply(StatusCode::OK, result)
}

pub(crate) async fn list_interviews<R, I, N>(
    State(service): Shared<R, I, N>,
    headers: HeaderMap,
    Path((rid, group)): Path<(String, String)>,
) -> Response
where
    R: RecruitmentRepository + 'static,
    I: IdentityResolver + 'static,
    N: NotificationTransport + 'static,
{
    let result = actor(&headers).and_then(|uid| {
        let name: Group = group.parse()?;
        Ok(service.interviews(&uid, &RecruitmentId(rid), name)?)
    });
    reply(StatusCode::OK, result)
}

pub(crate) async fn create_interviews<R, I, N>(
    State(service): Shared<R, I, N>,
    headers: HeaderMap,
    Path((rid, group)): Path<(String, String)>,
    Json(slots): Json<Vec<SlotFields>>,
) -> Response
where
    R: RecruitmentRepository + 'static,
    I: IdentityResolver + 'static,
    N: NotificationTransport + 'static,
{
    let result = actor(&headers).and_then(|uid| {
        let name: Group = group.parse()?;
        Ok(service.create_interviews(&uid, &RecruitmentId(rid), name, &slots, Utc::now())?)
    });
    reply(StatusCode::OK, result)
}

pub(crate) async fn reconcile_interviews<R, I, N>(
    State(service): Shared<R, I, N>,
    headers: HeaderMap,
    Path((rid, group)): Path<(String, String)>,
    Json(desired): Json<Vec<DesiredSlot>>,
) -> Response
where
    R: RecruitmentRepository + 'static,
    I: IdentityResolver + 'static,
    N: NotificationTransport + 'static,
{
    let result = actor(&headers).and_then(|uid| {
        let name: Group = group.parse()?;
        Ok(service.reconcile_interviews(&uid, &RecruitmentId(rid), name, &desired, Utc::now())?)
    });
    reply(StatusCode::OK, result)
}

pub(crate) async fn delete_interviews<R, I, N>(
    State(service): Shared<R, I, N>,
    headers: HeaderMap,
    Path((rid, group)): Path<(String, String)>,
    Json(ids): Json<Vec<InterviewId>>,
) -> Response
where
    R: RecruitmentRepository + 'static,
    I: IdentityResolver + 'static,
    N: NotificationTransport + 'static,
{
    let result = actor(&headers).and_then(|uid| {
        let name: Group = group.parse()?;
        Ok(service.delete_interviews(&uid, &RecruitmentId(rid), name, &ids, Utc::now())?)
    });
    reply(StatusCode::OK, result)
}

pub(crate) async fn update_interview<R, I, N>(
    State(service): Shared<R, I, N>,
    headers: HeaderMap,
    Path(iid): Path<String>,
    Json(fields): Json<SlotFields>,
) -> Response
where
    R: RecruitmentRepository + 'static,
    I: IdentityResolver + 'static,
    N: NotificationTransport + 'static,
{
    let result = actor(&headers).and_then(|uid| {
        Ok(service.update_interview(&uid, &InterviewId(iid), fields, Utc::now())?)
    });
    reply(StatusCode::OK, result)
}

pub(crate) async fn submit_application<R, I, N>(
    State(service): Shared<R, I, N>,
    headers: HeaderMap,
    Json(form): Json<ApplicationForm>,
) -> Response
where
    R: RecruitmentRepository + 'static,
    I: IdentityResolver + 'static,
    N: NotificationTransport + 'static,
{
    let result = actor(&headers)
        .and_then(|uid| Ok(service.submit_application(&uid, form, Utc::now())?));
    reply(StatusCode::CREATED, result)
}

pub(crate) async fn get_application<R, I, N>(
    State(service): Shared<R, I, N>,
    headers: HeaderMap,
    Path(aid): Path<String>,
) -> Response
where
    R: RecruitmentRepository + 'static,
    I: IdentityResolver + 'static,
    N: NotificationTransport + 'static,
{
    let result =
        actor(&headers).and_then(|uid| Ok(service.application(&uid, &ApplicationId(aid))?));
    reply(StatusCode::OK, result)
}

pub(crate) async fn update_application<R, I, N>(
    State(service): Shared<R, I, N>,
    headers: HeaderMap,
    Path(aid): Path<String>,
    Json(patch): Json<ApplicationPatch>,
) -> Response
where
    R: RecruitmentRepository + 'static,
    I: IdentityResolver + 'static,
    N: NotificationTransport + 'static,
{
    let result = actor(&headers).and_then(|uid| {
        Ok(service.update_application(&uid, &ApplicationId(aid), patch, Utc::now())?)
    });
    reply(StatusCode::OK, result)
}

pub(crate) async fn transition_step<R, I, N>(
    State(service): Shared<R, I, N>,
    headers: HeaderMap,
    Path(aid): Path<String>,
    Json(step): Json<StepMove>,
) -> Response
where
    R: RecruitmentRepository + 'static,
    I: IdentityResolver + 'static,
    N: NotificationTransport + 'static,
{
    let result = actor(&headers).and_then(|uid| {
        Ok(service.transition_step(&uid, &ApplicationId(aid), step.from, step.to, Utc::now())?)
    });
    reply(StatusCode::OK, result)
}

pub(crate) async fn abandon_application<R, I, N>(
    State(service): Shared<R, I, N>,
    headers: HeaderMap,
    Path(aid): Path<String>,
) -> Response
where
    R: RecruitmentRepository + 'static,
    I: IdentityResolver + 'static,
    N: NotificationTransport + 'static,
{
    let result = actor(&headers)
        .and_then(|uid| Ok(service.abandon_application(&uid, &ApplicationId(aid))?));
    reply(StatusCode::OK, result)
}

pub(crate) async fn reject_application<R, I, N>(
    State(service): Shared<R, I, N>,
    headers: HeaderMap,
    Path(aid): Path<String>,
) -> Response
where
    R: RecruitmentRepository + 'static,
    I: IdentityResolver + 'static,
    N: NotificationTransport + 'static,
{
    let result = actor(&headers)
        .and_then(|uid| Ok(service.reject_application(&uid, &ApplicationId(aid))?));
    reply(StatusCode::OK, result)
}

pub(crate) async fn available_slots<R, I, N>(
    State(service): Shared<R, I, N>,
    headers: HeaderMap,
    Path((aid, kind)): Path<(String, String)>,
) -> Response
where
    R: RecruitmentRepository + 'static,
    I: IdentityResolver + 'static,
    N: NotificationTransport + 'static,
{
    let result = actor(&headers).and_then(|uid| {
        let kind: InterviewKind = kind.parse()?;
        Ok(service.available_slots(&uid, &ApplicationId(aid), kind)?)
    });
    reply(StatusCode::OK, result)
}

pub(crate) async fn select_slots<R, I, N>(
    State(service): Shared<R, I, N>,
    headers: HeaderMap,
    Path((aid, kind)): Path<(String, String)>,
    Json(selection): Json<SlotSelection>,
) -> Response
where
    R: RecruitmentRepository + 'static,
    I: IdentityResolver + 'static,
    N: NotificationTransport + 'static,
{
    let result = actor(&headers).and_then(|uid| {
        let kind: InterviewKind = kind.parse()?;
        Ok(service.select_slots(&uid, &ApplicationId(aid), kind, &selection.iids, Utc::now())?)
    });
    reply(StatusCode::OK, result)
}

pub(crate) async fn allocate_interview<R, I, N>(
    State(service): Shared<R, I, N>,
    headers: HeaderMap,
    Path((aid, kind)): Path<(String, String)>,
    Json(allocation): Json<Allocation>,
) -> Response
where
    R: RecruitmentRepository + 'static,
    I: IdentityResolver + 'static,
    N: NotificationTransport + 'static,
{
    let result = actor(&headers).and_then(|uid| {
        let kind: InterviewKind = kind.parse()?;
        Ok(service.allocate_interview(
            &uid,
            &ApplicationId(aid),
            kind,
            &allocation.iid,
            Utc::now(),
        )?)
    });
    reply(StatusCode::OK, result)
}

pub(crate) async fn add_comment<R, I, N>(
    State(service): Shared<R, I, N>,
    headers: HeaderMap,
    Json(draft): Json<CommentDraft>,
) -> Response
where
    R: RecruitmentRepository + 'static,
    I: IdentityResolver + 'static,
    N: NotificationTransport + 'static,
{
    let result =
        actor(&headers).and_then(|uid| Ok(service.add_comment(&uid, draft, Utc::now())?));
    reply(StatusCode::CREATED, result)
}

pub(crate) async fn delete_comment<R, I, N>(
    State(service): Shared<R, I, N>,
    headers: HeaderMap,
    Path(cid): Path<String>,
) -> Response
where
    R: RecruitmentRepository + 'static,
    I: IdentityResolver + 'static,
    N: NotificationTransport + 'static,
{
    match actor(&headers).and_then(|uid| Ok(service.delete_comment(&uid, &CommentId(cid))?)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn send_sms<R, I, N>(
    State(service): Shared<R, I, N>,
    headers: HeaderMap,
    Json(request): Json<NotificationRequest>,
) -> Response
where
    R: RecruitmentRepository + 'static,
    I: IdentityResolver + 'static,
    N: NotificationTransport + 'static,
{
    let result = actor(&headers)
        .and_then(|uid| Ok(service.send_notifications(&uid, &request, Utc::now())?));
    reply(StatusCode::OK, result)
}
