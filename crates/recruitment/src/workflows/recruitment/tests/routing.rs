use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, Method, Request, StatusCode};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

use super::common::*;
use crate::workflows::recruitment::domain::{Group, Recruitment, RecruitmentDraft};
use crate::workflows::recruitment::router::{self, ACTOR_HEADER};
use crate::workflows::recruitment::steps::Step;

/// Recruitment whose windows are open right now, for routes that read the wall clock.
fn live_recruitment(service: &TestService) -> Recruitment {
    let now = Utc::now();
    service
        .create_recruitment(
            &uid(ADMIN),
            RecruitmentDraft {
                name: "2024S".to_string(),
                beginning: now - Duration::days(1),
                deadline: now + Duration::days(5),
                end: now + Duration::days(30),
            },
        )
        .expect("recruitment created")
}

fn request(method: Method, uri: &str, actor: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(actor) = actor {
        builder = builder.header(ACTOR_HEADER, actor);
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body).expect("serialize body")))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    }
}

#[tokio::test]
async fn submit_route_creates_application() {
    let (service, _, _) = build_service();
    let recruitment = live_recruitment(&service);
    let router = router_for(service);

    let body = serde_json::to_value(form(&recruitment, Group::Web)).expect("form json");
    let response = router
        .oneshot(request(Method::POST, "/api/v1/applications", Some(CANDIDATE), Some(body)))
        .await
        .expect("route responds");

    assert_status(&response, StatusCode::CREATED);
    let payload = read_json_body(response).await;
    assert_eq!(payload["step"], "SignUp");
    assert_eq!(payload["group"], "web");
    assert_eq!(payload["candidate_id"], CANDIDATE);
}

#[tokio::test]
async fn requests_without_actor_are_unauthorized() {
    let (service, _, _) = build_service();
    let router = router_for(service);

    let response = router
        .oneshot(request(
            Method::POST,
            "/api/v1/recruitments",
            None,
            Some(json!({
                "name": "2024S",
                "beginning": "2024-05-01T00:00:00Z",
                "deadline": "2024-05-10T00:00:00Z",
                "end": "2024-06-01T00:00:00Z",
            })),
        ))
        .await
        .expect("route responds");

    assert_status(&response, StatusCode::UNAUTHORIZED);
    let payload = read_json_body(response).await;
    assert!(payload["error"]
        .as_str()
        .is_some_and(|message| message.contains(ACTOR_HEADER)));
}

#[tokio::test]
async fn candidates_cannot_open_recruitments() {
    let (service, _, _) = build_service();
    let router = router_for(service);

    let response = router
        .oneshot(request(
            Method::POST,
            "/api/v1/recruitments",
            Some(CANDIDATE),
            Some(serde_json::to_value(draft("2024S")).expect("draft json")),
        ))
        .await
        .expect("route responds");

    assert_status(&response, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unknown_group_in_path_is_unprocessable() {
    let (service, _, _) = build_service();
    let recruitment = seed_recruitment(&service);
    let router = router_for(service);

    let uri = format!("/api/v1/recruitments/{}/interviews/marketing", recruitment.id);
    let response = router
        .oneshot(request(Method::GET, &uri, Some(WEB_MEMBER), None))
        .await
        .expect("route responds");

    assert_status(&response, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn unknown_interview_kind_in_path_is_named_in_the_error() {
    let (service, _, _) = build_service();
    let recruitment = seed_recruitment(&service);
    let application = submit(&service, &recruitment, CANDIDATE);
    let router = router_for(service);

    let uri = format!("/api/v1/applications/{}/slots/panel", application.id);
    let response = router
        .oneshot(request(Method::GET, &uri, Some(CANDIDATE), None))
        .await
        .expect("route responds");

    assert_status(&response, StatusCode::UNPROCESSABLE_ENTITY);
    let payload = read_json_body(response).await;
    let message = payload["error"].as_str().expect("error message");
    assert!(message.contains("interview kind 'panel'"), "{message}");
}

#[tokio::test]
async fn closed_selection_is_a_conflict() {
    let (service, _, _) = build_service();
    let recruitment = live_recruitment(&service);
    let application = service
        .submit_application(&uid(CANDIDATE), form(&recruitment, Group::Web), Utc::now())
        .expect("submitted");
    let router = router_for(service);

    let uri = format!("/api/v1/applications/{}/slots/group", application.id);
    let response = router
        .oneshot(request(Method::PUT, &uri, Some(CANDIDATE), Some(json!({ "iids": [] }))))
        .await
        .expect("route responds");

    assert_status(&response, StatusCode::CONFLICT);
}

#[tokio::test]
async fn step_route_moves_the_application() {
    let (service, _, _) = build_service();
    let recruitment = live_recruitment(&service);
    let application = service
        .submit_application(&uid(CANDIDATE), form(&recruitment, Group::Web), Utc::now())
        .expect("submitted");
    let router = router_for(service);

    let uri = format!("/api/v1/applications/{}/step", application.id);
    let moved = router
        .clone()
        .oneshot(request(
            Method::PUT,
            &uri,
            Some(WEB_MEMBER),
            Some(json!({ "from": "报名", "to": "GroupTimeSelection" })),
        ))
        .await
        .expect("route responds");
    assert_status(&moved, StatusCode::OK);
    assert_eq!(read_json_body(moved).await["step"], "GroupTimeSelection");

    let stale = router
        .oneshot(request(
            Method::PUT,
            &uri,
            Some(WEB_MEMBER),
            Some(json!({ "from": "SignUp", "to": "WrittenTest" })),
        ))
        .await
        .expect("route responds");
    assert_status(&stale, StatusCode::CONFLICT);
    let payload = read_json_body(stale).await;
    assert!(payload["error"]
        .as_str()
        .is_some_and(|message| message.contains(Step::GroupTimeSelection.wire_name())));
}

#[tokio::test]
async fn missing_application_is_not_found() {
    let (service, _, _) = build_service();
    let router = router_for(service);

    let response = router
        .oneshot(request(Method::GET, "/api/v1/applications/app-missing", Some(CANDIDATE), None))
        .await
        .expect("route responds");

    assert_status(&response, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn comment_routes_create_and_delete() {
    let (service, _, _) = build_service();
    let recruitment = live_recruitment(&service);
    let application = service
        .submit_application(&uid(CANDIDATE), form(&recruitment, Group::Web), Utc::now())
        .expect("submitted");
    let router = router_for(service);

    let created = router
        .clone()
        .oneshot(request(
            Method::POST,
            "/api/v1/comments",
            Some(WEB_MEMBER),
            Some(json!({ "application_id": application.id, "evaluation": "good" })),
        ))
        .await
        .expect("route responds");
    assert_status(&created, StatusCode::CREATED);
    let comment = read_json_body(created).await;
    let comment_id = comment["id"].as_str().expect("comment id").to_string();

    let foreign = router
        .clone()
        .oneshot(request(
            Method::DELETE,
            &format!("/api/v1/comments/{comment_id}"),
            Some(AI_MEMBER),
            None,
        ))
        .await
        .expect("route responds");
    assert_status(&foreign, StatusCode::FORBIDDEN);

    let deleted = router
        .oneshot(request(
            Method::DELETE,
            &format!("/api/v1/comments/{comment_id}"),
            Some(WEB_MEMBER),
            None,
        ))
        .await
        .expect("route responds");
    assert_status(&deleted, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn sms_route_rejects_empty_batches() {
    let (service, _, _) = build_service();
    let router = router_for(service);

    let response = router
        .oneshot(request(
            Method::POST,
            "/api/v1/sms",
            Some(WEB_MEMBER),
            Some(json!({ "type": "accept", "current": "SignUp", "next": "Pass", "aids": [] })),
        ))
        .await
        .expect("route responds");

    assert_status(&response, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn sms_route_reports_per_application_results() {
    let (service, _, transport) = build_service();
    let recruitment = live_recruitment(&service);
    let application = service
        .submit_application(&uid(CANDIDATE), form(&recruitment, Group::Web), Utc::now())
        .expect("submitted");
    let router = router_for(service);

    let response = router
        .oneshot(request(
            Method::POST,
            "/api/v1/sms",
            Some(WEB_MEMBER),
            Some(json!({
                "type": "accept",
                "current": "SignUp",
                "next": "GroupTimeSelection",
                "aids": [application.id],
            })),
        ))
        .await
        .expect("route responds");

    assert_status(&response, StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["succeeded"], json!([application.id]));
    assert_eq!(payload["failed"], json!([]));
    assert_eq!(transport.sent().len(), 1);
}

#[tokio::test]
async fn list_handler_returns_internal_error_on_repository_failure() {
    let service = Arc::new(unavailable_service());

    let response = router::list_recruitments(State(service)).await;

    assert_status(&response, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn recruitments_route_lists_newest_first() {
    let (service, _, _) = build_service();
    seed_recruitment(&service);
    let mut older = draft("2023A");
    older.beginning = at(1, 1, 0);
    older.deadline = at(1, 10, 0);
    older.end = at(2, 1, 0);
    service
        .create_recruitment(&uid(ADMIN), older)
        .expect("older recruitment");
    let router = router_for(service);

    let response = router
        .oneshot(request(Method::GET, "/api/v1/recruitments", None, None))
        .await
        .expect("route responds");

    assert_status(&response, StatusCode::OK);
    let payload = read_json_body(response).await;
    let names: Vec<&str> = payload
        .as_array()
        .expect("list")
        .iter()
        .filter_map(|recruitment| recruitment["name"].as_str())
        .collect();
    assert_eq!(names, vec!["2024S", "2023A"]);
}
