//! Audit log API HTTP tests

use super::request_http_test::file_request;
use super::{build_test_router, get_json, post_json, TestAppState};
use crate::api::TestUser;
use axum::http::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn test_audit_logs_record_mutations_newest_first() {
    let state = TestAppState::new();
    let jira = state.seed_leveling_app("Jira").await;
    let dana = TestUser::staff("Dana");
    let dana_token = state.token_for(&dana);
    let a = state.token_for(&TestUser::manager_a());
    let admin = state.token_for(&TestUser::it_admin());
    let app = build_test_router(state);

    let created = file_request(&app, &dana_token, &jira).await;
    let id = created["id"].as_str().unwrap().to_string();
    let (status, _): (StatusCode, Option<Value>) = post_json(
        &app,
        &format!("/api/v1/requests/{}/approve", id),
        Some(&a),
        &json!({ "comments": "fine" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body): (StatusCode, Option<Value>) =
        get_json(&app, "/api/v1/audit-logs", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    let body = body.unwrap();
    assert_eq!(body["pagination"]["total"], 2);

    let newest = &body["data"][0];
    assert_eq!(newest["action"], "access_request.approve");
    assert_eq!(newest["resource_type"], "access_request");
    assert_eq!(newest["resource_id"], id);
    assert_eq!(newest["old_value"]["current_level"], 1);
    assert_eq!(newest["new_value"]["current_level"], 2);
    assert_eq!(newest["new_value"]["comments"], "fine");
    assert_eq!(newest["new_value"]["manager_level"], "A");

    let oldest = &body["data"][1];
    assert_eq!(oldest["action"], "access_request.create");
    assert_eq!(oldest["actor_id"], dana.id.to_string());
}

#[tokio::test]
async fn test_audit_logs_filter_by_action() {
    let state = TestAppState::new();
    let jira = state.seed_leveling_app("Jira").await;
    let dana = state.token_for(&TestUser::staff("Dana"));
    let admin = state.token_for(&TestUser::it_admin());
    let app = build_test_router(state);

    file_request(&app, &dana, &jira).await;
    file_request(&app, &dana, &jira).await;

    let (_, body): (StatusCode, Option<Value>) = get_json(
        &app,
        "/api/v1/audit-logs?action=access_request.create&limit=1",
        Some(&admin),
    )
    .await;
    let body = body.unwrap();
    assert_eq!(body["pagination"]["total"], 2);
    assert_eq!(body["pagination"]["per_page"], 1);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (_, body): (StatusCode, Option<Value>) = get_json(
        &app,
        "/api/v1/audit-logs?action=application.create",
        Some(&admin),
    )
    .await;
    assert_eq!(body.unwrap()["pagination"]["total"], 0);
}

#[tokio::test]
async fn test_audit_logs_are_it_admin_only() {
    let state = TestAppState::new();
    let manager = state.token_for(&TestUser::manager_a());
    let app = build_test_router(state);

    let (status, _): (StatusCode, Option<Value>) =
        get_json(&app, "/api/v1/audit-logs", Some(&manager)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _): (StatusCode, Option<Value>) =
        get_json(&app, "/api/v1/audit-logs", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
