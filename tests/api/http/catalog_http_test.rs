//! Catalog API HTTP tests

use super::{build_test_router, delete_json, get_json, post_json, put_json, TestAppState};
use crate::api::TestUser;
use axum::http::StatusCode;
use serde_json::{json, Value};
use uuid::Uuid;

fn jira_body() -> Value {
    json!({
        "name": "Jira",
        "description": "Issue tracking",
        "category": "Engineering",
        "leveling": "leveling"
    })
}

#[tokio::test]
async fn test_it_admin_creates_application() {
    let state = TestAppState::new();
    let token = state.token_for(&TestUser::it_admin());
    let app = build_test_router(state.clone());

    let (status, body): (StatusCode, Option<Value>) =
        post_json(&app, "/api/v1/applications", Some(&token), &jira_body()).await;

    assert_eq!(status, StatusCode::CREATED);
    let data = &body.unwrap()["data"];
    assert_eq!(data["name"], "Jira");
    assert_eq!(data["leveling"], "leveling");
    assert_eq!(data["active"], true);

    let actions = state.audit_repo.actions().await;
    assert_eq!(actions, vec!["application.create".to_string()]);
}

#[tokio::test]
async fn test_duplicate_name_is_rejected_case_insensitively() {
    let state = TestAppState::new();
    state.seed_leveling_app("Jira").await;
    let token = state.token_for(&TestUser::it_admin());
    let app = build_test_router(state);

    let body = json!({ "name": "  JIRA ", "category": "Engineering" });
    let (status, body): (StatusCode, Option<Value>) =
        post_json(&app, "/api/v1/applications", Some(&token), &body).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body.unwrap()["error"], "validation");
}

#[tokio::test]
async fn test_blank_name_is_rejected() {
    let state = TestAppState::new();
    let token = state.token_for(&TestUser::it_admin());
    let app = build_test_router(state);

    let body = json!({ "name": "   ", "category": "Engineering" });
    let (status, _): (StatusCode, Option<Value>) =
        post_json(&app, "/api/v1/applications", Some(&token), &body).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_non_admin_cannot_write_catalog() {
    let state = TestAppState::new();
    let staff = state.token_for(&TestUser::staff("Dana"));
    let manager = state.token_for(&TestUser::manager_a());
    let app = build_test_router(state);

    for token in [&staff, &manager] {
        let (status, _): (StatusCode, Option<Value>) =
            post_json(&app, "/api/v1/applications", Some(token), &jira_body()).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}

#[tokio::test]
async fn test_catalog_requires_authentication() {
    let state = TestAppState::new();
    let app = build_test_router(state);

    let (status, body): (StatusCode, Option<Value>) =
        get_json(&app, "/api/v1/applications", None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body.unwrap()["error"], "unauthorized");
}

#[tokio::test]
async fn test_list_filters_by_category_and_search() {
    let state = TestAppState::new();
    state.seed_leveling_app("Jira").await;
    state.seed_leveling_app("GitHub").await;
    state.seed_no_leveling_app("Salesforce", vec![]).await;
    let token = state.token_for(&TestUser::staff("Dana"));
    let app = build_test_router(state);

    let (status, body): (StatusCode, Option<Value>) =
        get_json(&app, "/api/v1/applications", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    let body = body.unwrap();
    assert_eq!(body["pagination"]["total"], 3);
    // Sorted by name
    assert_eq!(body["data"][0]["name"], "GitHub");

    let (_, body): (StatusCode, Option<Value>) =
        get_json(&app, "/api/v1/applications?category=Business", Some(&token)).await;
    let body = body.unwrap();
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["data"][0]["name"], "Salesforce");

    let (_, body): (StatusCode, Option<Value>) =
        get_json(&app, "/api/v1/applications?q=hub", Some(&token)).await;
    assert_eq!(body.unwrap()["data"][0]["name"], "GitHub");
}

#[tokio::test]
async fn test_list_pagination() {
    let state = TestAppState::new();
    for name in ["A1", "A2", "A3"] {
        state.seed_leveling_app(name).await;
    }
    let token = state.token_for(&TestUser::staff("Dana"));
    let app = build_test_router(state);

    let (status, body): (StatusCode, Option<Value>) = get_json(
        &app,
        "/api/v1/applications?page=2&per_page=2",
        Some(&token),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let body = body.unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["name"], "A3");
    assert_eq!(body["pagination"]["total_pages"], 2);
}

#[tokio::test]
async fn test_get_unknown_application_is_404() {
    let state = TestAppState::new();
    let token = state.token_for(&TestUser::staff("Dana"));
    let app = build_test_router(state);

    let path = format!("/api/v1/applications/{}", Uuid::new_v4());
    let (status, _): (StatusCode, Option<Value>) = get_json(&app, &path, Some(&token)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_application() {
    let state = TestAppState::new();
    let jira = state.seed_leveling_app("Jira").await;
    let token = state.token_for(&TestUser::it_admin());
    let app = build_test_router(state);

    let path = format!("/api/v1/applications/{}", jira.id);
    let body = json!({ "description": "Tracks work", "leveling": "no_leveling" });
    let (status, body): (StatusCode, Option<Value>) =
        put_json(&app, &path, Some(&token), &body).await;

    assert_eq!(status, StatusCode::OK);
    let data = &body.unwrap()["data"];
    assert_eq!(data["name"], "Jira");
    assert_eq!(data["description"], "Tracks work");
    assert_eq!(data["leveling"], "no_leveling");
}

#[tokio::test]
async fn test_update_to_taken_name_is_rejected() {
    let state = TestAppState::new();
    state.seed_leveling_app("Jira").await;
    let github = state.seed_leveling_app("GitHub").await;
    let token = state.token_for(&TestUser::it_admin());
    let app = build_test_router(state);

    let path = format!("/api/v1/applications/{}", github.id);
    let (status, _): (StatusCode, Option<Value>) =
        put_json(&app, &path, Some(&token), &json!({ "name": "jira" })).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_delete_deactivates_application() {
    let state = TestAppState::new();
    let jira = state.seed_leveling_app("Jira").await;
    let admin = state.token_for(&TestUser::it_admin());
    let staff = state.token_for(&TestUser::staff("Dana"));
    let app = build_test_router(state.clone());

    let path = format!("/api/v1/applications/{}", jira.id);
    let (status, body): (StatusCode, Option<Value>) = delete_json(&app, &path, Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["message"], "Application deactivated");

    // Hidden from the default listing
    let (_, body): (StatusCode, Option<Value>) =
        get_json(&app, "/api/v1/applications", Some(&staff)).await;
    assert_eq!(body.unwrap()["pagination"]["total"], 0);

    // Still visible to admins who ask for inactive entries
    let (_, body): (StatusCode, Option<Value>) = get_json(
        &app,
        "/api/v1/applications?include_inactive=true",
        Some(&admin),
    )
    .await;
    let body = body.unwrap();
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["data"][0]["active"], false);

    assert!(state
        .audit_repo
        .actions()
        .await
        .contains(&"application.deactivate".to_string()));
}

#[tokio::test]
async fn test_staff_cannot_list_inactive() {
    let state = TestAppState::new();
    let token = state.token_for(&TestUser::staff("Dana"));
    let app = build_test_router(state);

    let (status, _): (StatusCode, Option<Value>) = get_json(
        &app,
        "/api/v1/applications?include_inactive=true",
        Some(&token),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}
