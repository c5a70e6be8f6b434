//! Access request API HTTP tests

use super::{build_test_router, delete_json, get_json, post_json, TestAppState};
use crate::api::TestUser;
use access_portal_core::domain::{Application, AssignedManager};
use axum::{http::StatusCode, Router};
use serde_json::{json, Value};
use uuid::Uuid;

/// File a request as `token` and return the response body's `data`
pub async fn file_request(app: &Router, token: &str, application: &Application) -> Value {
    let body = json!({
        "application_id": application.id,
        "justification": "Need access for the Q3 migration",
        "requested_access": "read-write",
        "requested_duration": "90 days"
    });
    let (status, body): (StatusCode, Option<Value>) =
        post_json(app, "/api/v1/requests", Some(token), &body).await;
    assert_eq!(status, StatusCode::CREATED, "unexpected body: {:?}", body);
    body.unwrap()["data"].clone()
}

#[tokio::test]
async fn test_leveling_request_gets_fixed_chain() {
    let state = TestAppState::new();
    let jira = state.seed_leveling_app("Jira").await;
    let dana = TestUser::staff("Dana");
    let token = state.token_for(&dana);
    let app = build_test_router(state.clone());

    let data = file_request(&app, &token, &jira).await;

    assert_eq!(data["status"], "pending");
    assert_eq!(data["current_level"], 1);
    assert_eq!(data["total_levels"], 3);
    assert_eq!(data["requester_id"], dana.id.to_string());
    assert_eq!(data["requester_name"], "Dana");
    assert_eq!(data["application_name"], "Jira");
    assert_eq!(data["can_act"], false);

    let entries = data["entries"].as_array().unwrap();
    let managers: Vec<&str> = entries
        .iter()
        .map(|e| e["manager_name"].as_str().unwrap())
        .collect();
    assert_eq!(managers, vec!["Manager A", "Manager B", "Manager C"]);
    assert_eq!(entries[0]["display_status"], "awaiting_this_level");
    assert_eq!(entries[1]["display_status"], "future");
    assert_eq!(entries[2]["display_status"], "future");

    assert_eq!(
        state.audit_repo.actions().await,
        vec!["access_request.create".to_string()]
    );
}

#[tokio::test]
async fn test_no_leveling_without_managers_falls_back_to_it_admin() {
    let state = TestAppState::new();
    let slack = state.seed_no_leveling_app("Slack", vec![]).await;
    let token = state.token_for(&TestUser::staff("Dana"));
    let app = build_test_router(state);

    let data = file_request(&app, &token, &slack).await;

    assert_eq!(data["total_levels"], 1);
    assert_eq!(data["entries"][0]["manager_name"], "IT Admin");
    assert_eq!(
        data["entries"][0]["manager_id"],
        TestUser::it_admin().id.to_string()
    );
}

#[tokio::test]
async fn test_no_leveling_uses_application_managers_in_order() {
    let state = TestAppState::new();
    let owner = Uuid::new_v4();
    let backup = Uuid::new_v4();
    let salesforce = state
        .seed_no_leveling_app(
            "Salesforce",
            vec![
                AssignedManager::new(owner, "Sales Owner"),
                AssignedManager::new(backup, "Sales Backup"),
            ],
        )
        .await;
    let token = state.token_for(&TestUser::staff("Dana"));
    let app = build_test_router(state);

    let data = file_request(&app, &token, &salesforce).await;

    assert_eq!(data["total_levels"], 2);
    assert_eq!(data["entries"][0]["manager_id"], owner.to_string());
    assert_eq!(data["entries"][1]["manager_id"], backup.to_string());
}

#[tokio::test]
async fn test_request_for_unknown_application_is_404() {
    let state = TestAppState::new();
    let token = state.token_for(&TestUser::staff("Dana"));
    let app = build_test_router(state);

    let body = json!({ "application_id": Uuid::new_v4(), "justification": "Need it" });
    let (status, _): (StatusCode, Option<Value>) =
        post_json(&app, "/api/v1/requests", Some(&token), &body).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_request_for_inactive_application_is_rejected() {
    let state = TestAppState::new();
    let retired = Application {
        name: "Retired".to_string(),
        category: "Legacy".to_string(),
        active: false,
        ..Default::default()
    };
    state.app_repo.add_application(retired.clone()).await;
    let token = state.token_for(&TestUser::staff("Dana"));
    let app = build_test_router(state);

    let body = json!({ "application_id": retired.id, "justification": "Need it" });
    let (status, body): (StatusCode, Option<Value>) =
        post_json(&app, "/api/v1/requests", Some(&token), &body).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body.unwrap()["error"], "validation");
}

#[tokio::test]
async fn test_empty_justification_is_rejected() {
    let state = TestAppState::new();
    let jira = state.seed_leveling_app("Jira").await;
    let token = state.token_for(&TestUser::staff("Dana"));
    let app = build_test_router(state);

    let body = json!({ "application_id": jira.id, "justification": "" });
    let (status, _): (StatusCode, Option<Value>) =
        post_json(&app, "/api/v1/requests", Some(&token), &body).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_list_mine_only_shows_own_requests() {
    let state = TestAppState::new();
    let jira = state.seed_leveling_app("Jira").await;
    let dana = state.token_for(&TestUser::staff("Dana"));
    let eli = state.token_for(&TestUser::staff("Eli"));
    let app = build_test_router(state);

    file_request(&app, &dana, &jira).await;
    file_request(&app, &dana, &jira).await;
    file_request(&app, &eli, &jira).await;

    let (status, body): (StatusCode, Option<Value>) =
        get_json(&app, "/api/v1/requests/mine", Some(&dana)).await;
    assert_eq!(status, StatusCode::OK);
    let body = body.unwrap();
    assert_eq!(body["pagination"]["total"], 2);
    for item in body["data"].as_array().unwrap() {
        assert_eq!(item["requester_name"], "Dana");
    }

    let (_, body): (StatusCode, Option<Value>) =
        get_json(&app, "/api/v1/requests/mine?status=approved", Some(&dana)).await;
    assert_eq!(body.unwrap()["pagination"]["total"], 0);
}

#[tokio::test]
async fn test_list_all_is_it_admin_only() {
    let state = TestAppState::new();
    let jira = state.seed_leveling_app("Jira").await;
    let dana = state.token_for(&TestUser::staff("Dana"));
    let admin = state.token_for(&TestUser::it_admin());
    let manager = state.token_for(&TestUser::manager_a());
    let app = build_test_router(state);

    file_request(&app, &dana, &jira).await;

    let (status, _): (StatusCode, Option<Value>) =
        get_json(&app, "/api/v1/requests", Some(&manager)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body): (StatusCode, Option<Value>) =
        get_json(&app, "/api/v1/requests?status=pending", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["pagination"]["total"], 1);
}

#[tokio::test]
async fn test_get_request_visibility() {
    let state = TestAppState::new();
    let jira = state.seed_leveling_app("Jira").await;
    let dana = state.token_for(&TestUser::staff("Dana"));
    let stranger = state.token_for(&TestUser::staff("Eli"));
    let manager_b = state.token_for(&TestUser::manager_b());
    let admin = state.token_for(&TestUser::it_admin());
    let app = build_test_router(state);

    let created = file_request(&app, &dana, &jira).await;
    let path = format!("/api/v1/requests/{}", created["id"].as_str().unwrap());

    let (status, _): (StatusCode, Option<Value>) = get_json(&app, &path, Some(&dana)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body): (StatusCode, Option<Value>) =
        get_json(&app, &path, Some(&manager_b)).await;
    assert_eq!(status, StatusCode::OK);
    let data = &body.unwrap()["data"];
    assert_eq!(data["acting_level"], 2);
    assert_eq!(data["can_act"], false);

    let (status, _): (StatusCode, Option<Value>) = get_json(&app, &path, Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _): (StatusCode, Option<Value>) = get_json(&app, &path, Some(&stranger)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_owner_deletes_request_once() {
    let state = TestAppState::new();
    let jira = state.seed_leveling_app("Jira").await;
    let dana = state.token_for(&TestUser::staff("Dana"));
    let eli = state.token_for(&TestUser::staff("Eli"));
    let admin = state.token_for(&TestUser::it_admin());
    let app = build_test_router(state.clone());

    let created = file_request(&app, &dana, &jira).await;
    let path = format!("/api/v1/requests/{}", created["id"].as_str().unwrap());

    let (status, _): (StatusCode, Option<Value>) = delete_json(&app, &path, Some(&eli)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _): (StatusCode, Option<Value>) = delete_json(&app, &path, Some(&admin)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body): (StatusCode, Option<Value>) = delete_json(&app, &path, Some(&dana)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["message"], "Access request deleted");

    let (status, _): (StatusCode, Option<Value>) = delete_json(&app, &path, Some(&dana)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _): (StatusCode, Option<Value>) = get_json(&app, &path, Some(&dana)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    assert!(state
        .audit_repo
        .actions()
        .await
        .contains(&"access_request.delete".to_string()));
}

#[tokio::test]
async fn test_owner_can_delete_decided_request() {
    let state = TestAppState::new();
    let slack = state.seed_no_leveling_app("Slack", vec![]).await;
    let dana = state.token_for(&TestUser::staff("Dana"));
    let admin = state.token_for(&TestUser::it_admin());
    let app = build_test_router(state);

    let created = file_request(&app, &dana, &slack).await;
    let id = created["id"].as_str().unwrap();

    let (status, _): (StatusCode, Option<Value>) = post_json(
        &app,
        &format!("/api/v1/requests/{}/approve", id),
        Some(&admin),
        &json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _): (StatusCode, Option<Value>) =
        delete_json(&app, &format!("/api/v1/requests/{}", id), Some(&dana)).await;
    assert_eq!(status, StatusCode::OK);
}
