//! Manager approval API handlers

use crate::api::{write_audit_log_generic, PaginatedResponse, PaginationQuery, SuccessResponse};
use crate::domain::{ApproveInput, RejectInput, RequestFilter};
use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::policy::{enforce, PolicyAction, PolicyInput};
use crate::service::DecisionOutcome;
use crate::state::HasServices;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// Which requests the approval queue shows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum QueueScope {
    /// Only requests waiting on the caller right now
    #[default]
    Actionable,
    /// Every request where the caller holds an entry
    All,
}

#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct QueueQuery {
    #[serde(default)]
    pub scope: QueueScope,
}

/// Requests awaiting the calling manager
#[utoipa::path(
    get,
    path = "/api/v1/approvals",
    tag = "Approvals",
    params(PaginationQuery, QueueQuery),
    responses(
        (status = 200, description = "Success"),
        (status = 403, description = "Manager or IT admin required")
    )
)]
pub async fn queue<S: HasServices>(
    State(state): State<S>,
    auth: AuthUser,
    Query(pagination): Query<PaginationQuery>,
    Query(query): Query<QueueQuery>,
) -> Result<impl IntoResponse> {
    enforce(&auth, &PolicyInput::global(PolicyAction::ApprovalQueueRead))?;

    let filter = RequestFilter::queue(auth.user_id, query.scope == QueueScope::Actionable);
    let (items, total) = state
        .request_service()
        .list(&filter, auth.as_viewer(), pagination.page, pagination.per_page)
        .await?;

    Ok(Json(PaginatedResponse::new(
        items,
        pagination.page,
        pagination.per_page,
        total,
    )))
}

/// Approve the caller's level of a request
#[utoipa::path(
    post,
    path = "/api/v1/requests/{id}/approve",
    tag = "Approvals",
    params(("id" = Uuid, Path, description = "Access request ID")),
    request_body = ApproveInput,
    responses(
        (status = 200, description = "Approved", body = crate::domain::RequestDetail),
        (status = 403, description = "Not the caller's turn"),
        (status = 404, description = "Not found"),
        (status = 409, description = "Request changed concurrently")
    )
)]
pub async fn approve<S: HasServices>(
    State(state): State<S>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(input): Json<ApproveInput>,
) -> Result<impl IntoResponse> {
    enforce(&auth, &PolicyInput::global(PolicyAction::ApprovalDecide))?;

    let outcome = state
        .approval_service()
        .approve(id.into(), auth.user_id, input)
        .await?;
    audit_decision(&state, &auth, &outcome).await;

    Ok(Json(SuccessResponse::new(outcome.detail)))
}

/// Reject a request at the caller's level. A reason is required.
#[utoipa::path(
    post,
    path = "/api/v1/requests/{id}/reject",
    tag = "Approvals",
    params(("id" = Uuid, Path, description = "Access request ID")),
    request_body = RejectInput,
    responses(
        (status = 200, description = "Rejected", body = crate::domain::RequestDetail),
        (status = 403, description = "Not the caller's turn"),
        (status = 404, description = "Not found"),
        (status = 409, description = "Request changed concurrently"),
        (status = 422, description = "Missing reason")
    )
)]
pub async fn reject<S: HasServices>(
    State(state): State<S>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(input): Json<RejectInput>,
) -> Result<impl IntoResponse> {
    enforce(&auth, &PolicyInput::global(PolicyAction::ApprovalDecide))?;

    let outcome = state
        .approval_service()
        .reject(id.into(), auth.user_id, input)
        .await?;
    audit_decision(&state, &auth, &outcome).await;

    Ok(Json(SuccessResponse::new(outcome.detail)))
}

async fn audit_decision<S: HasServices>(state: &S, auth: &AuthUser, outcome: &DecisionOutcome) {
    let decision = &outcome.decision;
    write_audit_log_generic(
        state,
        auth,
        outcome.audit_action(),
        "access_request",
        Some(decision.request_id),
        Some(json!({ "level": decision.level, "current_level": decision.expected_level })),
        Some(json!({
            "status": outcome.detail.request.status,
            "current_level": outcome.detail.request.current_level,
            "comments": decision.comments,
            "rejection_reason": decision.rejection_reason,
            "manager_level": auth.manager_level,
        })),
    )
    .await;
}
