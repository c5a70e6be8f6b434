//! Access request API handlers

use crate::api::{
    write_audit_log_generic, MessageResponse, PaginatedResponse, PaginationQuery, SuccessResponse,
};
use crate::domain::{CreateAccessRequestInput, RequestFilter, RequestStatus};
use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::policy::{enforce, PolicyAction, PolicyInput, ResourceScope};
use crate::state::HasServices;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct StatusQuery {
    pub status: Option<RequestStatus>,
}

/// File an access request
#[utoipa::path(
    post,
    path = "/api/v1/requests",
    tag = "Requests",
    request_body = CreateAccessRequestInput,
    responses(
        (status = 201, description = "Created", body = crate::domain::RequestDetail),
        (status = 404, description = "Application not found"),
        (status = 422, description = "Invalid input or inactive application")
    )
)]
pub async fn create<S: HasServices>(
    State(state): State<S>,
    auth: AuthUser,
    Json(input): Json<CreateAccessRequestInput>,
) -> Result<impl IntoResponse> {
    enforce(&auth, &PolicyInput::global(PolicyAction::RequestCreate))?;

    let detail = state
        .request_service()
        .create(&auth.as_requester(), input)
        .await?;
    write_audit_log_generic(
        &state,
        &auth,
        "access_request.create",
        "access_request",
        Some(detail.request.id),
        None,
        serde_json::to_value(&detail.request).ok(),
    )
    .await;

    Ok((StatusCode::CREATED, Json(SuccessResponse::new(detail))))
}

/// List every request (IT admin)
#[utoipa::path(
    get,
    path = "/api/v1/requests",
    tag = "Requests",
    params(PaginationQuery, StatusQuery),
    responses(
        (status = 200, description = "Success"),
        (status = 403, description = "IT admin required")
    )
)]
pub async fn list_all<S: HasServices>(
    State(state): State<S>,
    auth: AuthUser,
    Query(pagination): Query<PaginationQuery>,
    Query(query): Query<StatusQuery>,
) -> Result<impl IntoResponse> {
    enforce(&auth, &PolicyInput::global(PolicyAction::RequestReadAll))?;

    let filter = RequestFilter {
        status: query.status,
        ..Default::default()
    };
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

/// List the caller's own requests
#[utoipa::path(
    get,
    path = "/api/v1/requests/mine",
    tag = "Requests",
    params(PaginationQuery, StatusQuery),
    responses(
        (status = 200, description = "Success")
    )
)]
pub async fn list_mine<S: HasServices>(
    State(state): State<S>,
    auth: AuthUser,
    Query(pagination): Query<PaginationQuery>,
    Query(query): Query<StatusQuery>,
) -> Result<impl IntoResponse> {
    let filter = RequestFilter::mine(auth.user_id, query.status);
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

/// Get a request with its approval chain and the caller's eligibility
#[utoipa::path(
    get,
    path = "/api/v1/requests/{id}",
    tag = "Requests",
    params(("id" = Uuid, Path, description = "Access request ID")),
    responses(
        (status = 200, description = "Success", body = crate::domain::RequestDetail),
        (status = 403, description = "Not a participant"),
        (status = 404, description = "Not found")
    )
)]
pub async fn get<S: HasServices>(
    State(state): State<S>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let detail = state
        .request_service()
        .get_for(id.into(), auth.as_viewer())
        .await?;
    Ok(Json(SuccessResponse::new(detail)))
}

/// Delete one of the caller's requests, whatever its status
#[utoipa::path(
    delete,
    path = "/api/v1/requests/{id}",
    tag = "Requests",
    params(("id" = Uuid, Path, description = "Access request ID")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 403, description = "Not the requester"),
        (status = 404, description = "Not found")
    )
)]
pub async fn delete<S: HasServices>(
    State(state): State<S>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let existing = state.request_service().get(id.into()).await?;
    enforce(
        &auth,
        &PolicyInput {
            action: PolicyAction::RequestDelete,
            scope: ResourceScope::User(existing.request.requester_id),
        },
    )?;

    let removed = state
        .request_service()
        .delete(id.into(), auth.user_id)
        .await?;
    write_audit_log_generic(
        &state,
        &auth,
        "access_request.delete",
        "access_request",
        Some(removed.request.id),
        serde_json::to_value(&removed.request).ok(),
        None,
    )
    .await;

    Ok(Json(MessageResponse::new("Access request deleted")))
}
