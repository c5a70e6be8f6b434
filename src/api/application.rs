//! Application catalog API handlers

use crate::api::{
    write_audit_log_generic, MessageResponse, PaginatedResponse, PaginationQuery, SuccessResponse,
};
use crate::domain::{ApplicationFilter, CreateApplicationInput, UpdateApplicationInput};
use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::policy::{enforce, PolicyAction, PolicyInput};
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

/// Catalog listing filters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct ApplicationListQuery {
    /// Include deactivated applications (IT admin only)
    #[serde(default)]
    pub include_inactive: bool,
    pub category: Option<String>,
    /// Case-insensitive name search
    pub q: Option<String>,
}

impl ApplicationListQuery {
    fn into_filter(self) -> ApplicationFilter {
        ApplicationFilter {
            include_inactive: self.include_inactive,
            category: self.category.filter(|c| !c.trim().is_empty()),
            search: self.q.filter(|q| !q.trim().is_empty()),
        }
    }
}

/// List catalog applications
#[utoipa::path(
    get,
    path = "/api/v1/applications",
    tag = "Catalog",
    params(PaginationQuery, ApplicationListQuery),
    responses(
        (status = 200, description = "Success"),
        (status = 403, description = "Inactive listing requires IT admin")
    )
)]
pub async fn list<S: HasServices>(
    State(state): State<S>,
    auth: AuthUser,
    Query(pagination): Query<PaginationQuery>,
    Query(query): Query<ApplicationListQuery>,
) -> Result<impl IntoResponse> {
    let action = if query.include_inactive {
        PolicyAction::CatalogReadInactive
    } else {
        PolicyAction::CatalogRead
    };
    enforce(&auth, &PolicyInput::global(action))?;

    let filter = query.into_filter();
    let (apps, total) = state
        .catalog_service()
        .list(&filter, pagination.page, pagination.per_page)
        .await?;

    Ok(Json(PaginatedResponse::new(
        apps,
        pagination.page,
        pagination.per_page,
        total,
    )))
}

/// Get an application by ID
#[utoipa::path(
    get,
    path = "/api/v1/applications/{id}",
    tag = "Catalog",
    params(("id" = Uuid, Path, description = "Application ID")),
    responses(
        (status = 200, description = "Success", body = crate::domain::Application),
        (status = 404, description = "Not found")
    )
)]
pub async fn get<S: HasServices>(
    State(state): State<S>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    enforce(&auth, &PolicyInput::global(PolicyAction::CatalogRead))?;
    let app = state.catalog_service().get(id.into()).await?;
    Ok(Json(SuccessResponse::new(app)))
}

/// Add an application to the catalog
#[utoipa::path(
    post,
    path = "/api/v1/applications",
    tag = "Catalog",
    request_body = CreateApplicationInput,
    responses(
        (status = 201, description = "Created", body = crate::domain::Application),
        (status = 422, description = "Invalid input or duplicate name")
    )
)]
pub async fn create<S: HasServices>(
    State(state): State<S>,
    auth: AuthUser,
    Json(input): Json<CreateApplicationInput>,
) -> Result<impl IntoResponse> {
    enforce(&auth, &PolicyInput::global(PolicyAction::CatalogWrite))?;

    let app = state.catalog_service().create(input).await?;
    write_audit_log_generic(
        &state,
        &auth,
        "application.create",
        "application",
        Some(app.id),
        None,
        serde_json::to_value(&app).ok(),
    )
    .await;

    Ok((StatusCode::CREATED, Json(SuccessResponse::new(app))))
}

/// Edit an application
#[utoipa::path(
    put,
    path = "/api/v1/applications/{id}",
    tag = "Catalog",
    params(("id" = Uuid, Path, description = "Application ID")),
    request_body = UpdateApplicationInput,
    responses(
        (status = 200, description = "Updated", body = crate::domain::Application),
        (status = 404, description = "Not found"),
        (status = 422, description = "Invalid input or duplicate name")
    )
)]
pub async fn update<S: HasServices>(
    State(state): State<S>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateApplicationInput>,
) -> Result<impl IntoResponse> {
    enforce(&auth, &PolicyInput::global(PolicyAction::CatalogWrite))?;

    let before = state.catalog_service().get(id.into()).await?;
    let app = state.catalog_service().update(id.into(), input).await?;
    write_audit_log_generic(
        &state,
        &auth,
        "application.update",
        "application",
        Some(app.id),
        serde_json::to_value(&before).ok(),
        serde_json::to_value(&app).ok(),
    )
    .await;

    Ok(Json(SuccessResponse::new(app)))
}

/// Deactivate an application. Existing requests keep their snapshot.
#[utoipa::path(
    delete,
    path = "/api/v1/applications/{id}",
    tag = "Catalog",
    params(("id" = Uuid, Path, description = "Application ID")),
    responses(
        (status = 200, description = "Deactivated", body = MessageResponse),
        (status = 404, description = "Not found")
    )
)]
pub async fn delete<S: HasServices>(
    State(state): State<S>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    enforce(&auth, &PolicyInput::global(PolicyAction::CatalogWrite))?;

    let before = state.catalog_service().delete(id.into()).await?;
    write_audit_log_generic(
        &state,
        &auth,
        "application.deactivate",
        "application",
        Some(before.id),
        serde_json::to_value(&before).ok(),
        None,
    )
    .await;

    Ok(Json(MessageResponse::new("Application deactivated")))
}
