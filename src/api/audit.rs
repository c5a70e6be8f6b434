//! Audit log API handlers

use crate::api::{PaginatedResponse, MAX_PER_PAGE};
use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::policy::{enforce, PolicyAction, PolicyInput};
use crate::repository::audit::AuditLogQuery;
use crate::repository::AuditRepository;
use crate::state::HasServices;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};

const DEFAULT_LIMIT: i64 = 50;

/// List audit log entries, newest first
#[utoipa::path(
    get,
    path = "/api/v1/audit-logs",
    tag = "Audit",
    responses(
        (status = 200, description = "Success"),
        (status = 403, description = "IT admin required")
    )
)]
pub async fn list<S: HasServices>(
    State(state): State<S>,
    auth: AuthUser,
    Query(mut query): Query<AuditLogQuery>,
) -> Result<impl IntoResponse> {
    enforce(&auth, &PolicyInput::global(PolicyAction::AuditRead))?;

    let per_page = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_PER_PAGE);
    let offset = query.offset.unwrap_or(0).max(0);
    query.limit = Some(per_page);
    query.offset = Some(offset);

    let logs = state.audit_repo().find(&query).await?;
    let total = state.audit_repo().count(&query).await?;

    Ok(Json(PaginatedResponse::new(
        logs,
        page_of(offset, per_page),
        per_page,
        total,
    )))
}

/// 1-based page containing `offset`
fn page_of(offset: i64, per_page: i64) -> i64 {
    offset / per_page + 1
}
