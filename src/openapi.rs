//! OpenAPI 3.0 document for the portal API
//!
//! Served through Swagger UI outside production.

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Access Portal API",
        version = "0.1.0",
        description = "Application catalog, access requests and multi-level approvals",
        license(name = "Proprietary")
    ),
    tags(
        (name = "System", description = "Health checks"),
        (name = "Catalog", description = "Applications that access can be requested for"),
        (name = "Requests", description = "Filing, viewing and deleting access requests"),
        (name = "Approvals", description = "Manager queue and approve / reject decisions"),
        (name = "Audit", description = "Audit trail of mutations"),
    ),
    security(
        ("bearer_jwt" = [])
    ),
    components(
        schemas(
            crate::api::PaginationQuery,
            crate::api::PaginationMeta,
            crate::api::MessageResponse,
            crate::domain::StringUuid,
            crate::domain::Role,

            crate::domain::Application,
            crate::domain::AssignedManager,
            crate::domain::LevelingMode,
            crate::domain::CreateApplicationInput,
            crate::domain::UpdateApplicationInput,

            crate::domain::AccessRequest,
            crate::domain::RequestStatus,
            crate::domain::CreateAccessRequestInput,
            crate::domain::ApproveInput,
            crate::domain::RejectInput,
            crate::domain::ApprovalWorkflowEntry,
            crate::domain::EntryStatus,
            crate::domain::EntryDisplayStatus,
            crate::domain::EntryView,
            crate::domain::RequestDetail,
            crate::api::approval::QueueScope,

            crate::repository::audit::AuditLog,
            crate::api::health::HealthResponse,
            crate::api::health::ReadinessResponse,
        ),
    ),
    paths(
        crate::api::health::health,
        crate::api::health::ready,

        crate::api::application::list,
        crate::api::application::get,
        crate::api::application::create,
        crate::api::application::update,
        crate::api::application::delete,

        crate::api::request::create,
        crate::api::request::list_all,
        crate::api::request::list_mine,
        crate::api::request::get,
        crate::api::request::delete,

        crate::api::approval::queue,
        crate::api::approval::approve,
        crate::api::approval::reject,

        crate::api::audit::list,
    ),
)]
pub struct ApiDoc;

impl ApiDoc {
    /// The generated document plus the bearer JWT security scheme
    pub fn build() -> utoipa::openapi::OpenApi {
        let mut doc = Self::openapi();
        if let Some(c) = doc.components.as_mut() {
            c.security_schemes.insert(
                "bearer_jwt".to_string(),
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::Http::new(
                        utoipa::openapi::security::HttpAuthScheme::Bearer,
                    ),
                ),
            );
        }
        doc
    }
}
