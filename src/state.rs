//! Application state trait for dependency injection
//!
//! Handlers are generic over [`HasServices`], so the same code runs against
//! the production `AppState` and the in-memory state used by tests.

use crate::config::Config;
use crate::jwt::JwtManager;
use crate::repository::{AccessRequestRepository, ApplicationRepository, AuditRepository};
use crate::service::{AccessRequestService, ApprovalService, CatalogService};

pub trait HasServices: Clone + Send + Sync + 'static {
    /// The application catalog repository type
    type ApplicationRepo: ApplicationRepository;
    /// The access request repository type
    type RequestRepo: AccessRequestRepository;
    /// The audit repository type
    type AuditRepo: AuditRepository;

    /// Get the application configuration
    fn config(&self) -> &Config;

    /// Get the catalog service
    fn catalog_service(&self) -> &CatalogService<Self::ApplicationRepo>;

    /// Get the access request service
    fn request_service(&self) -> &AccessRequestService<Self::RequestRepo, Self::ApplicationRepo>;

    /// Get the approval service
    fn approval_service(&self) -> &ApprovalService<Self::RequestRepo>;

    /// Get the audit repository
    fn audit_repo(&self) -> &Self::AuditRepo;

    /// Get the JWT manager
    fn jwt_manager(&self) -> &JwtManager;

    /// Check if the system is ready. Returns (db_ok, cache_ok).
    fn check_ready(&self) -> impl std::future::Future<Output = (bool, bool)> + Send;
}
