//! Server initialization and routing

use crate::api;
use crate::cache::{CacheManager, CacheOperations};
use crate::config::Config;
use crate::jwt::JwtManager;
use crate::middleware::{ObservabilityLayer, SanitizedMakeSpan};
use crate::openapi::ApiDoc;
use crate::repository::{
    application::ApplicationRepositoryImpl, audit::AuditRepositoryImpl,
    request::AccessRequestRepositoryImpl,
};
use crate::service::{AccessRequestService, ApprovalService, CatalogService};
use crate::state::HasServices;
use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::{mysql::MySqlPoolOptions, MySqlPool};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use utoipa_swagger_ui::SwaggerUi;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db_pool: MySqlPool,
    pub catalog_service: Arc<CatalogService<ApplicationRepositoryImpl>>,
    pub request_service:
        Arc<AccessRequestService<AccessRequestRepositoryImpl, ApplicationRepositoryImpl>>,
    pub approval_service: Arc<ApprovalService<AccessRequestRepositoryImpl>>,
    pub audit_repo: Arc<AuditRepositoryImpl>,
    pub jwt_manager: JwtManager,
    pub cache_manager: CacheManager,
}

impl HasServices for AppState {
    type ApplicationRepo = ApplicationRepositoryImpl;
    type RequestRepo = AccessRequestRepositoryImpl;
    type AuditRepo = AuditRepositoryImpl;

    fn config(&self) -> &Config {
        &self.config
    }

    fn catalog_service(&self) -> &CatalogService<Self::ApplicationRepo> {
        &self.catalog_service
    }

    fn request_service(&self) -> &AccessRequestService<Self::RequestRepo, Self::ApplicationRepo> {
        &self.request_service
    }

    fn approval_service(&self) -> &ApprovalService<Self::RequestRepo> {
        &self.approval_service
    }

    fn audit_repo(&self) -> &Self::AuditRepo {
        &self.audit_repo
    }

    fn jwt_manager(&self) -> &JwtManager {
        &self.jwt_manager
    }

    async fn check_ready(&self) -> (bool, bool) {
        let db_ok = sqlx::query("SELECT 1").execute(&self.db_pool).await.is_ok();
        let cache_ok = self.cache_manager.ping().await.is_ok();
        (db_ok, cache_ok)
    }
}

impl AppState {
    /// Wire repositories and services over an existing pool and cache.
    pub fn new(config: Config, db_pool: MySqlPool, cache_manager: CacheManager) -> Result<Self> {
        let jwt_manager = JwtManager::new(config.jwt.clone())?;

        let app_repo = Arc::new(ApplicationRepositoryImpl::new(db_pool.clone()));
        let request_repo = Arc::new(AccessRequestRepositoryImpl::new(db_pool.clone()));
        let audit_repo = Arc::new(AuditRepositoryImpl::new(db_pool.clone()));

        let cache: Arc<dyn CacheOperations> = Arc::new(cache_manager.clone());
        let catalog_service = Arc::new(CatalogService::new(app_repo.clone(), Some(cache)));
        let request_service = Arc::new(AccessRequestService::new(
            request_repo.clone(),
            app_repo,
            config.workflow.clone(),
        ));
        let approval_service = Arc::new(ApprovalService::new(request_repo));

        Ok(Self {
            config: Arc::new(config),
            db_pool,
            catalog_service,
            request_service,
            approval_service,
            audit_repo,
            jwt_manager,
            cache_manager,
        })
    }
}

pub async fn run(config: Config, prometheus: Option<PrometheusHandle>) -> Result<()> {
    let db_pool = MySqlPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await?;
    info!("Connected to database");

    let cache_manager = CacheManager::new(&config.redis).await?;
    info!("Connected to Redis");

    let http_addr = config.http_addr();
    let expose_docs = !config.is_production();
    let state = AppState::new(config, db_pool, cache_manager)?;

    let mut app = build_router(state).merge(metrics_router(prometheus));
    if expose_docs {
        app = app.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::build()));
    }

    let listener = TcpListener::bind(&http_addr).await?;
    info!("HTTP server started on {}", http_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server stopped");
    Ok(())
}

fn metrics_router(handle: Option<PrometheusHandle>) -> Router {
    Router::new()
        .route("/metrics", get(api::metrics::metrics_handler))
        .with_state(Arc::new(handle))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// All API routes over any [`HasServices`] state. Tests drive this same router.
pub fn build_router<S: HasServices>(state: S) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(api::health::health))
        .route("/ready", get(api::health::ready::<S>))
        // Catalog
        .route(
            "/api/v1/applications",
            get(api::application::list::<S>).post(api::application::create::<S>),
        )
        .route(
            "/api/v1/applications/{id}",
            get(api::application::get::<S>)
                .put(api::application::update::<S>)
                .delete(api::application::delete::<S>),
        )
        // Requests
        .route(
            "/api/v1/requests",
            get(api::request::list_all::<S>).post(api::request::create::<S>),
        )
        .route("/api/v1/requests/mine", get(api::request::list_mine::<S>))
        .route(
            "/api/v1/requests/{id}",
            get(api::request::get::<S>).delete(api::request::delete::<S>),
        )
        // Approvals
        .route("/api/v1/approvals", get(api::approval::queue::<S>))
        .route(
            "/api/v1/requests/{id}/approve",
            post(api::approval::approve::<S>),
        )
        .route(
            "/api/v1/requests/{id}/reject",
            post(api::approval::reject::<S>),
        )
        // Audit
        .route("/api/v1/audit-logs", get(api::audit::list::<S>))
        .layer(TraceLayer::new_for_http().make_span_with(SanitizedMakeSpan))
        .layer(ObservabilityLayer)
        .layer(cors)
        .with_state(state)
}
