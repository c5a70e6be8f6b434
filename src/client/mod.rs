//! Typed HTTP client for the portal API
//!
//! Each `PortalClient` owns its caches; nothing is shared between instances.
//! GET calls that hit a transport failure or a 5xx response are retried with
//! exponential backoff. Mutations are sent once, since a timed-out POST may
//! already have been applied. Every other error is returned on the first attempt.

use crate::api::{MessageResponse, PaginatedResponse, SuccessResponse};
use crate::domain::{
    Application, ApproveInput, CreateAccessRequestInput, CreateApplicationInput, RejectInput,
    RequestDetail, RequestStatus, StringUuid, UpdateApplicationInput,
};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, warn};
use url::Url;

pub type ClientResult<T> = std::result::Result<T, ClientError>;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The API answered with an error envelope
    #[error("{status}: {message}")]
    Api {
        status: StatusCode,
        error: String,
        message: String,
    },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ClientError {
    /// Network failures and server-side errors. Conflict, validation,
    /// not-found and permission errors never are.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Api { status, .. } => status.is_server_error(),
            ClientError::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            ClientError::Url(_) => false,
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Transport(e) => e.status(),
            ClientError::Url(_) => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: Url,
    pub token: Option<String>,
    pub timeout: Duration,
    /// Retries after the first attempt
    pub max_retries: u32,
    pub base_delay: Duration,
    pub catalog_ttl: Duration,
    pub health_ttl: Duration,
}

impl ClientConfig {
    pub fn new(base_url: &str) -> ClientResult<Self> {
        Ok(Self {
            base_url: Url::parse(base_url)?,
            token: None,
            timeout: Duration::from_secs(10),
            max_retries: 3,
            base_delay: Duration::from_millis(200),
            catalog_ttl: Duration::from_secs(300),
            health_ttl: Duration::from_secs(30),
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Delay before retry number `attempt` (1-based): base * 2^(attempt-1), capped at 30s
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay
            .saturating_mul(factor)
            .min(Duration::from_secs(30))
    }
}

/// Small in-memory cache with a fixed time-to-live
#[derive(Debug)]
struct TtlCache<T> {
    ttl: Duration,
    entries: RwLock<HashMap<String, (Instant, T)>>,
}

impl<T: Clone> TtlCache<T> {
    fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    async fn get(&self, key: &str) -> Option<T> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|(stored, _)| stored.elapsed() < self.ttl)
            .map(|(_, value)| value.clone())
    }

    async fn put(&self, key: String, value: T) {
        let mut entries = self.entries.write().await;
        entries.retain(|_, (stored, _)| stored.elapsed() < self.ttl);
        entries.insert(key, (Instant::now(), value));
    }

    async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

/// Catalog listing parameters
#[derive(Debug, Clone, Default, Serialize)]
pub struct CatalogQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub include_inactive: bool,
}

impl CatalogQuery {
    fn cache_key(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RequestListQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<RequestStatus>,
}

pub struct PortalClient {
    http: reqwest::Client,
    config: ClientConfig,
    catalog: TtlCache<PaginatedResponse<Application>>,
    health: TtlCache<bool>,
}

impl PortalClient {
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            catalog: TtlCache::new(config.catalog_ttl),
            health: TtlCache::new(config.health_ttl),
            config,
        })
    }

    /// Whether the API is reachable and ready, cached for `health_ttl`
    pub async fn check_connection(&self) -> bool {
        if let Some(ok) = self.health.get("ready").await {
            return ok;
        }
        let ok = match self.url("/ready") {
            Ok(url) => matches!(
                self.http.get(url).send().await,
                Ok(resp) if resp.status().is_success()
            ),
            Err(_) => false,
        };
        self.health.put("ready".to_string(), ok).await;
        ok
    }

    // ── Catalog ────────────────────────────────────────────────────

    pub async fn list_applications(
        &self,
        query: &CatalogQuery,
    ) -> ClientResult<PaginatedResponse<Application>> {
        let key = query.cache_key();
        if let Some(hit) = self.catalog.get(&key).await {
            debug!("catalog cache hit");
            return Ok(hit);
        }
        let page: PaginatedResponse<Application> = self
            .send(Method::GET, "/api/v1/applications", Some(query), None::<&()>)
            .await?;
        self.catalog.put(key, page.clone()).await;
        Ok(page)
    }

    pub async fn get_application(&self, id: StringUuid) -> ClientResult<Application> {
        self.data(Method::GET, &format!("/api/v1/applications/{id}"), None::<&()>)
            .await
    }

    pub async fn create_application(
        &self,
        input: &CreateApplicationInput,
    ) -> ClientResult<Application> {
        let app = self.data(Method::POST, "/api/v1/applications", Some(input)).await?;
        self.catalog.clear().await;
        Ok(app)
    }

    pub async fn update_application(
        &self,
        id: StringUuid,
        input: &UpdateApplicationInput,
    ) -> ClientResult<Application> {
        let app = self
            .data(Method::PUT, &format!("/api/v1/applications/{id}"), Some(input))
            .await?;
        self.catalog.clear().await;
        Ok(app)
    }

    pub async fn delete_application(&self, id: StringUuid) -> ClientResult<MessageResponse> {
        let msg = self
            .send(
                Method::DELETE,
                &format!("/api/v1/applications/{id}"),
                None::<&()>,
                None::<&()>,
            )
            .await?;
        self.catalog.clear().await;
        Ok(msg)
    }

    // ── Requests ───────────────────────────────────────────────────

    pub async fn create_request(
        &self,
        input: &CreateAccessRequestInput,
    ) -> ClientResult<RequestDetail> {
        self.data(Method::POST, "/api/v1/requests", Some(input)).await
    }

    pub async fn get_request(&self, id: StringUuid) -> ClientResult<RequestDetail> {
        self.data(Method::GET, &format!("/api/v1/requests/{id}"), None::<&()>)
            .await
    }

    pub async fn list_my_requests(
        &self,
        query: &RequestListQuery,
    ) -> ClientResult<PaginatedResponse<RequestDetail>> {
        self.send(Method::GET, "/api/v1/requests/mine", Some(query), None::<&()>)
            .await
    }

    pub async fn list_all_requests(
        &self,
        query: &RequestListQuery,
    ) -> ClientResult<PaginatedResponse<RequestDetail>> {
        self.send(Method::GET, "/api/v1/requests", Some(query), None::<&()>)
            .await
    }

    pub async fn delete_request(&self, id: StringUuid) -> ClientResult<MessageResponse> {
        self.send(
            Method::DELETE,
            &format!("/api/v1/requests/{id}"),
            None::<&()>,
            None::<&()>,
        )
        .await
    }

    // ── Approvals ──────────────────────────────────────────────────

    /// `all = false` returns only requests waiting on the caller now
    pub async fn approval_queue(&self, all: bool) -> ClientResult<PaginatedResponse<RequestDetail>> {
        let scope = [("scope", if all { "all" } else { "actionable" })];
        self.send(Method::GET, "/api/v1/approvals", Some(&scope), None::<&()>)
            .await
    }

    pub async fn approve(
        &self,
        id: StringUuid,
        comments: Option<String>,
    ) -> ClientResult<RequestDetail> {
        self.data(
            Method::POST,
            &format!("/api/v1/requests/{id}/approve"),
            Some(&ApproveInput { comments }),
        )
        .await
    }

    pub async fn reject(&self, id: StringUuid, reason: &str) -> ClientResult<RequestDetail> {
        self.data(
            Method::POST,
            &format!("/api/v1/requests/{id}/reject"),
            Some(&RejectInput {
                reason: reason.to_string(),
            }),
        )
        .await
    }

    // ── Plumbing ───────────────────────────────────────────────────

    fn url(&self, path: &str) -> ClientResult<Url> {
        Ok(self.config.base_url.join(path)?)
    }

    async fn data<T, B>(&self, method: Method, path: &str, body: Option<&B>) -> ClientResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let envelope: SuccessResponse<T> = self.send(method, path, None::<&()>, body).await?;
        Ok(envelope.data)
    }

    async fn send<T, Q, B>(
        &self,
        method: Method,
        path: &str,
        query: Option<&Q>,
        body: Option<&B>,
    ) -> ClientResult<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
        B: Serialize + ?Sized,
    {
        let url = self.url(path)?;
        let idempotent = method == Method::GET;
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.send_once(method.clone(), url.clone(), query, body).await {
                Ok(value) => return Ok(value),
                Err(e) if idempotent && e.is_retryable() && attempt <= self.config.max_retries => {
                    let wait = self.config.backoff(attempt);
                    warn!(
                        path,
                        attempt,
                        wait_ms = wait.as_millis() as u64,
                        error = %e,
                        "Portal request failed, retrying with backoff"
                    );
                    tokio::time::sleep(wait).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn send_once<T, Q, B>(
        &self,
        method: Method,
        url: Url,
        query: Option<&Q>,
        body: Option<&B>,
    ) -> ClientResult<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
        B: Serialize + ?Sized,
    {
        let mut request = self.http.request(method, url);
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }
        if let Some(query) = query {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        let body = response.json::<ErrorBody>().await.ok();
        let (error, message) = body
            .map(|b| (b.error, b.message))
            .unwrap_or_else(|| (String::new(), status.to_string()));
        Err(ClientError::Api {
            status,
            error,
            message,
        })
    }
}
