//! Configuration management for the access portal

use crate::domain::AssignedManager;
use anyhow::{Context, Result};
use std::env;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Deployment environment ("development", "production", ...)
    pub environment: String,
    /// HTTP server host
    pub http_host: String,
    /// HTTP server port
    pub http_port: u16,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Redis configuration
    pub redis: RedisConfig,
    /// JWT configuration
    pub jwt: JwtConfig,
    /// Approval workflow configuration
    pub workflow: WorkflowConfig,
    /// Telemetry configuration
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: String,
    /// How long catalog entries stay cached
    pub catalog_ttl_secs: u64,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub token_ttl_secs: i64,
    pub private_key_pem: Option<String>,
    pub public_key_pem: Option<String>,
}

/// Who approves requests when the catalog doesn't say.
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    /// Fixed chain used by every leveling application, level 1 first
    pub leveling_chain: Vec<AssignedManager>,
    /// Single reviewer for no-leveling applications without managers
    pub default_reviewer: AssignedManager,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            leveling_chain: vec![
                AssignedManager::new(well_known::MANAGER_A_ID, "Manager A"),
                AssignedManager::new(well_known::MANAGER_B_ID, "Manager B"),
                AssignedManager::new(well_known::MANAGER_C_ID, "Manager C"),
            ],
            default_reviewer: AssignedManager::new(well_known::IT_ADMIN_ID, "IT Admin"),
        }
    }
}

/// Seeded principal ids used when the workflow isn't configured explicitly
pub mod well_known {
    use uuid::Uuid;

    pub const MANAGER_A_ID: Uuid = Uuid::from_u128(0x0000_0000_0000_4000_8000_0000_0000_000a);
    pub const MANAGER_B_ID: Uuid = Uuid::from_u128(0x0000_0000_0000_4000_8000_0000_0000_000b);
    pub const MANAGER_C_ID: Uuid = Uuid::from_u128(0x0000_0000_0000_4000_8000_0000_0000_000c);
    pub const IT_ADMIN_ID: Uuid = Uuid::from_u128(0x0000_0000_0000_4000_8000_0000_0000_0001);
}

/// Telemetry configuration
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// "json" or "pretty"
    pub log_format: String,
    pub metrics_enabled: bool,
    pub tracing_enabled: bool,
    pub otlp_endpoint: Option<String>,
    pub service_name: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            tracing_enabled: false,
            otlp_endpoint: None,
            service_name: "access-portal-core".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            http_host: env::var("HTTP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            http_port: env::var("HTTP_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("Invalid HTTP_PORT")?,
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").context("DATABASE_URL is required")?,
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .unwrap_or(10),
                min_connections: env::var("DATABASE_MIN_CONNECTIONS")
                    .unwrap_or_else(|_| "2".to_string())
                    .parse()
                    .unwrap_or(2),
            },
            redis: RedisConfig {
                url: env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string()),
                catalog_ttl_secs: env::var("CATALOG_CACHE_TTL_SECS")
                    .unwrap_or_else(|_| "300".to_string())
                    .parse()
                    .unwrap_or(300),
            },
            jwt: JwtConfig {
                secret: env::var("JWT_SECRET").context("JWT_SECRET is required")?,
                issuer: env::var("JWT_ISSUER")
                    .unwrap_or_else(|_| "https://portal.local".to_string()),
                audience: env::var("JWT_AUDIENCE")
                    .unwrap_or_else(|_| "access-portal".to_string()),
                token_ttl_secs: env::var("JWT_TOKEN_TTL_SECS")
                    .unwrap_or_else(|_| "3600".to_string())
                    .parse()
                    .unwrap_or(3600),
                private_key_pem: env::var("JWT_PRIVATE_KEY")
                    .ok()
                    .map(|value| value.replace("\\n", "\n")),
                public_key_pem: env::var("JWT_PUBLIC_KEY")
                    .ok()
                    .map(|value| value.replace("\\n", "\n")),
            },
            workflow: workflow_from_env()?,
            telemetry: TelemetryConfig {
                log_format: env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string()),
                metrics_enabled: env::var("METRICS_ENABLED")
                    .map(|s| s.to_lowercase() == "true")
                    .unwrap_or(false),
                tracing_enabled: env::var("OTEL_TRACING_ENABLED")
                    .map(|s| s.to_lowercase() == "true")
                    .unwrap_or(false),
                otlp_endpoint: env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok(),
                service_name: env::var("OTEL_SERVICE_NAME")
                    .unwrap_or_else(|_| "access-portal-core".to_string()),
            },
        })
    }

    /// Get HTTP server address
    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

fn workflow_from_env() -> Result<WorkflowConfig> {
    let mut workflow = WorkflowConfig::default();

    if let Ok(raw) = env::var("WORKFLOW_LEVELING_CHAIN") {
        let chain: Vec<AssignedManager> =
            serde_json::from_str(&raw).context("Invalid WORKFLOW_LEVELING_CHAIN")?;
        if chain.len() != crate::workflow::LEVELING_LEVELS as usize {
            anyhow::bail!(
                "WORKFLOW_LEVELING_CHAIN must list exactly {} managers, got {}",
                crate::workflow::LEVELING_LEVELS,
                chain.len()
            );
        }
        workflow.leveling_chain = chain;
    }

    if let Ok(raw) = env::var("WORKFLOW_DEFAULT_REVIEWER") {
        workflow.default_reviewer =
            serde_json::from_str(&raw).context("Invalid WORKFLOW_DEFAULT_REVIEWER")?;
    }

    Ok(workflow)
}
