//! Redis cache layer for catalog reads

use crate::config::RedisConfig;
use crate::domain::{Application, StringUuid};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;

/// Cache key prefixes
mod keys {
    pub const APPLICATION: &str = "portal:application";
    pub const CATALOG_PAGE: &str = "portal:catalog:page";
}

/// One cached catalog listing page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogPage {
    pub items: Vec<Application>,
    pub total: i64,
}

/// Cache operations the services depend on
#[async_trait]
pub trait CacheOperations: Send + Sync {
    async fn ping(&self) -> Result<()>;
    async fn get_application(&self, id: StringUuid) -> Result<Option<Application>>;
    async fn set_application(&self, app: &Application) -> Result<()>;
    /// `page_key` identifies the filter and page the listing was built from
    async fn get_catalog_page(&self, page_key: &str) -> Result<Option<CatalogPage>>;
    async fn set_catalog_page(&self, page_key: &str, page: &CatalogPage) -> Result<()>;
    /// Drop the application and every cached listing
    async fn invalidate_catalog(&self, id: Option<StringUuid>) -> Result<()>;
}

/// Cache manager for Redis operations
#[derive(Clone)]
pub struct CacheManager {
    conn: ConnectionManager,
    ttl: Duration,
}

impl CacheManager {
    /// Create a new cache manager
    pub async fn new(config: &RedisConfig) -> Result<Self> {
        let client = redis::Client::open(config.url.as_str()).map_err(|e| {
            AppError::Internal(anyhow::anyhow!("Failed to create Redis client: {}", e))
        })?;

        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to connect to Redis: {}", e)))?;

        Ok(Self {
            conn,
            ttl: Duration::from_secs(config.catalog_ttl_secs),
        })
    }

    async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;

        match value {
            Some(v) => {
                let parsed = serde_json::from_str(&v).map_err(|e| {
                    AppError::Internal(anyhow::anyhow!("Cache deserialize error: {}", e))
                })?;
                Ok(Some(parsed))
            }
            None => Ok(None),
        }
    }

    async fn set<T: Serialize + Sync>(&self, key: &str, value: &T) -> Result<()> {
        let mut conn = self.conn.clone();
        let serialized = serde_json::to_string(value)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Cache serialize error: {}", e)))?;

        let _: () = conn.set_ex(key, serialized, self.ttl.as_secs()).await?;
        Ok(())
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let keys: Vec<String> = redis::cmd("KEYS")
            .arg(pattern)
            .query_async(&mut conn)
            .await?;

        if !keys.is_empty() {
            conn.del::<_, ()>(keys).await?;
        }
        Ok(())
    }
}

fn application_key(id: StringUuid) -> String {
    format!("{}:{}", keys::APPLICATION, id)
}

fn catalog_page_key(page_key: &str) -> String {
    format!("{}:{}", keys::CATALOG_PAGE, page_key)
}

#[async_trait]
impl CacheOperations for CacheManager {
    async fn ping(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    async fn get_application(&self, id: StringUuid) -> Result<Option<Application>> {
        self.get(&application_key(id)).await
    }

    async fn set_application(&self, app: &Application) -> Result<()> {
        self.set(&application_key(app.id), app).await
    }

    async fn get_catalog_page(&self, page_key: &str) -> Result<Option<CatalogPage>> {
        self.get(&catalog_page_key(page_key)).await
    }

    async fn set_catalog_page(&self, page_key: &str, page: &CatalogPage) -> Result<()> {
        self.set(&catalog_page_key(page_key), page).await
    }

    async fn invalidate_catalog(&self, id: Option<StringUuid>) -> Result<()> {
        if let Some(id) = id {
            let mut conn = self.conn.clone();
            let _: () = conn.del(application_key(id)).await?;
        }
        self.delete_pattern(&format!("{}:*", keys::CATALOG_PAGE)).await
    }
}

/// Cache that never stores anything. Every read misses.
#[derive(Debug, Clone, Default)]
pub struct NoOpCacheManager;

impl NoOpCacheManager {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CacheOperations for NoOpCacheManager {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn get_application(&self, _id: StringUuid) -> Result<Option<Application>> {
        Ok(None)
    }

    async fn set_application(&self, _app: &Application) -> Result<()> {
        Ok(())
    }

    async fn get_catalog_page(&self, _page_key: &str) -> Result<Option<CatalogPage>> {
        Ok(None)
    }

    async fn set_catalog_page(&self, _page_key: &str, _page: &CatalogPage) -> Result<()> {
        Ok(())
    }

    async fn invalidate_catalog(&self, _id: Option<StringUuid>) -> Result<()> {
        Ok(())
    }
}
