//! Application catalog business logic

use crate::cache::{CacheOperations, CatalogPage};
use crate::domain::{
    normalize_name, Application, ApplicationFilter, CreateApplicationInput, StringUuid,
    UpdateApplicationInput,
};
use crate::error::{AppError, Result};
use crate::repository::ApplicationRepository;
use std::sync::Arc;
use tracing::warn;
use validator::Validate;

pub struct CatalogService<R: ApplicationRepository> {
    repo: Arc<R>,
    cache: Option<Arc<dyn CacheOperations>>,
}

impl<R: ApplicationRepository> CatalogService<R> {
    pub fn new(repo: Arc<R>, cache: Option<Arc<dyn CacheOperations>>) -> Self {
        Self { repo, cache }
    }

    pub async fn create(&self, input: CreateApplicationInput) -> Result<Application> {
        input.validate()?;

        if self.repo.find_by_name(&input.name).await?.is_some() {
            return Err(AppError::Validation(format!(
                "An application named '{}' already exists",
                input.name.trim()
            )));
        }

        let app = self.repo.create(&input).await?;
        self.invalidate(None).await;
        Ok(app)
    }

    pub async fn get(&self, id: StringUuid) -> Result<Application> {
        if let Some(cache) = &self.cache {
            if let Ok(Some(app)) = cache.get_application(id).await {
                return Ok(app);
            }
        }

        let app = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Application {} not found", id)))?;

        if let Some(cache) = &self.cache {
            let _ = cache.set_application(&app).await;
        }
        Ok(app)
    }

    pub async fn list(
        &self,
        filter: &ApplicationFilter,
        page: i64,
        per_page: i64,
    ) -> Result<(Vec<Application>, i64)> {
        let key = page_key(filter, page, per_page);
        if let Some(cache) = &self.cache {
            if let Ok(Some(cached)) = cache.get_catalog_page(&key).await {
                return Ok((cached.items, cached.total));
            }
        }

        let offset = page.saturating_sub(1).saturating_mul(per_page);
        let apps = self.repo.list(filter, offset, per_page).await?;
        let total = self.repo.count(filter).await?;

        if let Some(cache) = &self.cache {
            let page = CatalogPage {
                items: apps.clone(),
                total,
            };
            let _ = cache.set_catalog_page(&key, &page).await;
        }
        Ok((apps, total))
    }

    pub async fn update(&self, id: StringUuid, input: UpdateApplicationInput) -> Result<Application> {
        input.validate()?;

        if let Some(name) = &input.name {
            if let Some(other) = self.repo.find_by_name(name).await? {
                if other.id != id {
                    return Err(AppError::Validation(format!(
                        "An application named '{}' already exists",
                        name.trim()
                    )));
                }
            }
        }

        let app = self.repo.update(id, &input).await?;
        self.invalidate(Some(id)).await;
        Ok(app)
    }

    /// Soft delete; returns the application as it was before.
    pub async fn delete(&self, id: StringUuid) -> Result<Application> {
        let existing = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Application {} not found", id)))?;

        self.repo.deactivate(id).await?;
        self.invalidate(Some(id)).await;
        Ok(existing)
    }

    async fn invalidate(&self, id: Option<StringUuid>) {
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.invalidate_catalog(id).await {
                warn!("Failed to invalidate catalog cache: {}", e);
            }
        }
    }
}

fn page_key(filter: &ApplicationFilter, page: i64, per_page: i64) -> String {
    format!(
        "{}:{}:{}:{}:{}",
        if filter.include_inactive { "all" } else { "active" },
        filter.category.as_deref().unwrap_or("*"),
        filter
            .search
            .as_deref()
            .map(normalize_name)
            .unwrap_or_default(),
        page,
        per_page
    )
}
