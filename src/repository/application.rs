//! Application catalog repository

use crate::domain::{
    normalize_name, Application, ApplicationFilter, CreateApplicationInput, StringUuid,
    UpdateApplicationInput,
};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use sqlx::MySqlPool;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ApplicationRepository: Send + Sync {
    async fn create(&self, input: &CreateApplicationInput) -> Result<Application>;
    async fn find_by_id(&self, id: StringUuid) -> Result<Option<Application>>;
    /// Lookup ignoring case and surrounding whitespace, inactive rows included
    async fn find_by_name(&self, name: &str) -> Result<Option<Application>>;
    async fn list(
        &self,
        filter: &ApplicationFilter,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Application>>;
    async fn count(&self, filter: &ApplicationFilter) -> Result<i64>;
    async fn update(&self, id: StringUuid, input: &UpdateApplicationInput) -> Result<Application>;
    /// Soft delete: the row stays so existing requests keep their reference
    async fn deactivate(&self, id: StringUuid) -> Result<()>;
}

pub struct ApplicationRepositoryImpl {
    pool: MySqlPool,
}

impl ApplicationRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

const SELECT_APPLICATION: &str = r#"
    SELECT id, name, description, category, leveling, managers, logo_url, active, created_at, updated_at
    FROM applications
"#;

/// WHERE clause and its string binds, in order
fn filter_clause(filter: &ApplicationFilter) -> (String, Vec<String>) {
    let mut sql = String::from(" WHERE 1=1");
    let mut binds = Vec::new();

    if !filter.include_inactive {
        sql.push_str(" AND active = TRUE");
    }
    if let Some(category) = &filter.category {
        sql.push_str(" AND category = ?");
        binds.push(category.clone());
    }
    if let Some(search) = filter.search.as_deref().map(normalize_name) {
        if !search.is_empty() {
            sql.push_str(" AND name_normalized LIKE ?");
            binds.push(format!("%{}%", search));
        }
    }

    (sql, binds)
}

/// The unique index on `name_normalized` is the last line of defence
/// against duplicate names.
fn map_unique_violation(err: sqlx::Error, name: &str) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => AppError::Validation(format!(
            "An application named '{}' already exists",
            name.trim()
        )),
        _ => AppError::Database(err),
    }
}

#[async_trait]
impl ApplicationRepository for ApplicationRepositoryImpl {
    async fn create(&self, input: &CreateApplicationInput) -> Result<Application> {
        let id = StringUuid::new_v4();
        let managers_json =
            serde_json::to_string(&input.managers).map_err(|e| AppError::Internal(e.into()))?;

        sqlx::query(
            r#"
            INSERT INTO applications (id, name, name_normalized, description, category, leveling, managers, logo_url, active, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, TRUE, NOW(), NOW())
            "#,
        )
        .bind(id)
        .bind(input.name.trim())
        .bind(normalize_name(&input.name))
        .bind(&input.description)
        .bind(&input.category)
        .bind(input.leveling)
        .bind(&managers_json)
        .bind(&input.logo_url)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, &input.name))?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to create application")))
    }

    async fn find_by_id(&self, id: StringUuid) -> Result<Option<Application>> {
        let sql = format!("{} WHERE id = ?", SELECT_APPLICATION);
        let app = sqlx::query_as::<_, Application>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(app)
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Application>> {
        let sql = format!("{} WHERE name_normalized = ?", SELECT_APPLICATION);
        let app = sqlx::query_as::<_, Application>(&sql)
            .bind(normalize_name(name))
            .fetch_optional(&self.pool)
            .await?;

        Ok(app)
    }

    async fn list(
        &self,
        filter: &ApplicationFilter,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Application>> {
        let (clause, binds) = filter_clause(filter);
        let sql = format!(
            "{}{} ORDER BY name_normalized ASC LIMIT ? OFFSET ?",
            SELECT_APPLICATION, clause
        );

        let mut query = sqlx::query_as::<_, Application>(&sql);
        for value in binds {
            query = query.bind(value);
        }
        let apps = query.bind(limit).bind(offset).fetch_all(&self.pool).await?;

        Ok(apps)
    }

    async fn count(&self, filter: &ApplicationFilter) -> Result<i64> {
        let (clause, binds) = filter_clause(filter);
        let sql = format!("SELECT COUNT(*) FROM applications{}", clause);

        let mut query = sqlx::query_as::<_, (i64,)>(&sql);
        for value in binds {
            query = query.bind(value);
        }
        let (count,) = query.fetch_one(&self.pool).await?;

        Ok(count)
    }

    async fn update(&self, id: StringUuid, input: &UpdateApplicationInput) -> Result<Application> {
        let existing = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Application {} not found", id)))?;

        let name = input
            .name
            .as_deref()
            .map(str::trim)
            .unwrap_or(&existing.name);
        let description = input.description.as_ref().unwrap_or(&existing.description);
        let category = input.category.as_ref().unwrap_or(&existing.category);
        let leveling = input.leveling.unwrap_or(existing.leveling);
        let managers = input.managers.as_ref().unwrap_or(&existing.managers);
        let logo_url = input.logo_url.as_ref().or(existing.logo_url.as_ref());
        let active = input.active.unwrap_or(existing.active);

        let managers_json =
            serde_json::to_string(managers).map_err(|e| AppError::Internal(e.into()))?;

        sqlx::query(
            r#"
            UPDATE applications
            SET name = ?, name_normalized = ?, description = ?, category = ?, leveling = ?,
                managers = ?, logo_url = ?, active = ?, updated_at = NOW()
            WHERE id = ?
            "#,
        )
        .bind(name)
        .bind(normalize_name(name))
        .bind(description)
        .bind(category)
        .bind(leveling)
        .bind(&managers_json)
        .bind(logo_url)
        .bind(active)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, name))?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to update application")))
    }

    async fn deactivate(&self, id: StringUuid) -> Result<()> {
        let result = sqlx::query(
            "UPDATE applications SET active = FALSE, updated_at = NOW() WHERE id = ?",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Application {} not found", id)));
        }

        Ok(())
    }
}
