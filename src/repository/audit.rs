//! Audit log repository

use crate::domain::StringUuid;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, MySqlPool};
use utoipa::ToSchema;

/// Audit log entry
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct AuditLog {
    pub id: i64,
    pub actor_id: Option<StringUuid>,
    pub action: String,
    pub resource_type: String,
    pub resource_id: Option<StringUuid>,
    #[sqlx(json(nullable))]
    pub old_value: Option<serde_json::Value>,
    #[sqlx(json(nullable))]
    pub new_value: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// Input for creating an audit log entry
#[derive(Debug, Clone, PartialEq)]
pub struct CreateAuditLogInput {
    pub actor_id: Option<StringUuid>,
    pub action: String,
    pub resource_type: String,
    pub resource_id: Option<StringUuid>,
    pub old_value: Option<serde_json::Value>,
    pub new_value: Option<serde_json::Value>,
}

/// Audit log query parameters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditLogQuery {
    pub actor_id: Option<StringUuid>,
    pub resource_type: Option<String>,
    pub resource_id: Option<StringUuid>,
    pub action: Option<String>,
    pub offset: Option<i64>,
    pub limit: Option<i64>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuditRepository: Send + Sync {
    async fn create(&self, input: &CreateAuditLogInput) -> Result<()>;
    async fn find(&self, query: &AuditLogQuery) -> Result<Vec<AuditLog>>;
    async fn count(&self, query: &AuditLogQuery) -> Result<i64>;
}

pub struct AuditRepositoryImpl {
    pool: MySqlPool,
}

impl AuditRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

enum AuditBind<'a> {
    Id(StringUuid),
    Text(&'a str),
}

fn where_clause(query: &AuditLogQuery) -> (String, Vec<AuditBind<'_>>) {
    let mut sql = String::from(" WHERE 1=1");
    let mut binds = Vec::new();

    if let Some(actor_id) = query.actor_id {
        sql.push_str(" AND actor_id = ?");
        binds.push(AuditBind::Id(actor_id));
    }
    if let Some(ref resource_type) = query.resource_type {
        sql.push_str(" AND resource_type = ?");
        binds.push(AuditBind::Text(resource_type));
    }
    if let Some(resource_id) = query.resource_id {
        sql.push_str(" AND resource_id = ?");
        binds.push(AuditBind::Id(resource_id));
    }
    if let Some(ref action) = query.action {
        sql.push_str(" AND action = ?");
        binds.push(AuditBind::Text(action));
    }

    (sql, binds)
}

#[async_trait]
impl AuditRepository for AuditRepositoryImpl {
    async fn create(&self, input: &CreateAuditLogInput) -> Result<()> {
        let old_value = input
            .old_value
            .as_ref()
            .map(|v| serde_json::to_string(v).unwrap_or_default());
        let new_value = input
            .new_value
            .as_ref()
            .map(|v| serde_json::to_string(v).unwrap_or_default());

        sqlx::query(
            r#"
            INSERT INTO audit_logs (actor_id, action, resource_type, resource_id, old_value, new_value, created_at)
            VALUES (?, ?, ?, ?, ?, ?, NOW())
            "#,
        )
        .bind(input.actor_id)
        .bind(&input.action)
        .bind(&input.resource_type)
        .bind(input.resource_id)
        .bind(old_value)
        .bind(new_value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find(&self, query: &AuditLogQuery) -> Result<Vec<AuditLog>> {
        let (clause, binds) = where_clause(query);
        let sql = format!(
            "SELECT id, actor_id, action, resource_type, resource_id, old_value, new_value, created_at \
             FROM audit_logs{} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
            clause
        );

        let mut query_builder = sqlx::query_as::<_, AuditLog>(&sql);
        for value in binds {
            query_builder = match value {
                AuditBind::Id(id) => query_builder.bind(id),
                AuditBind::Text(text) => query_builder.bind(text),
            };
        }

        let limit = query.limit.unwrap_or(50).min(100);
        let offset = query.offset.unwrap_or(0);
        let logs = query_builder
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(logs)
    }

    async fn count(&self, query: &AuditLogQuery) -> Result<i64> {
        let (clause, binds) = where_clause(query);
        let sql = format!("SELECT COUNT(*) FROM audit_logs{}", clause);

        let mut query_builder = sqlx::query_as::<_, (i64,)>(&sql);
        for value in binds {
            query_builder = match value {
                AuditBind::Id(id) => query_builder.bind(id),
                AuditBind::Text(text) => query_builder.bind(text),
            };
        }

        let (count,) = query_builder.fetch_one(&self.pool).await?;
        Ok(count)
    }
}
