//! Access request repository.
//!
//! A request and its workflow entries are one unit: they are inserted,
//! decided and deleted inside a single transaction.

use crate::domain::{
    AccessRequest, ApprovalWorkflowEntry, Decision, DecisionKind, RequestFilter, RequestStatus,
    RequestWorkflow, StringUuid,
};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use sqlx::MySqlPool;
use std::collections::HashMap;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccessRequestRepository: Send + Sync {
    /// Insert a planned request with all of its entries
    async fn create(&self, workflow: &RequestWorkflow) -> Result<RequestWorkflow>;
    async fn find_by_id(&self, id: StringUuid) -> Result<Option<RequestWorkflow>>;
    async fn list(
        &self,
        filter: &RequestFilter,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<RequestWorkflow>>;
    async fn count(&self, filter: &RequestFilter) -> Result<i64>;
    /// Apply an engine decision. Fails with `Conflict` when the stored state
    /// no longer matches the snapshot the decision was made against.
    async fn apply_decision(&self, decision: &Decision) -> Result<RequestWorkflow>;
    async fn delete(&self, id: StringUuid) -> Result<()>;
}

pub struct AccessRequestRepositoryImpl {
    pool: MySqlPool,
}

impl AccessRequestRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn entries_for(
        &self,
        request_ids: &[StringUuid],
    ) -> Result<HashMap<StringUuid, Vec<ApprovalWorkflowEntry>>> {
        let mut grouped: HashMap<StringUuid, Vec<ApprovalWorkflowEntry>> = HashMap::new();
        if request_ids.is_empty() {
            return Ok(grouped);
        }

        let placeholders = vec!["?"; request_ids.len()].join(", ");
        let sql = format!(
            "{} WHERE request_id IN ({}) ORDER BY request_id, level",
            SELECT_ENTRY, placeholders
        );
        let mut query = sqlx::query_as::<_, ApprovalWorkflowEntry>(&sql);
        for id in request_ids {
            query = query.bind(*id);
        }

        for entry in query.fetch_all(&self.pool).await? {
            grouped.entry(entry.request_id).or_default().push(entry);
        }
        Ok(grouped)
    }
}

const SELECT_REQUEST: &str = r#"
    SELECT r.id, r.requester_id, r.requester_name, r.requester_email, r.application_id,
           r.application_name, r.status, r.current_level, r.total_levels, r.justification,
           r.requested_access, r.requested_duration, r.rejection_reason, r.decided_at,
           r.created_at, r.updated_at
    FROM access_requests r
"#;

const SELECT_ENTRY: &str = r#"
    SELECT id, request_id, level, manager_id, manager_name, status, comments, approved_at, rejected_at
    FROM approval_workflow_entries
"#;

/// Bind values for request filters
enum FilterBind {
    Id(StringUuid),
    Status(RequestStatus),
}

fn filter_clause(filter: &RequestFilter) -> (String, Vec<FilterBind>) {
    let mut sql = String::from(" WHERE 1=1");
    let mut binds = Vec::new();

    if let Some(requester_id) = filter.requester_id {
        sql.push_str(" AND r.requester_id = ?");
        binds.push(FilterBind::Id(requester_id));
    }
    if let Some(manager_id) = filter.manager_id {
        if filter.actionable_only {
            // Lower levels are always approved while a request is pending,
            // so the entry at current_level is the only actionable one.
            sql.push_str(
                " AND r.status = 'pending' AND EXISTS (SELECT 1 FROM approval_workflow_entries e \
                 WHERE e.request_id = r.id AND e.manager_id = ? AND e.status = 'pending' \
                 AND e.level = r.current_level)",
            );
        } else {
            sql.push_str(
                " AND EXISTS (SELECT 1 FROM approval_workflow_entries e \
                 WHERE e.request_id = r.id AND e.manager_id = ?)",
            );
        }
        binds.push(FilterBind::Id(manager_id));
    }
    if let Some(status) = filter.status {
        sql.push_str(" AND r.status = ?");
        binds.push(FilterBind::Status(status));
    }

    (sql, binds)
}

#[async_trait]
impl AccessRequestRepository for AccessRequestRepositoryImpl {
    async fn create(&self, workflow: &RequestWorkflow) -> Result<RequestWorkflow> {
        let request = &workflow.request;
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO access_requests (id, requester_id, requester_name, requester_email, application_id,
                application_name, status, current_level, total_levels, justification, requested_access,
                requested_duration, rejection_reason, decided_at, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, NULL, NULL, ?, ?)
            "#,
        )
        .bind(request.id)
        .bind(request.requester_id)
        .bind(&request.requester_name)
        .bind(&request.requester_email)
        .bind(request.application_id)
        .bind(&request.application_name)
        .bind(request.status)
        .bind(request.current_level)
        .bind(request.total_levels)
        .bind(&request.justification)
        .bind(&request.requested_access)
        .bind(&request.requested_duration)
        .bind(request.created_at)
        .bind(request.updated_at)
        .execute(&mut *tx)
        .await?;

        for entry in &workflow.entries {
            sqlx::query(
                r#"
                INSERT INTO approval_workflow_entries (id, request_id, level, manager_id, manager_name, status)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(entry.id)
            .bind(request.id)
            .bind(entry.level)
            .bind(entry.manager_id)
            .bind(&entry.manager_name)
            .bind(entry.status)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        self.find_by_id(request.id)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to create access request")))
    }

    async fn find_by_id(&self, id: StringUuid) -> Result<Option<RequestWorkflow>> {
        let sql = format!("{} WHERE r.id = ?", SELECT_REQUEST);
        let Some(request) = sqlx::query_as::<_, AccessRequest>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        let entries = sqlx::query_as::<_, ApprovalWorkflowEntry>(&format!(
            "{} WHERE request_id = ? ORDER BY level",
            SELECT_ENTRY
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(RequestWorkflow::new(request, entries)))
    }

    async fn list(
        &self,
        filter: &RequestFilter,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<RequestWorkflow>> {
        let (clause, binds) = filter_clause(filter);
        let sql = format!(
            "{}{} ORDER BY r.created_at DESC LIMIT ? OFFSET ?",
            SELECT_REQUEST, clause
        );

        let mut query = sqlx::query_as::<_, AccessRequest>(&sql);
        for value in binds {
            query = match value {
                FilterBind::Id(id) => query.bind(id),
                FilterBind::Status(status) => query.bind(status),
            };
        }
        let requests = query.bind(limit).bind(offset).fetch_all(&self.pool).await?;

        let ids: Vec<StringUuid> = requests.iter().map(|r| r.id).collect();
        let mut entries = self.entries_for(&ids).await?;

        Ok(requests
            .into_iter()
            .map(|request| {
                let own = entries.remove(&request.id).unwrap_or_default();
                RequestWorkflow::new(request, own)
            })
            .collect())
    }

    async fn count(&self, filter: &RequestFilter) -> Result<i64> {
        let (clause, binds) = filter_clause(filter);
        let sql = format!("SELECT COUNT(*) FROM access_requests r{}", clause);

        let mut query = sqlx::query_as::<_, (i64,)>(&sql);
        for value in binds {
            query = match value {
                FilterBind::Id(id) => query.bind(id),
                FilterBind::Status(status) => query.bind(status),
            };
        }
        let (count,) = query.fetch_one(&self.pool).await?;

        Ok(count)
    }

    async fn apply_decision(&self, decision: &Decision) -> Result<RequestWorkflow> {
        let mut tx = self.pool.begin().await?;

        let locked: Option<(RequestStatus, i32)> = sqlx::query_as(
            "SELECT status, current_level FROM access_requests WHERE id = ? FOR UPDATE",
        )
        .bind(decision.request_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((status, current_level)) = locked else {
            return Err(AppError::NotFound(format!(
                "Access request {} not found",
                decision.request_id
            )));
        };
        if status != RequestStatus::Pending || current_level != decision.expected_level {
            return Err(AppError::Conflict(format!(
                "Request {} changed while the decision was being made",
                decision.request_id
            )));
        }

        let (approved_at, rejected_at, entry_status) = match decision.kind {
            DecisionKind::Approve => (Some(decision.decided_at), None, "approved"),
            DecisionKind::Reject => (None, Some(decision.decided_at), "rejected"),
        };
        let entry_result = sqlx::query(
            r#"
            UPDATE approval_workflow_entries
            SET status = ?, comments = ?, approved_at = ?, rejected_at = ?
            WHERE id = ? AND request_id = ? AND status = 'pending'
            "#,
        )
        .bind(entry_status)
        .bind(&decision.comments)
        .bind(approved_at)
        .bind(rejected_at)
        .bind(decision.entry_id)
        .bind(decision.request_id)
        .execute(&mut *tx)
        .await?;

        if entry_result.rows_affected() == 0 {
            return Err(AppError::Conflict(format!(
                "Approval entry {} was already decided",
                decision.entry_id
            )));
        }

        if !decision.skipped_entry_ids.is_empty() {
            let placeholders = vec!["?"; decision.skipped_entry_ids.len()].join(", ");
            let sql = format!(
                "UPDATE approval_workflow_entries SET status = 'skipped' \
                 WHERE request_id = ? AND status = 'pending' AND id IN ({})",
                placeholders
            );
            let mut query = sqlx::query(&sql).bind(decision.request_id);
            for id in &decision.skipped_entry_ids {
                query = query.bind(*id);
            }
            query.execute(&mut *tx).await?;
        }

        let decided_at = decision
            .next_status
            .is_terminal()
            .then_some(decision.decided_at);
        let request_result = sqlx::query(
            r#"
            UPDATE access_requests
            SET status = ?, current_level = ?, rejection_reason = COALESCE(?, rejection_reason),
                decided_at = COALESCE(?, decided_at), updated_at = ?
            WHERE id = ? AND status = 'pending' AND current_level = ?
            "#,
        )
        .bind(decision.next_status)
        .bind(decision.next_level)
        .bind(&decision.rejection_reason)
        .bind(decided_at)
        .bind(decision.decided_at)
        .bind(decision.request_id)
        .bind(decision.expected_level)
        .execute(&mut *tx)
        .await?;

        if request_result.rows_affected() == 0 {
            return Err(AppError::Conflict(format!(
                "Request {} changed while the decision was being made",
                decision.request_id
            )));
        }

        tx.commit().await?;

        self.find_by_id(decision.request_id)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to reload access request")))
    }

    async fn delete(&self, id: StringUuid) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM approval_workflow_entries WHERE request_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM access_requests WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Access request {} not found", id)));
        }

        tx.commit().await?;
        Ok(())
    }
}
