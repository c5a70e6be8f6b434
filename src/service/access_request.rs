//! Access request business logic: filing, viewing, listing, deleting

use crate::config::WorkflowConfig;
use crate::domain::{
    CreateAccessRequestInput, RequestDetail, RequestFilter, RequestWorkflow, Requester,
    StringUuid,
};
use crate::error::{AppError, Result};
use crate::repository::{AccessRequestRepository, ApplicationRepository};
use crate::telemetry::metrics::REQUESTS_CREATED_TOTAL;
use crate::workflow;
use chrono::Utc;
use std::sync::Arc;
use tracing::info;
use validator::Validate;

/// Who is looking at a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewer {
    pub id: StringUuid,
    /// IT admins can see every request
    pub sees_all: bool,
}

pub struct AccessRequestService<R: AccessRequestRepository, A: ApplicationRepository> {
    repo: Arc<R>,
    app_repo: Arc<A>,
    workflow: WorkflowConfig,
}

impl<R: AccessRequestRepository, A: ApplicationRepository> AccessRequestService<R, A> {
    pub fn new(repo: Arc<R>, app_repo: Arc<A>, workflow: WorkflowConfig) -> Self {
        Self {
            repo,
            app_repo,
            workflow,
        }
    }

    /// File a request and plan its approval chain.
    pub async fn create(
        &self,
        requester: &Requester,
        input: CreateAccessRequestInput,
    ) -> Result<RequestDetail> {
        input.validate()?;

        let app = self
            .app_repo
            .find_by_id(input.application_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Application {} not found", input.application_id))
            })?;

        let planned = workflow::new_request(requester, &app, &input, &self.workflow, Utc::now())?;
        let stored = self.repo.create(&planned).await?;

        metrics::counter!(REQUESTS_CREATED_TOTAL).increment(1);
        info!(
            request_id = %stored.request.id,
            application_id = %app.id,
            total_levels = stored.request.total_levels,
            "Access request created"
        );

        Ok(workflow::render(stored, requester.id))
    }

    pub async fn get(&self, id: StringUuid) -> Result<RequestWorkflow> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Access request {} not found", id)))
    }

    /// Visible to the requester, to managers in the chain and to admins.
    pub async fn get_for(&self, id: StringUuid, viewer: Viewer) -> Result<RequestDetail> {
        let wf = self.get(id).await?;

        let participant = wf.request.requester_id == viewer.id
            || wf.entries.iter().any(|e| e.manager_id == viewer.id);
        if !participant && !viewer.sees_all {
            return Err(AppError::Forbidden(
                "You are not a participant in this request".to_string(),
            ));
        }

        Ok(workflow::render(wf, viewer.id))
    }

    /// Paginated listing rendered for `viewer`
    pub async fn list(
        &self,
        filter: &RequestFilter,
        viewer: Viewer,
        page: i64,
        per_page: i64,
    ) -> Result<(Vec<RequestDetail>, i64)> {
        let offset = page.saturating_sub(1).saturating_mul(per_page);
        let items = self.repo.list(filter, offset, per_page).await?;
        let total = self.repo.count(filter).await?;

        let rendered = items
            .into_iter()
            .map(|wf| workflow::render(wf, viewer.id))
            .collect();
        Ok((rendered, total))
    }

    /// Owners may delete their request in any state. Returns what was removed.
    pub async fn delete(&self, id: StringUuid, requester_id: StringUuid) -> Result<RequestWorkflow> {
        let wf = self.get(id).await?;
        if wf.request.requester_id != requester_id {
            return Err(AppError::Forbidden(
                "Only the requester can delete this request".to_string(),
            ));
        }

        self.repo.delete(id).await?;
        info!(request_id = %id, status = %wf.request.status, "Access request deleted");
        Ok(wf)
    }
}
