//! Approve / reject flow: snapshot, engine decision, atomic persist

use crate::domain::{
    ApproveInput, Decision, DecisionKind, RejectInput, RequestDetail, RequestWorkflow, StringUuid,
};
use crate::error::{AppError, Result};
use crate::repository::AccessRequestRepository;
use crate::telemetry::metrics::{APPROVAL_CONFLICTS_TOTAL, APPROVAL_DECISIONS_TOTAL};
use crate::workflow;
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};
use validator::Validate;

/// A decision and the request as stored after it
#[derive(Debug, Clone)]
pub struct DecisionOutcome {
    pub decision: Decision,
    pub detail: RequestDetail,
}

pub struct ApprovalService<R: AccessRequestRepository> {
    repo: Arc<R>,
}

impl<R: AccessRequestRepository> ApprovalService<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn approve(
        &self,
        request_id: StringUuid,
        manager_id: StringUuid,
        input: ApproveInput,
    ) -> Result<DecisionOutcome> {
        input.validate()?;
        let snapshot = self.snapshot(request_id).await?;
        let decision = workflow::approve(&snapshot, manager_id, input.comments, Utc::now())?;
        self.persist(decision).await
    }

    pub async fn reject(
        &self,
        request_id: StringUuid,
        manager_id: StringUuid,
        input: RejectInput,
    ) -> Result<DecisionOutcome> {
        input.validate()?;
        let snapshot = self.snapshot(request_id).await?;
        let decision = workflow::reject(&snapshot, manager_id, &input.reason, Utc::now())?;
        self.persist(decision).await
    }

    async fn snapshot(&self, request_id: StringUuid) -> Result<RequestWorkflow> {
        self.repo
            .find_by_id(request_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Access request {} not found", request_id)))
    }

    async fn persist(&self, decision: Decision) -> Result<DecisionOutcome> {
        let kind = decision.kind.as_str();
        match self.repo.apply_decision(&decision).await {
            Ok(stored) => {
                metrics::counter!(APPROVAL_DECISIONS_TOTAL, "decision" => kind).increment(1);
                info!(
                    request_id = %decision.request_id,
                    level = decision.level,
                    manager_id = %decision.manager_id,
                    decision = kind,
                    status = %stored.request.status,
                    "Approval decision applied"
                );
                let detail = workflow::render(stored, decision.manager_id);
                Ok(DecisionOutcome { decision, detail })
            }
            Err(AppError::Conflict(msg)) => {
                metrics::counter!(APPROVAL_CONFLICTS_TOTAL).increment(1);
                warn!(
                    request_id = %decision.request_id,
                    level = decision.level,
                    manager_id = %decision.manager_id,
                    "Approval decision lost a race: {}",
                    msg
                );
                Err(AppError::Conflict(msg))
            }
            Err(e) => Err(e),
        }
    }
}

impl DecisionOutcome {
    pub fn audit_action(&self) -> &'static str {
        match self.decision.kind {
            DecisionKind::Approve => "access_request.approve",
            DecisionKind::Reject => "access_request.reject",
        }
    }
}
