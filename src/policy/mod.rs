//! Centralized authorization policy for HTTP handlers.
//!
//! Role checks only. Whether a manager may decide on a particular request is
//! the workflow engine's call, not this module's.

use crate::domain::{Role, StringUuid};
use crate::error::AppError;
use crate::middleware::auth::AuthUser;

pub type PolicyResult<T> = std::result::Result<T, AppError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyAction {
    CatalogRead,
    CatalogWrite,
    /// Include soft-deleted applications in listings
    CatalogReadInactive,
    RequestCreate,
    RequestReadAll,
    RequestDelete,
    ApprovalQueueRead,
    ApprovalDecide,
    AuditRead,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceScope {
    Global,
    /// Resource owned by this principal
    User(StringUuid),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyInput {
    pub action: PolicyAction,
    pub scope: ResourceScope,
}

impl PolicyInput {
    pub fn global(action: PolicyAction) -> Self {
        Self {
            action,
            scope: ResourceScope::Global,
        }
    }
}

pub fn enforce(auth: &AuthUser, input: &PolicyInput) -> PolicyResult<()> {
    match input.action {
        PolicyAction::CatalogRead | PolicyAction::RequestCreate => Ok(()),
        PolicyAction::CatalogWrite
        | PolicyAction::CatalogReadInactive
        | PolicyAction::RequestReadAll
        | PolicyAction::AuditRead => require_role(auth, &[Role::ItAdmin]),
        PolicyAction::ApprovalQueueRead | PolicyAction::ApprovalDecide => require_reviewer(auth),
        PolicyAction::RequestDelete => require_owner(auth, &input.scope),
    }
}

fn require_role(auth: &AuthUser, allowed: &[Role]) -> PolicyResult<()> {
    if allowed.contains(&auth.role) {
        return Ok(());
    }
    Err(AppError::Forbidden(format!(
        "Role '{}' is not allowed to perform this action",
        auth.role
    )))
}

fn require_reviewer(auth: &AuthUser) -> PolicyResult<()> {
    if auth.role.can_review() {
        return Ok(());
    }
    Err(AppError::Forbidden(format!(
        "Role '{}' cannot review access requests",
        auth.role
    )))
}

fn require_owner(auth: &AuthUser, scope: &ResourceScope) -> PolicyResult<()> {
    match scope {
        ResourceScope::User(owner) if *owner == auth.user_id => Ok(()),
        ResourceScope::User(_) => Err(AppError::Forbidden(
            "Only the owner can perform this action".to_string(),
        )),
        ResourceScope::Global => Err(AppError::Forbidden(
            "Action requires an owned resource".to_string(),
        )),
    }
}
