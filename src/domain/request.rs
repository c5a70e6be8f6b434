//! Access request domain model

use super::common::{impl_mysql_string_enum, StringUuid};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Aggregate status of an access request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
    /// Reserved; no operation produces it
    Cancelled,
}

impl RequestStatus {
    /// No manager can act on a request in a terminal state.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RequestStatus::Pending)
    }
}

impl std::str::FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(RequestStatus::Pending),
            "approved" => Ok(RequestStatus::Approved),
            "rejected" => Ok(RequestStatus::Rejected),
            "cancelled" => Ok(RequestStatus::Cancelled),
            _ => Err(format!("Unknown request status: {}", s)),
        }
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestStatus::Pending => write!(f, "pending"),
            RequestStatus::Approved => write!(f, "approved"),
            RequestStatus::Rejected => write!(f, "rejected"),
            RequestStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl_mysql_string_enum!(RequestStatus);

/// One user's request for access to one application
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct AccessRequest {
    pub id: StringUuid,
    pub requester_id: StringUuid,
    pub requester_name: String,
    pub requester_email: String,
    pub application_id: StringUuid,
    /// Name at creation time; later renames don't touch it
    pub application_name: String,
    pub status: RequestStatus,
    pub current_level: i32,
    pub total_levels: i32,
    pub justification: String,
    pub requested_access: Option<String>,
    pub requested_duration: Option<String>,
    pub rejection_reason: Option<String>,
    pub decided_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for AccessRequest {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: StringUuid::new_v4(),
            requester_id: StringUuid::new_v4(),
            requester_name: String::new(),
            requester_email: String::new(),
            application_id: StringUuid::new_v4(),
            application_name: String::new(),
            status: RequestStatus::Pending,
            current_level: 1,
            total_levels: 1,
            justification: String::new(),
            requested_access: None,
            requested_duration: None,
            rejection_reason: None,
            decided_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// The person filing a request, as reported by the authentication provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requester {
    pub id: StringUuid,
    pub name: String,
    pub email: String,
}

/// Input for filing a request
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateAccessRequestInput {
    pub application_id: StringUuid,
    #[validate(length(min = 1, max = 2000))]
    pub justification: String,
    #[validate(length(max = 255))]
    pub requested_access: Option<String>,
    #[validate(length(max = 255))]
    pub requested_duration: Option<String>,
}

/// Input for approving the caller's level
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct ApproveInput {
    #[validate(length(max = 2000))]
    pub comments: Option<String>,
}

/// Input for rejecting a request; the reason is mandatory
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct RejectInput {
    #[validate(length(max = 2000))]
    pub reason: String,
}

/// Request listing filters. Unset fields don't constrain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestFilter {
    pub requester_id: Option<StringUuid>,
    /// Requests where this manager holds an entry
    pub manager_id: Option<StringUuid>,
    /// With `manager_id`: only requests waiting on that manager's level now
    pub actionable_only: bool,
    pub status: Option<RequestStatus>,
}

impl RequestFilter {
    pub fn mine(requester_id: StringUuid, status: Option<RequestStatus>) -> Self {
        Self {
            requester_id: Some(requester_id),
            status,
            ..Default::default()
        }
    }

    pub fn queue(manager_id: StringUuid, actionable_only: bool) -> Self {
        Self {
            manager_id: Some(manager_id),
            actionable_only,
            ..Default::default()
        }
    }
}
