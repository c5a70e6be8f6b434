//! Approval workflow entries and the views derived from them

use super::common::{impl_mysql_string_enum, StringUuid};
use super::request::{AccessRequest, RequestStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Status of one approval level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
    /// Left unreachable by a rejection at a lower level
    Skipped,
}

impl EntryStatus {
    pub fn is_decided(&self) -> bool {
        !matches!(self, EntryStatus::Pending)
    }
}

impl std::str::FromStr for EntryStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(EntryStatus::Pending),
            "approved" => Ok(EntryStatus::Approved),
            "rejected" => Ok(EntryStatus::Rejected),
            "skipped" => Ok(EntryStatus::Skipped),
            _ => Err(format!("Unknown entry status: {}", s)),
        }
    }
}

impl std::fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryStatus::Pending => write!(f, "pending"),
            EntryStatus::Approved => write!(f, "approved"),
            EntryStatus::Rejected => write!(f, "rejected"),
            EntryStatus::Skipped => write!(f, "skipped"),
        }
    }
}

impl_mysql_string_enum!(EntryStatus);

/// One (request, level) row owned by one manager
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ApprovalWorkflowEntry {
    pub id: StringUuid,
    pub request_id: StringUuid,
    pub level: i32,
    pub manager_id: StringUuid,
    pub manager_name: String,
    pub status: EntryStatus,
    pub comments: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
}

/// What the UI shows for an entry. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EntryDisplayStatus {
    Pending,
    Approved,
    Rejected,
    Skipped,
    /// "need approval"
    AwaitingThisLevel,
    /// "still waiting"
    Future,
}

impl From<EntryStatus> for EntryDisplayStatus {
    fn from(status: EntryStatus) -> Self {
        match status {
            EntryStatus::Pending => EntryDisplayStatus::Pending,
            EntryStatus::Approved => EntryDisplayStatus::Approved,
            EntryStatus::Rejected => EntryDisplayStatus::Rejected,
            EntryStatus::Skipped => EntryDisplayStatus::Skipped,
        }
    }
}

/// A request together with its entries, ordered by level
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestWorkflow {
    pub request: AccessRequest,
    pub entries: Vec<ApprovalWorkflowEntry>,
}

impl RequestWorkflow {
    pub fn new(request: AccessRequest, mut entries: Vec<ApprovalWorkflowEntry>) -> Self {
        entries.sort_by_key(|e| e.level);
        Self { request, entries }
    }

    pub fn entry_at(&self, level: i32) -> Option<&ApprovalWorkflowEntry> {
        self.entries.iter().find(|e| e.level == level)
    }
}

/// Which way a manager decided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionKind {
    Approve,
    Reject,
}

impl DecisionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionKind::Approve => "approve",
            DecisionKind::Reject => "reject",
        }
    }
}

/// One approve/reject transition, computed from a snapshot and applied
/// atomically by the repository. `expected_level` and the pending status of
/// the entry are the compare-and-set guards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub kind: DecisionKind,
    pub request_id: StringUuid,
    pub entry_id: StringUuid,
    pub manager_id: StringUuid,
    pub level: i32,
    pub expected_level: i32,
    pub comments: Option<String>,
    pub decided_at: DateTime<Utc>,
    pub next_status: RequestStatus,
    pub next_level: i32,
    pub rejection_reason: Option<String>,
    pub skipped_entry_ids: Vec<StringUuid>,
}

/// Entry plus its derived display status
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EntryView {
    #[serde(flatten)]
    pub entry: ApprovalWorkflowEntry,
    pub display_status: EntryDisplayStatus,
}

/// Request as rendered for one principal
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RequestDetail {
    #[serde(flatten)]
    pub request: AccessRequest,
    pub entries: Vec<EntryView>,
    /// Whether the viewing principal may approve or reject right now
    pub can_act: bool,
    /// Level of the viewer's own entry, if they hold one
    pub acting_level: Option<i32>,
}
