//! Sequential approval engine.
//!
//! Every eligibility check and state transition for a request lives here.
//! Functions are pure: they read a [`RequestWorkflow`] snapshot and either
//! describe a transition as a [`Decision`] or fail without side effects.
//! Persisting a decision is the repository's job; [`apply_decision`] is the
//! in-memory equivalent.

use crate::config::WorkflowConfig;
use crate::domain::{
    AccessRequest, Application, ApprovalWorkflowEntry, AssignedManager, CreateAccessRequestInput,
    Decision, DecisionKind, EntryDisplayStatus, EntryStatus, EntryView, LevelingMode,
    RequestDetail, RequestStatus, RequestWorkflow, Requester, StringUuid,
};
use crate::error::{AppError, Result};
use chrono::{DateTime, Utc};

/// Depth of the fixed chain used by leveling applications
pub const LEVELING_LEVELS: i32 = 3;

/// Managers that will approve a request for `app`, level 1 first.
pub fn plan_approvers(app: &Application, config: &WorkflowConfig) -> Vec<AssignedManager> {
    match app.leveling {
        LevelingMode::Leveling => config.leveling_chain.clone(),
        LevelingMode::NoLeveling if app.managers.is_empty() => {
            vec![config.default_reviewer.clone()]
        }
        LevelingMode::NoLeveling => app.managers.clone(),
    }
}

/// Build a fresh pending request and its entries.
///
/// Fails with `Validation` when the application is inactive.
pub fn new_request(
    requester: &Requester,
    app: &Application,
    input: &CreateAccessRequestInput,
    config: &WorkflowConfig,
    now: DateTime<Utc>,
) -> Result<RequestWorkflow> {
    if !app.active {
        return Err(AppError::Validation(format!(
            "Application '{}' is not accepting requests",
            app.name
        )));
    }

    let approvers = plan_approvers(app, config);
    if approvers.is_empty() {
        return Err(AppError::Validation(
            "No approvers configured for this application".to_string(),
        ));
    }

    let request_id = StringUuid::new_v4();
    let entries: Vec<ApprovalWorkflowEntry> = approvers
        .into_iter()
        .enumerate()
        .map(|(idx, manager)| ApprovalWorkflowEntry {
            id: StringUuid::new_v4(),
            request_id,
            level: idx as i32 + 1,
            manager_id: manager.id,
            manager_name: manager.name,
            status: EntryStatus::Pending,
            comments: None,
            approved_at: None,
            rejected_at: None,
        })
        .collect();

    let request = AccessRequest {
        id: request_id,
        requester_id: requester.id,
        requester_name: requester.name.clone(),
        requester_email: requester.email.clone(),
        application_id: app.id,
        application_name: app.name.clone(),
        status: RequestStatus::Pending,
        current_level: 1,
        total_levels: entries.len() as i32,
        justification: input.justification.trim().to_string(),
        requested_access: non_blank(input.requested_access.as_deref()),
        requested_duration: non_blank(input.requested_duration.as_deref()),
        rejection_reason: None,
        decided_at: None,
        created_at: now,
        updated_at: now,
    };

    Ok(RequestWorkflow::new(request, entries))
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// The entry a manager acts through: theirs at `current_level` if any,
/// otherwise their lowest pending entry, otherwise their lowest entry.
pub fn acting_entry(wf: &RequestWorkflow, manager_id: StringUuid) -> Option<&ApprovalWorkflowEntry> {
    let current = wf.request.current_level;
    let own = || wf.entries.iter().filter(move |e| e.manager_id == manager_id);

    own()
        .find(|e| e.level == current)
        .or_else(|| {
            own()
                .filter(|e| e.status == EntryStatus::Pending)
                .min_by_key(|e| e.level)
        })
        .or_else(|| own().min_by_key(|e| e.level))
}

/// Whether `manager_id` may approve or reject the request right now.
pub fn can_act(wf: &RequestWorkflow, manager_id: StringUuid) -> bool {
    if wf.request.status.is_terminal() {
        return false;
    }

    let Some(entry) = acting_entry(wf, manager_id) else {
        return false;
    };
    if entry.status != EntryStatus::Pending {
        return false;
    }

    if wf.request.total_levels == 1 {
        return true;
    }

    let lower_levels_approved = wf
        .entries
        .iter()
        .filter(|e| e.level < entry.level)
        .all(|e| e.status == EntryStatus::Approved);

    lower_levels_approved && entry.level == wf.request.current_level
}

fn ensure_turn(
    wf: &RequestWorkflow,
    manager_id: StringUuid,
    kind: DecisionKind,
) -> Result<&ApprovalWorkflowEntry> {
    let not_your_turn = || AppError::NotYourTurn {
        request_id: wf.request.id.0,
        action: kind.as_str(),
        current_level: wf.request.current_level,
        acting_level: acting_entry(wf, manager_id).map(|e| e.level),
    };

    if !can_act(wf, manager_id) {
        return Err(not_your_turn());
    }
    acting_entry(wf, manager_id).ok_or_else(not_your_turn)
}

/// Approve the acting manager's level.
///
/// The last level approves the request; any other level advances
/// `current_level` by one.
pub fn approve(
    wf: &RequestWorkflow,
    manager_id: StringUuid,
    comments: Option<String>,
    now: DateTime<Utc>,
) -> Result<Decision> {
    let entry = ensure_turn(wf, manager_id, DecisionKind::Approve)?;
    let is_last = entry.level >= wf.request.total_levels;

    Ok(Decision {
        kind: DecisionKind::Approve,
        request_id: wf.request.id,
        entry_id: entry.id,
        manager_id,
        level: entry.level,
        expected_level: wf.request.current_level,
        comments: non_blank(comments.as_deref()),
        decided_at: now,
        next_status: if is_last {
            RequestStatus::Approved
        } else {
            RequestStatus::Pending
        },
        next_level: if is_last {
            wf.request.current_level
        } else {
            wf.request.current_level + 1
        },
        rejection_reason: None,
        skipped_entry_ids: Vec::new(),
    })
}

/// Reject the request at the acting manager's level.
///
/// `current_level` is kept; every other pending entry becomes skipped.
pub fn reject(
    wf: &RequestWorkflow,
    manager_id: StringUuid,
    reason: &str,
    now: DateTime<Utc>,
) -> Result<Decision> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(AppError::Validation(
            "A rejection reason is required".to_string(),
        ));
    }

    let entry = ensure_turn(wf, manager_id, DecisionKind::Reject)?;
    let skipped_entry_ids = wf
        .entries
        .iter()
        .filter(|e| e.id != entry.id && e.status == EntryStatus::Pending)
        .map(|e| e.id)
        .collect();

    Ok(Decision {
        kind: DecisionKind::Reject,
        request_id: wf.request.id,
        entry_id: entry.id,
        manager_id,
        level: entry.level,
        expected_level: wf.request.current_level,
        comments: Some(reason.to_string()),
        decided_at: now,
        next_status: RequestStatus::Rejected,
        next_level: wf.request.current_level,
        rejection_reason: Some(reason.to_string()),
        skipped_entry_ids,
    })
}

/// Apply a decision to an in-memory snapshot.
///
/// Runs the same guards the database applies; a stale decision fails with
/// `Conflict` and leaves `wf` untouched.
pub fn apply_decision(wf: &mut RequestWorkflow, decision: &Decision) -> Result<()> {
    if wf.request.id != decision.request_id {
        return Err(AppError::Conflict(format!(
            "Decision for request {} applied to {}",
            decision.request_id, wf.request.id
        )));
    }
    if wf.request.status != RequestStatus::Pending
        || wf.request.current_level != decision.expected_level
    {
        return Err(AppError::Conflict(format!(
            "Request {} changed while the decision was being made",
            decision.request_id
        )));
    }
    let entry_pending = wf
        .entries
        .iter()
        .any(|e| e.id == decision.entry_id && e.status == EntryStatus::Pending);
    if !entry_pending {
        return Err(AppError::Conflict(format!(
            "Approval entry {} was already decided",
            decision.entry_id
        )));
    }

    for entry in wf.entries.iter_mut() {
        if entry.id == decision.entry_id {
            entry.comments = decision.comments.clone();
            match decision.kind {
                DecisionKind::Approve => {
                    entry.status = EntryStatus::Approved;
                    entry.approved_at = Some(decision.decided_at);
                }
                DecisionKind::Reject => {
                    entry.status = EntryStatus::Rejected;
                    entry.rejected_at = Some(decision.decided_at);
                }
            }
        } else if decision.skipped_entry_ids.contains(&entry.id)
            && entry.status == EntryStatus::Pending
        {
            entry.status = EntryStatus::Skipped;
        }
    }

    let request = &mut wf.request;
    request.status = decision.next_status;
    request.current_level = decision.next_level;
    request.updated_at = decision.decided_at;
    if decision.next_status.is_terminal() {
        request.decided_at = Some(decision.decided_at);
    }
    if decision.rejection_reason.is_some() {
        request.rejection_reason = decision.rejection_reason.clone();
    }

    Ok(())
}

/// What the UI shows for one entry. Never persisted.
pub fn derive_display_status(
    entry: &ApprovalWorkflowEntry,
    current_level: i32,
    request_status: RequestStatus,
) -> EntryDisplayStatus {
    if request_status.is_terminal() || entry.status.is_decided() {
        return entry.status.into();
    }

    match entry.level.cmp(&current_level) {
        std::cmp::Ordering::Equal => EntryDisplayStatus::AwaitingThisLevel,
        std::cmp::Ordering::Greater => EntryDisplayStatus::Future,
        std::cmp::Ordering::Less => EntryDisplayStatus::Pending,
    }
}

/// Render a snapshot for one viewer.
pub fn render(wf: RequestWorkflow, viewer_id: StringUuid) -> RequestDetail {
    let can_act = can_act(&wf, viewer_id);
    let acting_level = acting_entry(&wf, viewer_id).map(|e| e.level);
    let RequestWorkflow { request, entries } = wf;

    let entries = entries
        .into_iter()
        .map(|entry| {
            let display_status =
                derive_display_status(&entry, request.current_level, request.status);
            EntryView {
                entry,
                display_status,
            }
        })
        .collect();

    RequestDetail {
        request,
        entries,
        can_act,
        acting_level,
    }
}
