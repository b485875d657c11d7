//! Domain events emitted by the approval flow for notification delivery.

use chrono::NaiveDate;
use peoplehub_core::{AppError, AppResult, UserId};
use serde::{Deserialize, Serialize};

use crate::{ApprovalId, EntitlementId, LeaveRequest, LeaveRequestId};

/// Notification kind understood by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LeaveEventKind {
    /// An approver has a step waiting.
    #[serde(rename = "leave-requested")]
    LeaveRequested,
    /// The request was approved by its final phase.
    #[serde(rename = "leave-approved")]
    LeaveApproved,
    /// The request was rejected.
    #[serde(rename = "leave-rejected")]
    LeaveRejected,
}

impl LeaveEventKind {
    /// Returns stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LeaveRequested => "leave-requested",
            Self::LeaveApproved => "leave-approved",
            Self::LeaveRejected => "leave-rejected",
        }
    }

    /// Parses storage value.
    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "leave-requested" => Ok(Self::LeaveRequested),
            "leave-approved" => Ok(Self::LeaveApproved),
            "leave-rejected" => Ok(Self::LeaveRejected),
            _ => Err(AppError::Validation(format!(
                "unknown leave event kind '{value}'"
            ))),
        }
    }
}

/// Leave details carried by every event so mail templates need no extra lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveEventLeave {
    /// Request identifier.
    pub leave_request_id: LeaveRequestId,
    /// Requester.
    pub requester_id: UserId,
    /// Leave type identifier.
    pub leave_type_id: EntitlementId,
    /// Leave type display name.
    pub leave_type_name: String,
    /// First day of leave.
    pub start_date: NaiveDate,
    /// Last day of leave.
    pub end_date: NaiveDate,
    /// Business-day duration.
    pub duration_days: i64,
    /// Requester's reason.
    pub reason: String,
}

impl LeaveEventLeave {
    /// Captures event details from a request.
    #[must_use]
    pub fn from_request(request: &LeaveRequest, leave_type_name: impl Into<String>) -> Self {
        Self {
            leave_request_id: request.id(),
            requester_id: request.user_id(),
            leave_type_id: request.leave_type_id(),
            leave_type_name: leave_type_name.into(),
            start_date: request.date_range().start_date(),
            end_date: request.date_range().end_date(),
            duration_days: request.duration_days(),
            reason: request.reason().to_owned(),
        }
    }
}

/// Phase transition published after the owning transaction commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LeaveEvent {
    /// A new request opened its first phase.
    LeaveRequested {
        /// Leave details.
        leave: LeaveEventLeave,
        /// Opened step.
        approval_id: ApprovalId,
        /// Approver of the opened step.
        approver_id: UserId,
        /// Phase of the opened step.
        phase: i32,
    },
    /// A phase approved and the next phase opened.
    NextPhaseActivated {
        /// Leave details.
        leave: LeaveEventLeave,
        /// Opened step.
        approval_id: ApprovalId,
        /// Approver of the opened step.
        approver_id: UserId,
        /// Phase of the opened step.
        phase: i32,
    },
    /// The final phase approved.
    LeaveApproved {
        /// Leave details.
        leave: LeaveEventLeave,
        /// User who approved the final phase.
        approved_by: UserId,
    },
    /// A phase rejected and the request terminated.
    LeaveRejected {
        /// Leave details.
        leave: LeaveEventLeave,
        /// User who rejected.
        rejected_by: UserId,
        /// Rejection note.
        reason: Option<String>,
    },
}

impl LeaveEvent {
    /// Returns the notification kind.
    #[must_use]
    pub fn kind(&self) -> LeaveEventKind {
        match self {
            Self::LeaveRequested { .. } | Self::NextPhaseActivated { .. } => {
                LeaveEventKind::LeaveRequested
            }
            Self::LeaveApproved { .. } => LeaveEventKind::LeaveApproved,
            Self::LeaveRejected { .. } => LeaveEventKind::LeaveRejected,
        }
    }

    /// Returns the leave details.
    #[must_use]
    pub fn leave(&self) -> &LeaveEventLeave {
        match self {
            Self::LeaveRequested { leave, .. }
            | Self::NextPhaseActivated { leave, .. }
            | Self::LeaveApproved { leave, .. }
            | Self::LeaveRejected { leave, .. } => leave,
        }
    }

    /// Returns who should be told: the next approver, or the requester once terminal.
    #[must_use]
    pub fn recipient_id(&self) -> UserId {
        match self {
            Self::LeaveRequested { approver_id, .. }
            | Self::NextPhaseActivated { approver_id, .. } => *approver_id,
            Self::LeaveApproved { leave, .. } | Self::LeaveRejected { leave, .. } => {
                leave.requester_id
            }
        }
    }
}
