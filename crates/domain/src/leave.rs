//! Leave requests and their sequential approval chain.
//!
//! Only the active phase of a chain owns an [`Approval`] row. The next phase's
//! row is created when the previous phase approves, so a request never has more
//! than one pending step. The resolved chain itself is kept on the request as
//! [`ChainSlot`]s with contiguous phases `1..=N`.

use chrono::{DateTime, Utc};
use peoplehub_core::{AppError, AppResult, NonEmptyString, UserId};
use serde::{Deserialize, Serialize};

use crate::{EntitlementId, LeaveDateRange};

uuid_identifier!(
    /// Unique identifier for a leave request.
    LeaveRequestId
);

uuid_identifier!(
    /// Unique identifier for one approval step.
    ApprovalId
);

/// Overall status of a leave request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaveStatus {
    /// Awaiting decisions.
    Pending,
    /// Every phase approved.
    Approved,
    /// One phase rejected.
    Rejected,
}

impl LeaveStatus {
    /// Returns stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Parses storage value.
    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(AppError::Validation(format!(
                "unknown leave status '{value}'"
            ))),
        }
    }

    /// Returns true once no further transition is possible.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Status of one approval step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    /// Waiting for the approver.
    Pending,
    /// Approved by an authorized approver.
    Approved,
    /// Rejected by an authorized approver.
    Rejected,
}

impl ApprovalStatus {
    /// Returns stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Parses storage value.
    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(AppError::Validation(format!(
                "unknown approval status '{value}'"
            ))),
        }
    }
}

/// One position in a resolved approval chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainSlot {
    /// 1-based phase.
    pub phase: i32,
    /// User expected to action the phase.
    pub approver_id: UserId,
}

/// Ordered, non-empty list of approvers with dense phases starting at 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ChainSlot>", into = "Vec<ChainSlot>")]
pub struct ApprovalChain {
    slots: Vec<ChainSlot>,
}

impl ApprovalChain {
    /// Assigns phases to approvers in resolution order.
    ///
    /// The requester never gets a slot and a user listed twice keeps only the
    /// first position. Fails with `NotFound` when nobody is left.
    pub fn from_ordered_approvers(
        requester_id: UserId,
        approvers: impl IntoIterator<Item = UserId>,
    ) -> AppResult<Self> {
        let mut slots: Vec<ChainSlot> = Vec::new();

        for approver_id in approvers {
            if approver_id == requester_id
                || slots.iter().any(|slot| slot.approver_id == approver_id)
            {
                continue;
            }

            let phase = i32::try_from(slots.len() + 1).map_err(|error| {
                AppError::Validation(format!("approval chain is too long: {error}"))
            })?;
            slots.push(ChainSlot { phase, approver_id });
        }

        if slots.is_empty() {
            return Err(AppError::NotFound(format!(
                "no eligible approvers found for user '{requester_id}'"
            )));
        }

        Ok(Self { slots })
    }

    /// Rebuilds a chain from storage, checking that phases are `1..=N`.
    pub fn from_slots(mut slots: Vec<ChainSlot>) -> AppResult<Self> {
        slots.sort_by_key(|slot| slot.phase);

        if slots.is_empty() {
            return Err(AppError::Validation(
                "approval chain must contain at least one slot".to_owned(),
            ));
        }

        for (index, slot) in slots.iter().enumerate() {
            let expected = i32::try_from(index + 1).map_err(|error| {
                AppError::Validation(format!("approval chain is too long: {error}"))
            })?;
            if slot.phase != expected {
                return Err(AppError::Validation(format!(
                    "approval chain phases must be contiguous, expected phase {expected} but found {}",
                    slot.phase
                )));
            }
        }

        Ok(Self { slots })
    }

    /// Returns the slots ordered by phase.
    #[must_use]
    pub fn slots(&self) -> &[ChainSlot] {
        &self.slots
    }

    /// Returns the number of phases.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true when the chain has no slots, which constructors rule out.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Returns the slot for a phase.
    #[must_use]
    pub fn slot(&self, phase: i32) -> Option<ChainSlot> {
        self.slots.iter().copied().find(|slot| slot.phase == phase)
    }

    /// Returns the phase-1 slot. Chains are never empty.
    #[must_use]
    pub fn first(&self) -> ChainSlot {
        self.slots[0]
    }

    /// Returns the slot following `phase`, if any.
    #[must_use]
    pub fn next_after(&self, phase: i32) -> Option<ChainSlot> {
        phase.checked_add(1).and_then(|next| self.slot(next))
    }
}

impl TryFrom<Vec<ChainSlot>> for ApprovalChain {
    type Error = AppError;

    fn try_from(slots: Vec<ChainSlot>) -> AppResult<Self> {
        Self::from_slots(slots)
    }
}

impl From<ApprovalChain> for Vec<ChainSlot> {
    fn from(chain: ApprovalChain) -> Self {
        chain.slots
    }
}

/// Validated leave request details before any approval exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLeaveRequest {
    id: LeaveRequestId,
    user_id: UserId,
    leave_type_id: EntitlementId,
    doa_id: Option<UserId>,
    reason: NonEmptyString,
    date_range: LeaveDateRange,
    duration_days: i64,
    uploads: Vec<String>,
}

impl NewLeaveRequest {
    /// Validates request details and computes the business-day duration.
    pub fn new(
        user_id: UserId,
        leave_type_id: EntitlementId,
        doa_id: Option<UserId>,
        reason: impl Into<String>,
        date_range: LeaveDateRange,
        uploads: Vec<String>,
    ) -> AppResult<Self> {
        let reason = NonEmptyString::new(reason)
            .map_err(|_| AppError::Validation("leave reason must not be empty".to_owned()))?;

        if doa_id == Some(user_id) {
            return Err(AppError::Validation(
                "a requester cannot delegate their authority to themselves".to_owned(),
            ));
        }

        let duration_days = date_range.business_days();
        if duration_days == 0 {
            return Err(AppError::Validation(format!(
                "leave from {} to {} contains no business days",
                date_range.start_date(),
                date_range.end_date()
            )));
        }

        let uploads = uploads
            .into_iter()
            .map(|upload| upload.trim().to_owned())
            .filter(|upload| !upload.is_empty())
            .collect();

        Ok(Self {
            id: LeaveRequestId::new(),
            user_id,
            leave_type_id,
            doa_id,
            reason,
            date_range,
            duration_days,
            uploads,
        })
    }

    /// Rebuilds request details from storage.
    #[allow(clippy::too_many_arguments)]
    pub fn from_storage(
        id: LeaveRequestId,
        user_id: UserId,
        leave_type_id: EntitlementId,
        doa_id: Option<UserId>,
        reason: impl Into<String>,
        date_range: LeaveDateRange,
        duration_days: i64,
        uploads: Vec<String>,
    ) -> AppResult<Self> {
        Ok(Self {
            id,
            user_id,
            leave_type_id,
            doa_id,
            reason: NonEmptyString::new(reason)?,
            date_range,
            duration_days,
            uploads,
        })
    }

    /// Returns the request identifier.
    #[must_use]
    pub fn id(&self) -> LeaveRequestId {
        self.id
    }

    /// Returns the requester.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns the leave type.
    #[must_use]
    pub fn leave_type_id(&self) -> EntitlementId {
        self.leave_type_id
    }

    /// Returns the business-day duration.
    #[must_use]
    pub fn duration_days(&self) -> i64 {
        self.duration_days
    }

    /// Returns the requested range.
    #[must_use]
    pub fn date_range(&self) -> LeaveDateRange {
        self.date_range
    }
}

/// Leave request workflow subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveRequest {
    details: NewLeaveRequest,
    status: LeaveStatus,
    current_approval_id: Option<ApprovalId>,
    approval_chain: ApprovalChain,
    created_at: DateTime<Utc>,
}

impl LeaveRequest {
    /// Submits a request against a resolved chain and opens its phase-1 step.
    #[must_use]
    pub fn submit(
        details: NewLeaveRequest,
        approval_chain: ApprovalChain,
        now: DateTime<Utc>,
    ) -> (Self, Approval) {
        let first_approval = Approval::open(details.id, approval_chain.first(), now);

        let request = Self {
            details,
            status: LeaveStatus::Pending,
            current_approval_id: Some(first_approval.id()),
            approval_chain,
            created_at: now,
        };

        (request, first_approval)
    }

    /// Rebuilds a request from storage.
    pub fn from_storage(
        details: NewLeaveRequest,
        status: LeaveStatus,
        current_approval_id: Option<ApprovalId>,
        approval_chain: ApprovalChain,
        created_at: DateTime<Utc>,
    ) -> AppResult<Self> {
        if status.is_terminal() && current_approval_id.is_some() {
            return Err(AppError::Validation(format!(
                "leave request '{}' is {} but still references an active approval",
                details.id,
                status.as_str()
            )));
        }

        Ok(Self {
            details,
            status,
            current_approval_id,
            approval_chain,
            created_at,
        })
    }

    /// Returns the request identifier.
    #[must_use]
    pub fn id(&self) -> LeaveRequestId {
        self.details.id
    }

    /// Returns the requester.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.details.user_id
    }

    /// Returns the leave type.
    #[must_use]
    pub fn leave_type_id(&self) -> EntitlementId {
        self.details.leave_type_id
    }

    /// Returns the delegate of authority while the requester is away.
    #[must_use]
    pub fn doa_id(&self) -> Option<UserId> {
        self.details.doa_id
    }

    /// Returns the free-text reason.
    #[must_use]
    pub fn reason(&self) -> &str {
        self.details.reason.as_str()
    }

    /// Returns the requested range.
    #[must_use]
    pub fn date_range(&self) -> LeaveDateRange {
        self.details.date_range
    }

    /// Returns the business-day duration.
    #[must_use]
    pub fn duration_days(&self) -> i64 {
        self.details.duration_days
    }

    /// Returns upload references attached at creation.
    #[must_use]
    pub fn uploads(&self) -> &[String] {
        &self.details.uploads
    }

    /// Returns the overall status.
    #[must_use]
    pub fn status(&self) -> LeaveStatus {
        self.status
    }

    /// Returns the active step, `None` once terminal.
    #[must_use]
    pub fn current_approval_id(&self) -> Option<ApprovalId> {
        self.current_approval_id
    }

    /// Returns the resolved chain.
    #[must_use]
    pub fn approval_chain(&self) -> &ApprovalChain {
        &self.approval_chain
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Fails unless `approval` is the pending step this request is waiting on.
    pub fn ensure_actionable(&self, approval: &Approval) -> AppResult<()> {
        if approval.leave_request_id() != self.id() {
            return Err(AppError::Validation(format!(
                "approval '{}' does not belong to leave request '{}'",
                approval.id(),
                self.id()
            )));
        }

        if self.status.is_terminal()
            || approval.status() != ApprovalStatus::Pending
            || self.current_approval_id != Some(approval.id())
        {
            return Err(AppError::Validation(format!(
                "approval '{}' has already been processed",
                approval.id()
            )));
        }

        Ok(())
    }

    /// Moves past an approved step.
    ///
    /// Returns the newly opened step, or `None` when the approved step was the
    /// last phase and the whole request is now approved.
    pub fn advance_after(
        &mut self,
        approved: &Approval,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Approval>> {
        if approved.status() != ApprovalStatus::Approved
            || self.current_approval_id != Some(approved.id())
        {
            return Err(AppError::Validation(format!(
                "approval '{}' is not the approved active step of leave request '{}'",
                approved.id(),
                self.id()
            )));
        }

        match self.approval_chain.next_after(approved.phase()) {
            Some(slot) => {
                let next = Approval::open(self.id(), slot, now);
                self.current_approval_id = Some(next.id());
                Ok(Some(next))
            }
            None => {
                self.status = LeaveStatus::Approved;
                self.current_approval_id = None;
                Ok(None)
            }
        }
    }

    /// Terminates the request after a rejected step. Later phases never open.
    pub fn close_rejected(&mut self, rejected: &Approval) -> AppResult<()> {
        if rejected.status() != ApprovalStatus::Rejected
            || self.current_approval_id != Some(rejected.id())
        {
            return Err(AppError::Validation(format!(
                "approval '{}' is not the rejected active step of leave request '{}'",
                rejected.id(),
                self.id()
            )));
        }

        self.status = LeaveStatus::Rejected;
        self.current_approval_id = None;
        Ok(())
    }
}

/// One step of a leave request's approval chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approval {
    id: ApprovalId,
    leave_request_id: LeaveRequestId,
    phase: i32,
    approver_id: UserId,
    status: ApprovalStatus,
    note: Option<String>,
    action_date: Option<DateTime<Utc>>,
    acted_by: Option<UserId>,
    created_at: DateTime<Utc>,
}

impl Approval {
    fn open(leave_request_id: LeaveRequestId, slot: ChainSlot, now: DateTime<Utc>) -> Self {
        Self {
            id: ApprovalId::new(),
            leave_request_id,
            phase: slot.phase,
            approver_id: slot.approver_id,
            status: ApprovalStatus::Pending,
            note: None,
            action_date: None,
            acted_by: None,
            created_at: now,
        }
    }

    /// Rebuilds a step from storage.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn from_storage(
        id: ApprovalId,
        leave_request_id: LeaveRequestId,
        phase: i32,
        approver_id: UserId,
        status: ApprovalStatus,
        note: Option<String>,
        action_date: Option<DateTime<Utc>>,
        acted_by: Option<UserId>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            leave_request_id,
            phase,
            approver_id,
            status,
            note,
            action_date,
            acted_by,
            created_at,
        }
    }

    /// Returns the step identifier.
    #[must_use]
    pub fn id(&self) -> ApprovalId {
        self.id
    }

    /// Returns the parent request.
    #[must_use]
    pub fn leave_request_id(&self) -> LeaveRequestId {
        self.leave_request_id
    }

    /// Returns the 1-based phase.
    #[must_use]
    pub fn phase(&self) -> i32 {
        self.phase
    }

    /// Returns the approver the chain assigned to this phase.
    #[must_use]
    pub fn approver_id(&self) -> UserId {
        self.approver_id
    }

    /// Returns the step status.
    #[must_use]
    pub fn status(&self) -> ApprovalStatus {
        self.status
    }

    /// Returns the decision note.
    #[must_use]
    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    /// Returns when the step was actioned.
    #[must_use]
    pub fn action_date(&self) -> Option<DateTime<Utc>> {
        self.action_date
    }

    /// Returns who actioned the step.
    #[must_use]
    pub fn acted_by(&self) -> Option<UserId> {
        self.acted_by
    }

    /// Returns when the step was opened.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Records an approval decision.
    pub fn approve(
        &mut self,
        actor_id: UserId,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        self.decide(ApprovalStatus::Approved, actor_id, note, now)
    }

    /// Records a rejection decision.
    pub fn reject(
        &mut self,
        actor_id: UserId,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        self.decide(ApprovalStatus::Rejected, actor_id, note, now)
    }

    fn decide(
        &mut self,
        status: ApprovalStatus,
        actor_id: UserId,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        if self.status != ApprovalStatus::Pending {
            return Err(AppError::Validation(format!(
                "approval '{}' has already been processed",
                self.id
            )));
        }

        self.status = status;
        self.note = note
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty());
        self.action_date = Some(now);
        self.acted_by = Some(actor_id);
        Ok(())
    }
}
