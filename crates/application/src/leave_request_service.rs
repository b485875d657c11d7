use std::sync::Arc;

use chrono::NaiveDate;
use peoplehub_core::{Actor, AppError, AppResult, UserId};
use peoplehub_domain::{
    Approval, ApprovalStatus, EntitlementId, LeaveDateRange, LeaveRequest, LeaveRequestId,
    LeaveStatus, NewLeaveRequest,
};
use tracing::info;

use crate::{
    ApprovalFlowService, ApproverService, BalanceService, EntitlementService, LeaveRepository,
    LeaveRequestQuery,
};

/// Leave request creation payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateLeaveRequestInput {
    /// Entitlement used as leave type.
    pub leave_type_id: EntitlementId,
    /// Delegate of authority during the absence.
    pub doa_id: Option<UserId>,
    /// Free-text reason.
    pub reason: String,
    /// First day of leave.
    pub start_date: NaiveDate,
    /// Last day of leave, inclusive.
    pub end_date: NaiveDate,
    /// Opaque upload references.
    pub uploads: Vec<String>,
}

/// Newly created request with its phase-1 step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedLeaveRequest {
    /// Persisted request.
    pub leave_request: LeaveRequest,
    /// Active phase-1 step.
    pub approval: Approval,
}

/// A request together with its approval steps ordered by phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveRequestDetails {
    /// Request.
    pub leave_request: LeaveRequest,
    /// Steps opened so far.
    pub approvals: Vec<Approval>,
}

/// Optional filters when listing the actor's own requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LeaveRequestFilter {
    /// Status filter.
    pub status: Option<LeaveStatus>,
    /// Leave type filter.
    pub leave_type_id: Option<EntitlementId>,
}

/// Entry point for employees submitting and managing leave.
#[derive(Clone)]
pub struct LeaveRequestService {
    entitlement_service: EntitlementService,
    balance_service: BalanceService,
    approver_service: ApproverService,
    approval_flow: ApprovalFlowService,
    leave_repository: Arc<dyn LeaveRepository>,
}

impl LeaveRequestService {
    /// Creates a leave request service.
    #[must_use]
    pub fn new(
        entitlement_service: EntitlementService,
        balance_service: BalanceService,
        approver_service: ApproverService,
        approval_flow: ApprovalFlowService,
        leave_repository: Arc<dyn LeaveRepository>,
    ) -> Self {
        Self {
            entitlement_service,
            balance_service,
            approver_service,
            approval_flow,
            leave_repository,
        }
    }

    /// Validates and persists a request, then opens its approval chain.
    pub async fn create_leave_request(
        &self,
        actor: &Actor,
        input: CreateLeaveRequestInput,
    ) -> AppResult<CreatedLeaveRequest> {
        let requester_id = actor.user_id();
        let allowance = self
            .entitlement_service
            .find_leave_allowance(requester_id, input.leave_type_id)
            .await?;

        let date_range = LeaveDateRange::new(input.start_date, input.end_date)?;
        let details = NewLeaveRequest::new(
            requester_id,
            input.leave_type_id,
            input.doa_id,
            input.reason,
            date_range,
            input.uploads,
        )?;

        let mut transaction = self.leave_repository.begin().await?;
        transaction.lock_requester(requester_id).await?;

        let balance = self
            .balance_service
            .balance_in(
                &mut *transaction,
                allowance,
                requester_id,
                details.date_range().start_date(),
            )
            .await?;
        if details.duration_days() > balance.available_days() {
            return Err(AppError::Validation(format!(
                "requested {} {} of '{}' but only {} remain",
                details.duration_days(),
                balance.unit,
                balance.entitlement.name,
                balance.available_days()
            )));
        }

        let (leave_request, approval) = self
            .approval_flow
            .initialize_approval_flow(&mut *transaction, details)
            .await?;
        transaction.commit().await?;

        info!(
            leave_request_id = %leave_request.id(),
            user_id = %requester_id,
            duration_days = leave_request.duration_days(),
            "leave request created"
        );

        self.approval_flow
            .publish_requested(&leave_request, &approval)
            .await;

        Ok(CreatedLeaveRequest {
            leave_request,
            approval,
        })
    }

    /// Withdraws a request nobody has acted on yet.
    pub async fn delete_leave_request(
        &self,
        actor: &Actor,
        leave_request_id: LeaveRequestId,
    ) -> AppResult<()> {
        let mut transaction = self.leave_repository.begin().await?;
        let request = transaction
            .lock_leave_request(leave_request_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("leave request '{leave_request_id}' does not exist"))
            })?;

        if request.user_id() != actor.user_id() {
            return Err(AppError::Forbidden(format!(
                "user '{}' may not delete leave request '{leave_request_id}'",
                actor.user_id()
            )));
        }

        let untouched = match request.current_approval_id() {
            Some(approval_id) if request.status() == LeaveStatus::Pending => transaction
                .find_approval(approval_id)
                .await?
                .is_some_and(|approval| {
                    approval.phase() == 1 && approval.status() == ApprovalStatus::Pending
                }),
            _ => false,
        };
        if !untouched {
            return Err(AppError::Validation(format!(
                "leave request '{leave_request_id}' has already been processed"
            )));
        }

        transaction.delete_leave_request(leave_request_id).await?;
        transaction.commit().await?;

        info!(leave_request_id = %leave_request_id, "leave request deleted");
        Ok(())
    }

    /// Returns a request with its steps when the actor owns it or may approve it.
    pub async fn find_leave_request(
        &self,
        actor: &Actor,
        leave_request_id: LeaveRequestId,
    ) -> AppResult<LeaveRequestDetails> {
        let leave_request = self
            .leave_repository
            .find_leave_request(leave_request_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("leave request '{leave_request_id}' does not exist"))
            })?;

        let owner_id = leave_request.user_id();
        if owner_id != actor.user_id()
            && !self
                .approver_service
                .can_user_approve(actor.user_id(), owner_id)
                .await?
        {
            return Err(AppError::Forbidden(format!(
                "user '{}' may not view leave request '{leave_request_id}'",
                actor.user_id()
            )));
        }

        let approvals = self.leave_repository.list_approvals(leave_request_id).await?;
        Ok(LeaveRequestDetails {
            leave_request,
            approvals,
        })
    }

    /// Lists the actor's own requests, newest start date first.
    pub async fn list_leave_requests(
        &self,
        actor: &Actor,
        filter: LeaveRequestFilter,
    ) -> AppResult<Vec<LeaveRequest>> {
        self.leave_repository
            .list_leave_requests(LeaveRequestQuery {
                status: filter.status,
                leave_type_id: filter.leave_type_id,
                ..LeaveRequestQuery::for_user(actor.user_id())
            })
            .await
    }
}
