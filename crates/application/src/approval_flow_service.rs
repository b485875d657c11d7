//! Sequential multi-phase approval of leave requests.

use std::sync::Arc;

use chrono::Utc;
use peoplehub_core::{Actor, AppError, AppResult, UserId};
use peoplehub_domain::{
    Approval, ApprovalChain, ApprovalId, LeaveEvent, LeaveEventLeave, LeaveRequest,
    NewLeaveRequest,
};
use tracing::{info, warn};

use crate::{
    ApproverService, EntitlementService, LeaveEventPublisher, LeaveRepository, LeaveTransaction,
};

/// Result of a decision on one approval step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalOutcome {
    /// Request after the decision.
    pub leave_request: LeaveRequest,
    /// The step that was just decided.
    pub decided_approval: Approval,
    /// Step opened for the next phase, if any.
    pub next_approval: Option<Approval>,
    /// True once the request reached a terminal status.
    pub is_final: bool,
}

/// Drives leave requests through their approval chain.
#[derive(Clone)]
pub struct ApprovalFlowService {
    approver_service: ApproverService,
    entitlement_service: EntitlementService,
    leave_repository: Arc<dyn LeaveRepository>,
    event_publisher: Arc<dyn LeaveEventPublisher>,
}

impl ApprovalFlowService {
    /// Creates an approval flow service.
    #[must_use]
    pub fn new(
        approver_service: ApproverService,
        entitlement_service: EntitlementService,
        leave_repository: Arc<dyn LeaveRepository>,
        event_publisher: Arc<dyn LeaveEventPublisher>,
    ) -> Self {
        Self {
            approver_service,
            entitlement_service,
            leave_repository,
            event_publisher,
        }
    }

    /// Resolves the chain for a new request and persists the request with its
    /// phase-1 step inside the caller's unit of work.
    pub async fn initialize_approval_flow(
        &self,
        transaction: &mut dyn LeaveTransaction,
        details: NewLeaveRequest,
    ) -> AppResult<(LeaveRequest, Approval)> {
        let requester_id = details.user_id();
        let resolved = self.approver_service.approvers_for_user(requester_id).await?;

        let mut candidates: Vec<UserId> = Vec::with_capacity(resolved.len());
        for approver in &resolved {
            let user_id = approver.user_id();
            if user_id != requester_id && !candidates.contains(&user_id) {
                candidates.push(user_id);
            }
        }
        if candidates.is_empty() {
            return Err(AppError::NotFound(format!(
                "no approvers found for user '{requester_id}'"
            )));
        }

        let mut eligible = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if self
                .approver_service
                .can_user_approve(candidate, requester_id)
                .await?
            {
                eligible.push(candidate);
            }
        }

        let chain = ApprovalChain::from_ordered_approvers(requester_id, eligible)?;
        let (request, first_approval) = LeaveRequest::submit(details, chain, Utc::now());

        transaction.insert_leave_request(&request).await?;
        transaction.insert_approval(&first_approval).await?;

        info!(
            leave_request_id = %request.id(),
            approval_id = %first_approval.id(),
            phases = request.approval_chain().len(),
            "approval flow initialized"
        );

        Ok((request, first_approval))
    }

    /// Approves the active step and opens the next phase, or finishes the request.
    pub async fn approve_leave_request(
        &self,
        actor: &Actor,
        approval_id: ApprovalId,
        note: Option<String>,
    ) -> AppResult<ApprovalOutcome> {
        let mut transaction = self.leave_repository.begin().await?;
        let (mut request, mut approval) = self
            .lock_actionable_step(&mut *transaction, actor, approval_id)
            .await?;

        let now = Utc::now();
        approval.approve(actor.user_id(), note, now)?;
        transaction.update_approval(&approval).await?;

        let next_approval = request.advance_after(&approval, now)?;
        if let Some(next) = &next_approval {
            transaction.insert_approval(next).await?;
        }
        transaction.update_leave_request(&request).await?;
        transaction.commit().await?;

        info!(
            leave_request_id = %request.id(),
            approval_id = %approval.id(),
            phase = approval.phase(),
            acted_by = %actor.user_id(),
            status = request.status().as_str(),
            "leave approval recorded"
        );

        let leave = self.event_leave(&request).await;
        let event = match &next_approval {
            Some(next) => LeaveEvent::NextPhaseActivated {
                leave,
                approval_id: next.id(),
                approver_id: next.approver_id(),
                phase: next.phase(),
            },
            None => LeaveEvent::LeaveApproved {
                leave,
                approved_by: actor.user_id(),
            },
        };
        self.publish(event).await;

        Ok(ApprovalOutcome {
            is_final: next_approval.is_none(),
            leave_request: request,
            decided_approval: approval,
            next_approval,
        })
    }

    /// Rejects the active step, which terminates the whole request.
    pub async fn reject_leave_request(
        &self,
        actor: &Actor,
        approval_id: ApprovalId,
        note: Option<String>,
    ) -> AppResult<ApprovalOutcome> {
        let mut transaction = self.leave_repository.begin().await?;
        let (mut request, mut approval) = self
            .lock_actionable_step(&mut *transaction, actor, approval_id)
            .await?;

        approval.reject(actor.user_id(), note, Utc::now())?;
        transaction.update_approval(&approval).await?;
        request.close_rejected(&approval)?;
        transaction.update_leave_request(&request).await?;
        transaction.commit().await?;

        info!(
            leave_request_id = %request.id(),
            approval_id = %approval.id(),
            phase = approval.phase(),
            acted_by = %actor.user_id(),
            "leave rejection recorded"
        );

        let event = LeaveEvent::LeaveRejected {
            leave: self.event_leave(&request).await,
            rejected_by: actor.user_id(),
            reason: approval.note().map(str::to_owned),
        };
        self.publish(event).await;

        Ok(ApprovalOutcome {
            leave_request: request,
            decided_approval: approval,
            next_approval: None,
            is_final: true,
        })
    }

    /// Lists pending steps waiting on the actor.
    pub async fn list_pending_approvals(&self, actor: &Actor) -> AppResult<Vec<Approval>> {
        self.leave_repository
            .list_current_approvals_for_approver(actor.user_id())
            .await
    }

    /// Publishes the phase-1 notification of a freshly created request.
    pub(crate) async fn publish_requested(&self, request: &LeaveRequest, approval: &Approval) {
        let event = LeaveEvent::LeaveRequested {
            leave: self.event_leave(request).await,
            approval_id: approval.id(),
            approver_id: approval.approver_id(),
            phase: approval.phase(),
        };
        self.publish(event).await;
    }

    async fn lock_actionable_step(
        &self,
        transaction: &mut dyn LeaveTransaction,
        actor: &Actor,
        approval_id: ApprovalId,
    ) -> AppResult<(LeaveRequest, Approval)> {
        let not_found = || AppError::NotFound(format!("approval '{approval_id}' does not exist"));

        let leave_request_id = transaction
            .find_approval(approval_id)
            .await?
            .ok_or_else(not_found)?
            .leave_request_id();
        let request = transaction
            .lock_leave_request(leave_request_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("leave request '{leave_request_id}' does not exist"))
            })?;
        let approval = transaction
            .lock_approval(approval_id)
            .await?
            .ok_or_else(not_found)?;

        if !self
            .approver_service
            .can_user_approve(actor.user_id(), request.user_id())
            .await?
        {
            return Err(AppError::Forbidden(format!(
                "user '{}' may not action leave request '{}'",
                actor.user_id(),
                request.id()
            )));
        }

        request.ensure_actionable(&approval)?;
        Ok((request, approval))
    }

    async fn event_leave(&self, request: &LeaveRequest) -> LeaveEventLeave {
        let leave_type_name = match self
            .entitlement_service
            .find_leave_allowance(request.user_id(), request.leave_type_id())
            .await
        {
            Ok(allowance) => allowance.name,
            Err(error) => {
                warn!(
                    leave_request_id = %request.id(),
                    error = %error,
                    "leave type name unavailable for notification"
                );
                request.leave_type_id().to_string()
            }
        };

        LeaveEventLeave::from_request(request, leave_type_name)
    }

    async fn publish(&self, event: LeaveEvent) {
        let kind = event.kind();
        let leave_request_id = event.leave().leave_request_id;

        if let Err(error) = self.event_publisher.publish(event).await {
            warn!(
                leave_request_id = %leave_request_id,
                event = kind.as_str(),
                error = %error,
                "failed to publish leave event"
            );
        }
    }
}
