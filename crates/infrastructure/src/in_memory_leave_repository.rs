use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use peoplehub_application::{LeaveRepository, LeaveRequestQuery, LeaveTransaction};
use peoplehub_core::{AppError, AppResult, UserId};
use peoplehub_domain::{
    Approval, ApprovalId, ApprovalStatus, LeaveRequest, LeaveRequestId, LeaveStatus,
};
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Clone, Default)]
struct LeaveStore {
    requests: HashMap<LeaveRequestId, LeaveRequest>,
    approvals: HashMap<ApprovalId, Approval>,
}

impl LeaveStore {
    fn list_requests(&self, query: LeaveRequestQuery) -> Vec<LeaveRequest> {
        let mut requests: Vec<LeaveRequest> = self
            .requests
            .values()
            .filter(|request| query.matches(request))
            .cloned()
            .collect();
        requests.sort_by(|left, right| {
            right
                .date_range()
                .start_date()
                .cmp(&left.date_range().start_date())
                .then_with(|| right.created_at().cmp(&left.created_at()))
        });
        requests
    }
}

/// In-memory leave repository.
///
/// A transaction holds the store lock until it commits or drops, so at most one
/// unit of work runs at a time. Reads outside a transaction wait for it.
#[derive(Debug, Default, Clone)]
pub struct InMemoryLeaveRepository {
    store: Arc<Mutex<LeaveStore>>,
}

impl InMemoryLeaveRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LeaveRepository for InMemoryLeaveRepository {
    async fn begin(&self) -> AppResult<Box<dyn LeaveTransaction>> {
        let guard = Arc::clone(&self.store).lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(InMemoryLeaveTransaction { guard, staged }))
    }

    async fn find_leave_request(
        &self,
        leave_request_id: LeaveRequestId,
    ) -> AppResult<Option<LeaveRequest>> {
        Ok(self.store.lock().await.requests.get(&leave_request_id).cloned())
    }

    async fn list_leave_requests(&self, query: LeaveRequestQuery) -> AppResult<Vec<LeaveRequest>> {
        Ok(self.store.lock().await.list_requests(query))
    }

    async fn list_approvals(&self, leave_request_id: LeaveRequestId) -> AppResult<Vec<Approval>> {
        let mut approvals: Vec<Approval> = self
            .store
            .lock()
            .await
            .approvals
            .values()
            .filter(|approval| approval.leave_request_id() == leave_request_id)
            .cloned()
            .collect();
        approvals.sort_by_key(Approval::phase);
        Ok(approvals)
    }

    async fn list_current_approvals_for_approver(
        &self,
        approver_id: UserId,
    ) -> AppResult<Vec<Approval>> {
        let store = self.store.lock().await;
        let mut approvals: Vec<Approval> = store
            .approvals
            .values()
            .filter(|approval| {
                approval.approver_id() == approver_id
                    && approval.status() == ApprovalStatus::Pending
                    && store
                        .requests
                        .get(&approval.leave_request_id())
                        .is_some_and(|request| {
                            request.status() == LeaveStatus::Pending
                                && request.current_approval_id() == Some(approval.id())
                        })
            })
            .cloned()
            .collect();
        approvals.sort_by_key(Approval::created_at);
        Ok(approvals)
    }
}

struct InMemoryLeaveTransaction {
    guard: OwnedMutexGuard<LeaveStore>,
    staged: LeaveStore,
}

#[async_trait]
impl LeaveTransaction for InMemoryLeaveTransaction {
    async fn lock_requester(&mut self, _user_id: UserId) -> AppResult<()> {
        // The store lock already serializes every writer.
        Ok(())
    }

    async fn list_leave_requests(
        &mut self,
        query: LeaveRequestQuery,
    ) -> AppResult<Vec<LeaveRequest>> {
        Ok(self.staged.list_requests(query))
    }

    async fn insert_leave_request(&mut self, request: &LeaveRequest) -> AppResult<()> {
        if self.staged.requests.contains_key(&request.id()) {
            return Err(AppError::Conflict(format!(
                "leave request '{}' already exists",
                request.id()
            )));
        }

        self.staged.requests.insert(request.id(), request.clone());
        Ok(())
    }

    async fn lock_leave_request(
        &mut self,
        leave_request_id: LeaveRequestId,
    ) -> AppResult<Option<LeaveRequest>> {
        Ok(self.staged.requests.get(&leave_request_id).cloned())
    }

    async fn update_leave_request(&mut self, request: &LeaveRequest) -> AppResult<()> {
        let stored = self.staged.requests.get_mut(&request.id()).ok_or_else(|| {
            AppError::NotFound(format!("leave request '{}' does not exist", request.id()))
        })?;
        *stored = request.clone();
        Ok(())
    }

    async fn delete_leave_request(&mut self, leave_request_id: LeaveRequestId) -> AppResult<()> {
        self.staged.requests.remove(&leave_request_id);
        self.staged
            .approvals
            .retain(|_, approval| approval.leave_request_id() != leave_request_id);
        Ok(())
    }

    async fn insert_approval(&mut self, approval: &Approval) -> AppResult<()> {
        let has_open_step = self.staged.approvals.values().any(|stored| {
            stored.leave_request_id() == approval.leave_request_id()
                && stored.status() == ApprovalStatus::Pending
        });
        if has_open_step && approval.status() == ApprovalStatus::Pending {
            return Err(AppError::Conflict(format!(
                "leave request '{}' already has an active approval step",
                approval.leave_request_id()
            )));
        }

        self.staged.approvals.insert(approval.id(), approval.clone());
        Ok(())
    }

    async fn find_approval(&mut self, approval_id: ApprovalId) -> AppResult<Option<Approval>> {
        Ok(self.staged.approvals.get(&approval_id).cloned())
    }

    async fn lock_approval(&mut self, approval_id: ApprovalId) -> AppResult<Option<Approval>> {
        Ok(self.staged.approvals.get(&approval_id).cloned())
    }

    async fn update_approval(&mut self, approval: &Approval) -> AppResult<()> {
        let stored = self.staged.approvals.get_mut(&approval.id()).ok_or_else(|| {
            AppError::NotFound(format!("approval '{}' does not exist", approval.id()))
        })?;
        *stored = approval.clone();
        Ok(())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let Self { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }
}
