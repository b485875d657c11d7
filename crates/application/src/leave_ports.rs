use async_trait::async_trait;
use chrono::NaiveDate;
use peoplehub_core::{AppResult, UserId};
use peoplehub_domain::{
    Approval, ApprovalId, EntitlementId, LeaveRequest, LeaveRequestId, LeaveStatus,
};

/// Filtered leave request lookup for one requester.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaveRequestQuery {
    /// Requester.
    pub user_id: UserId,
    /// Optional leave type filter.
    pub leave_type_id: Option<EntitlementId>,
    /// Optional lower bound on the start date, inclusive.
    pub starting_on_or_after: Option<NaiveDate>,
    /// Optional upper bound on the start date, inclusive.
    pub starting_on_or_before: Option<NaiveDate>,
    /// Optional status filter.
    pub status: Option<LeaveStatus>,
}

impl LeaveRequestQuery {
    /// Every request of one user.
    #[must_use]
    pub fn for_user(user_id: UserId) -> Self {
        Self {
            user_id,
            leave_type_id: None,
            starting_on_or_after: None,
            starting_on_or_before: None,
            status: None,
        }
    }

    /// Returns true when a request satisfies the query.
    #[must_use]
    pub fn matches(&self, request: &LeaveRequest) -> bool {
        request.user_id() == self.user_id
            && self
                .leave_type_id
                .is_none_or(|leave_type_id| request.leave_type_id() == leave_type_id)
            && self
                .starting_on_or_after
                .is_none_or(|date| request.date_range().start_date() >= date)
            && self
                .starting_on_or_before
                .is_none_or(|date| request.date_range().start_date() <= date)
            && self.status.is_none_or(|status| request.status() == status)
    }
}

/// Repository port for leave requests and their approval steps.
#[async_trait]
pub trait LeaveRepository: Send + Sync {
    /// Opens a unit of work. Dropping it without `commit` rolls back.
    async fn begin(&self) -> AppResult<Box<dyn LeaveTransaction>>;

    /// Returns one request.
    async fn find_leave_request(
        &self,
        leave_request_id: LeaveRequestId,
    ) -> AppResult<Option<LeaveRequest>>;

    /// Lists requests matching a query, newest start date first.
    async fn list_leave_requests(&self, query: LeaveRequestQuery) -> AppResult<Vec<LeaveRequest>>;

    /// Lists the approval steps of one request ordered by phase.
    async fn list_approvals(&self, leave_request_id: LeaveRequestId) -> AppResult<Vec<Approval>>;

    /// Lists pending steps assigned to a user that are the active step of their request.
    async fn list_current_approvals_for_approver(
        &self,
        approver_id: UserId,
    ) -> AppResult<Vec<Approval>>;
}

/// Transactional unit of work over leave data.
///
/// `lock_*` reads take row locks that are held until commit or rollback.
/// Callers lock the request before its approval rows.
#[async_trait]
pub trait LeaveTransaction: Send {
    /// Serializes concurrent submissions by the same requester.
    async fn lock_requester(&mut self, user_id: UserId) -> AppResult<()>;

    /// Lists requests matching a query inside the transaction.
    async fn list_leave_requests(
        &mut self,
        query: LeaveRequestQuery,
    ) -> AppResult<Vec<LeaveRequest>>;

    /// Inserts a request together with its approval chain slots.
    async fn insert_leave_request(&mut self, request: &LeaveRequest) -> AppResult<()>;

    /// Loads and locks one request.
    async fn lock_leave_request(
        &mut self,
        leave_request_id: LeaveRequestId,
    ) -> AppResult<Option<LeaveRequest>>;

    /// Persists status and active-step changes of a request.
    async fn update_leave_request(&mut self, request: &LeaveRequest) -> AppResult<()>;

    /// Deletes a request with its chain slots and approval rows.
    async fn delete_leave_request(&mut self, leave_request_id: LeaveRequestId) -> AppResult<()>;

    /// Inserts one approval step.
    async fn insert_approval(&mut self, approval: &Approval) -> AppResult<()>;

    /// Loads one approval step without locking it.
    async fn find_approval(&mut self, approval_id: ApprovalId) -> AppResult<Option<Approval>>;

    /// Loads and locks one approval step.
    async fn lock_approval(&mut self, approval_id: ApprovalId) -> AppResult<Option<Approval>>;

    /// Persists a decision on one approval step.
    async fn update_approval(&mut self, approval: &Approval) -> AppResult<()>;

    /// Commits every change made through this unit of work.
    async fn commit(self: Box<Self>) -> AppResult<()>;
}
