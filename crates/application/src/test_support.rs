//! In-process fakes shared by the service tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Datelike, Days, NaiveDate, Utc, Weekday};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use peoplehub_core::{Actor, AppError, AppResult, UserId};
use peoplehub_domain::{
    Approval, ApprovalId, ApprovalStatus, Approver, ApproverId, ApproverRole, Department,
    DepartmentId, Employee, Entitlement, EntitlementId, EntitlementKind, LeaveEvent,
    LeaveRequest, LeaveRequestId, LeaveStatus, Level, LevelEntitlement, LevelId, UserRole,
};

use crate::{
    ApprovalFlowService, ApproverQuery, ApproverService, BalanceService, CreateLeaveRequestInput,
    EmailService, EntitlementService, LeaveEventPublisher, LeaveRepository, LeaveRequestQuery,
    LeaveRequestService, LeaveTransaction, OrganizationRepository,
};

/// Monday of the given week, counted from the first Monday of the current year.
pub(crate) fn monday_of_week(week: u64) -> NaiveDate {
    let year = Utc::now().year();
    let Some(mut day) = NaiveDate::from_ymd_opt(year, 1, 1) else {
        panic!("January 1 must exist");
    };
    while day.weekday() != Weekday::Mon {
        day = day + Days::new(1);
    }
    day + Days::new(7 * week)
}

/// Second Monday of next year.
pub(crate) fn next_year_monday() -> NaiveDate {
    let Some(mut day) = NaiveDate::from_ymd_opt(Utc::now().year() + 1, 1, 8) else {
        panic!("January 8 must exist");
    };
    while day.weekday() != Weekday::Mon {
        day = day + Days::new(1);
    }
    day
}

pub(crate) fn actor(user_id: UserId) -> Actor {
    Actor::new(user_id, "Test User", Vec::new())
}

/// Monday to Friday of the given week, five business days.
pub(crate) fn week_off(leave_type_id: EntitlementId, week: u64) -> CreateLeaveRequestInput {
    let start_date = monday_of_week(week);
    CreateLeaveRequestInput {
        leave_type_id,
        doa_id: None,
        reason: "Family trip".to_owned(),
        start_date,
        end_date: start_date + Days::new(4),
        uploads: Vec::new(),
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct OrganizationState {
    employees: HashMap<UserId, Employee>,
    departments: HashMap<DepartmentId, Department>,
    levels: HashMap<LevelId, Level>,
    level_entitlements: Vec<LevelEntitlement>,
    approvers: Vec<Approver>,
}

#[derive(Default)]
pub(crate) struct FakeOrganizationRepository {
    state: RwLock<OrganizationState>,
}

#[async_trait]
impl OrganizationRepository for FakeOrganizationRepository {
    async fn find_employee(&self, user_id: UserId) -> AppResult<Option<Employee>> {
        Ok(self.state.read().await.employees.get(&user_id).cloned())
    }

    async fn find_department(
        &self,
        department_id: DepartmentId,
    ) -> AppResult<Option<Department>> {
        Ok(self
            .state
            .read()
            .await
            .departments
            .get(&department_id)
            .cloned())
    }

    async fn list_level_entitlements(
        &self,
        level_id: LevelId,
    ) -> AppResult<Vec<LevelEntitlement>> {
        Ok(self
            .state
            .read()
            .await
            .level_entitlements
            .iter()
            .filter(|binding| binding.level_id() == level_id)
            .cloned()
            .collect())
    }

    async fn list_active_approvers(&self, query: ApproverQuery) -> AppResult<Vec<Approver>> {
        Ok(self
            .state
            .read()
            .await
            .approvers
            .iter()
            .filter(|approver| query.matches(approver))
            .cloned()
            .collect())
    }

    async fn find_approver(&self, approver_id: ApproverId) -> AppResult<Option<Approver>> {
        Ok(self
            .state
            .read()
            .await
            .approvers
            .iter()
            .find(|approver| approver.id() == approver_id)
            .cloned())
    }

    async fn save_approver(&self, approver: Approver) -> AppResult<()> {
        let mut state = self.state.write().await;
        match state
            .approvers
            .iter_mut()
            .find(|stored| stored.id() == approver.id())
        {
            Some(stored) => *stored = approver,
            None => state.approvers.push(approver),
        }
        Ok(())
    }
}

/// Synchronous builder for organization data.
pub(crate) struct OrganizationFixture {
    state: OrganizationState,
    counter: usize,
}

impl OrganizationFixture {
    pub(crate) fn new() -> Self {
        Self {
            state: OrganizationState::default(),
            counter: 0,
        }
    }

    fn next_name(&mut self, prefix: &str) -> String {
        self.counter += 1;
        format!("{prefix}{}", self.counter)
    }

    pub(crate) fn add_level(&mut self, name: &str) -> LevelId {
        let level = match Level::new(LevelId::new(), name) {
            Ok(level) => level,
            Err(error) => panic!("level should build: {error}"),
        };
        let level_id = level.id();
        self.state.levels.insert(level_id, level);
        level_id
    }

    pub(crate) fn bind_entitlement(
        &mut self,
        level_id: LevelId,
        name: &str,
        unit: &str,
        kind: EntitlementKind,
        value: i64,
    ) -> EntitlementId {
        let binding = Entitlement::new(EntitlementId::new(), name, unit, kind)
            .and_then(|entitlement| LevelEntitlement::new(level_id, entitlement, value));
        let binding = match binding {
            Ok(binding) => binding,
            Err(error) => panic!("level entitlement should build: {error}"),
        };
        let entitlement_id = binding.entitlement().id();
        self.state.level_entitlements.push(binding);
        entitlement_id
    }

    pub(crate) fn add_department(&mut self, name: &str) -> DepartmentId {
        let department = match Department::new(DepartmentId::new(), name) {
            Ok(department) => department,
            Err(error) => panic!("department should build: {error}"),
        };
        let department_id = department.id();
        self.state.departments.insert(department_id, department);
        department_id
    }

    pub(crate) fn set_head(&mut self, department_id: DepartmentId, head_id: UserId) {
        let Some(department) = self.state.departments.remove(&department_id) else {
            panic!("department '{department_id}' should exist");
        };
        self.state
            .departments
            .insert(department_id, department.with_head(head_id));
    }

    pub(crate) fn add_employee(
        &mut self,
        department_id: Option<DepartmentId>,
        level_id: Option<LevelId>,
    ) -> UserId {
        let user_id = UserId::new();
        let first_name = self.next_name("Employee");
        let email = format!("{}@example.com", first_name.to_lowercase());
        let mut employee = match Employee::new(user_id, first_name, "Tester", email) {
            Ok(employee) => employee,
            Err(error) => panic!("employee should build: {error}"),
        };
        if let Some(department_id) = department_id {
            employee = employee.with_department(department_id);
        }
        if let Some(level_id) = level_id {
            employee = employee.with_level(level_id);
        }
        self.state.employees.insert(user_id, employee);
        user_id
    }

    pub(crate) fn set_roles(&mut self, user_id: UserId, roles: &[UserRole]) {
        let Some(employee) = self.state.employees.remove(&user_id) else {
            panic!("employee '{user_id}' should exist");
        };
        self.state
            .employees
            .insert(user_id, employee.with_roles(roles.iter().copied()));
    }

    pub(crate) fn add_approver(
        &mut self,
        user_id: UserId,
        role: ApproverRole,
        department_id: Option<DepartmentId>,
    ) -> ApproverId {
        let approver = Approver::new(ApproverId::new(), user_id, role, department_id);
        let approver_id = approver.id();
        self.state.approvers.push(approver);
        approver_id
    }

    pub(crate) fn repository(&self) -> Arc<FakeOrganizationRepository> {
        Arc::new(FakeOrganizationRepository {
            state: RwLock::new(self.state.clone()),
        })
    }

    pub(crate) fn entitlement_service(&self) -> EntitlementService {
        EntitlementService::new(self.repository())
    }

    pub(crate) fn approver_service(&self) -> ApproverService {
        ApproverService::new(self.repository())
    }

    pub(crate) fn harness(&self) -> Harness {
        Harness::new(self.repository(), Arc::new(RecordingPublisher::default()))
    }

    pub(crate) fn harness_with_publisher(&self, publisher: Arc<RecordingPublisher>) -> Harness {
        Harness::new(self.repository(), publisher)
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct LeaveState {
    pub(crate) requests: Vec<LeaveRequest>,
    pub(crate) approvals: Vec<Approval>,
    pub(crate) commits: usize,
}

#[derive(Default)]
pub(crate) struct FakeLeaveRepository {
    state: Arc<Mutex<LeaveState>>,
}

impl FakeLeaveRepository {
    pub(crate) async fn snapshot(&self) -> LeaveState {
        self.state.lock().await.clone()
    }

    pub(crate) async fn seed_request(&self, request: LeaveRequest) {
        self.state.lock().await.requests.push(request);
    }
}

fn sorted_requests<'a>(
    requests: impl Iterator<Item = &'a LeaveRequest>,
    query: LeaveRequestQuery,
) -> Vec<LeaveRequest> {
    let mut matches: Vec<LeaveRequest> = requests
        .filter(|request| query.matches(request))
        .cloned()
        .collect();
    matches.sort_by_key(|request| std::cmp::Reverse(request.date_range().start_date()));
    matches
}

#[async_trait]
impl LeaveRepository for FakeLeaveRepository {
    async fn begin(&self) -> AppResult<Box<dyn LeaveTransaction>> {
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(FakeLeaveTransaction { guard, staged }))
    }

    async fn find_leave_request(
        &self,
        leave_request_id: LeaveRequestId,
    ) -> AppResult<Option<LeaveRequest>> {
        Ok(self
            .state
            .lock()
            .await
            .requests
            .iter()
            .find(|request| request.id() == leave_request_id)
            .cloned())
    }

    async fn list_leave_requests(&self, query: LeaveRequestQuery) -> AppResult<Vec<LeaveRequest>> {
        Ok(sorted_requests(self.state.lock().await.requests.iter(), query))
    }

    async fn list_approvals(&self, leave_request_id: LeaveRequestId) -> AppResult<Vec<Approval>> {
        let mut approvals: Vec<Approval> = self
            .state
            .lock()
            .await
            .approvals
            .iter()
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
        let state = self.state.lock().await;
        Ok(state
            .approvals
            .iter()
            .filter(|approval| {
                approval.approver_id() == approver_id
                    && approval.status() == ApprovalStatus::Pending
                    && state.requests.iter().any(|request| {
                        request.status() == LeaveStatus::Pending
                            && request.current_approval_id() == Some(approval.id())
                    })
            })
            .cloned()
            .collect())
    }
}

pub(crate) struct FakeLeaveTransaction {
    guard: OwnedMutexGuard<LeaveState>,
    staged: LeaveState,
}

#[async_trait]
impl LeaveTransaction for FakeLeaveTransaction {
    async fn lock_requester(&mut self, _user_id: UserId) -> AppResult<()> {
        Ok(())
    }

    async fn list_leave_requests(
        &mut self,
        query: LeaveRequestQuery,
    ) -> AppResult<Vec<LeaveRequest>> {
        Ok(sorted_requests(self.staged.requests.iter(), query))
    }

    async fn insert_leave_request(&mut self, request: &LeaveRequest) -> AppResult<()> {
        self.staged.requests.push(request.clone());
        Ok(())
    }

    async fn lock_leave_request(
        &mut self,
        leave_request_id: LeaveRequestId,
    ) -> AppResult<Option<LeaveRequest>> {
        Ok(self
            .staged
            .requests
            .iter()
            .find(|request| request.id() == leave_request_id)
            .cloned())
    }

    async fn update_leave_request(&mut self, request: &LeaveRequest) -> AppResult<()> {
        let stored = self
            .staged
            .requests
            .iter_mut()
            .find(|stored| stored.id() == request.id())
            .ok_or_else(|| AppError::NotFound(format!("leave request '{}'", request.id())))?;
        *stored = request.clone();
        Ok(())
    }

    async fn delete_leave_request(&mut self, leave_request_id: LeaveRequestId) -> AppResult<()> {
        self.staged
            .requests
            .retain(|request| request.id() != leave_request_id);
        self.staged
            .approvals
            .retain(|approval| approval.leave_request_id() != leave_request_id);
        Ok(())
    }

    async fn insert_approval(&mut self, approval: &Approval) -> AppResult<()> {
        self.staged.approvals.push(approval.clone());
        Ok(())
    }

    async fn find_approval(&mut self, approval_id: ApprovalId) -> AppResult<Option<Approval>> {
        Ok(self
            .staged
            .approvals
            .iter()
            .find(|approval| approval.id() == approval_id)
            .cloned())
    }

    async fn lock_approval(&mut self, approval_id: ApprovalId) -> AppResult<Option<Approval>> {
        self.find_approval(approval_id).await
    }

    async fn update_approval(&mut self, approval: &Approval) -> AppResult<()> {
        let stored = self
            .staged
            .approvals
            .iter_mut()
            .find(|stored| stored.id() == approval.id())
            .ok_or_else(|| AppError::NotFound(format!("approval '{}'", approval.id())))?;
        *stored = approval.clone();
        Ok(())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let Self { mut guard, mut staged } = *self;
        staged.commits += 1;
        *guard = staged;
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct RecordingPublisher {
    events: Mutex<Vec<LeaveEvent>>,
    failing: bool,
}

impl RecordingPublisher {
    pub(crate) fn failing() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            failing: true,
        }
    }

    pub(crate) async fn events(&self) -> Vec<LeaveEvent> {
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl LeaveEventPublisher for RecordingPublisher {
    async fn publish(&self, event: LeaveEvent) -> AppResult<()> {
        if self.failing {
            return Err(AppError::Internal("notification channel closed".to_owned()));
        }
        self.events.lock().await.push(event);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SentEmail {
    pub(crate) to: String,
    pub(crate) subject: String,
    pub(crate) text_body: String,
}

#[derive(Default)]
pub(crate) struct RecordingEmailService {
    sent: Mutex<Vec<SentEmail>>,
}

impl RecordingEmailService {
    pub(crate) async fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl EmailService for RecordingEmailService {
    async fn send_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        _html_body: Option<&str>,
    ) -> AppResult<()> {
        self.sent.lock().await.push(SentEmail {
            to: to.to_owned(),
            subject: subject.to_owned(),
            text_body: text_body.to_owned(),
        });
        Ok(())
    }
}

/// Every leave service wired over the same fakes.
pub(crate) struct Harness {
    pub(crate) organization: Arc<FakeOrganizationRepository>,
    pub(crate) leave_repository: Arc<FakeLeaveRepository>,
    pub(crate) publisher: Arc<RecordingPublisher>,
    pub(crate) approver_service: ApproverService,
    pub(crate) balance_service: BalanceService,
    pub(crate) approval_flow: ApprovalFlowService,
    pub(crate) leave_requests: LeaveRequestService,
}

impl Harness {
    fn new(
        organization: Arc<FakeOrganizationRepository>,
        publisher: Arc<RecordingPublisher>,
    ) -> Self {
        let leave_repository = Arc::new(FakeLeaveRepository::default());
        let entitlement_service = EntitlementService::new(organization.clone());
        let approver_service = ApproverService::new(organization.clone());
        let balance_service =
            BalanceService::new(entitlement_service.clone(), leave_repository.clone());
        let approval_flow = ApprovalFlowService::new(
            approver_service.clone(),
            entitlement_service.clone(),
            leave_repository.clone(),
            publisher.clone(),
        );
        let leave_requests = LeaveRequestService::new(
            entitlement_service,
            balance_service.clone(),
            approver_service.clone(),
            approval_flow.clone(),
            leave_repository.clone(),
        );

        Self {
            organization,
            leave_repository,
            publisher,
            approver_service,
            balance_service,
            approval_flow,
            leave_requests,
        }
    }
}
