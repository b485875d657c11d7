use async_trait::async_trait;
use peoplehub_core::{AppResult, UserId};
use peoplehub_domain::{
    Approver, ApproverId, ApproverRole, Department, DepartmentId, Employee, LevelEntitlement,
    LevelId,
};

/// Department filter applied to approver lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApproverScope {
    /// Any scope, global or department.
    Any,
    /// Records with no department.
    Global,
    /// Records scoped to exactly this department.
    Department(DepartmentId),
    /// Department-scoped records of every department except this one.
    OtherDepartmentsThan(DepartmentId),
}

/// Active approver lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApproverQuery {
    /// Optional holder filter.
    pub user_id: Option<UserId>,
    /// Optional role filter.
    pub role: Option<ApproverRole>,
    /// Department filter.
    pub scope: ApproverScope,
}

impl ApproverQuery {
    /// Global approvers of any role.
    #[must_use]
    pub fn global() -> Self {
        Self {
            user_id: None,
            role: None,
            scope: ApproverScope::Global,
        }
    }

    /// Department managers of one department.
    #[must_use]
    pub fn department_managers(department_id: DepartmentId) -> Self {
        Self {
            user_id: None,
            role: Some(ApproverRole::DeptManager),
            scope: ApproverScope::Department(department_id),
        }
    }

    /// Department managers of every other department.
    #[must_use]
    pub fn peer_department_managers(own_department_id: DepartmentId) -> Self {
        Self {
            user_id: None,
            role: Some(ApproverRole::DeptManager),
            scope: ApproverScope::OtherDepartmentsThan(own_department_id),
        }
    }

    /// Every active grant held by one user.
    #[must_use]
    pub fn held_by(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            role: None,
            scope: ApproverScope::Any,
        }
    }

    /// Returns true when an approver record satisfies the query.
    #[must_use]
    pub fn matches(&self, approver: &Approver) -> bool {
        if !approver.is_active() {
            return false;
        }
        if self.user_id.is_some_and(|user_id| approver.user_id() != user_id) {
            return false;
        }
        if self.role.is_some_and(|role| approver.role() != role) {
            return false;
        }

        match self.scope {
            ApproverScope::Any => true,
            ApproverScope::Global => approver.is_global(),
            ApproverScope::Department(department_id) => {
                approver.department_id() == Some(department_id)
            }
            ApproverScope::OtherDepartmentsThan(department_id) => approver
                .department_id()
                .is_some_and(|scoped| scoped != department_id),
        }
    }
}

/// Approver grant payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrantApproverInput {
    /// User receiving the grant.
    pub user_id: UserId,
    /// Granted role.
    pub role: ApproverRole,
    /// Department scope, `None` for a global grant.
    pub department_id: Option<DepartmentId>,
}

/// Repository port for organization data owned outside the leave core.
#[async_trait]
pub trait OrganizationRepository: Send + Sync {
    /// Returns one employee.
    async fn find_employee(&self, user_id: UserId) -> AppResult<Option<Employee>>;

    /// Returns one department with its head reference.
    async fn find_department(&self, department_id: DepartmentId)
    -> AppResult<Option<Department>>;

    /// Lists the entitlements bound to a level.
    async fn list_level_entitlements(&self, level_id: LevelId)
    -> AppResult<Vec<LevelEntitlement>>;

    /// Lists active approvers matching a query, oldest grant first.
    async fn list_active_approvers(&self, query: ApproverQuery) -> AppResult<Vec<Approver>>;

    /// Returns one approver record, active or not.
    async fn find_approver(&self, approver_id: ApproverId) -> AppResult<Option<Approver>>;

    /// Inserts or updates one approver record.
    async fn save_approver(&self, approver: Approver) -> AppResult<()>;
}
