use peoplehub_core::{AppError, AppResult, UserId};
use serde::{Deserialize, Serialize};

use crate::{DepartmentId, UserRole};

uuid_identifier!(
    /// Unique identifier for an approver capability record.
    ApproverId
);

/// Capability carried by an approver record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApproverRole {
    /// Department manager slot.
    DeptManager,
    /// Human-resources approver.
    Hr,
}

impl ApproverRole {
    /// Returns stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DeptManager => "dept_manager",
            Self::Hr => "hr",
        }
    }

    /// Parses storage value.
    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "dept_manager" => Ok(Self::DeptManager),
            "hr" => Ok(Self::Hr),
            _ => Err(AppError::Validation(format!(
                "unknown approver role '{value}'"
            ))),
        }
    }

    /// Returns the user role granted while a record with this role is active.
    #[must_use]
    pub fn granted_user_role(&self) -> UserRole {
        match self {
            Self::DeptManager => UserRole::DeptManager,
            Self::Hr => UserRole::Hr,
        }
    }
}

/// Grant letting a user approve requests, optionally scoped to one department.
///
/// Records are never physically deleted; revoking a grant deactivates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approver {
    id: ApproverId,
    user_id: UserId,
    role: ApproverRole,
    department_id: Option<DepartmentId>,
    is_active: bool,
}

impl Approver {
    /// Creates an active approver record.
    #[must_use]
    pub fn new(
        id: ApproverId,
        user_id: UserId,
        role: ApproverRole,
        department_id: Option<DepartmentId>,
    ) -> Self {
        Self {
            id,
            user_id,
            role,
            department_id,
            is_active: true,
        }
    }

    /// Rebuilds a record from storage.
    #[must_use]
    pub fn from_storage(
        id: ApproverId,
        user_id: UserId,
        role: ApproverRole,
        department_id: Option<DepartmentId>,
        is_active: bool,
    ) -> Self {
        Self {
            id,
            user_id,
            role,
            department_id,
            is_active,
        }
    }

    /// Returns the record identifier.
    #[must_use]
    pub fn id(&self) -> ApproverId {
        self.id
    }

    /// Returns the user holding the grant.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns the approver role.
    #[must_use]
    pub fn role(&self) -> ApproverRole {
        self.role
    }

    /// Returns the department scope. `None` means global.
    #[must_use]
    pub fn department_id(&self) -> Option<DepartmentId> {
        self.department_id
    }

    /// Returns whether the grant is currently active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Global approvers may approve anyone.
    #[must_use]
    pub fn is_global(&self) -> bool {
        self.department_id.is_none()
    }

    /// Returns true for department-scoped manager grants.
    #[must_use]
    pub fn is_department_manager(&self) -> bool {
        self.role == ApproverRole::DeptManager && self.department_id.is_some()
    }

    /// Soft-deletes the grant.
    pub fn deactivate(&mut self) -> AppResult<()> {
        if !self.is_active {
            return Err(AppError::Validation(format!(
                "approver '{}' is already inactive",
                self.id
            )));
        }

        self.is_active = false;
        Ok(())
    }
}
