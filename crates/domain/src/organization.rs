//! Organization read models consumed by the leave core.

use std::collections::BTreeSet;

use peoplehub_core::{AppError, AppResult, NonEmptyString, UserId};
use serde::{Deserialize, Serialize};

uuid_identifier!(
    /// Unique identifier for a department.
    DepartmentId
);

uuid_identifier!(
    /// Unique identifier for an organizational level.
    LevelId
);

/// Base role held by a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Regular employee.
    Employee,
    /// System administrator.
    Admin,
    /// Human-resources staff.
    Hr,
    /// Manager of a department.
    DeptManager,
}

impl UserRole {
    /// Returns stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Employee => "employee",
            Self::Admin => "admin",
            Self::Hr => "hr",
            Self::DeptManager => "dept_manager",
        }
    }

    /// Parses storage value.
    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "employee" => Ok(Self::Employee),
            "admin" => Ok(Self::Admin),
            "hr" => Ok(Self::Hr),
            "dept_manager" => Ok(Self::DeptManager),
            _ => Err(AppError::Validation(format!("unknown user role '{value}'"))),
        }
    }
}

/// Employee account with its organizational attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    id: UserId,
    first_name: NonEmptyString,
    last_name: NonEmptyString,
    email: NonEmptyString,
    department_id: Option<DepartmentId>,
    level_id: Option<LevelId>,
    roles: BTreeSet<UserRole>,
}

impl Employee {
    /// Creates an employee with the base `Employee` role.
    pub fn new(
        id: UserId,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
    ) -> AppResult<Self> {
        Ok(Self {
            id,
            first_name: NonEmptyString::new(first_name)?,
            last_name: NonEmptyString::new(last_name)?,
            email: NonEmptyString::new(email)?,
            department_id: None,
            level_id: None,
            roles: BTreeSet::from([UserRole::Employee]),
        })
    }

    /// Places the employee in a department.
    #[must_use]
    pub fn with_department(mut self, department_id: DepartmentId) -> Self {
        self.department_id = Some(department_id);
        self
    }

    /// Assigns the employee an organizational level.
    #[must_use]
    pub fn with_level(mut self, level_id: LevelId) -> Self {
        self.level_id = Some(level_id);
        self
    }

    /// Replaces the base role set.
    #[must_use]
    pub fn with_roles(mut self, roles: impl IntoIterator<Item = UserRole>) -> Self {
        self.roles = roles.into_iter().collect();
        self
    }

    /// Returns the user identifier.
    #[must_use]
    pub fn id(&self) -> UserId {
        self.id
    }

    /// Returns the first name.
    #[must_use]
    pub fn first_name(&self) -> &str {
        self.first_name.as_str()
    }

    /// Returns the last name.
    #[must_use]
    pub fn last_name(&self) -> &str {
        self.last_name.as_str()
    }

    /// Returns "first last".
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.as_str(), self.last_name.as_str())
    }

    /// Returns the contact email.
    #[must_use]
    pub fn email(&self) -> &str {
        self.email.as_str()
    }

    /// Returns the department membership, if any.
    #[must_use]
    pub fn department_id(&self) -> Option<DepartmentId> {
        self.department_id
    }

    /// Returns the organizational level, if any.
    #[must_use]
    pub fn level_id(&self) -> Option<LevelId> {
        self.level_id
    }

    /// Returns the base roles stored on the account.
    #[must_use]
    pub fn roles(&self) -> &BTreeSet<UserRole> {
        &self.roles
    }
}

/// Department with an optional head.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    id: DepartmentId,
    name: NonEmptyString,
    head_id: Option<UserId>,
}

impl Department {
    /// Creates a department without a head.
    pub fn new(id: DepartmentId, name: impl Into<String>) -> AppResult<Self> {
        Ok(Self {
            id,
            name: NonEmptyString::new(name)?,
            head_id: None,
        })
    }

    /// Sets the department head, replacing any previous one.
    #[must_use]
    pub fn with_head(mut self, head_id: UserId) -> Self {
        self.head_id = Some(head_id);
        self
    }

    /// Returns the department identifier.
    #[must_use]
    pub fn id(&self) -> DepartmentId {
        self.id
    }

    /// Returns the department name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the current head.
    #[must_use]
    pub fn head_id(&self) -> Option<UserId> {
        self.head_id
    }

    /// Returns true when the given user heads this department.
    #[must_use]
    pub fn is_headed_by(&self, user_id: UserId) -> bool {
        self.head_id == Some(user_id)
    }
}

/// Organizational rank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Level {
    id: LevelId,
    name: NonEmptyString,
}

impl Level {
    /// Creates a level.
    pub fn new(id: LevelId, name: impl Into<String>) -> AppResult<Self> {
        Ok(Self {
            id,
            name: NonEmptyString::new(name)?,
        })
    }

    /// Returns the level identifier.
    #[must_use]
    pub fn id(&self) -> LevelId {
        self.id
    }

    /// Returns the level name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }
}
