use std::collections::HashMap;

use async_trait::async_trait;
use peoplehub_application::{ApproverQuery, OrganizationRepository};
use peoplehub_core::{AppError, AppResult, UserId};
use peoplehub_domain::{
    Approver, ApproverId, Department, DepartmentId, Employee, LevelEntitlement, LevelId,
};
use tokio::sync::RwLock;

/// In-memory organization repository.
#[derive(Debug, Default)]
pub struct InMemoryOrganizationRepository {
    employees: RwLock<HashMap<UserId, Employee>>,
    departments: RwLock<HashMap<DepartmentId, Department>>,
    level_entitlements: RwLock<Vec<LevelEntitlement>>,
    approvers: RwLock<Vec<Approver>>,
}

impl InMemoryOrganizationRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces an employee.
    pub async fn save_employee(&self, employee: Employee) {
        self.employees.write().await.insert(employee.id(), employee);
    }

    /// Inserts or replaces a department.
    pub async fn save_department(&self, department: Department) {
        self.departments
            .write()
            .await
            .insert(department.id(), department);
    }

    /// Binds an entitlement to a level, replacing an existing binding of the same pair.
    pub async fn save_level_entitlement(&self, binding: LevelEntitlement) {
        let mut bindings = self.level_entitlements.write().await;
        bindings.retain(|stored| {
            stored.level_id() != binding.level_id()
                || stored.entitlement().id() != binding.entitlement().id()
        });
        bindings.push(binding);
    }
}

#[async_trait]
impl OrganizationRepository for InMemoryOrganizationRepository {
    async fn find_employee(&self, user_id: UserId) -> AppResult<Option<Employee>> {
        Ok(self.employees.read().await.get(&user_id).cloned())
    }

    async fn find_department(
        &self,
        department_id: DepartmentId,
    ) -> AppResult<Option<Department>> {
        Ok(self.departments.read().await.get(&department_id).cloned())
    }

    async fn list_level_entitlements(
        &self,
        level_id: LevelId,
    ) -> AppResult<Vec<LevelEntitlement>> {
        let mut bindings: Vec<LevelEntitlement> = self
            .level_entitlements
            .read()
            .await
            .iter()
            .filter(|binding| binding.level_id() == level_id)
            .cloned()
            .collect();
        bindings.sort_by(|left, right| left.entitlement().name().cmp(right.entitlement().name()));
        Ok(bindings)
    }

    async fn list_active_approvers(&self, query: ApproverQuery) -> AppResult<Vec<Approver>> {
        Ok(self
            .approvers
            .read()
            .await
            .iter()
            .filter(|approver| query.matches(approver))
            .cloned()
            .collect())
    }

    async fn find_approver(&self, approver_id: ApproverId) -> AppResult<Option<Approver>> {
        Ok(self
            .approvers
            .read()
            .await
            .iter()
            .find(|approver| approver.id() == approver_id)
            .cloned())
    }

    async fn save_approver(&self, approver: Approver) -> AppResult<()> {
        let mut approvers = self.approvers.write().await;

        if approver.is_active()
            && approvers.iter().any(|stored| {
                stored.id() != approver.id()
                    && stored.is_active()
                    && stored.user_id() == approver.user_id()
                    && stored.role() == approver.role()
                    && stored.department_id() == approver.department_id()
            })
        {
            return Err(AppError::Conflict(format!(
                "user '{}' already holds an active {} grant for this scope",
                approver.user_id(),
                approver.role().as_str()
            )));
        }

        match approvers.iter_mut().find(|stored| stored.id() == approver.id()) {
            Some(stored) => *stored = approver,
            None => approvers.push(approver),
        }
        Ok(())
    }
}
