use std::sync::Arc;

use peoplehub_core::{AppError, AppResult, UserId};
use peoplehub_domain::{EntitlementId, Employee, LeaveAllowance, LevelEntitlement};

use crate::OrganizationRepository;

/// Resolves leave allowances granted by a user's level.
#[derive(Clone)]
pub struct EntitlementService {
    organization: Arc<dyn OrganizationRepository>,
}

impl EntitlementService {
    /// Creates an entitlement service.
    #[must_use]
    pub fn new(organization: Arc<dyn OrganizationRepository>) -> Self {
        Self { organization }
    }

    /// Returns the leave allowances of a user's level.
    pub async fn leave_entitlements(&self, user_id: UserId) -> AppResult<Vec<LeaveAllowance>> {
        let (_, level_entitlements) = self.level_entitlements_for(user_id).await?;

        Ok(level_entitlements
            .iter()
            .filter(|binding| binding.entitlement().is_leave_allowance())
            .map(LevelEntitlement::to_allowance)
            .collect())
    }

    /// Returns the allowance for one leave type on the user's level.
    pub async fn find_leave_allowance(
        &self,
        user_id: UserId,
        leave_type_id: EntitlementId,
    ) -> AppResult<LeaveAllowance> {
        self.leave_entitlements(user_id)
            .await?
            .into_iter()
            .find(|allowance| allowance.entitlement_id == leave_type_id)
            .ok_or_else(|| {
                AppError::Validation(format!(
                    "leave type '{leave_type_id}' is not available for user '{user_id}'"
                ))
            })
    }

    pub(crate) async fn level_entitlements_for(
        &self,
        user_id: UserId,
    ) -> AppResult<(Employee, Vec<LevelEntitlement>)> {
        let employee = self
            .organization
            .find_employee(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("employee '{user_id}' does not exist")))?;

        let level_id = employee.level_id().ok_or_else(|| {
            AppError::NotFound(format!("employee '{user_id}' has no level assigned"))
        })?;

        let level_entitlements = self.organization.list_level_entitlements(level_id).await?;
        Ok((employee, level_entitlements))
    }
}
