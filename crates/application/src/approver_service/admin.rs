use tracing::info;

use super::*;

impl ApproverService {
    pub(super) async fn ensure_can_administer(&self, actor: &Actor) -> AppResult<()> {
        if actor.has_role(UserRole::Admin.as_str()) || actor.has_role(UserRole::Hr.as_str()) {
            return Ok(());
        }

        let roles = self.effective_roles(actor.user_id()).await?;
        if roles.contains(&UserRole::Admin) || roles.contains(&UserRole::Hr) {
            return Ok(());
        }

        Err(AppError::Forbidden(format!(
            "user '{}' may not manage approvers",
            actor.user_id()
        )))
    }

    pub(super) async fn grant_approver_impl(
        &self,
        input: GrantApproverInput,
    ) -> AppResult<Approver> {
        self.require_employee(input.user_id).await?;

        if let Some(department_id) = input.department_id
            && self
                .organization
                .find_department(department_id)
                .await?
                .is_none()
        {
            return Err(AppError::NotFound(format!(
                "department '{department_id}' does not exist"
            )));
        }

        let existing = self
            .organization
            .list_active_approvers(ApproverQuery::held_by(input.user_id))
            .await?;
        if existing.iter().any(|grant| {
            grant.role() == input.role && grant.department_id() == input.department_id
        }) {
            return Err(AppError::Conflict(format!(
                "user '{}' already holds an active {} grant for this scope",
                input.user_id,
                input.role.as_str()
            )));
        }

        let approver = Approver::new(
            ApproverId::new(),
            input.user_id,
            input.role,
            input.department_id,
        );
        self.organization.save_approver(approver.clone()).await?;

        info!(
            approver_id = %approver.id(),
            user_id = %approver.user_id(),
            role = approver.role().as_str(),
            global = approver.is_global(),
            "approver granted"
        );

        Ok(approver)
    }

    pub(super) async fn deactivate_approver_impl(
        &self,
        approver_id: ApproverId,
    ) -> AppResult<Approver> {
        let mut approver = self
            .organization
            .find_approver(approver_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("approver '{approver_id}' does not exist")))?;

        approver.deactivate()?;
        self.organization.save_approver(approver.clone()).await?;

        info!(
            approver_id = %approver.id(),
            user_id = %approver.user_id(),
            "approver deactivated"
        );

        Ok(approver)
    }
}
