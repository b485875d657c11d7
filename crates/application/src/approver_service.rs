//! Approver resolution and authorization.
//!
//! `approvers_for_user` answers who should sit in a request's chain.
//! `can_user_approve` answers whether one user may act on another user's
//! request and is evaluated independently of the chain, both when the chain is
//! built and again at every decision.

use std::collections::BTreeSet;
use std::sync::Arc;

use peoplehub_core::{Actor, AppError, AppResult, UserId};
use peoplehub_domain::{Approver, ApproverId, ApproverRole, Employee, UserRole};

use crate::{ApproverQuery, GrantApproverInput, OrganizationRepository};

mod admin;

/// Application service resolving approvers and approval rights.
#[derive(Clone)]
pub struct ApproverService {
    organization: Arc<dyn OrganizationRepository>,
}

impl ApproverService {
    /// Creates an approver service.
    #[must_use]
    pub fn new(organization: Arc<dyn OrganizationRepository>) -> Self {
        Self { organization }
    }

    /// Returns the approvers eligible for requests made by `user_id`, in chain order.
    ///
    /// A department head is routed to peer heads of other departments so that
    /// nobody approves leave through their own manager slot. Global approvers
    /// always follow.
    pub async fn approvers_for_user(&self, user_id: UserId) -> AppResult<Vec<Approver>> {
        let employee = self.require_employee(user_id).await?;

        let mut approvers = match employee.department_id() {
            Some(department_id) => {
                let department = self
                    .organization
                    .find_department(department_id)
                    .await?
                    .ok_or_else(|| {
                        AppError::NotFound(format!(
                            "department '{department_id}' of employee '{user_id}' does not exist"
                        ))
                    })?;

                let query = if department.is_headed_by(user_id) {
                    ApproverQuery::peer_department_managers(department_id)
                } else {
                    ApproverQuery::department_managers(department_id)
                };
                self.organization.list_active_approvers(query).await?
            }
            None => Vec::new(),
        };

        approvers.extend(
            self.organization
                .list_active_approvers(ApproverQuery::global())
                .await?,
        );

        Ok(approvers)
    }

    /// Returns whether `approver_user_id` may action requests of `target_user_id`.
    pub async fn can_user_approve(
        &self,
        approver_user_id: UserId,
        target_user_id: UserId,
    ) -> AppResult<bool> {
        if approver_user_id == target_user_id {
            return Ok(false);
        }

        let grants = self
            .organization
            .list_active_approvers(ApproverQuery::held_by(approver_user_id))
            .await?;
        if grants.is_empty() {
            return Ok(false);
        }
        if grants.iter().any(Approver::is_global) {
            return Ok(true);
        }

        let Some(target) = self.organization.find_employee(target_user_id).await? else {
            return Ok(false);
        };
        let Some(target_department_id) = target.department_id() else {
            return Ok(false);
        };

        let manager_grants: Vec<&Approver> = grants
            .iter()
            .filter(|grant| grant.role() == ApproverRole::DeptManager)
            .collect();
        if manager_grants.is_empty() {
            return Ok(false);
        }

        if manager_grants
            .iter()
            .any(|grant| grant.department_id() == Some(target_department_id))
        {
            return Ok(true);
        }

        let target_is_head = self
            .organization
            .find_department(target_department_id)
            .await?
            .is_some_and(|department| department.is_headed_by(target_user_id));

        Ok(target_is_head)
    }

    /// Returns base roles joined with roles granted by active approver records.
    pub async fn effective_roles(&self, user_id: UserId) -> AppResult<BTreeSet<UserRole>> {
        let employee = self.require_employee(user_id).await?;
        let grants = self
            .organization
            .list_active_approvers(ApproverQuery::held_by(user_id))
            .await?;

        let mut roles = employee.roles().clone();
        roles.extend(grants.iter().map(|grant| grant.role().granted_user_role()));
        Ok(roles)
    }

    /// Grants approval rights to a user.
    pub async fn grant_approver(
        &self,
        actor: &Actor,
        input: GrantApproverInput,
    ) -> AppResult<Approver> {
        self.ensure_can_administer(actor).await?;
        self.grant_approver_impl(input).await
    }

    /// Revokes an approver record by deactivating it.
    pub async fn deactivate_approver(
        &self,
        actor: &Actor,
        approver_id: ApproverId,
    ) -> AppResult<Approver> {
        self.ensure_can_administer(actor).await?;
        self.deactivate_approver_impl(approver_id).await
    }

    async fn require_employee(&self, user_id: UserId) -> AppResult<Employee> {
        self.organization
            .find_employee(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("employee '{user_id}' does not exist")))
    }
}
