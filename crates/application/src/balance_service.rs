use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use peoplehub_core::{AppResult, UserId};
use peoplehub_domain::{
    EntitlementId, LeaveAllowance, LeaveBalance, LeaveRequest, LeaveUsage, leave_year_end,
    leave_year_start,
};

use crate::{EntitlementService, LeaveRepository, LeaveRequestQuery, LeaveTransaction};

/// Computes year-to-date leave balances.
#[derive(Clone)]
pub struct BalanceService {
    entitlement_service: EntitlementService,
    leave_repository: Arc<dyn LeaveRepository>,
}

impl BalanceService {
    /// Creates a balance service.
    #[must_use]
    pub fn new(
        entitlement_service: EntitlementService,
        leave_repository: Arc<dyn LeaveRepository>,
    ) -> Self {
        Self {
            entitlement_service,
            leave_repository,
        }
    }

    /// Returns the balance of one leave type for the current leave year.
    pub async fn check_leave_balance(
        &self,
        user_id: UserId,
        leave_type_id: EntitlementId,
    ) -> AppResult<LeaveBalance> {
        let allowance = self
            .entitlement_service
            .find_leave_allowance(user_id, leave_type_id)
            .await?;
        let query = leave_year(user_id, Some(leave_type_id), today());
        let requests = self.leave_repository.list_leave_requests(query).await?;

        Ok(balance_of(allowance, &requests, query))
    }

    /// Returns the balance of every leave type on the user's level.
    pub async fn list_leave_balances(&self, user_id: UserId) -> AppResult<Vec<LeaveBalance>> {
        let allowances = self.entitlement_service.leave_entitlements(user_id).await?;
        let query = leave_year(user_id, None, today());
        let requests = self.leave_repository.list_leave_requests(query).await?;

        Ok(allowances
            .into_iter()
            .map(|allowance| {
                let query = LeaveRequestQuery {
                    leave_type_id: Some(allowance.entitlement_id),
                    ..query
                };
                balance_of(allowance, &requests, query)
            })
            .collect())
    }

    /// Balance of the leave year containing `day`, read inside an open unit of work.
    pub(crate) async fn balance_in(
        &self,
        transaction: &mut dyn LeaveTransaction,
        allowance: LeaveAllowance,
        user_id: UserId,
        day: NaiveDate,
    ) -> AppResult<LeaveBalance> {
        let query = leave_year(user_id, Some(allowance.entitlement_id), day);
        let requests = transaction.list_leave_requests(query).await?;

        Ok(balance_of(allowance, &requests, query))
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn leave_year(
    user_id: UserId,
    leave_type_id: Option<EntitlementId>,
    day: NaiveDate,
) -> LeaveRequestQuery {
    LeaveRequestQuery {
        leave_type_id,
        starting_on_or_after: Some(leave_year_start(day)),
        starting_on_or_before: Some(leave_year_end(day)),
        ..LeaveRequestQuery::for_user(user_id)
    }
}

fn balance_of(
    allowance: LeaveAllowance,
    requests: &[LeaveRequest],
    query: LeaveRequestQuery,
) -> LeaveBalance {
    let year_start = query.starting_on_or_after.unwrap_or(NaiveDate::MIN);
    let usage = LeaveUsage::tally(
        requests.iter().filter(|request| query.matches(request)),
        year_start,
    );
    LeaveBalance::new(allowance, usage)
}
