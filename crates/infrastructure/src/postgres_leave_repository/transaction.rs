use sqlx::{Postgres, Transaction};

use super::*;

/// Unit of work over one PostgreSQL transaction. Dropping it rolls back.
pub(super) struct PostgresLeaveTransaction {
    transaction: Transaction<'static, Postgres>,
}

impl PostgresLeaveTransaction {
    pub(super) fn new(transaction: Transaction<'static, Postgres>) -> Self {
        Self { transaction }
    }
}

#[async_trait]
impl LeaveTransaction for PostgresLeaveTransaction {
    async fn lock_requester(&mut self, user_id: UserId) -> AppResult<()> {
        let locked = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT id
            FROM employees
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&mut *self.transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to lock employee '{user_id}': {error}"))
        })?;

        locked
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("employee '{user_id}' does not exist")))
    }

    async fn list_leave_requests(
        &mut self,
        query: LeaveRequestQuery,
    ) -> AppResult<Vec<LeaveRequest>> {
        list_leave_requests(&mut self.transaction, query).await
    }

    async fn insert_leave_request(&mut self, request: &LeaveRequest) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO leave_requests (
                id,
                user_id,
                leave_type_id,
                doa_id,
                reason,
                start_date,
                end_date,
                duration_days,
                uploads,
                status,
                current_approval_id,
                created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(request.id().as_uuid())
        .bind(request.user_id().as_uuid())
        .bind(request.leave_type_id().as_uuid())
        .bind(request.doa_id().map(|doa_id| doa_id.as_uuid()))
        .bind(request.reason())
        .bind(request.date_range().start_date())
        .bind(request.date_range().end_date())
        .bind(request.duration_days())
        .bind(request.uploads())
        .bind(request.status().as_str())
        .bind(request.current_approval_id().map(|approval_id| approval_id.as_uuid()))
        .bind(request.created_at())
        .execute(&mut *self.transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to insert leave request '{}': {error}",
                request.id()
            ))
        })?;

        let (phases, approvers): (Vec<i32>, Vec<Uuid>) = request
            .approval_chain()
            .slots()
            .iter()
            .map(|slot| (slot.phase, slot.approver_id.as_uuid()))
            .unzip();

        sqlx::query(
            r#"
            INSERT INTO leave_approval_chain (leave_request_id, phase, approver_id)
            SELECT $1, slots.phase, slots.approver_id
            FROM UNNEST($2::INT[], $3::UUID[]) AS slots(phase, approver_id)
            "#,
        )
        .bind(request.id().as_uuid())
        .bind(phases)
        .bind(approvers)
        .execute(&mut *self.transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to insert approval chain of leave request '{}': {error}",
                request.id()
            ))
        })?;

        Ok(())
    }

    async fn lock_leave_request(
        &mut self,
        leave_request_id: LeaveRequestId,
    ) -> AppResult<Option<LeaveRequest>> {
        find_leave_request(&mut self.transaction, leave_request_id, true).await
    }

    async fn update_leave_request(&mut self, request: &LeaveRequest) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE leave_requests
            SET
                status = $2,
                current_approval_id = $3,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(request.id().as_uuid())
        .bind(request.status().as_str())
        .bind(request.current_approval_id().map(|approval_id| approval_id.as_uuid()))
        .execute(&mut *self.transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to update leave request '{}': {error}",
                request.id()
            ))
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "leave request '{}' does not exist",
                request.id()
            )));
        }

        Ok(())
    }

    async fn delete_leave_request(&mut self, leave_request_id: LeaveRequestId) -> AppResult<()> {
        sqlx::query("DELETE FROM leave_requests WHERE id = $1")
            .bind(leave_request_id.as_uuid())
            .execute(&mut *self.transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!(
                    "failed to delete leave request '{leave_request_id}': {error}"
                ))
            })?;

        Ok(())
    }

    async fn insert_approval(&mut self, approval: &Approval) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO leave_approvals (
                id,
                leave_request_id,
                phase,
                approver_id,
                status,
                note,
                action_date,
                acted_by,
                created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(approval.id().as_uuid())
        .bind(approval.leave_request_id().as_uuid())
        .bind(approval.phase())
        .bind(approval.approver_id().as_uuid())
        .bind(approval.status().as_str())
        .bind(approval.note())
        .bind(approval.action_date())
        .bind(approval.acted_by().map(|user_id| user_id.as_uuid()))
        .bind(approval.created_at())
        .execute(&mut *self.transaction)
        .await
        .map_err(|error| {
            if let sqlx::Error::Database(database_error) = &error
                && database_error.code().as_deref() == Some("23505")
            {
                return AppError::Conflict(format!(
                    "leave request '{}' already has an active approval step",
                    approval.leave_request_id()
                ));
            }
            AppError::Internal(format!(
                "failed to insert approval '{}': {error}",
                approval.id()
            ))
        })?;

        Ok(())
    }

    async fn find_approval(&mut self, approval_id: ApprovalId) -> AppResult<Option<Approval>> {
        find_approval(&mut self.transaction, approval_id, false).await
    }

    async fn lock_approval(&mut self, approval_id: ApprovalId) -> AppResult<Option<Approval>> {
        find_approval(&mut self.transaction, approval_id, true).await
    }

    async fn update_approval(&mut self, approval: &Approval) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE leave_approvals
            SET
                status = $2,
                note = $3,
                action_date = $4,
                acted_by = $5
            WHERE id = $1
            "#,
        )
        .bind(approval.id().as_uuid())
        .bind(approval.status().as_str())
        .bind(approval.note())
        .bind(approval.action_date())
        .bind(approval.acted_by().map(|user_id| user_id.as_uuid()))
        .execute(&mut *self.transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to update approval '{}': {error}",
                approval.id()
            ))
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "approval '{}' does not exist",
                approval.id()
            )));
        }

        Ok(())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit leave transaction: {error}"))
        })
    }
}
