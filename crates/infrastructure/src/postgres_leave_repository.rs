use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use peoplehub_application::{LeaveRepository, LeaveRequestQuery, LeaveTransaction};
use peoplehub_core::{AppError, AppResult, UserId};
use peoplehub_domain::{
    Approval, ApprovalChain, ApprovalId, ApprovalStatus, ChainSlot, EntitlementId,
    LeaveDateRange, LeaveRequest, LeaveRequestId, LeaveStatus, NewLeaveRequest,
};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

mod transaction;

use transaction::PostgresLeaveTransaction;

/// PostgreSQL-backed leave request and approval repository.
#[derive(Clone)]
pub struct PostgresLeaveRepository {
    pool: PgPool,
}

impl PostgresLeaveRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn connection(&self) -> AppResult<sqlx::pool::PoolConnection<sqlx::Postgres>> {
        self.pool.acquire().await.map_err(|error| {
            AppError::Internal(format!("failed to acquire leave database connection: {error}"))
        })
    }
}

#[derive(Debug, FromRow)]
struct LeaveRequestRow {
    id: Uuid,
    user_id: Uuid,
    leave_type_id: Uuid,
    doa_id: Option<Uuid>,
    reason: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    duration_days: i64,
    uploads: Vec<String>,
    status: String,
    current_approval_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct ChainSlotRow {
    leave_request_id: Uuid,
    phase: i32,
    approver_id: Uuid,
}

#[derive(Debug, FromRow)]
struct ApprovalRow {
    id: Uuid,
    leave_request_id: Uuid,
    phase: i32,
    approver_id: Uuid,
    status: String,
    note: Option<String>,
    action_date: Option<DateTime<Utc>>,
    acted_by: Option<Uuid>,
    created_at: DateTime<Utc>,
}

const SELECT_LEAVE_REQUEST: &str = r#"
    SELECT
        id, user_id, leave_type_id, doa_id, reason, start_date, end_date,
        duration_days, uploads, status, current_approval_id, created_at
    FROM leave_requests
    WHERE id = $1
"#;

const LOCK_LEAVE_REQUEST: &str = r#"
    SELECT
        id, user_id, leave_type_id, doa_id, reason, start_date, end_date,
        duration_days, uploads, status, current_approval_id, created_at
    FROM leave_requests
    WHERE id = $1
    FOR UPDATE
"#;

const SELECT_APPROVAL: &str = r#"
    SELECT
        id, leave_request_id, phase, approver_id, status, note, action_date, acted_by, created_at
    FROM leave_approvals
    WHERE id = $1
"#;

const LOCK_APPROVAL: &str = r#"
    SELECT
        id, leave_request_id, phase, approver_id, status, note, action_date, acted_by, created_at
    FROM leave_approvals
    WHERE id = $1
    FOR UPDATE
"#;

#[async_trait]
impl LeaveRepository for PostgresLeaveRepository {
    async fn begin(&self) -> AppResult<Box<dyn LeaveTransaction>> {
        let transaction = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!("failed to start leave transaction: {error}"))
        })?;

        Ok(Box::new(PostgresLeaveTransaction::new(transaction)))
    }

    async fn find_leave_request(
        &self,
        leave_request_id: LeaveRequestId,
    ) -> AppResult<Option<LeaveRequest>> {
        let mut connection = self.connection().await?;
        find_leave_request(&mut connection, leave_request_id, false).await
    }

    async fn list_leave_requests(&self, query: LeaveRequestQuery) -> AppResult<Vec<LeaveRequest>> {
        let mut connection = self.connection().await?;
        list_leave_requests(&mut connection, query).await
    }

    async fn list_approvals(&self, leave_request_id: LeaveRequestId) -> AppResult<Vec<Approval>> {
        let rows = sqlx::query_as::<_, ApprovalRow>(
            r#"
            SELECT
                id, leave_request_id, phase, approver_id, status, note,
                action_date, acted_by, created_at
            FROM leave_approvals
            WHERE leave_request_id = $1
            ORDER BY phase ASC
            "#,
        )
        .bind(leave_request_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to list approvals of leave request '{leave_request_id}': {error}"
            ))
        })?;

        rows.into_iter().map(approval_from_row).collect()
    }

    async fn list_current_approvals_for_approver(
        &self,
        approver_id: UserId,
    ) -> AppResult<Vec<Approval>> {
        let rows = sqlx::query_as::<_, ApprovalRow>(
            r#"
            SELECT
                approvals.id,
                approvals.leave_request_id,
                approvals.phase,
                approvals.approver_id,
                approvals.status,
                approvals.note,
                approvals.action_date,
                approvals.acted_by,
                approvals.created_at
            FROM leave_approvals approvals
            INNER JOIN leave_requests requests
                ON requests.current_approval_id = approvals.id
            WHERE approvals.approver_id = $1
              AND approvals.status = 'pending'
              AND requests.status = 'pending'
            ORDER BY approvals.created_at ASC
            "#,
        )
        .bind(approver_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to list pending approvals of user '{approver_id}': {error}"
            ))
        })?;

        rows.into_iter().map(approval_from_row).collect()
    }
}

async fn find_leave_request(
    connection: &mut PgConnection,
    leave_request_id: LeaveRequestId,
    lock: bool,
) -> AppResult<Option<LeaveRequest>> {
    let sql = if lock {
        LOCK_LEAVE_REQUEST
    } else {
        SELECT_LEAVE_REQUEST
    };

    let row = sqlx::query_as::<_, LeaveRequestRow>(sql)
        .bind(leave_request_id.as_uuid())
        .fetch_optional(&mut *connection)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to load leave request '{leave_request_id}': {error}"
            ))
        })?;

    let Some(row) = row else {
        return Ok(None);
    };

    let mut requests = with_chains(connection, vec![row]).await?;
    Ok(requests.pop())
}

async fn list_leave_requests(
    connection: &mut PgConnection,
    query: LeaveRequestQuery,
) -> AppResult<Vec<LeaveRequest>> {
    let rows = sqlx::query_as::<_, LeaveRequestRow>(
        r#"
        SELECT
            id, user_id, leave_type_id, doa_id, reason, start_date, end_date,
            duration_days, uploads, status, current_approval_id, created_at
        FROM leave_requests
        WHERE user_id = $1
          AND ($2::UUID IS NULL OR leave_type_id = $2)
          AND ($3::DATE IS NULL OR start_date >= $3)
          AND ($4::DATE IS NULL OR start_date <= $4)
          AND ($5::TEXT IS NULL OR status = $5)
        ORDER BY start_date DESC, created_at DESC
        "#,
    )
    .bind(query.user_id.as_uuid())
    .bind(query.leave_type_id.map(|leave_type_id| leave_type_id.as_uuid()))
    .bind(query.starting_on_or_after)
    .bind(query.starting_on_or_before)
    .bind(query.status.map(|status| status.as_str()))
    .fetch_all(&mut *connection)
    .await
    .map_err(|error| {
        AppError::Internal(format!(
            "failed to list leave requests of user '{}': {error}",
            query.user_id
        ))
    })?;

    with_chains(connection, rows).await
}

async fn with_chains(
    connection: &mut PgConnection,
    rows: Vec<LeaveRequestRow>,
) -> AppResult<Vec<LeaveRequest>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let request_ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
    let slot_rows = sqlx::query_as::<_, ChainSlotRow>(
        r#"
        SELECT leave_request_id, phase, approver_id
        FROM leave_approval_chain
        WHERE leave_request_id = ANY($1)
        ORDER BY leave_request_id, phase
        "#,
    )
    .bind(&request_ids)
    .fetch_all(&mut *connection)
    .await
    .map_err(|error| {
        AppError::Internal(format!("failed to load leave approval chains: {error}"))
    })?;

    let mut chains: HashMap<Uuid, Vec<ChainSlot>> = HashMap::new();
    for slot in slot_rows {
        chains.entry(slot.leave_request_id).or_default().push(ChainSlot {
            phase: slot.phase,
            approver_id: UserId::from_uuid(slot.approver_id),
        });
    }

    rows.into_iter()
        .map(|row| {
            let slots = chains.remove(&row.id).unwrap_or_default();
            leave_request_from_row(row, slots)
        })
        .collect()
}

async fn find_approval(
    connection: &mut PgConnection,
    approval_id: ApprovalId,
    lock: bool,
) -> AppResult<Option<Approval>> {
    let sql = if lock { LOCK_APPROVAL } else { SELECT_APPROVAL };

    let row = sqlx::query_as::<_, ApprovalRow>(sql)
        .bind(approval_id.as_uuid())
        .fetch_optional(&mut *connection)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to load approval '{approval_id}': {error}"))
        })?;

    row.map(approval_from_row).transpose()
}

/// Stored rows that fail domain checks are server faults, not client input errors.
fn corrupted(kind: &'static str, id: Uuid) -> impl FnOnce(AppError) -> AppError {
    move |error| AppError::Internal(format!("stored {kind} '{id}' is invalid: {error}"))
}

fn leave_request_from_row(row: LeaveRequestRow, slots: Vec<ChainSlot>) -> AppResult<LeaveRequest> {
    let id = row.id;
    decode_leave_request(row, slots).map_err(corrupted("leave request", id))
}

fn decode_leave_request(row: LeaveRequestRow, slots: Vec<ChainSlot>) -> AppResult<LeaveRequest> {
    let details = NewLeaveRequest::from_storage(
        LeaveRequestId::from_uuid(row.id),
        UserId::from_uuid(row.user_id),
        EntitlementId::from_uuid(row.leave_type_id),
        row.doa_id.map(UserId::from_uuid),
        row.reason,
        LeaveDateRange::new(row.start_date, row.end_date)?,
        row.duration_days,
        row.uploads,
    )?;

    LeaveRequest::from_storage(
        details,
        LeaveStatus::parse(row.status.as_str())?,
        row.current_approval_id.map(ApprovalId::from_uuid),
        ApprovalChain::from_slots(slots)?,
        row.created_at,
    )
}

fn approval_from_row(row: ApprovalRow) -> AppResult<Approval> {
    let id = row.id;
    let status = ApprovalStatus::parse(row.status.as_str()).map_err(corrupted("approval", id))?;

    Ok(Approval::from_storage(
        ApprovalId::from_uuid(row.id),
        LeaveRequestId::from_uuid(row.leave_request_id),
        row.phase,
        UserId::from_uuid(row.approver_id),
        status,
        row.note,
        row.action_date,
        row.acted_by.map(UserId::from_uuid),
        row.created_at,
    ))
}
