use async_trait::async_trait;
use peoplehub_application::LeaveEventPublisher;
use peoplehub_core::{AppError, AppResult};
use peoplehub_domain::LeaveEvent;
use sqlx::{FromRow, PgPool};
use tracing::warn;

/// Leave event written to the outbox and claimed by one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimedLeaveEvent {
    /// Outbox row identifier.
    pub id: i64,
    /// Decoded event.
    pub event: LeaveEvent,
}

/// PostgreSQL outbox for leave notifications.
///
/// Publishing inserts a `pending` row. Workers claim rows with
/// `FOR UPDATE SKIP LOCKED`, so each event is handed to exactly one worker, and
/// settle them as `delivered` or `failed`. Failed rows are kept for inspection
/// and never retried.
#[derive(Clone)]
pub struct PostgresLeaveEventOutbox {
    pool: PgPool,
}

#[derive(Debug, FromRow)]
struct ClaimedRow {
    id: i64,
    payload: serde_json::Value,
}

/// Splits claimed rows into decoded events and `(id, reason)` pairs for bad payloads.
fn decode_claimed(rows: Vec<ClaimedRow>) -> (Vec<ClaimedLeaveEvent>, Vec<(i64, String)>) {
    let mut claimed = Vec::with_capacity(rows.len());
    let mut undecodable = Vec::new();
    for row in rows {
        match serde_json::from_value::<LeaveEvent>(row.payload) {
            Ok(event) => claimed.push(ClaimedLeaveEvent { id: row.id, event }),
            Err(error) => undecodable.push((row.id, format!("invalid payload: {error}"))),
        }
    }
    (claimed, undecodable)
}

impl PostgresLeaveEventOutbox {
    /// Creates an outbox over the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Claims up to `limit` pending events, oldest first.
    pub async fn claim_pending(
        &self,
        worker_id: &str,
        limit: usize,
    ) -> AppResult<Vec<ClaimedLeaveEvent>> {
        let limit = i64::try_from(limit).map_err(|error| {
            AppError::Validation(format!("invalid outbox claim limit: {error}"))
        })?;

        let mut rows = sqlx::query_as::<_, ClaimedRow>(
            r#"
            WITH candidates AS (
                SELECT id
                FROM leave_notification_outbox
                WHERE status = 'pending'
                ORDER BY created_at ASC, id ASC
                LIMIT $1
                FOR UPDATE SKIP LOCKED
            )
            UPDATE leave_notification_outbox AS outbox
            SET status = 'processing',
                claimed_by = $2,
                claimed_at = now()
            FROM candidates
            WHERE outbox.id = candidates.id
            RETURNING outbox.id, outbox.payload
            "#,
        )
        .bind(limit)
        .bind(worker_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to claim leave notifications for worker '{worker_id}': {error}"
            ))
        })?;
        rows.sort_by_key(|row| row.id);

        let (claimed, undecodable) = decode_claimed(rows);
        for (id, reason) in undecodable {
            warn!(outbox_id = id, error = %reason, "undecodable leave notification payload");
            if let Err(error) = self.mark_failed(id, &reason).await {
                warn!(
                    outbox_id = id,
                    error = %error,
                    "failed to mark undecodable leave notification as failed"
                );
            }
        }

        Ok(claimed)
    }

    /// Marks a claimed event as delivered.
    pub async fn mark_delivered(&self, id: i64) -> AppResult<()> {
        self.settle(id, "delivered", None).await
    }

    /// Marks a claimed event as failed and records the error.
    pub async fn mark_failed(&self, id: i64, error_message: &str) -> AppResult<()> {
        self.settle(id, "failed", Some(error_message)).await
    }

    async fn settle(&self, id: i64, status: &str, error_message: Option<&str>) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE leave_notification_outbox
            SET status = $2,
                last_error = $3,
                finished_at = now()
            WHERE id = $1
              AND status = 'processing'
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(error_message)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to mark leave notification '{id}' as {status}: {error}"
            ))
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::Conflict(format!(
                "leave notification '{id}' is not currently claimed"
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl LeaveEventPublisher for PostgresLeaveEventOutbox {
    async fn publish(&self, event: LeaveEvent) -> AppResult<()> {
        let payload = serde_json::to_value(&event).map_err(|error| {
            AppError::Internal(format!("failed to encode leave event payload: {error}"))
        })?;

        sqlx::query(
            r#"
            INSERT INTO leave_notification_outbox (
                event_type,
                leave_request_id,
                recipient_id,
                payload
            )
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(event.kind().as_str())
        .bind(event.leave().leave_request_id.as_uuid())
        .bind(event.recipient_id().as_uuid())
        .bind(payload)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to enqueue {} notification for leave request '{}': {error}",
                event.kind().as_str(),
                event.leave().leave_request_id
            ))
        })?;

        Ok(())
    }
}
