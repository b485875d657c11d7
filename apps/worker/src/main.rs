//! PeopleHub notification worker.
//!
//! Drains the leave notification outbox and delivers one e-mail per event.
//! Run with the `migrate` argument to apply database migrations and exit.

#![forbid(unsafe_code)]

mod config;

use std::sync::Arc;

use peoplehub_application::{EmailService, NotificationService};
use peoplehub_core::{AppError, AppResult};
use peoplehub_infrastructure::{
    ClaimedLeaveEvent, ConsoleEmailService, PostgresLeaveEventOutbox,
    PostgresOrganizationRepository, SmtpEmailService,
};
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{EmailProvider, WorkerConfig};

static MIGRATOR: Migrator = sqlx::migrate!("../../crates/infrastructure/migrations");

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = WorkerConfig::from_env()?;
    let pool = connect_pool(&config).await?;

    if std::env::args().nth(1).as_deref() == Some("migrate") {
        MIGRATOR.run(&pool).await.map_err(|error| {
            AppError::Internal(format!("failed to apply migrations: {error}"))
        })?;
        info!("migrations applied");
        return Ok(());
    }

    let outbox = PostgresLeaveEventOutbox::new(pool.clone());
    let notifications = NotificationService::new(
        Arc::new(PostgresOrganizationRepository::new(pool)),
        email_service(&config.email_provider)?,
    );

    info!(
        worker_id = %config.worker_id,
        batch_size = config.batch_size,
        poll_interval_ms = config.poll_interval.as_millis(),
        "peoplehub-worker started"
    );

    loop {
        match outbox
            .claim_pending(config.worker_id.as_str(), config.batch_size)
            .await
        {
            Ok(claimed) if claimed.is_empty() => {
                tokio::time::sleep(config.poll_interval).await;
            }
            Ok(claimed) => {
                info!(
                    worker_id = %config.worker_id,
                    claimed_count = claimed.len(),
                    "claimed leave notifications"
                );
                for event in claimed {
                    deliver(&outbox, &notifications, event).await;
                }
            }
            Err(error) => {
                warn!(
                    worker_id = %config.worker_id,
                    error = %error,
                    "failed to claim leave notifications"
                );
                tokio::time::sleep(config.poll_interval).await;
            }
        }
    }
}

async fn deliver(
    outbox: &PostgresLeaveEventOutbox,
    notifications: &NotificationService,
    claimed: ClaimedLeaveEvent,
) {
    let leave_request_id = claimed.event.leave().leave_request_id;
    let settled = match notifications.deliver(&claimed.event).await {
        Ok(()) => outbox.mark_delivered(claimed.id).await,
        Err(error) => {
            warn!(
                outbox_id = claimed.id,
                leave_request_id = %leave_request_id,
                event = claimed.event.kind().as_str(),
                error = %error,
                "leave notification delivery failed"
            );
            outbox.mark_failed(claimed.id, &error.to_string()).await
        }
    };

    if let Err(error) = settled {
        warn!(
            outbox_id = claimed.id,
            leave_request_id = %leave_request_id,
            error = %error,
            "failed to settle leave notification"
        );
    }
}

fn email_service(provider: &EmailProvider) -> AppResult<Arc<dyn EmailService>> {
    match provider {
        EmailProvider::Console => Ok(Arc::new(ConsoleEmailService::new())),
        EmailProvider::Smtp(smtp) => Ok(Arc::new(SmtpEmailService::new(smtp.clone())?)),
    }
}

async fn connect_pool(config: &WorkerConfig) -> AppResult<PgPool> {
    PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(config.database_url.as_str())
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}
