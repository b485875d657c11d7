//! Database fixtures for adapter tests. Every helper panics on failure.

use peoplehub_core::UserId;
use peoplehub_domain::{DepartmentId, EntitlementId, LevelId};
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Connects to `DATABASE_URL` and applies migrations, or returns `None` when unset.
pub(crate) async fn test_pool() -> Option<PgPool> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        return None;
    };

    let pool = match PgPoolOptions::new()
        .max_connections(4)
        .connect(database_url.as_str())
        .await
    {
        Ok(pool) => pool,
        Err(error) => panic!("failed to connect to DATABASE_URL in test: {error}"),
    };

    if let Err(error) = MIGRATOR.run(&pool).await {
        panic!("failed to run migrations for postgres adapter tests: {error}");
    }

    Some(pool)
}

async fn execute(pool: &PgPool, query: sqlx::query::Query<'_, sqlx::Postgres, sqlx::postgres::PgArguments>) {
    if let Err(error) = query.execute(pool).await {
        panic!("fixture insert failed: {error}");
    }
}

pub(crate) async fn insert_level(pool: &PgPool) -> LevelId {
    let level_id = LevelId::new();
    execute(
        pool,
        sqlx::query("INSERT INTO levels (id, name) VALUES ($1, $2)")
            .bind(level_id.as_uuid())
            .bind(format!("Level {level_id}")),
    )
    .await;
    level_id
}

pub(crate) async fn insert_leave_entitlement(
    pool: &PgPool,
    level_id: LevelId,
    name: &str,
    value: i64,
) -> EntitlementId {
    let entitlement_id = EntitlementId::new();
    execute(
        pool,
        sqlx::query("INSERT INTO entitlements (id, name, unit, kind) VALUES ($1, $2, 'days', 'leave')")
            .bind(entitlement_id.as_uuid())
            .bind(name),
    )
    .await;
    execute(
        pool,
        sqlx::query(
            "INSERT INTO level_entitlements (level_id, entitlement_id, value) VALUES ($1, $2, $3)",
        )
        .bind(level_id.as_uuid())
        .bind(entitlement_id.as_uuid())
        .bind(value),
    )
    .await;
    entitlement_id
}

pub(crate) async fn insert_department(pool: &PgPool, name: &str) -> DepartmentId {
    let department_id = DepartmentId::new();
    execute(
        pool,
        sqlx::query("INSERT INTO departments (id, name) VALUES ($1, $2)")
            .bind(department_id.as_uuid())
            .bind(name),
    )
    .await;
    department_id
}

pub(crate) async fn insert_employee(
    pool: &PgPool,
    department_id: Option<DepartmentId>,
    level_id: Option<LevelId>,
) -> UserId {
    let user_id = UserId::new();
    execute(
        pool,
        sqlx::query(
            r#"
            INSERT INTO employees (id, first_name, last_name, email, department_id, level_id)
            VALUES ($1, 'Test', 'Employee', $2, $3, $4)
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(format!("{}@example.com", Uuid::new_v4()))
        .bind(department_id.map(|value| value.as_uuid()))
        .bind(level_id.map(|value| value.as_uuid())),
    )
    .await;
    user_id
}

pub(crate) async fn set_department_head(pool: &PgPool, department_id: DepartmentId, head_id: UserId) {
    execute(
        pool,
        sqlx::query("UPDATE departments SET head_id = $2 WHERE id = $1")
            .bind(department_id.as_uuid())
            .bind(head_id.as_uuid()),
    )
    .await;
}
