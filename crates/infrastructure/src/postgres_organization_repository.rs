use async_trait::async_trait;
use peoplehub_application::{ApproverQuery, ApproverScope, OrganizationRepository};
use peoplehub_core::{AppError, AppResult, UserId};
use peoplehub_domain::{
    Approver, ApproverId, ApproverRole, Department, DepartmentId, Employee, Entitlement,
    EntitlementId, EntitlementKind, LevelEntitlement, LevelId, UserRole,
};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// PostgreSQL-backed organization read models and approver records.
#[derive(Clone)]
pub struct PostgresOrganizationRepository {
    pool: PgPool,
}

impl PostgresOrganizationRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct EmployeeRow {
    id: Uuid,
    first_name: String,
    last_name: String,
    email: String,
    department_id: Option<Uuid>,
    level_id: Option<Uuid>,
    roles: Vec<String>,
}

#[derive(Debug, FromRow)]
struct DepartmentRow {
    id: Uuid,
    name: String,
    head_id: Option<Uuid>,
}

#[derive(Debug, FromRow)]
struct LevelEntitlementRow {
    level_id: Uuid,
    entitlement_id: Uuid,
    name: String,
    unit: String,
    kind: String,
    value: i64,
}

#[derive(Debug, FromRow)]
struct ApproverRow {
    id: Uuid,
    user_id: Uuid,
    role: String,
    department_id: Option<Uuid>,
    is_active: bool,
}

#[async_trait]
impl OrganizationRepository for PostgresOrganizationRepository {
    async fn find_employee(&self, user_id: UserId) -> AppResult<Option<Employee>> {
        let row = sqlx::query_as::<_, EmployeeRow>(
            r#"
            SELECT id, first_name, last_name, email, department_id, level_id, roles
            FROM employees
            WHERE id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to find employee '{user_id}': {error}"))
        })?;

        row.map(employee_from_row).transpose()
    }

    async fn find_department(
        &self,
        department_id: DepartmentId,
    ) -> AppResult<Option<Department>> {
        let row = sqlx::query_as::<_, DepartmentRow>(
            r#"
            SELECT id, name, head_id
            FROM departments
            WHERE id = $1
            "#,
        )
        .bind(department_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to find department '{department_id}': {error}"
            ))
        })?;

        row.map(department_from_row).transpose()
    }

    async fn list_level_entitlements(
        &self,
        level_id: LevelId,
    ) -> AppResult<Vec<LevelEntitlement>> {
        let rows = sqlx::query_as::<_, LevelEntitlementRow>(
            r#"
            SELECT
                bindings.level_id,
                bindings.entitlement_id,
                entitlements.name,
                entitlements.unit,
                entitlements.kind,
                bindings.value
            FROM level_entitlements bindings
            INNER JOIN entitlements
                ON entitlements.id = bindings.entitlement_id
            WHERE bindings.level_id = $1
            ORDER BY entitlements.name
            "#,
        )
        .bind(level_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to list entitlements of level '{level_id}': {error}"
            ))
        })?;

        rows.into_iter().map(level_entitlement_from_row).collect()
    }

    async fn list_active_approvers(&self, query: ApproverQuery) -> AppResult<Vec<Approver>> {
        let (scope, scope_department_id) = match query.scope {
            ApproverScope::Any => ("any", None),
            ApproverScope::Global => ("global", None),
            ApproverScope::Department(department_id) => {
                ("department", Some(department_id.as_uuid()))
            }
            ApproverScope::OtherDepartmentsThan(department_id) => {
                ("other_departments", Some(department_id.as_uuid()))
            }
        };

        let rows = sqlx::query_as::<_, ApproverRow>(
            r#"
            SELECT id, user_id, role, department_id, is_active
            FROM approvers
            WHERE is_active = true
              AND ($1::UUID IS NULL OR user_id = $1)
              AND ($2::TEXT IS NULL OR role = $2)
              AND (
                    $3::TEXT = 'any'
                    OR ($3::TEXT = 'global' AND department_id IS NULL)
                    OR ($3::TEXT = 'department' AND department_id = $4)
                    OR (
                        $3::TEXT = 'other_departments'
                        AND department_id IS NOT NULL
                        AND department_id <> $4
                    )
                  )
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(query.user_id.map(|user_id| user_id.as_uuid()))
        .bind(query.role.map(|role| role.as_str()))
        .bind(scope)
        .bind(scope_department_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list active approvers: {error}"))
        })?;

        rows.into_iter().map(approver_from_row).collect()
    }

    async fn find_approver(&self, approver_id: ApproverId) -> AppResult<Option<Approver>> {
        let row = sqlx::query_as::<_, ApproverRow>(
            r#"
            SELECT id, user_id, role, department_id, is_active
            FROM approvers
            WHERE id = $1
            "#,
        )
        .bind(approver_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to find approver '{approver_id}': {error}"))
        })?;

        row.map(approver_from_row).transpose()
    }

    async fn save_approver(&self, approver: Approver) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO approvers (id, user_id, role, department_id, is_active, updated_at)
            VALUES ($1, $2, $3, $4, $5, now())
            ON CONFLICT (id)
            DO UPDATE SET
                is_active = EXCLUDED.is_active,
                updated_at = now()
            "#,
        )
        .bind(approver.id().as_uuid())
        .bind(approver.user_id().as_uuid())
        .bind(approver.role().as_str())
        .bind(approver.department_id().map(|department_id| department_id.as_uuid()))
        .bind(approver.is_active())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            if is_unique_violation(&error) {
                return AppError::Conflict(format!(
                    "user '{}' already holds an active {} grant for this scope",
                    approver.user_id(),
                    approver.role().as_str()
                ));
            }
            AppError::Internal(format!(
                "failed to save approver '{}': {error}",
                approver.id()
            ))
        })?;

        Ok(())
    }
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(
        error,
        sqlx::Error::Database(database_error) if database_error.code().as_deref() == Some("23505")
    )
}

/// Stored rows that fail domain checks are server faults, not client input errors.
fn corrupted(kind: &'static str, id: Uuid) -> impl FnOnce(AppError) -> AppError {
    move |error| AppError::Internal(format!("stored {kind} '{id}' is invalid: {error}"))
}

fn employee_from_row(row: EmployeeRow) -> AppResult<Employee> {
    let id = row.id;
    decode_employee(row).map_err(corrupted("employee", id))
}

fn decode_employee(row: EmployeeRow) -> AppResult<Employee> {
    let roles = row
        .roles
        .iter()
        .map(|role| UserRole::parse(role))
        .collect::<AppResult<Vec<_>>>()?;

    let mut employee = Employee::new(
        UserId::from_uuid(row.id),
        row.first_name,
        row.last_name,
        row.email,
    )?
    .with_roles(roles);

    if let Some(department_id) = row.department_id {
        employee = employee.with_department(DepartmentId::from_uuid(department_id));
    }
    if let Some(level_id) = row.level_id {
        employee = employee.with_level(LevelId::from_uuid(level_id));
    }

    Ok(employee)
}

fn department_from_row(row: DepartmentRow) -> AppResult<Department> {
    let department = Department::new(DepartmentId::from_uuid(row.id), row.name)
        .map_err(corrupted("department", row.id))?;
    Ok(match row.head_id {
        Some(head_id) => department.with_head(UserId::from_uuid(head_id)),
        None => department,
    })
}

fn level_entitlement_from_row(row: LevelEntitlementRow) -> AppResult<LevelEntitlement> {
    let id = row.entitlement_id;
    decode_level_entitlement(row).map_err(corrupted("entitlement", id))
}

fn decode_level_entitlement(row: LevelEntitlementRow) -> AppResult<LevelEntitlement> {
    let entitlement = Entitlement::new(
        EntitlementId::from_uuid(row.entitlement_id),
        row.name,
        row.unit,
        EntitlementKind::parse(row.kind.as_str())?,
    )?;
    LevelEntitlement::new(LevelId::from_uuid(row.level_id), entitlement, row.value)
}

fn approver_from_row(row: ApproverRow) -> AppResult<Approver> {
    let role = ApproverRole::parse(row.role.as_str()).map_err(corrupted("approver", row.id))?;

    Ok(Approver::from_storage(
        ApproverId::from_uuid(row.id),
        UserId::from_uuid(row.user_id),
        role,
        row.department_id.map(DepartmentId::from_uuid),
        row.is_active,
    ))
}
