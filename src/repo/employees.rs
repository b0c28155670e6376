//! PostgreSQL persistence for employees.
//!
//! Every read returns the referenced user joined as a value snapshot, so
//! writes go through a CTE that re-selects the joined shape.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::domain::employees::{
    Employee, EmployeeError, EmployeeRepository, EmployeeStatus, ListEmployeesFilter, NewEmployee,
    UserSnapshot,
};
use crate::domain::users::UserStatus;
use crate::services::db::{self, TxContext};
use crate::services::page::{self, Page};

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";
const CHECK_VIOLATION: &str = "23514";

const COMPANY_FKEY: &str = "employees_company_id_fkey";
const USER_FKEY: &str = "employees_user_id_fkey";

pub struct PgEmployeeRepository {
    pool: PgPool,
}

impl PgEmployeeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct EmployeeRow {
    id: Uuid,
    company_id: Uuid,
    employee_code: String,
    user_id: Uuid,
    status: String,
    hired_at: Option<NaiveDate>,
    terminated_at: Option<NaiveDate>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    user_email: String,
    user_name: String,
    user_status: String,
    user_created_at: DateTime<Utc>,
    user_updated_at: DateTime<Utc>,
}

impl TryFrom<EmployeeRow> for Employee {
    type Error = sqlx::Error;

    fn try_from(row: EmployeeRow) -> Result<Employee, sqlx::Error> {
        let status = EmployeeStatus::parse(&row.status).ok_or_else(|| {
            sqlx::Error::Decode(format!("unknown employee status {:?}", row.status).into())
        })?;
        let user_status = UserStatus::parse(&row.user_status).ok_or_else(|| {
            sqlx::Error::Decode(format!("unknown user status {:?}", row.user_status).into())
        })?;
        Ok(Employee {
            id: row.id,
            company_id: row.company_id,
            employee_code: row.employee_code,
            user_id: row.user_id,
            status,
            hired_at: row.hired_at,
            terminated_at: row.terminated_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
            user: UserSnapshot {
                id: row.user_id,
                email: row.user_email,
                name: row.user_name,
                status: user_status,
                created_at: row.user_created_at,
                updated_at: row.user_updated_at,
            },
        })
    }
}

const EMPLOYEE_COLUMNS: &str = r#"
        e.id,
        e.company_id,
        e.employee_code,
        e.user_id,
        e.status,
        e.hired_at,
        e.terminated_at,
        e.created_at,
        e.updated_at,
        u.email AS user_email,
        u.name AS user_name,
        u.status AS user_status,
        u.created_at AS user_created_at,
        u.updated_at AS user_updated_at
"#;

async fn insert_employee<'e, E>(
    executor: E,
    employee: &NewEmployee,
) -> Result<EmployeeRow, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let sql = format!(
        r#"
        WITH e AS (
            INSERT INTO employees
                (company_id, employee_code, user_id, status, hired_at, terminated_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, company_id, employee_code, user_id, status, hired_at, terminated_at, created_at, updated_at
        )
        SELECT {cols}
          FROM e
          JOIN users u ON u.id = e.user_id
        "#,
        cols = EMPLOYEE_COLUMNS
    );
    sqlx::query_as(&sql)
        .bind(employee.company_id)
        .bind(&employee.employee_code)
        .bind(employee.user_id)
        .bind(employee.status.as_str())
        .bind(employee.hired_at)
        .bind(employee.terminated_at)
        .bind(employee.created_at)
        .bind(employee.updated_at)
        .fetch_one(executor)
        .await
}

async fn update_employee<'e, E>(executor: E, employee: &Employee) -> Result<EmployeeRow, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let sql = format!(
        r#"
        WITH e AS (
            UPDATE employees
               SET employee_code = $1,
                   user_id = $2,
                   status = $3,
                   hired_at = $4,
                   terminated_at = $5,
                   updated_at = $6
             WHERE id = $7
            RETURNING id, company_id, employee_code, user_id, status, hired_at, terminated_at, created_at, updated_at
        )
        SELECT {cols}
          FROM e
          JOIN users u ON u.id = e.user_id
        "#,
        cols = EMPLOYEE_COLUMNS
    );
    sqlx::query_as(&sql)
        .bind(&employee.employee_code)
        .bind(employee.user_id)
        .bind(employee.status.as_str())
        .bind(employee.hired_at)
        .bind(employee.terminated_at)
        .bind(employee.updated_at)
        .bind(employee.id)
        .fetch_one(executor)
        .await
}

async fn delete_employee<'e, E>(executor: E, id: Uuid) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query("DELETE FROM employees WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

async fn select_employee_by_id<'e, E>(executor: E, id: Uuid) -> Result<EmployeeRow, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let sql = format!(
        r#"
        SELECT {cols}
          FROM employees e
          JOIN users u ON u.id = e.user_id
         WHERE e.id = $1
        "#,
        cols = EMPLOYEE_COLUMNS
    );
    sqlx::query_as(&sql).bind(id).fetch_one(executor).await
}

async fn select_employee_by_company_and_code<'e, E>(
    executor: E,
    company_id: Uuid,
    employee_code: &str,
) -> Result<Option<EmployeeRow>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let sql = format!(
        r#"
        SELECT {cols}
          FROM employees e
          JOIN users u ON u.id = e.user_id
         WHERE e.company_id = $1 AND e.employee_code = $2
        "#,
        cols = EMPLOYEE_COLUMNS
    );
    sqlx::query_as(&sql)
        .bind(company_id)
        .bind(employee_code)
        .fetch_optional(executor)
        .await
}

async fn select_employees<'e, E>(
    executor: E,
    company_id: Uuid,
    status: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<Vec<EmployeeRow>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    // One probe row past the page size decides whether a next page exists.
    let sql = format!(
        r#"
        SELECT {cols}
          FROM employees e
          JOIN users u ON u.id = e.user_id
         WHERE e.company_id = $1
           AND ($2::text IS NULL OR e.status = $2)
         ORDER BY e.created_at DESC, e.id DESC
         LIMIT $3 OFFSET $4
        "#,
        cols = EMPLOYEE_COLUMNS
    );
    sqlx::query_as(&sql)
        .bind(company_id)
        .bind(status)
        .bind(limit + 1)
        .bind(offset)
        .fetch_all(executor)
        .await
}

#[async_trait]
impl EmployeeRepository for PgEmployeeRepository {
    async fn create(
        &self,
        ctx: &TxContext,
        employee: NewEmployee,
    ) -> Result<Employee, EmployeeError> {
        let mut handle = db::acquire(ctx, &self.pool).await.map_err(translate_error)?;
        let row = insert_employee(handle.as_conn().map_err(translate_error)?, &employee)
            .await
            .map_err(translate_error)?;
        Employee::try_from(row).map_err(translate_error)
    }

    async fn update(
        &self,
        ctx: &TxContext,
        employee: &Employee,
    ) -> Result<Employee, EmployeeError> {
        let mut handle = db::acquire(ctx, &self.pool).await.map_err(translate_error)?;
        let row = update_employee(handle.as_conn().map_err(translate_error)?, employee)
            .await
            .map_err(translate_error)?;
        Employee::try_from(row).map_err(translate_error)
    }

    async fn delete(&self, ctx: &TxContext, id: Uuid) -> Result<(), EmployeeError> {
        let mut handle = db::acquire(ctx, &self.pool).await.map_err(translate_error)?;
        let affected = delete_employee(handle.as_conn().map_err(translate_error)?, id)
            .await
            .map_err(translate_error)?;
        if affected == 0 {
            return Err(EmployeeError::NotFound);
        }
        Ok(())
    }

    async fn find_by_id(&self, ctx: &TxContext, id: Uuid) -> Result<Employee, EmployeeError> {
        let mut handle = db::acquire(ctx, &self.pool).await.map_err(translate_error)?;
        let row = select_employee_by_id(handle.as_conn().map_err(translate_error)?, id)
            .await
            .map_err(translate_error)?;
        Employee::try_from(row).map_err(translate_error)
    }

    async fn find_by_company_and_code(
        &self,
        ctx: &TxContext,
        company_id: Uuid,
        employee_code: &str,
    ) -> Result<Option<Employee>, EmployeeError> {
        let mut handle = db::acquire(ctx, &self.pool).await.map_err(translate_error)?;
        let row = select_employee_by_company_and_code(
            handle.as_conn().map_err(translate_error)?,
            company_id,
            employee_code,
        )
        .await
        .map_err(translate_error)?;
        row.map(Employee::try_from)
            .transpose()
            .map_err(translate_error)
    }

    async fn list(
        &self,
        ctx: &TxContext,
        filter: ListEmployeesFilter,
    ) -> Result<Page<Employee>, EmployeeError> {
        page::check_window(filter.limit, filter.offset)?;

        let mut handle = db::acquire(ctx, &self.pool).await.map_err(translate_error)?;
        let rows = select_employees(
            handle.as_conn().map_err(translate_error)?,
            filter.company_id,
            filter.status.map(|s| s.as_str()),
            filter.limit,
            filter.offset,
        )
        .await
        .map_err(translate_error)?;

        let employees = rows
            .into_iter()
            .map(Employee::try_from)
            .collect::<Result<Vec<_>, _>>()
            .map_err(translate_error)?;
        Ok(page::paginate(employees, filter.limit, filter.offset))
    }
}

fn translate_error(err: sqlx::Error) -> EmployeeError {
    if matches!(err, sqlx::Error::RowNotFound) {
        return EmployeeError::NotFound;
    }
    if let sqlx::Error::Database(db_err) = &err {
        if let Some(mapped) = classify(db_err.code().as_deref(), db_err.constraint()) {
            return mapped;
        }
    }
    EmployeeError::Storage(err)
}

/// SQLSTATE table for employees. Foreign-key violations dispatch on the
/// constraint name since the table references both companies and users;
/// an unknown constraint passes through as infrastructure.
fn classify(code: Option<&str>, constraint: Option<&str>) -> Option<EmployeeError> {
    match code {
        Some(UNIQUE_VIOLATION) => Some(EmployeeError::CodeAlreadyExists),
        Some(FOREIGN_KEY_VIOLATION) => match constraint {
            Some(COMPANY_FKEY) => Some(EmployeeError::CompanyNotFound),
            Some(USER_FKEY) => Some(EmployeeError::UserNotFound),
            _ => None,
        },
        Some(CHECK_VIOLATION) => Some(EmployeeError::InvalidEmploymentPeriod),
        _ => None,
    }
}
