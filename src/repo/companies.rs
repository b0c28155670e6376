//! PostgreSQL persistence for companies.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::domain::companies::{
    Company, CompanyError, CompanyRepository, CompanyStatus, ListCompaniesFilter, NewCompany,
};
use crate::services::db::{self, TxContext};
use crate::services::page::{self, Page};

const UNIQUE_VIOLATION: &str = "23505";

pub struct PgCompanyRepository {
    pool: PgPool,
}

impl PgCompanyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CompanyRow {
    id: Uuid,
    name: String,
    code: String,
    status: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CompanyRow> for Company {
    type Error = sqlx::Error;

    fn try_from(row: CompanyRow) -> Result<Company, sqlx::Error> {
        let status = CompanyStatus::parse(&row.status).ok_or_else(|| {
            sqlx::Error::Decode(format!("unknown company status {:?}", row.status).into())
        })?;
        Ok(Company {
            id: row.id,
            name: row.name,
            code: row.code,
            status,
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

async fn insert_company<'e, E>(executor: E, company: &NewCompany) -> Result<CompanyRow, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        INSERT INTO companies (name, code, status, description, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, name, code, status, description, created_at, updated_at
        "#,
    )
    .bind(&company.name)
    .bind(&company.code)
    .bind(company.status.as_str())
    .bind(&company.description)
    .bind(company.created_at)
    .bind(company.updated_at)
    .fetch_one(executor)
    .await
}

async fn update_company<'e, E>(executor: E, company: &Company) -> Result<CompanyRow, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        UPDATE companies
           SET name = $1,
               code = $2,
               status = $3,
               description = $4,
               updated_at = $5
         WHERE id = $6
        RETURNING id, name, code, status, description, created_at, updated_at
        "#,
    )
    .bind(&company.name)
    .bind(&company.code)
    .bind(company.status.as_str())
    .bind(&company.description)
    .bind(company.updated_at)
    .bind(company.id)
    .fetch_one(executor)
    .await
}

async fn delete_company<'e, E>(executor: E, id: Uuid) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query("DELETE FROM companies WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

async fn select_company_by_id<'e, E>(executor: E, id: Uuid) -> Result<CompanyRow, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        SELECT id, name, code, status, description, created_at, updated_at
          FROM companies
         WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_one(executor)
    .await
}

async fn select_company_by_code<'e, E>(
    executor: E,
    code: &str,
) -> Result<Option<CompanyRow>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        SELECT id, name, code, status, description, created_at, updated_at
          FROM companies
         WHERE code = $1
        "#,
    )
    .bind(code)
    .fetch_optional(executor)
    .await
}

async fn select_companies<'e, E>(
    executor: E,
    status: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<Vec<CompanyRow>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    // One probe row past the page size decides whether a next page exists.
    sqlx::query_as(
        r#"
        SELECT id, name, code, status, description, created_at, updated_at
          FROM companies
         WHERE ($1::text IS NULL OR status = $1)
         ORDER BY created_at DESC, id DESC
         LIMIT $2 OFFSET $3
        "#,
    )
    .bind(status)
    .bind(limit + 1)
    .bind(offset)
    .fetch_all(executor)
    .await
}

#[async_trait]
impl CompanyRepository for PgCompanyRepository {
    async fn create(&self, ctx: &TxContext, company: NewCompany) -> Result<Company, CompanyError> {
        let mut handle = db::acquire(ctx, &self.pool).await.map_err(translate_error)?;
        let row = insert_company(handle.as_conn().map_err(translate_error)?, &company)
            .await
            .map_err(translate_error)?;
        Company::try_from(row).map_err(translate_error)
    }

    async fn update(&self, ctx: &TxContext, company: &Company) -> Result<Company, CompanyError> {
        let mut handle = db::acquire(ctx, &self.pool).await.map_err(translate_error)?;
        let row = update_company(handle.as_conn().map_err(translate_error)?, company)
            .await
            .map_err(translate_error)?;
        Company::try_from(row).map_err(translate_error)
    }

    async fn delete(&self, ctx: &TxContext, id: Uuid) -> Result<(), CompanyError> {
        let mut handle = db::acquire(ctx, &self.pool).await.map_err(translate_error)?;
        let affected = delete_company(handle.as_conn().map_err(translate_error)?, id)
            .await
            .map_err(translate_error)?;
        if affected == 0 {
            return Err(CompanyError::NotFound);
        }
        Ok(())
    }

    async fn find_by_id(&self, ctx: &TxContext, id: Uuid) -> Result<Company, CompanyError> {
        let mut handle = db::acquire(ctx, &self.pool).await.map_err(translate_error)?;
        let row = select_company_by_id(handle.as_conn().map_err(translate_error)?, id)
            .await
            .map_err(translate_error)?;
        Company::try_from(row).map_err(translate_error)
    }

    async fn find_by_code(
        &self,
        ctx: &TxContext,
        code: &str,
    ) -> Result<Option<Company>, CompanyError> {
        let mut handle = db::acquire(ctx, &self.pool).await.map_err(translate_error)?;
        let row = select_company_by_code(handle.as_conn().map_err(translate_error)?, code)
            .await
            .map_err(translate_error)?;
        row.map(Company::try_from)
            .transpose()
            .map_err(translate_error)
    }

    async fn list(
        &self,
        ctx: &TxContext,
        filter: ListCompaniesFilter,
    ) -> Result<Page<Company>, CompanyError> {
        page::check_window(filter.limit, filter.offset)?;

        let mut handle = db::acquire(ctx, &self.pool).await.map_err(translate_error)?;
        let rows = select_companies(
            handle.as_conn().map_err(translate_error)?,
            filter.status.map(|s| s.as_str()),
            filter.limit,
            filter.offset,
        )
        .await
        .map_err(translate_error)?;

        let companies = rows
            .into_iter()
            .map(Company::try_from)
            .collect::<Result<Vec<_>, _>>()
            .map_err(translate_error)?;
        Ok(page::paginate(companies, filter.limit, filter.offset))
    }
}

fn translate_error(err: sqlx::Error) -> CompanyError {
    if matches!(err, sqlx::Error::RowNotFound) {
        return CompanyError::NotFound;
    }
    if let sqlx::Error::Database(db_err) = &err {
        if let Some(mapped) = classify(db_err.code().as_deref(), db_err.constraint()) {
            return mapped;
        }
    }
    CompanyError::Storage(err)
}

/// SQLSTATE table for companies.
fn classify(code: Option<&str>, _constraint: Option<&str>) -> Option<CompanyError> {
    match code {
        Some(UNIQUE_VIOLATION) => Some(CompanyError::CodeAlreadyExists),
        _ => None,
    }
}
