//! PostgreSQL persistence for users.
//!
//! Query functions are generic over the executor so the same SQL runs inside
//! or outside an ambient transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::domain::users::{
    ListUsersFilter, NewUser, User, UserError, UserRepository, UserStatus,
};
use crate::services::db::{self, TxContext};
use crate::services::page::{self, Page};

const UNIQUE_VIOLATION: &str = "23505";

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    name: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = sqlx::Error;

    fn try_from(row: UserRow) -> Result<User, sqlx::Error> {
        let status = UserStatus::parse(&row.status).ok_or_else(|| {
            sqlx::Error::Decode(format!("unknown user status {:?}", row.status).into())
        })?;
        Ok(User {
            id: row.id,
            email: row.email,
            name: row.name,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

async fn insert_user<'e, E>(executor: E, user: &NewUser) -> Result<UserRow, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        INSERT INTO users (email, name, status, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, email, name, status, created_at, updated_at
        "#,
    )
    .bind(&user.email)
    .bind(&user.name)
    .bind(user.status.as_str())
    .bind(user.created_at)
    .bind(user.updated_at)
    .fetch_one(executor)
    .await
}

/// The email is a natural key and stays immutable on update.
async fn update_user<'e, E>(executor: E, user: &User) -> Result<UserRow, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        UPDATE users
           SET name = $1,
               status = $2,
               updated_at = $3
         WHERE id = $4
        RETURNING id, email, name, status, created_at, updated_at
        "#,
    )
    .bind(&user.name)
    .bind(user.status.as_str())
    .bind(user.updated_at)
    .bind(user.id)
    .fetch_one(executor)
    .await
}

async fn delete_user<'e, E>(executor: E, id: Uuid) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

async fn select_user_by_id<'e, E>(executor: E, id: Uuid) -> Result<UserRow, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        SELECT id, email, name, status, created_at, updated_at
          FROM users
         WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_one(executor)
    .await
}

async fn select_user_by_email<'e, E>(
    executor: E,
    email: &str,
) -> Result<Option<UserRow>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        SELECT id, email, name, status, created_at, updated_at
          FROM users
         WHERE email = $1
        "#,
    )
    .bind(email)
    .fetch_optional(executor)
    .await
}

async fn select_users<'e, E>(
    executor: E,
    status: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<Vec<UserRow>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    // One probe row past the page size decides whether a next page exists.
    sqlx::query_as(
        r#"
        SELECT id, email, name, status, created_at, updated_at
          FROM users
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
impl UserRepository for PgUserRepository {
    async fn create(&self, ctx: &TxContext, user: NewUser) -> Result<User, UserError> {
        let mut handle = db::acquire(ctx, &self.pool).await.map_err(translate_error)?;
        let row = insert_user(handle.as_conn().map_err(translate_error)?, &user)
            .await
            .map_err(translate_error)?;
        User::try_from(row).map_err(translate_error)
    }

    async fn update(&self, ctx: &TxContext, user: &User) -> Result<User, UserError> {
        let mut handle = db::acquire(ctx, &self.pool).await.map_err(translate_error)?;
        let row = update_user(handle.as_conn().map_err(translate_error)?, user)
            .await
            .map_err(translate_error)?;
        User::try_from(row).map_err(translate_error)
    }

    async fn delete(&self, ctx: &TxContext, id: Uuid) -> Result<(), UserError> {
        let mut handle = db::acquire(ctx, &self.pool).await.map_err(translate_error)?;
        let affected = delete_user(handle.as_conn().map_err(translate_error)?, id)
            .await
            .map_err(translate_error)?;
        if affected == 0 {
            return Err(UserError::NotFound);
        }
        Ok(())
    }

    async fn find_by_id(&self, ctx: &TxContext, id: Uuid) -> Result<User, UserError> {
        let mut handle = db::acquire(ctx, &self.pool).await.map_err(translate_error)?;
        let row = select_user_by_id(handle.as_conn().map_err(translate_error)?, id)
            .await
            .map_err(translate_error)?;
        User::try_from(row).map_err(translate_error)
    }

    async fn find_by_email(
        &self,
        ctx: &TxContext,
        email: &str,
    ) -> Result<Option<User>, UserError> {
        let mut handle = db::acquire(ctx, &self.pool).await.map_err(translate_error)?;
        let row = select_user_by_email(handle.as_conn().map_err(translate_error)?, email)
            .await
            .map_err(translate_error)?;
        row.map(User::try_from).transpose().map_err(translate_error)
    }

    async fn list(
        &self,
        ctx: &TxContext,
        filter: ListUsersFilter,
    ) -> Result<Page<User>, UserError> {
        page::check_window(filter.limit, filter.offset)?;

        let mut handle = db::acquire(ctx, &self.pool).await.map_err(translate_error)?;
        let rows = select_users(
            handle.as_conn().map_err(translate_error)?,
            filter.status.map(|s| s.as_str()),
            filter.limit,
            filter.offset,
        )
        .await
        .map_err(translate_error)?;

        let users = rows
            .into_iter()
            .map(User::try_from)
            .collect::<Result<Vec<_>, _>>()
            .map_err(translate_error)?;
        Ok(page::paginate(users, filter.limit, filter.offset))
    }
}

fn translate_error(err: sqlx::Error) -> UserError {
    if matches!(err, sqlx::Error::RowNotFound) {
        return UserError::NotFound;
    }
    if let sqlx::Error::Database(db_err) = &err {
        if let Some(mapped) = classify(db_err.code().as_deref(), db_err.constraint()) {
            return mapped;
        }
    }
    UserError::Storage(err)
}

/// SQLSTATE table for users. Unrecognized codes fall through to the caller
/// as infrastructure errors.
fn classify(code: Option<&str>, _constraint: Option<&str>) -> Option<UserError> {
    match code {
        Some(UNIQUE_VIOLATION) => Some(UserError::EmailAlreadyExists),
        _ => None,
    }
}
