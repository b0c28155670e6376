//! User domain: entity, validation, and use cases.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::services::clock::Clock;
use crate::services::db::TxContext;
use crate::services::page::{self, Page, PageError};
use crate::services::tx::{TxError, TxManager};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserStatus {
    Active,
    Inactive,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "active",
            UserStatus::Inactive => "inactive",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "active" => Some(UserStatus::Active),
            "inactive" => Some(UserStatus::Inactive),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for a user row that does not exist yet; the id is assigned by the
/// database.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum UserError {
    #[error("user not found")]
    NotFound,
    #[error("email already exists")]
    EmailAlreadyExists,
    #[error("invalid email")]
    InvalidEmail,
    #[error("invalid name")]
    InvalidName,
    #[error("invalid status")]
    InvalidStatus,
    #[error("invalid id")]
    InvalidId,
    #[error("invalid page size")]
    InvalidPageSize,
    #[error("invalid page token")]
    InvalidPageToken,
    #[error(transparent)]
    Transaction(#[from] TxError),
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

impl From<PageError> for UserError {
    fn from(err: PageError) -> Self {
        match err {
            PageError::InvalidPageSize => UserError::InvalidPageSize,
            PageError::InvalidPageToken => UserError::InvalidPageToken,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ListUsersFilter {
    pub limit: i64,
    pub offset: i64,
    pub status: Option<UserStatus>,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, ctx: &TxContext, user: NewUser) -> Result<User, UserError>;
    async fn update(&self, ctx: &TxContext, user: &User) -> Result<User, UserError>;
    async fn delete(&self, ctx: &TxContext, id: Uuid) -> Result<(), UserError>;
    async fn find_by_id(&self, ctx: &TxContext, id: Uuid) -> Result<User, UserError>;
    async fn find_by_email(
        &self,
        ctx: &TxContext,
        email: &str,
    ) -> Result<Option<User>, UserError>;
    async fn list(
        &self,
        ctx: &TxContext,
        filter: ListUsersFilter,
    ) -> Result<Page<User>, UserError>;
}

#[derive(Debug, Clone)]
pub struct CreateUserInput {
    pub email: String,
    pub name: String,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateUserInput {
    pub id: String,
    pub name: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ListUsersInput {
    pub page_size: i32,
    pub page_token: String,
    pub status: Option<String>,
}

/// User use cases. Multi-step operations run under the transaction
/// coordinator so the uniqueness probe and the write share one transaction.
#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UserRepository>,
    clock: Arc<dyn Clock>,
    tx: TxManager,
}

impl UserService {
    pub fn new(repo: Arc<dyn UserRepository>, clock: Arc<dyn Clock>, tx: TxManager) -> Self {
        Self { repo, clock, tx }
    }

    pub async fn create_user(
        &self,
        ctx: &TxContext,
        input: CreateUserInput,
    ) -> Result<User, UserError> {
        let email = normalize_email(&input.email)?;
        let name = normalize_name(&input.name)?;

        self.tx
            .within_read_write(ctx, move |txctx| {
                Box::pin(async move {
                    if self.repo.find_by_email(&txctx, &email).await?.is_some() {
                        return Err(UserError::EmailAlreadyExists);
                    }

                    let now = self.clock.now();
                    self.repo
                        .create(
                            &txctx,
                            NewUser {
                                email,
                                name,
                                status: UserStatus::Active,
                                created_at: now,
                                updated_at: now,
                            },
                        )
                        .await
                })
            })
            .await
    }

    pub async fn get_user(&self, ctx: &TxContext, id: &str) -> Result<User, UserError> {
        let id = parse_id(id)?;

        self.tx
            .within_read_only(ctx, move |txctx| {
                Box::pin(async move { self.repo.find_by_id(&txctx, id).await })
            })
            .await
    }

    pub async fn list_users(
        &self,
        ctx: &TxContext,
        input: ListUsersInput,
    ) -> Result<Page<User>, UserError> {
        let limit = page::normalize_page_size(input.page_size)?;
        let offset = page::parse_page_token(&input.page_token)?;
        let status = parse_status_filter(input.status.as_deref())?;

        self.tx
            .within_read_only(ctx, move |txctx| {
                Box::pin(async move {
                    self.repo
                        .list(
                            &txctx,
                            ListUsersFilter {
                                limit,
                                offset,
                                status,
                            },
                        )
                        .await
                })
            })
            .await
    }

    pub async fn update_user(
        &self,
        ctx: &TxContext,
        input: UpdateUserInput,
    ) -> Result<User, UserError> {
        let id = parse_id(&input.id)?;

        self.tx
            .within_read_write(ctx, move |txctx| {
                Box::pin(async move {
                    let mut existing = self.repo.find_by_id(&txctx, id).await?;

                    if let Some(name) = &input.name {
                        existing.name = normalize_name(name)?;
                    }

                    if let Some(status) = &input.status {
                        existing.status =
                            UserStatus::parse(status.trim()).ok_or(UserError::InvalidStatus)?;
                    }

                    existing.updated_at = self.clock.now();
                    self.repo.update(&txctx, &existing).await
                })
            })
            .await
    }

    pub async fn delete_user(&self, ctx: &TxContext, id: &str) -> Result<(), UserError> {
        let id = parse_id(id)?;

        self.tx
            .within_read_write(ctx, move |txctx| {
                Box::pin(async move { self.repo.delete(&txctx, id).await })
            })
            .await
    }
}

fn parse_id(raw: &str) -> Result<Uuid, UserError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(UserError::InvalidId);
    }
    Uuid::parse_str(trimmed).map_err(|_| UserError::InvalidId)
}

fn normalize_name(raw: &str) -> Result<String, UserError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(UserError::InvalidName);
    }
    Ok(trimmed.to_string())
}

/// Minimal structural address check: one `@`, non-empty local part, domain
/// with an interior dot. The stored form is lowercased.
fn normalize_email(raw: &str) -> Result<String, UserError> {
    let trimmed = raw.trim();
    let (local, domain) = trimmed.split_once('@').ok_or(UserError::InvalidEmail)?;
    if local.is_empty()
        || domain.is_empty()
        || domain.contains('@')
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
        || trimmed.contains(char::is_whitespace)
    {
        return Err(UserError::InvalidEmail);
    }
    Ok(trimmed.to_ascii_lowercase())
}

fn parse_status_filter(raw: Option<&str>) -> Result<Option<UserStatus>, UserError> {
    match raw {
        None => Ok(None),
        Some(s) => UserStatus::parse(s.trim())
            .map(Some)
            .ok_or(UserError::InvalidStatus),
    }
}
