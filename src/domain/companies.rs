//! Company domain: entity, validation, and use cases.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use thiserror::Error;
use uuid::Uuid;

use crate::services::clock::Clock;
use crate::services::db::TxContext;
use crate::services::page::{self, Page, PageError};
use crate::services::tx::{TxError, TxManager};

static CODE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^[a-z0-9][a-z0-9_-]*$").expect("code pattern"));

/// Shared shape for company and employee codes: lowercase alphanumeric with
/// interior dashes/underscores.
pub(crate) fn code_matches(code: &str) -> bool {
    CODE_PATTERN.is_match(code)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompanyStatus {
    Active,
    Inactive,
}

impl CompanyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompanyStatus::Active => "active",
            CompanyStatus::Inactive => "inactive",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "active" => Some(CompanyStatus::Active),
            "inactive" => Some(CompanyStatus::Inactive),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub status: CompanyStatus,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for a company row that does not exist yet; the id is assigned by
/// the database.
#[derive(Debug, Clone)]
pub struct NewCompany {
    pub name: String,
    pub code: String,
    pub status: CompanyStatus,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum CompanyError {
    #[error("company not found")]
    NotFound,
    #[error("code already exists")]
    CodeAlreadyExists,
    #[error("invalid name")]
    InvalidName,
    #[error("invalid code")]
    InvalidCode,
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

impl From<PageError> for CompanyError {
    fn from(err: PageError) -> Self {
        match err {
            PageError::InvalidPageSize => CompanyError::InvalidPageSize,
            PageError::InvalidPageToken => CompanyError::InvalidPageToken,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ListCompaniesFilter {
    pub limit: i64,
    pub offset: i64,
    pub status: Option<CompanyStatus>,
}

#[async_trait]
pub trait CompanyRepository: Send + Sync {
    async fn create(&self, ctx: &TxContext, company: NewCompany) -> Result<Company, CompanyError>;
    async fn update(&self, ctx: &TxContext, company: &Company) -> Result<Company, CompanyError>;
    async fn delete(&self, ctx: &TxContext, id: Uuid) -> Result<(), CompanyError>;
    async fn find_by_id(&self, ctx: &TxContext, id: Uuid) -> Result<Company, CompanyError>;
    async fn find_by_code(
        &self,
        ctx: &TxContext,
        code: &str,
    ) -> Result<Option<Company>, CompanyError>;
    async fn list(
        &self,
        ctx: &TxContext,
        filter: ListCompaniesFilter,
    ) -> Result<Page<Company>, CompanyError>;
}

#[derive(Debug, Clone)]
pub struct CreateCompanyInput {
    pub name: String,
    pub code: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateCompanyInput {
    pub id: String,
    pub name: Option<String>,
    pub code: Option<String>,
    pub status: Option<String>,
    /// `Some("")` clears the description; `None` leaves it unchanged.
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ListCompaniesInput {
    pub page_size: i32,
    pub page_token: String,
    pub status: Option<String>,
}

/// Company use cases.
#[derive(Clone)]
pub struct CompanyService {
    repo: Arc<dyn CompanyRepository>,
    clock: Arc<dyn Clock>,
    tx: TxManager,
}

impl CompanyService {
    pub fn new(repo: Arc<dyn CompanyRepository>, clock: Arc<dyn Clock>, tx: TxManager) -> Self {
        Self { repo, clock, tx }
    }

    pub async fn create_company(
        &self,
        ctx: &TxContext,
        input: CreateCompanyInput,
    ) -> Result<Company, CompanyError> {
        let name = normalize_name(&input.name)?;
        let code = normalize_code(&input.code)?;
        let description = normalize_description(input.description.as_deref());

        self.tx
            .within_read_write(ctx, move |txctx| {
                Box::pin(async move {
                    ensure_code_not_exists(self.repo.as_ref(), &txctx, &code).await?;

                    let now = self.clock.now();
                    self.repo
                        .create(
                            &txctx,
                            NewCompany {
                                name,
                                code,
                                status: CompanyStatus::Active,
                                description,
                                created_at: now,
                                updated_at: now,
                            },
                        )
                        .await
                })
            })
            .await
    }

    pub async fn get_company(&self, ctx: &TxContext, id: &str) -> Result<Company, CompanyError> {
        let id = parse_id(id)?;

        self.tx
            .within_read_only(ctx, move |txctx| {
                Box::pin(async move { self.repo.find_by_id(&txctx, id).await })
            })
            .await
    }

    pub async fn list_companies(
        &self,
        ctx: &TxContext,
        input: ListCompaniesInput,
    ) -> Result<Page<Company>, CompanyError> {
        let limit = page::normalize_page_size(input.page_size)?;
        let offset = page::parse_page_token(&input.page_token)?;
        let status = parse_status_filter(input.status.as_deref())?;

        self.tx
            .within_read_only(ctx, move |txctx| {
                Box::pin(async move {
                    self.repo
                        .list(
                            &txctx,
                            ListCompaniesFilter {
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

    pub async fn update_company(
        &self,
        ctx: &TxContext,
        input: UpdateCompanyInput,
    ) -> Result<Company, CompanyError> {
        let id = parse_id(&input.id)?;

        self.tx
            .within_read_write(ctx, move |txctx| {
                Box::pin(async move {
                    let mut existing = self.repo.find_by_id(&txctx, id).await?;

                    if let Some(name) = &input.name {
                        existing.name = normalize_name(name)?;
                    }

                    if let Some(code) = &input.code {
                        let code = normalize_code(code)?;
                        if code != existing.code {
                            ensure_code_not_exists(self.repo.as_ref(), &txctx, &code).await?;
                            existing.code = code;
                        }
                    }

                    if let Some(status) = &input.status {
                        existing.status = CompanyStatus::parse(status.trim())
                            .ok_or(CompanyError::InvalidStatus)?;
                    }

                    if let Some(description) = &input.description {
                        existing.description = normalize_description(Some(description));
                    }

                    existing.updated_at = self.clock.now();
                    self.repo.update(&txctx, &existing).await
                })
            })
            .await
    }

    pub async fn delete_company(&self, ctx: &TxContext, id: &str) -> Result<(), CompanyError> {
        let id = parse_id(id)?;

        self.tx
            .within_read_write(ctx, move |txctx| {
                Box::pin(async move { self.repo.delete(&txctx, id).await })
            })
            .await
    }
}

/// The uniqueness probe runs inside the same transaction as the write that
/// follows it; the unique index remains the last line of defense.
async fn ensure_code_not_exists(
    repo: &dyn CompanyRepository,
    ctx: &TxContext,
    code: &str,
) -> Result<(), CompanyError> {
    if repo.find_by_code(ctx, code).await?.is_some() {
        return Err(CompanyError::CodeAlreadyExists);
    }
    Ok(())
}

fn parse_id(raw: &str) -> Result<Uuid, CompanyError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CompanyError::InvalidId);
    }
    Uuid::parse_str(trimmed).map_err(|_| CompanyError::InvalidId)
}

fn normalize_name(raw: &str) -> Result<String, CompanyError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CompanyError::InvalidName);
    }
    Ok(trimmed.to_string())
}

fn normalize_code(raw: &str) -> Result<String, CompanyError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CompanyError::InvalidCode);
    }
    let lower = trimmed.to_lowercase();
    if !CODE_PATTERN.is_match(&lower) {
        return Err(CompanyError::InvalidCode);
    }
    Ok(lower)
}

fn normalize_description(raw: Option<&str>) -> Option<String> {
    let trimmed = raw?.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.to_string())
}

fn parse_status_filter(raw: Option<&str>) -> Result<Option<CompanyStatus>, CompanyError> {
    match raw {
        None => Ok(None),
        Some(s) => CompanyStatus::parse(s.trim())
            .map(Some)
            .ok_or(CompanyError::InvalidStatus),
    }
}
