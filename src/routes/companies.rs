//! Company endpoints (/companies)

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::error;
use uuid::Uuid;

use crate::AppState;
use crate::domain::companies::{
    Company, CompanyError, CreateCompanyInput, ListCompaniesInput, UpdateCompanyInput,
};
use crate::services::db::TxContext;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/companies", post(create_company).get(list_companies))
        .route(
            "/companies/{id}",
            get(get_company).patch(update_company).delete(delete_company),
        )
}

/// Company API response DTO
#[derive(Debug, Serialize)]
pub struct CompanyResponse {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub status: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Company> for CompanyResponse {
    fn from(company: Company) -> Self {
        Self {
            id: company.id,
            name: company.name,
            code: company.code,
            status: company.status.as_str().to_string(),
            description: company.description,
            created_at: company.created_at,
            updated_at: company.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreateCompanyRequest {
    name: String,
    code: String,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpdateCompanyRequest {
    name: Option<String>,
    code: Option<String>,
    status: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct ListCompaniesQuery {
    #[serde(default)]
    page_size: i32,
    #[serde(default)]
    page_token: String,
    status: Option<String>,
}

#[derive(Debug, Serialize)]
struct ListCompaniesResponse {
    companies: Vec<CompanyResponse>,
    next_page_token: String,
}

async fn create_company(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateCompanyRequest>,
) -> Result<(StatusCode, Json<CompanyResponse>), StatusCode> {
    let ctx = TxContext::new();
    let created = state
        .companies
        .create_company(
            &ctx,
            CreateCompanyInput {
                name: req.name,
                code: req.code,
                description: req.description,
            },
        )
        .await
        .map_err(error_status)?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

async fn get_company(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<CompanyResponse>, StatusCode> {
    let ctx = TxContext::new();
    let company = state
        .companies
        .get_company(&ctx, &id)
        .await
        .map_err(error_status)?;
    Ok(Json(company.into()))
}

async fn list_companies(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListCompaniesQuery>,
) -> Result<Json<ListCompaniesResponse>, StatusCode> {
    let ctx = TxContext::new();
    let page = state
        .companies
        .list_companies(
            &ctx,
            ListCompaniesInput {
                page_size: query.page_size,
                page_token: query.page_token,
                status: query.status,
            },
        )
        .await
        .map_err(error_status)?;
    Ok(Json(ListCompaniesResponse {
        companies: page.items.into_iter().map(CompanyResponse::from).collect(),
        next_page_token: page.next_page_token,
    }))
}

async fn update_company(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateCompanyRequest>,
) -> Result<Json<CompanyResponse>, StatusCode> {
    let ctx = TxContext::new();
    let updated = state
        .companies
        .update_company(
            &ctx,
            UpdateCompanyInput {
                id,
                name: req.name,
                code: req.code,
                status: req.status,
                description: req.description,
            },
        )
        .await
        .map_err(error_status)?;
    Ok(Json(updated.into()))
}

async fn delete_company(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, StatusCode> {
    let ctx = TxContext::new();
    state
        .companies
        .delete_company(&ctx, &id)
        .await
        .map_err(error_status)?;
    Ok(StatusCode::NO_CONTENT)
}

fn error_status(err: CompanyError) -> StatusCode {
    match err {
        CompanyError::NotFound => StatusCode::NOT_FOUND,
        CompanyError::CodeAlreadyExists => StatusCode::CONFLICT,
        CompanyError::InvalidName
        | CompanyError::InvalidCode
        | CompanyError::InvalidStatus
        | CompanyError::InvalidId
        | CompanyError::InvalidPageSize
        | CompanyError::InvalidPageToken => StatusCode::BAD_REQUEST,
        CompanyError::Transaction(_) | CompanyError::Storage(_) => {
            error!(error = %err, "company request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
