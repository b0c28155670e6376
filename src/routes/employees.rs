//! Employee endpoints (/employees)

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::error;
use uuid::Uuid;

use crate::AppState;
use crate::domain::employees::{
    CreateEmployeeInput, Employee, EmployeeError, ListEmployeesInput, UpdateEmployeeInput,
    UserSnapshot,
};
use crate::services::db::TxContext;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/employees", post(create_employee).get(list_employees))
        .route(
            "/employees/{id}",
            get(get_employee)
                .patch(update_employee)
                .delete(delete_employee),
        )
}

#[derive(Debug, Serialize)]
pub struct EmployeeUserResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub status: String,
}

impl From<UserSnapshot> for EmployeeUserResponse {
    fn from(user: UserSnapshot) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            status: user.status.as_str().to_string(),
        }
    }
}

/// Employee API response DTO, carrying the joined user snapshot.
#[derive(Debug, Serialize)]
pub struct EmployeeResponse {
    pub id: Uuid,
    pub company_id: Uuid,
    pub employee_code: String,
    pub status: String,
    pub hired_at: Option<NaiveDate>,
    pub terminated_at: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user: EmployeeUserResponse,
}

impl From<Employee> for EmployeeResponse {
    fn from(employee: Employee) -> Self {
        Self {
            id: employee.id,
            company_id: employee.company_id,
            employee_code: employee.employee_code,
            status: employee.status.as_str().to_string(),
            hired_at: employee.hired_at,
            terminated_at: employee.terminated_at,
            created_at: employee.created_at,
            updated_at: employee.updated_at,
            user: employee.user.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreateEmployeeRequest {
    company_id: String,
    employee_code: String,
    user_id: String,
    status: Option<String>,
    hired_at: Option<NaiveDate>,
    terminated_at: Option<NaiveDate>,
}

/// A date field that is absent stays unchanged; an explicit `null` clears it.
#[derive(Debug, Deserialize)]
struct UpdateEmployeeRequest {
    employee_code: Option<String>,
    user_id: Option<String>,
    status: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    hired_at: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "double_option")]
    terminated_at: Option<Option<NaiveDate>>,
}

fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize, Default)]
struct ListEmployeesQuery {
    #[serde(default)]
    company_id: String,
    #[serde(default)]
    page_size: i32,
    #[serde(default)]
    page_token: String,
    status: Option<String>,
}

#[derive(Debug, Serialize)]
struct ListEmployeesResponse {
    employees: Vec<EmployeeResponse>,
    next_page_token: String,
}

async fn create_employee(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateEmployeeRequest>,
) -> Result<(StatusCode, Json<EmployeeResponse>), StatusCode> {
    let ctx = TxContext::new();
    let created = state
        .employees
        .create_employee(
            &ctx,
            CreateEmployeeInput {
                company_id: req.company_id,
                employee_code: req.employee_code,
                user_id: req.user_id,
                status: req.status,
                hired_at: req.hired_at,
                terminated_at: req.terminated_at,
            },
        )
        .await
        .map_err(error_status)?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

async fn get_employee(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<EmployeeResponse>, StatusCode> {
    let ctx = TxContext::new();
    let employee = state
        .employees
        .get_employee(&ctx, &id)
        .await
        .map_err(error_status)?;
    Ok(Json(employee.into()))
}

async fn list_employees(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListEmployeesQuery>,
) -> Result<Json<ListEmployeesResponse>, StatusCode> {
    let ctx = TxContext::new();
    let page = state
        .employees
        .list_employees(
            &ctx,
            ListEmployeesInput {
                company_id: query.company_id,
                page_size: query.page_size,
                page_token: query.page_token,
                status: query.status,
            },
        )
        .await
        .map_err(error_status)?;
    Ok(Json(ListEmployeesResponse {
        employees: page.items.into_iter().map(EmployeeResponse::from).collect(),
        next_page_token: page.next_page_token,
    }))
}

async fn update_employee(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateEmployeeRequest>,
) -> Result<Json<EmployeeResponse>, StatusCode> {
    let ctx = TxContext::new();
    let updated = state
        .employees
        .update_employee(
            &ctx,
            UpdateEmployeeInput {
                id,
                employee_code: req.employee_code,
                user_id: req.user_id,
                status: req.status,
                hired_at: req.hired_at,
                terminated_at: req.terminated_at,
            },
        )
        .await
        .map_err(error_status)?;
    Ok(Json(updated.into()))
}

async fn delete_employee(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, StatusCode> {
    let ctx = TxContext::new();
    state
        .employees
        .delete_employee(&ctx, &id)
        .await
        .map_err(error_status)?;
    Ok(StatusCode::NO_CONTENT)
}

fn error_status(err: EmployeeError) -> StatusCode {
    match err {
        EmployeeError::NotFound
        | EmployeeError::CompanyNotFound
        | EmployeeError::UserNotFound => StatusCode::NOT_FOUND,
        EmployeeError::CodeAlreadyExists => StatusCode::CONFLICT,
        EmployeeError::InvalidId
        | EmployeeError::InvalidCompanyId
        | EmployeeError::InvalidUserId
        | EmployeeError::InvalidCode
        | EmployeeError::InvalidStatus
        | EmployeeError::InvalidEmploymentPeriod
        | EmployeeError::InvalidPageSize
        | EmployeeError::InvalidPageToken => StatusCode::BAD_REQUEST,
        EmployeeError::Transaction(_) | EmployeeError::Storage(_) => {
            error!(error = %err, "employee request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
