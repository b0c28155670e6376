//! User endpoints (/users)

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
use crate::domain::users::{CreateUserInput, ListUsersInput, UpdateUserInput, User, UserError};
use crate::services::db::TxContext;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users", post(create_user).get(list_users))
        .route(
            "/users/{id}",
            get(get_user).patch(update_user).delete(delete_user),
        )
}

/// User API response DTO
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            status: user.status.as_str().to_string(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreateUserRequest {
    email: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct UpdateUserRequest {
    name: Option<String>,
    status: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct ListUsersQuery {
    #[serde(default)]
    page_size: i32,
    #[serde(default)]
    page_token: String,
    status: Option<String>,
}

#[derive(Debug, Serialize)]
struct ListUsersResponse {
    users: Vec<UserResponse>,
    next_page_token: String,
}

async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), StatusCode> {
    let ctx = TxContext::new();
    let created = state
        .users
        .create_user(
            &ctx,
            CreateUserInput {
                email: req.email,
                name: req.name,
            },
        )
        .await
        .map_err(error_status)?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, StatusCode> {
    let ctx = TxContext::new();
    let user = state.users.get_user(&ctx, &id).await.map_err(error_status)?;
    Ok(Json(user.into()))
}

async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<ListUsersResponse>, StatusCode> {
    let ctx = TxContext::new();
    let page = state
        .users
        .list_users(
            &ctx,
            ListUsersInput {
                page_size: query.page_size,
                page_token: query.page_token,
                status: query.status,
            },
        )
        .await
        .map_err(error_status)?;
    Ok(Json(ListUsersResponse {
        users: page.items.into_iter().map(UserResponse::from).collect(),
        next_page_token: page.next_page_token,
    }))
}

async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, StatusCode> {
    let ctx = TxContext::new();
    let updated = state
        .users
        .update_user(
            &ctx,
            UpdateUserInput {
                id,
                name: req.name,
                status: req.status,
            },
        )
        .await
        .map_err(error_status)?;
    Ok(Json(updated.into()))
}

async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, StatusCode> {
    let ctx = TxContext::new();
    state
        .users
        .delete_user(&ctx, &id)
        .await
        .map_err(error_status)?;
    Ok(StatusCode::NO_CONTENT)
}

fn error_status(err: UserError) -> StatusCode {
    match err {
        UserError::NotFound => StatusCode::NOT_FOUND,
        UserError::EmailAlreadyExists => StatusCode::CONFLICT,
        UserError::InvalidEmail
        | UserError::InvalidName
        | UserError::InvalidStatus
        | UserError::InvalidId
        | UserError::InvalidPageSize
        | UserError::InvalidPageToken => StatusCode::BAD_REQUEST,
        UserError::Transaction(_) | UserError::Storage(_) => {
            error!(error = %err, "user request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
