//! HTTP surface: thin JSON handlers over the use-case services.
//!
//! Handlers start a fresh [`TxContext`](crate::services::db::TxContext) per
//! request and map domain errors onto status codes: validation failures are
//! 400, natural-key conflicts 409, missing rows 404, everything else 500.

pub mod companies;
pub mod employees;
pub mod users;

use std::sync::Arc;

use axum::{Router, routing::get};

use crate::AppState;

pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .merge(users::routes())
        .merge(companies::routes())
        .merge(employees::routes())
}

async fn health() -> &'static str {
    "ok"
}
