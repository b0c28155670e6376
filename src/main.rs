mod config;
mod domain;
mod repo;
mod routes;
mod services;

use std::sync::Arc;

use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::domain::companies::CompanyService;
use crate::domain::employees::EmployeeService;
use crate::domain::users::UserService;
use crate::repo::companies::PgCompanyRepository;
use crate::repo::employees::PgEmployeeRepository;
use crate::repo::users::PgUserRepository;
use crate::services::clock::{Clock, SystemClock};
use crate::services::db;
use crate::services::tx::TxManager;

pub struct AppState {
    pub users: UserService,
    pub companies: CompanyService,
    pub employees: EmployeeService,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = Config::from_env().expect("configuration");

    let pool = db::connect(&cfg.database)
        .await
        .expect("database connection");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let tx = TxManager::new(pool.clone());

    let state = Arc::new(AppState {
        users: UserService::new(
            Arc::new(PgUserRepository::new(pool.clone())),
            clock.clone(),
            tx.clone(),
        ),
        companies: CompanyService::new(
            Arc::new(PgCompanyRepository::new(pool.clone())),
            clock.clone(),
            tx.clone(),
        ),
        employees: EmployeeService::new(
            Arc::new(PgEmployeeRepository::new(pool.clone())),
            clock.clone(),
            tx.clone(),
        ),
    });

    let app = routes::api_router()
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&cfg.listen_addr)
        .await
        .expect("bind listen address");
    info!(addr = %cfg.listen_addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("install terminate handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
