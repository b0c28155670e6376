//! Applies the SQL migrations under `migrations/` and exits.
//!
//! Migrations run out-of-band rather than at service startup so a bad
//! migration never takes down a deploy rollout.
//!
//! ## Environment Variables
//! - `DATABASE_URL` - Postgres connection string (required)

use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await
        .expect("database connection");

    MIGRATOR.run(&pool).await.expect("apply migrations");

    info!("migrations applied");
}
