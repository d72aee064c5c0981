use shared_config::AppConfig;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

/// Opens the connection pool against `DATABASE_URL`.
pub async fn connect_pool(config: &AppConfig) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await?;
    info!("Connected to Postgres");
    Ok(pool)
}

/// Pool that only connects on first use. Router-level tests build state with
/// this so no database has to be running.
pub fn connect_lazy(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPool::connect_lazy(database_url)
}

/// Applies the embedded migrations under `libs/shared/database/migrations/`.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
