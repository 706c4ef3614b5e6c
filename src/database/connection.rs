//! Postgres pool setup, schema migrations and health checks

use sqlx::{Pool, Postgres};
use std::time::Duration;
use crate::utils::errors::CourseDeskError;

pub type DatabasePool = Pool<Postgres>;

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Option<Duration>,
    pub max_lifetime: Option<Duration>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost/coursedesk".to_string(),
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Some(Duration::from_secs(600)),
            max_lifetime: Some(Duration::from_secs(1800)),
        }
    }
}

impl From<&crate::config::DatabaseConfig> for DatabaseConfig {
    fn from(settings: &crate::config::DatabaseConfig) -> Self {
        Self {
            url: settings.url.clone(),
            max_connections: settings.max_connections,
            min_connections: settings.min_connections,
            ..Default::default()
        }
    }
}

/// Open the pool and make sure the server answers
pub async fn create_pool(config: &DatabaseConfig) -> Result<DatabasePool, CourseDeskError> {
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .max_lifetime(config.max_lifetime)
        .connect(&config.url)
        .await?;

    health_check(&pool).await?;

    tracing::info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Database pool ready"
    );
    Ok(pool)
}

/// Apply the embedded schedule schema migrations
pub async fn run_migrations(pool: &DatabasePool) -> Result<(), CourseDeskError> {
    let migrator = sqlx::migrate!("./migrations");
    let known = migrator.iter().count();

    migrator.run(pool).await?;

    tracing::info!(migrations = known, "Schedule schema is up to date");
    Ok(())
}

/// Round trip to the server; the elapsed time is logged at debug level
pub async fn health_check(pool: &DatabasePool) -> Result<(), CourseDeskError> {
    let started = std::time::Instant::now();
    sqlx::query("SELECT 1").execute(pool).await?;
    tracing::debug!(elapsed_ms = started.elapsed().as_millis() as u64, "Database health check passed");
    Ok(())
}
