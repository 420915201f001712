//! Database access
//!
//! Handlers talk to storage through the traits in [`traits`]; the Postgres
//! implementations live next to them.

pub mod jobs;
pub mod resources;
pub mod traits;

pub use jobs::PgJobStore;
pub use resources::PgResourceStore;
pub use traits::{JobStore, NewBatch, ResourceStore, Scope};

use crate::config::DatabaseConfig;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

pub async fn connect(config: &DatabaseConfig) -> crate::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .min_connections(config.pool_min_size)
        .max_connections(config.pool_max_size)
        .acquire_timeout(Duration::from_secs(config.pool_timeout_seconds))
        .connect(&config.url)
        .await?;

    if config.run_migrations {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| crate::Error::Internal(format!("Failed to run migrations: {}", e)))?;
        tracing::info!("Database migrations applied");
    }

    Ok(pool)
}
