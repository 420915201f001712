//! Shared application state

use crate::config::Config;
use crate::db::{self, JobStore, PgJobStore, PgResourceStore, ResourceStore};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub resources: Arc<dyn ResourceStore>,
    pub jobs: Arc<dyn JobStore>,
}

impl AppState {
    /// Connect to Postgres (running migrations when configured) and build the stores.
    pub async fn new(config: Config) -> crate::Result<Self> {
        let pool = db::connect(&config.database).await?;
        Ok(Self {
            config: Arc::new(config),
            resources: Arc::new(PgResourceStore::new(pool.clone())),
            jobs: Arc::new(PgJobStore::new(pool)),
        })
    }

    /// State over caller-provided stores.
    pub fn with_stores(
        config: Config,
        resources: Arc<dyn ResourceStore>,
        jobs: Arc<dyn JobStore>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            resources,
            jobs,
        }
    }
}
