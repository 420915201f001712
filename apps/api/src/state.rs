//! Application state shared by both listeners

use std::sync::Arc;

use crate::client::{AttributionClient, HttpAttributionClient, HttpSsasClient, SsasClient};
use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub attribution: Arc<dyn AttributionClient>,
    pub ssas: Arc<dyn SsasClient>,
}

impl AppState {
    /// State backed by the HTTP clients described in `config`.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let attribution = Arc::new(HttpAttributionClient::new(&config.attribution)?);
        let ssas = Arc::new(HttpSsasClient::new(&config.ssas)?);
        Ok(Self::with_clients(config, attribution, ssas))
    }

    pub fn with_clients(
        config: Config,
        attribution: Arc<dyn AttributionClient>,
        ssas: Arc<dyn SsasClient>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            attribution,
            ssas,
        }
    }
}
