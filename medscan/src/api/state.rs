use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;
use crate::scan::ScanPipeline;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub pipeline: ScanPipeline,
}

impl AppState {
    pub fn new(config: Config, pipeline: ScanPipeline) -> Self {
        Self {
            config: Arc::new(config),
            pipeline,
        }
    }

    /// Production wiring from configuration.
    pub fn from_config(config: Config) -> Result<Self> {
        let pipeline = ScanPipeline::from_config(&config)?;
        Ok(Self::new(config, pipeline))
    }
}
