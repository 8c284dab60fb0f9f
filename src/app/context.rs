use std::sync::Arc;

use crate::app::Result;
use crate::config::Config;
use crate::fetcher::{Fetcher, ScrapflyFetcher};
use crate::harvest::Harvester;

/// Wires the loaded configuration to the components a command needs: the
/// injected fetch client and a harvester carrying the configured policies.
pub struct AppContext {
    pub config: Config,
    pub fetcher: Arc<dyn Fetcher + Send + Sync>,
    pub harvester: Harvester,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        let fetcher: Arc<dyn Fetcher + Send + Sync> =
            Arc::new(ScrapflyFetcher::from_config(&config.fetch)?);
        Ok(Self::with_fetcher(config, fetcher))
    }

    /// Build a context around any fetcher implementation. Used by tests to
    /// run pipelines without the scraping API.
    pub fn with_fetcher(config: Config, fetcher: Arc<dyn Fetcher + Send + Sync>) -> Self {
        let harvester = Harvester::with_workers(fetcher.clone(), config.fetch.workers)
            .ordering(config.harvest.ordering)
            .on_page_failure(config.harvest.on_page_failure);

        Self {
            config,
            fetcher,
            harvester,
        }
    }
}
