//! Configuration for harvest runs.
//!
//! Read once at startup from an explicit `--config` path or
//! `~/.config/gleaner/config.toml` (created with a commented template on
//! first run), then passed by value into the pipelines. Nothing in the
//! crate mutates configuration after load, and the fetch client is built
//! from it exactly once.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::app::{GleanerError, Result};
use crate::fetcher::scrapfly::KEY_ENV_VAR;
use crate::fetcher::{batch::DEFAULT_WORKERS, FetchRequest};
use crate::harvest::{OrderingPolicy, PageFailurePolicy};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub fetch: FetchConfig,
    pub harvest: HarvestConfig,
    pub output: OutputConfig,
}

/// Options for the scraping API client. `country`, `proxy_pool` and
/// `cache` are pass-through request options the crate never interprets.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Scrape endpoint of the API.
    pub api_url: String,

    /// API key; falls back to `$SCRAPFLY_KEY` when unset.
    pub key: Option<String>,

    /// Geographic egress country for proxied fetches.
    pub country: Option<String>,

    /// Proxy pool to route through.
    pub proxy_pool: Option<String>,

    /// Let the service answer from its cache.
    pub cache: bool,

    /// Per-request timeout in seconds. Rendered fetches can be slow.
    pub timeout_secs: u64,

    /// Concurrent fetches in flight during fan-out.
    pub workers: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.scrapfly.io/scrape".into(),
            key: None,
            country: Some("US".into()),
            proxy_pool: Some("public_residential_pool".into()),
            cache: false,
            timeout_secs: 90,
            workers: DEFAULT_WORKERS,
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn resolve_key(&self) -> Option<String> {
        self.key
            .clone()
            .or_else(|| std::env::var(KEY_ENV_VAR).ok())
    }

    /// Stamp the configured pass-through options onto a request.
    pub fn apply(&self, request: FetchRequest) -> FetchRequest {
        request
            .country(self.country.clone())
            .proxy_pool(self.proxy_pool.clone())
            .cache(self.cache)
    }
}

/// Harvest policies, all explicit rather than inherited from the fetch
/// service's defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    pub ordering: OrderingPolicy,
    pub on_page_failure: PageFailurePolicy,

    /// Soft page limit applied to every search harvest unless the command
    /// line narrows it further.
    pub max_pages: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory harvest documents are written to.
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("results"),
        }
    }
}

impl Config {
    /// Load configuration from `path`, or from the default location when
    /// none is given. A missing default file is created as a commented
    /// template; a missing explicit file is an error. Missing fields take
    /// their defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(explicit) => explicit.to_path_buf(),
            None => {
                let default_path = Self::default_config_path()?;
                if !default_path.exists() {
                    Self::create_default_config(&default_path)?;
                    return Ok(Self::default());
                }
                default_path
            }
        };

        let content = fs::read_to_string(&config_path).map_err(|e| {
            GleanerError::Config(format!("cannot read {}: {e}", config_path.display()))
        })?;
        toml::from_str(&content).map_err(|e| {
            GleanerError::Config(format!("cannot parse {}: {e}", config_path.display()))
        })
    }

    /// `~/.config/gleaner/config.toml`
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| GleanerError::Config("could not determine config directory".into()))?;
        Ok(config_dir.join("gleaner").join("config.toml"))
    }

    fn create_default_config(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = fs::File::create(path)?;
        file.write_all(Self::default_config_content().as_bytes())?;
        Ok(())
    }

    fn default_config_content() -> &'static str {
        r##"# Gleaner configuration
#
# All values are optional; anything missing takes the default shown here.

[fetch]
# Scrape endpoint of the scraping API.
api_url = "https://api.scrapfly.io/scrape"

# API key. When unset, $SCRAPFLY_KEY is used instead.
# key = "scp-live-..."

# Geographic egress country for proxied fetches.
country = "US"

# Proxy pool to route through.
proxy_pool = "public_residential_pool"

# Let the service answer from its cache.
cache = false

# Per-request timeout in seconds.
timeout_secs = 90

# Concurrent fetches in flight during fan-out.
workers = 10

[harvest]
# "request-order" re-sorts concurrently fetched pages back into page
# order; "arrival-order" appends them as they complete.
ordering = "request-order"

# "abort" fails the harvest on the first broken page; "skip-and-log"
# drops the page and continues.
on_page_failure = "abort"

# Soft limit on pages per search harvest. Sources impose their own hard
# ceilings on top of this.
# max_pages = 5

[output]
# Directory harvest documents are written to.
dir = "results"
"##
    }
}
