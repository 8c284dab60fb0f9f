pub mod batch;
pub mod scrapfly;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scraper::Html;

use crate::app::{GleanerError, Result};

pub use batch::BatchFetcher;
pub use scrapfly::ScrapflyFetcher;

/// A single page to fetch through the scraping API, plus the pass-through
/// options the API accepts. Validated at construction and immutable
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    url: String,
    render_js: bool,
    country: Option<String>,
    proxy_pool: Option<String>,
    cache: bool,
}

impl FetchRequest {
    /// Build a request for `url`. Empty or unparseable locators are
    /// rejected here, before anything reaches the network.
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(GleanerError::InvalidInput("empty URL".into()));
        }
        url::Url::parse(&url)
            .map_err(|e| GleanerError::InvalidInput(format!("malformed URL {url:?}: {e}")))?;

        Ok(Self {
            url,
            render_js: false,
            country: None,
            proxy_pool: None,
            cache: false,
        })
    }

    /// Ask the scraping API to run the page's JavaScript before returning it.
    pub fn render_js(mut self, enabled: bool) -> Self {
        self.render_js = enabled;
        self
    }

    /// Geographic egress country for the proxy.
    pub fn country(mut self, country: Option<String>) -> Self {
        self.country = country;
        self
    }

    /// Named proxy pool to route through.
    pub fn proxy_pool(mut self, pool: Option<String>) -> Self {
        self.proxy_pool = pool;
        self
    }

    /// Let the scraping API serve a cached copy if it has one.
    pub fn cache(mut self, enabled: bool) -> Self {
        self.cache = enabled;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn wants_render_js(&self) -> bool {
        self.render_js
    }

    pub fn country_code(&self) -> Option<&str> {
        self.country.as_deref()
    }

    pub fn proxy_pool_name(&self) -> Option<&str> {
        self.proxy_pool.as_deref()
    }

    pub fn wants_cache(&self) -> bool {
        self.cache
    }
}

/// A successfully fetched page. Exposes the raw body for embedded script
/// payloads and an on-demand parsed document for markup lookups.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    url: String,
    body: String,
    pub fetched_at: DateTime<Utc>,
}

impl FetchResponse {
    pub fn new(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            body: body.into(),
            fetched_at: Utc::now(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn text(&self) -> &str {
        &self.body
    }

    /// Parse the body as an HTML document. `scraper::Html` is not `Send`,
    /// so callers parse locally and must not hold the document across an
    /// await point.
    pub fn html(&self) -> Html {
        Html::parse_document(&self.body)
    }
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse>;
}
