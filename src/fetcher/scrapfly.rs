use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::app::{GleanerError, Result};
use crate::config::FetchConfig;
use crate::fetcher::{FetchRequest, FetchResponse, Fetcher};

/// Environment variable consulted when no API key is configured.
pub const KEY_ENV_VAR: &str = "SCRAPFLY_KEY";

/// Client for the ScrapFly scrape endpoint.
///
/// One API call per target page: the target URL and the pass-through
/// options ride along as query parameters, and the rendered page body comes
/// back inside a JSON envelope. Proxy rotation, anti-bot bypass, caching
/// and retries all live on the service side.
pub struct ScrapflyFetcher {
    client: Client,
    api_url: String,
    key: String,
}

impl ScrapflyFetcher {
    pub fn new(api_url: impl Into<String>, key: impl Into<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .user_agent(concat!("gleaner/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            api_url: api_url.into(),
            key: key.into(),
        }
    }

    /// Build a fetcher from configuration, resolving the API key from the
    /// config file or `$SCRAPFLY_KEY`.
    pub fn from_config(config: &FetchConfig) -> Result<Self> {
        let key = config.resolve_key().ok_or_else(|| {
            GleanerError::Config(format!(
                "no scraping API key: set [fetch] key or ${KEY_ENV_VAR}"
            ))
        })?;
        Ok(Self::new(&config.api_url, key, config.timeout()))
    }

    fn api_url_for(&self, request: &FetchRequest) -> Result<url::Url> {
        let mut api = url::Url::parse(&self.api_url)?;
        {
            let mut query = api.query_pairs_mut();
            query.append_pair("key", &self.key);
            query.append_pair("url", request.url());
            if request.wants_render_js() {
                query.append_pair("render_js", "true");
            }
            if let Some(country) = request.country_code() {
                query.append_pair("country", country);
            }
            if let Some(pool) = request.proxy_pool_name() {
                query.append_pair("proxy_pool", pool);
            }
            if request.wants_cache() {
                query.append_pair("cache", "true");
            }
        }
        Ok(api)
    }
}

#[async_trait]
impl Fetcher for ScrapflyFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse> {
        let api = self.api_url_for(request)?;
        let target = request.url().to_string();

        tracing::debug!(url = %target, render_js = request.wants_render_js(), "fetching page");

        let response = self
            .client
            .get(api)
            .send()
            .await
            .map_err(|e| GleanerError::Fetch {
                url: target.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GleanerError::Fetch {
                url: target,
                reason: format!("scraping API returned {status}: {body}"),
            });
        }

        let envelope: ScrapeEnvelope =
            response.json().await.map_err(|e| GleanerError::Fetch {
                url: target.clone(),
                reason: format!("malformed API envelope: {e}"),
            })?;

        let result = envelope.result;
        if let Some(false) = result.success {
            return Err(GleanerError::Fetch {
                url: target,
                reason: result
                    .error
                    .unwrap_or_else(|| "service reported failure".into()),
            });
        }
        if let Some(code) = result.status_code {
            if code >= 400 {
                return Err(GleanerError::Fetch {
                    url: target,
                    reason: format!("upstream returned status {code}"),
                });
            }
        }

        let final_url = result.url.unwrap_or(target);
        Ok(FetchResponse::new(final_url, result.content))
    }
}

/// The service's response envelope. Only the fields this crate consumes;
/// the rest of the payload (timings, billing, headers) is ignored.
#[derive(Debug, Deserialize)]
struct ScrapeEnvelope {
    result: ScrapeResult,
}

#[derive(Debug, Deserialize)]
struct ScrapeResult {
    #[serde(default)]
    content: String,
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    status_code: Option<u16>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher_for(server: &MockServer) -> ScrapflyFetcher {
        ScrapflyFetcher::new(
            format!("{}/scrape", server.uri()),
            "test-key",
            Duration::from_secs(5),
        )
    }

    fn envelope(content: &str) -> serde_json::Value {
        json!({
            "result": {
                "content": content,
                "success": true,
                "status_code": 200,
                "url": "https://www.walmart.com/search?q=rice&page=1"
            }
        })
    }

    #[tokio::test]
    async fn test_fetch_passes_options_through() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/scrape"))
            .and(query_param("key", "test-key"))
            .and(query_param("url", "https://www.walmart.com/search?q=rice&page=1"))
            .and(query_param("render_js", "true"))
            .and(query_param("country", "US"))
            .and(query_param("cache", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope("<html></html>")))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = fetcher_for(&server);
        let request = FetchRequest::new("https://www.walmart.com/search?q=rice&page=1")
            .unwrap()
            .render_js(true)
            .country(Some("US".into()))
            .cache(true);

        let response = fetcher.fetch(&request).await.unwrap();
        assert_eq!(response.text(), "<html></html>");
    }

    #[tokio::test]
    async fn test_api_error_status_is_fetch_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/scrape"))
            .respond_with(ResponseTemplate::new(429).set_body_string("throttled"))
            .mount(&server)
            .await;

        let fetcher = fetcher_for(&server);
        let request = FetchRequest::new("https://example.com/").unwrap();
        let err = fetcher.fetch(&request).await.unwrap_err();
        assert!(matches!(err, GleanerError::Fetch { .. }));
        assert!(err.to_string().contains("429"));
    }

    #[tokio::test]
    async fn test_upstream_block_is_fetch_error() {
        let server = MockServer::start().await;
        let body = json!({
            "result": { "content": "", "success": true, "status_code": 403 }
        });
        Mock::given(method("GET"))
            .and(path("/scrape"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let fetcher = fetcher_for(&server);
        let request = FetchRequest::new("https://example.com/").unwrap();
        let err = fetcher.fetch(&request).await.unwrap_err();
        assert!(err.to_string().contains("403"));
    }

    #[tokio::test]
    async fn test_service_reported_failure() {
        let server = MockServer::start().await;
        let body = json!({
            "result": { "content": "", "success": false, "error": "ASP shield down" }
        });
        Mock::given(method("GET"))
            .and(path("/scrape"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let fetcher = fetcher_for(&server);
        let request = FetchRequest::new("https://example.com/").unwrap();
        let err = fetcher.fetch(&request).await.unwrap_err();
        assert!(err.to_string().contains("ASP shield down"));
    }
}
