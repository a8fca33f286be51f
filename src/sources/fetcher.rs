//! Page fetching for job board scrapers
//!
//! Scrapers only need "give me the document at this URL". The default
//! [`HttpPageFetcher`] issues plain HTTP requests with browser-like headers;
//! a JavaScript rendering backend can be slotted in behind the same trait.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE};
use reqwest::Client;
use tracing::debug;

use crate::config::ScraperConfig;
use crate::errors::{SourceError, SourceResult};

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch the body at `url`, failing on non-success status codes
    async fn fetch(&self, url: &str) -> SourceResult<String>;

    /// Fetch a JSON API response at `url`
    async fn fetch_json(&self, url: &str) -> SourceResult<String> {
        self.fetch(url).await
    }
}

pub struct HttpPageFetcher {
    client: Client,
}

impl HttpPageFetcher {
    pub fn new(config: &ScraperConfig) -> SourceResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/json;q=0.9,*/*;q=0.8",
            ),
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("fr-FR,fr;q=0.9,en;q=0.8"),
        );

        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| SourceError::invalid_config("http_client", e.to_string()))?;

        Ok(Self { client })
    }

    async fn get(&self, url: &str, headers: HeaderMap) -> SourceResult<String> {
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .headers(headers)
            .send()
            .await
            .map_err(|e| SourceError::from_reqwest(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Http {
                status: status.as_u16(),
                message: format!("call failed with status {} for {}", status, url),
            });
        }

        response
            .text()
            .await
            .map_err(|e| SourceError::from_reqwest(url, e))
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str) -> SourceResult<String> {
        self.get(url, HeaderMap::new()).await
    }

    async fn fetch_json(&self, url: &str) -> SourceResult<String> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        self.get(url, headers).await
    }
}
